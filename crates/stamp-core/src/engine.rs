//! Signing engine
//!
//! Opens a document, stamps the signature image onto every page and returns
//! the serialized result. The engine is stateless between calls apart from
//! its fixed configuration, so one instance can be shared across threads.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::config::StampConfig;
use crate::error::{ConfigError, FailureReason, SigningError};
use crate::geometry::{stamp_rect, InsertionRect, PageGeometry, RelativePosition};
use crate::loader::PdfDocument;
use crate::observer::{SigningEvent, SigningObserver, Stage, TracingObserver};
use crate::signature::SignatureImage;
use crate::source::Source;

/// Inputs for one signing call
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub source_pdf: Source,
    pub signature_image: Source,
    pub position: Option<RelativePosition>,
}

impl SigningRequest {
    pub fn new(source_pdf: impl Into<Source>, signature_image: impl Into<Source>) -> Self {
        Self {
            source_pdf: source_pdf.into(),
            signature_image: signature_image.into(),
            position: None,
        }
    }

    pub fn with_position(mut self, position: Option<RelativePosition>) -> Self {
        self.position = position;
        self
    }
}

/// A successfully signed document
#[derive(Debug, Clone)]
pub struct SignedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

pub struct SigningEngine {
    config: StampConfig,
    observer: Arc<dyn SigningObserver>,
}

impl std::fmt::Debug for SigningEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for SigningEngine {
    fn default() -> Self {
        Self {
            config: StampConfig::default(),
            observer: Arc::new(TracingObserver),
        }
    }
}

impl SigningEngine {
    pub fn new(config: StampConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            observer: Arc::new(TracingObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn SigningObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &StampConfig {
        &self.config
    }

    /// Where the stamp lands on a page of the given size
    pub fn placement(&self, page: PageGeometry, position: Option<RelativePosition>) -> InsertionRect {
        stamp_rect(page, &self.config, position)
    }

    /// Stamp the signature onto every page of the source document
    pub fn sign(&self, request: &SigningRequest) -> Result<SignedPdf, SigningError> {
        self.observer.on_event(&SigningEvent::Started {
            source: request.source_pdf.describe(),
            image: request.signature_image.describe(),
        });

        let mut doc = PdfDocument::open(&request.source_pdf).map_err(|e| {
            self.fail(Stage::Open, None, FailureReason::InvalidSourceDocument, e)
        })?;

        self.sign_document(&mut doc, &request.signature_image, request.position)
    }

    /// Convenience wrapper around [`SigningEngine::sign`]
    pub fn sign_sources(
        &self,
        source_pdf: impl Into<Source>,
        signature_image: impl Into<Source>,
        position: Option<RelativePosition>,
    ) -> Result<SignedPdf, SigningError> {
        self.sign(&SigningRequest::new(source_pdf, signature_image).with_position(position))
    }

    /// Stamp an already opened document and serialize it.
    ///
    /// The handle is always closed when this returns, whether signing
    /// succeeded or not.
    pub fn sign_document(
        &self,
        doc: &mut PdfDocument,
        signature_image: &Source,
        position: Option<RelativePosition>,
    ) -> Result<SignedPdf, SigningError> {
        let mut doc = CloseOnDrop(doc);

        let page_count = doc.page_count();
        self.observer.on_event(&SigningEvent::Opened { page_count });

        if page_count > 0 {
            let image = SignatureImage::open(signature_image).map_err(|e| {
                self.fail(Stage::DecodeImage, None, FailureReason::InvalidImageSource, e)
            })?;

            for page_index in 0..page_count {
                self.sign_page(&mut doc, page_index, page_count, &image, position)?;
            }
        }

        let bytes = self.serialize(&mut doc)?;

        self.observer.on_event(&SigningEvent::Completed {
            output_bytes: bytes.len(),
        });
        Ok(SignedPdf { bytes, page_count })
    }

    fn sign_page(
        &self,
        doc: &mut PdfDocument,
        page_index: usize,
        page_count: usize,
        image: &SignatureImage,
        position: Option<RelativePosition>,
    ) -> Result<(), SigningError> {
        let geometry = doc.page_geometry(page_index).map_err(|e| {
            self.fail(Stage::Geometry, Some(page_index), FailureReason::ImageInsertFailed, e)
        })?;

        let rect = self.placement(geometry, position);

        doc.insert_image(page_index, rect, image).map_err(|e| {
            self.fail(Stage::InsertImage, Some(page_index), FailureReason::ImageInsertFailed, e)
        })?;

        self.observer.on_event(&SigningEvent::PageSigned {
            page_index,
            page_count,
        });
        Ok(())
    }

    fn serialize(&self, doc: &mut PdfDocument) -> Result<Vec<u8>, SigningError> {
        let serialized = match &self.config.spool_dir {
            Some(dir) => doc.serialize_spooled(dir, |path, err| {
                self.observer.on_event(&SigningEvent::CleanupWarning {
                    detail: format!("{}: {}", path.display(), err),
                });
            }),
            None => doc.serialize(),
        };

        serialized
            .map_err(|e| self.fail(Stage::Serialize, None, FailureReason::SerializationFailed, e))
    }

    fn fail(
        &self,
        stage: Stage,
        page_index: Option<usize>,
        reason: FailureReason,
        cause: impl std::fmt::Display,
    ) -> SigningError {
        let cause = cause.to_string();
        self.observer.on_event(&SigningEvent::Failed {
            stage,
            page_index,
            cause: cause.clone(),
        });
        SigningError::new(reason, cause)
    }
}

/// Closes the wrapped document when it goes out of scope
struct CloseOnDrop<'a>(&'a mut PdfDocument);

impl Deref for CloseOnDrop<'_> {
    type Target = PdfDocument;

    fn deref(&self) -> &PdfDocument {
        self.0
    }
}

impl DerefMut for CloseOnDrop<'_> {
    fn deref_mut(&mut self) -> &mut PdfDocument {
        self.0
    }
}

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}
