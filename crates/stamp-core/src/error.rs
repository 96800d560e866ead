use thiserror::Error;

/// Failures raised by the document loader.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to open PDF: {0}")]
    Open(String),

    #[error("Page index {index} out of range (document has {page_count} pages)")]
    Index { index: usize, page_count: usize },

    #[error("Image insertion failed: {0}")]
    ImageInsert(String),

    #[error("Serialization failed: {0}")]
    Serialize(String),

    #[error("Document handle is closed")]
    Closed,
}

/// Failures raised while reading or decoding a signature image.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to read image: {0}")]
    Read(#[from] std::io::Error),

    #[error("Unsupported or corrupt image: {0}")]
    Decode(String),

    #[error("Image has zero width or height")]
    Empty,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Stamp {0} must be a positive, finite number of points")]
    NonPositive(&'static str),

    #[error("Margin must be a non-negative, finite number of points")]
    InvalidMargin,
}

/// Coarse classification of a failed signing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    InvalidSourceDocument,
    InvalidImageSource,
    ImageInsertFailed,
    SerializationFailed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvalidSourceDocument => "invalid_source_document",
            FailureReason::InvalidImageSource => "invalid_image_source",
            FailureReason::ImageInsertFailed => "image_insert_failed",
            FailureReason::SerializationFailed => "serialization_failed",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error type returned by [`crate::SigningEngine::sign`].
///
/// Stage detail (which page, which loader call) goes to the observer; the
/// error itself only carries the reason and a human-readable message.
#[derive(Error, Debug)]
#[error("Failed to sign PDF: {detail}")]
pub struct SigningError {
    pub reason: FailureReason,
    pub detail: String,
}

impl SigningError {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn reason(&self) -> FailureReason {
        self.reason
    }
}
