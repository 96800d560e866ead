//! Visual signature stamping for PDF documents
//!
//! This crate stamps a signature image onto every page of a PDF using lopdf.
//!
//! - [`loader::PdfDocument`]: open a PDF, read page geometry, insert images, serialize
//! - [`engine::SigningEngine`]: per-page placement, failure handling and cleanup
//! - [`geometry`]: default bottom-right placement and clamped relative positions
//!
//! ```no_run
//! use stamp_core::{RelativePosition, SigningEngine, SigningRequest, Source};
//!
//! let engine = SigningEngine::default();
//! let request = SigningRequest::new(Source::path("contract.pdf"), Source::path("signature.png"))
//!     .with_position(RelativePosition::new(0.1, 0.9));
//! let signed = engine.sign(&request)?;
//! std::fs::write("contract-signed.pdf", signed.bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod observer;
pub mod signature;
pub mod source;

pub use config::StampConfig;
pub use engine::{SignedPdf, SigningEngine, SigningRequest};
pub use error::{ConfigError, FailureReason, ImageError, LoaderError, SigningError};
pub use geometry::{InsertionRect, PageGeometry, RelativePosition};
pub use loader::{page_count, PdfDocument};
pub use observer::{MemoryObserver, SigningEvent, SigningObserver, Stage, TracingObserver};
pub use signature::SignatureImage;
pub use source::Source;
