//! Byte sources for documents and images

use std::io::Read;
use std::path::{Path, PathBuf};

/// Where a PDF or signature image comes from.
#[derive(Debug, Clone)]
pub enum Source {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl Source {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Source::Path(path.into())
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Source::Bytes(bytes.into())
    }

    /// Drain a reader into an in-memory source
    pub fn from_reader<R: Read>(mut reader: R) -> std::io::Result<Self> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        Ok(Source::Bytes(buffer))
    }

    /// Short description used in log events
    pub fn describe(&self) -> String {
        match self {
            Source::Path(path) => path.display().to_string(),
            Source::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }

    pub(crate) fn read_all(&self) -> std::io::Result<std::borrow::Cow<'_, [u8]>> {
        match self {
            Source::Path(path) => std::fs::read(path).map(std::borrow::Cow::Owned),
            Source::Bytes(bytes) => Ok(std::borrow::Cow::Borrowed(bytes.as_slice())),
        }
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Bytes(bytes)
    }
}

impl From<&[u8]> for Source {
    fn from(bytes: &[u8]) -> Self {
        Source::Bytes(bytes.to_vec())
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}
