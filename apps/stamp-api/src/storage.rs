//! On-disk file store for uploads and signed output

use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Subdirectory for uploaded source PDFs
pub const DOCUMENTS_DIR: &str = "documents";
/// Subdirectory for uploaded signature images
pub const SIGNATURES_DIR: &str = "signatures";
/// Subdirectory for stamped output
pub const SIGNED_DIR: &str = "signed_documents";

/// Files live under one root. Records store paths relative to it.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        for dir in [DOCUMENTS_DIR, SIGNATURES_DIR, SIGNED_DIR] {
            std::fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { root })
    }

    /// Write `bytes` into `dir` under `file_name`, returning the relative path.
    ///
    /// The data is written to a temp file in the target directory and then
    /// persisted, so a half-written upload never appears under its final name.
    /// Name collisions get a numeric suffix instead of overwriting.
    pub fn save(&self, dir: &str, file_name: &str, bytes: &[u8]) -> io::Result<String> {
        let target_dir = self.root.join(dir);
        let mut tmp = tempfile::Builder::new()
            .prefix(".upload-")
            .tempfile_in(&target_dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;

        let file_name = sanitize_file_name(file_name);
        let (stem, ext) = split_extension(&file_name);

        let mut attempt = 0u32;
        loop {
            let candidate = if attempt == 0 {
                file_name.clone()
            } else {
                format!("{}_{}{}", stem, attempt, ext)
            };
            match tmp.persist_noclobber(target_dir.join(&candidate)) {
                Ok(_) => return Ok(format!("{}/{}", dir, candidate)),
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists && attempt < 1000 => {
                    tmp = e.file;
                    attempt += 1;
                }
                Err(e) => return Err(e.error),
            }
        }
    }

    /// Resolve a stored relative path. Paths escaping the root are rejected.
    pub fn path(&self, relative: &str) -> io::Result<PathBuf> {
        let rel = Path::new(relative);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing path outside storage: {}", relative),
            ));
        }
        Ok(self.root.join(rel))
    }

    pub fn read(&self, relative: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.path(relative)?)
    }

    /// Remove a stored file. Returns `false` if it was already gone.
    pub fn remove(&self, relative: &str) -> io::Result<bool> {
        match std::fs::remove_file(self.path(relative)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Keep the final path component and replace anything unusual.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}
