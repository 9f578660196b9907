//! Request-scoped upload staging.
//!
//! An upload is written to the upload directory only after its filename
//! passes the allow-list, and lives exactly as long as its
//! [`StagedUpload`] guard. Dropping the guard deletes the file, so every
//! early return and error path releases storage.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::sniff::PlanKind;

/// Extensions accepted for upload (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["json", "txt"];

/// Largest accepted upload: 16 MiB.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Errors from accepting or staging an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file selected")]
    NoFile,

    #[error("File type not allowed: {filename:?}")]
    NotAllowed { filename: String },

    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("failed to stage upload in {}: {source}", .dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Whether `filename` has an allowed extension.
pub fn is_allowed(filename: &str) -> bool {
    PlanKind::from_filename(filename) != PlanKind::Unrecognized
}

/// Reduce a client-supplied filename to a safe basename.
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`; whitespace becomes `_`;
/// everything else is dropped. Leading dots and underscores are stripped so
/// the result can never be a hidden file or a path component like `..`.
/// May return an empty string.
pub fn sanitize_filename(raw: &str) -> String {
    let basename = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = basename
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Directory that holds in-flight uploads.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }

    /// Override the size limit.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Create the upload directory if it does not exist.
    pub fn ensure_dir(&self) -> Result<(), UploadError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| UploadError::Io {
            dir: self.dir.clone(),
            source,
        })
    }

    /// Write `bytes` to a fresh file in the upload directory.
    ///
    /// `filename` must already be sanitized. Disallowed or oversized uploads
    /// are rejected before anything touches the disk.
    pub fn stage(&self, filename: &str, bytes: &[u8]) -> Result<StagedUpload, UploadError> {
        if filename.is_empty() {
            return Err(UploadError::NoFile);
        }
        if !is_allowed(filename) {
            return Err(UploadError::NotAllowed {
                filename: filename.to_string(),
            });
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let io_err = |source| UploadError::Io {
            dir: self.dir.clone(),
            source,
        };
        let suffix = format!("-{filename}");
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(&self.dir)
            .map_err(io_err)?;
        io::Write::write_all(&mut file, bytes).map_err(io_err)?;

        debug!(path = %file.path().display(), size = bytes.len(), "upload staged");
        Ok(StagedUpload {
            file,
            filename: filename.to_string(),
        })
    }
}

/// A staged upload. The backing file is deleted on drop or [`release`](Self::release).
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    filename: String,
}

impl StagedUpload {
    /// The sanitized client filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn kind(&self) -> PlanKind {
        PlanKind::from_filename(&self.filename)
    }

    /// Read the staged content back.
    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.file.path()).await
    }

    /// Delete the backing file, reporting any removal error.
    pub fn release(self) -> io::Result<()> {
        let path = self.file.path().to_path_buf();
        self.file.close()?;
        debug!(path = %path.display(), "upload released");
        Ok(())
    }
}
