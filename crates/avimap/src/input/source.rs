//! Input-file provenance.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AvimapError, Result};

/// Metadata about one ingested reference file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    pub size_bytes: u64,
    /// Data rows retained after ingestion.
    pub row_count: usize,
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    pub(crate) fn new(path: &Path, contents: &[u8], row_count: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(contents);
        Self {
            file: path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            hash: format!("sha256:{:x}", hasher.finalize()),
            size_bytes: contents.len() as u64,
            row_count,
            loaded_at: Utc::now(),
        }
    }
}

/// Read a whole reference file. A file that cannot be opened is a missing
/// external resource: fatal, no retry.
pub(crate) fn read_reference_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| AvimapError::MissingResource {
        path: path.to_path_buf(),
        what: e.to_string(),
    })?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents).map_err(|e| AvimapError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(contents)
}
