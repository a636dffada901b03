//! Persistence layer for document indexes.
//!
//! Each index is stored as pretty-printed JSON in a single directory. The
//! storage filename is derived deterministically from the absolute document
//! path (stem plus a truncated path digest), so repeated runs against the
//! same file resolve to the same record regardless of process state.

use crate::error::{IndexError, Result};
use crate::index::DocumentIndex;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Length of the truncated path digest in the storage filename.
const PATH_HASH_LEN: usize = 12;

/// SHA-256 hex digest of a file's bytes, used for staleness detection.
pub fn content_hash(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| IndexError::io(path, e))?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// Store for persisted [`DocumentIndex`] records.
#[derive(Debug, Clone)]
pub struct IndexStore {
    index_dir: PathBuf,
}

impl IndexStore {
    /// Create a store rooted at the given directory.
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
        }
    }

    /// Default index directory (`~/.pageindex`).
    pub fn default_index_dir() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".pageindex"))
            .unwrap_or_else(|| PathBuf::from(".pageindex"))
    }

    /// The storage path for a document's index file.
    ///
    /// Filename: `{stem}_{first 12 hex chars of SHA-256(absolute path)}.json`.
    pub fn index_path(&self, pdf_path: &Path) -> PathBuf {
        let digest = Sha256::digest(pdf_path.to_string_lossy().as_bytes());
        let hash = format!("{:x}", digest);

        let stem = pdf_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");

        self.index_dir
            .join(format!("{}_{}.json", stem, &hash[..PATH_HASH_LEN]))
    }

    /// Load the persisted index for a document, if one exists.
    pub fn load(&self, pdf_path: &Path) -> Result<Option<DocumentIndex>> {
        let path = self.index_path(pdf_path);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| IndexError::io(&path, e))?;
        let index = serde_json::from_str(&content)
            .map_err(|e| IndexError::Serialization(e.to_string()))?;

        Ok(Some(index))
    }

    /// Persist an index, overwriting any previous record for the same file.
    pub fn save(&self, index: &DocumentIndex) -> Result<()> {
        if !self.index_dir.exists() {
            fs::create_dir_all(&self.index_dir).map_err(|e| IndexError::io(&self.index_dir, e))?;
        }

        let data = serde_json::to_string_pretty(index)
            .map_err(|e| IndexError::Serialization(e.to_string()))?;

        let path = self.index_path(&index.file_path);
        fs::write(&path, data).map_err(|e| IndexError::io(&path, e))?;

        Ok(())
    }

    /// Whether a persisted index no longer matches the current file content.
    pub fn is_stale(index: &DocumentIndex, current_hash: &str) -> bool {
        index.file_hash != current_hash
    }
}
