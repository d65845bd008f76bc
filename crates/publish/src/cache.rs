//! Optional upload cache keyed by content hash.
//!
//! Stored as JSON at `~/.config/evoapp/upload-cache.json`. Keys are the
//! SHA-256 of the file content plus its content type, so re-running a
//! publish only uploads files that changed or never made it.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use evoapp_protocol::TxId;
use sha2::{Digest, Sha256};

use crate::error::PublishError;

/// Persistent content-hash → identifier map.
#[derive(Debug, Default)]
pub struct UploadCache {
    path: Option<PathBuf>,
    entries: HashMap<String, TxId>,
    dirty: bool,
}

impl UploadCache {
    /// Creates an in-memory cache that is never persisted.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the cache from `path`. A missing file yields an empty cache.
    pub fn load(path: &Path) -> Result<Self, PublishError> {
        let entries = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "discarding unreadable upload cache");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            entries,
            dirty: false,
        })
    }

    /// Returns the identifier previously recorded for this content.
    pub fn get(&self, data: &[u8], content_type: &str) -> Option<&TxId> {
        self.entries.get(&cache_key(data, content_type))
    }

    /// Records an accepted upload.
    pub fn insert(&mut self, data: &[u8], content_type: &str, id: TxId) {
        self.entries.insert(cache_key(data, content_type), id);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the cache back to disk if it changed. The file is replaced
    /// atomically through a temp file in the same directory.
    pub fn save(&mut self) -> Result<(), PublishError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let content = serde_json::to_string(&self.entries)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path).map_err(|e| PublishError::Io(e.error))?;
        self.dirty = false;

        tracing::debug!(path = %path.display(), entries = self.entries.len(), "upload cache saved");
        Ok(())
    }
}

/// SHA-256 of the content and content type, hex-encoded.
fn cache_key(data: &[u8], content_type: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content_type.as_bytes());
    hasher.update([0u8]);
    hasher.update(data);
    hex::encode(hasher.finalize())
}
