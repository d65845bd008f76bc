//! Data types for the publish flow.

use evoapp_protocol::{AppKind, Tag, TxId};

use crate::error::Stage;
use crate::storage::Winston;

/// Progress event emitted while publishing.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishEvent {
    StageStarted { stage: Stage },
    /// One file accepted by the storage network (or found in the cache).
    FileUploaded {
        path: String,
        id: TxId,
        cached: bool,
        done: usize,
        total: usize,
    },
    StageCompleted { stage: Stage },
}

/// Size and cost of a pending upload, shown to the user for confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadQuote {
    pub files: usize,
    pub bytes: u64,
    pub price: Winston,
}

/// Options for uploading a whole directory behind a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUpload {
    pub index_file: String,
    pub tags: Vec<Tag>,
}

/// Validated user input for a new app version.
#[derive(Debug, Clone, PartialEq)]
pub struct AppDraft {
    pub kind: AppKind,
    pub title: String,
    pub description: String,
    /// Raw comma/space separated topics.
    pub topics: String,
    pub group_id: Option<String>,
    pub forks: Option<TxId>,
    pub balance: u64,
    /// Wallet address receiving the minted balance.
    pub owner: String,
    pub release_notes: String,
    pub source_code: Option<TxId>,
    pub logo: Option<TxId>,
}

/// Input for deploying the wrapper of a base version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperRequest {
    pub base_id: String,
    pub title: String,
    pub description: String,
    pub topics: Vec<String>,
    pub logo: Option<String>,
}
