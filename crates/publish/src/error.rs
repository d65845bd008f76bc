//! Publish error types.

use std::fmt;
use std::path::PathBuf;

/// Errors produced while publishing an app.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported {kind} at {}", path.display())]
    UnsupportedEntry { path: PathBuf, kind: &'static str },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("upload failed for {path}: {reason}")]
    Upload { path: String, reason: String },

    #[error("storage network error: {0}")]
    Network(String),

    #[error("manifest key {key:?} produced by both {first:?} and {second:?}")]
    KeyCollision {
        key: String,
        first: String,
        second: String,
    },

    #[error("wrapper scaffold error: {0}")]
    Scaffold(String),

    #[error("cancelled")]
    Cancelled,
}

impl PublishError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Tags the error with the stage it came from.
    pub fn at(self, stage: Stage) -> StageError {
        StageError { stage, error: self }
    }
}

/// Publish pipeline stage, used to tell the user where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scanning,
    Pricing,
    Uploading,
    ManifestWriting,
    ForkLookup,
    AssetCreation,
    WrapperDeployment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Scanning => "scanning",
            Stage::Pricing => "pricing",
            Stage::Uploading => "uploading",
            Stage::ManifestWriting => "manifest-writing",
            Stage::ForkLookup => "fork-lookup",
            Stage::AssetCreation => "asset-creation",
            Stage::WrapperDeployment => "wrapper-deployment",
        };
        f.write_str(name)
    }
}

/// A [`PublishError`] tagged with the stage that produced it.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {error}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub error: PublishError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_names_stage() {
        let err = PublishError::Network("timeout".into()).at(Stage::Pricing);
        assert_eq!(
            err.to_string(),
            "pricing failed: storage network error: timeout"
        );
    }

    #[test]
    fn collision_message_lists_both_sources() {
        let err = PublishError::KeyCollision {
            key: "a.js".into(),
            first: "app/a.js".into(),
            second: "a.js".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"app/a.js\""));
        assert!(msg.contains("\"a.js\""));
    }

    #[test]
    fn unsupported_entry_shows_path() {
        let err = PublishError::UnsupportedEntry {
            path: PathBuf::from("/tmp/app/link"),
            kind: "symbolic link",
        };
        assert_eq!(err.to_string(), "unsupported symbolic link at /tmp/app/link");
    }
}
