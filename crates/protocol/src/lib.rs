//! Data model shared by the evoapp publisher, resolver and gateway clients.

pub mod constants;
pub mod manifest;
pub mod types;
pub mod version;

// Re-export primary types for convenience.
pub use manifest::{IndexEntry, Manifest, PathMap, PathRecord};
pub use types::{AppKind, AssetInfo, Balances, FileRecord, Tag, TxId, TxIdError, UploadRecord};
pub use version::{VersionNode, VouchCounts};
