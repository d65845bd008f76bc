//! Evolutionary app publish flow: scan, price, upload, manifest, asset, wrapper.
//!
//! This crate implements the **business logic** of `evoapp create`. It is a
//! library crate with no transport dependencies: the storage network, asset
//! registry, contract state and build tool are collaborator traits, and the
//! CLI wires in the HTTP implementations from `evoapp-gateway`.
//!
//! # Pipeline
//!
//! 1. **Scan**: recursively walk the app directory
//! 2. **Price**: quote the storage cost of the total size
//! 3. **Upload**: one signed unit per file, recorded in a path manifest
//! 4. **Manifest**: rewrite keys to manifest-relative form, write a snapshot
//! 5. **Asset**: mint the app asset with the manifest as payload
//! 6. **Wrapper**: build and upload the version-resolving wrapper (base only)

pub mod cache;
pub mod content_type;
pub mod directory;
pub mod error;
pub mod manifest;
pub mod publisher;
pub mod scanner;
pub mod storage;
pub mod types;
pub mod upload;
pub mod wrapper;

// Re-export primary types for convenience.
pub use cache::UploadCache;
pub use content_type::{detect_content_type, parse_topics};
pub use directory::upload_directory;
pub use error::{PublishError, Stage, StageError};
pub use manifest::{load_snapshot, rewrite_keys, root_label, serialize, write_snapshot};
pub use publisher::{PublishContext, Publisher};
pub use scanner::{ScanReport, scan_directory};
pub use storage::{
    AssetRegistry, AssetRequest, BoxFuture, ContractState, SignedUnit, StorageNetwork,
    UploadUnit, Winston,
};
pub use types::{AppDraft, DirectoryUpload, PublishEvent, UploadQuote, WrapperRequest};
pub use upload::{RetryPolicy, UploadCoordinator};
pub use wrapper::{BuildRunner, PnpmBuild, WrapperProvisioner};
