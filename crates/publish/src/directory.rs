//! Whole-directory upload behind a path manifest.

use std::path::Path;

use evoapp_protocol::constants::{MANIFEST_CONTENT_TYPE, tags};
use evoapp_protocol::{Manifest, Tag, TxId};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PublishError;
use crate::manifest::{rewrite_keys, root_label, serialize};
use crate::scanner::scan_directory;
use crate::storage::{StorageNetwork, UploadUnit};
use crate::types::DirectoryUpload;
use crate::upload::{RetryPolicy, UploadCoordinator};

/// Uploads every file under `dir`, then the manifest pointing at them.
///
/// Returns the manifest's identifier, which serves the directory.
pub async fn upload_directory(
    storage: &dyn StorageNetwork,
    dir: &Path,
    options: &DirectoryUpload,
    retry: RetryPolicy,
    cancel: CancellationToken,
) -> Result<TxId, PublishError> {
    let report = scan_directory(dir)?;
    if report.files.is_empty() {
        return Err(PublishError::Upload {
            path: dir.display().to_string(),
            reason: "directory is empty".into(),
        });
    }

    let mut manifest = Manifest::new(Some(&options.index_file));
    let coordinator = UploadCoordinator::new(storage, cancel.clone()).with_retry(retry);
    coordinator
        .upload(dir, &report.files, &mut manifest.paths, None)
        .await?;

    let manifest = rewrite_keys(manifest, &root_label(dir))?;
    if !manifest.paths.contains_key(manifest.index_path()) {
        tracing::warn!(index = manifest.index_path(), "index file not among uploaded paths");
    }

    let mut unit_tags = vec![Tag::new(tags::CONTENT_TYPE, MANIFEST_CONTENT_TYPE)];
    unit_tags.extend(options.tags.iter().cloned());
    let unit = UploadUnit::new(serialize(&manifest)?.into_bytes(), unit_tags);

    let signed = storage.sign(unit).await?;
    let id = tokio::select! {
        _ = cancel.cancelled() => return Err(PublishError::Cancelled),
        id = storage.submit(&signed) => id?,
    };

    info!(id = %id, files = manifest.len(), "directory uploaded");
    Ok(id)
}
