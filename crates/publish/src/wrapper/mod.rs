//! Wrapper provisioning.
//!
//! A wrapper is a small web app published for each base version. When a
//! visitor opens it, it resolves the most-vouched version in the fork tree
//! and navigates there. Provisioning scaffolds the project in a temporary
//! directory, runs the external build, and uploads `dist/`.

pub mod build;
pub mod templates;

use std::path::PathBuf;
use std::time::Duration;

use evoapp_protocol::constants::{DATA_PROTOCOL, DEFAULT_INDEX, GATEWAY_BASE, NAVIGATION_DELAY, tags};
use evoapp_protocol::{Tag, TxId};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::directory::upload_directory;
use crate::error::PublishError;
use crate::storage::StorageNetwork;
use crate::types::{DirectoryUpload, WrapperRequest};
use crate::upload::RetryPolicy;

pub use build::{BuildRunner, PnpmBuild};
pub use templates::WrapperConfig;

/// Value of the `Type` tag on wrapper manifests.
pub const WRAPPER_TYPE: &str = "app-wrapper";

/// Scaffolds, builds and uploads wrapper projects.
pub struct WrapperProvisioner<'a> {
    storage: &'a dyn StorageNetwork,
    builder: &'a dyn BuildRunner,
    retry: RetryPolicy,
    cancel: CancellationToken,
    gateway: String,
    navigation_delay: Duration,
    work_root: Option<PathBuf>,
}

impl<'a> WrapperProvisioner<'a> {
    pub fn new(
        storage: &'a dyn StorageNetwork,
        builder: &'a dyn BuildRunner,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            storage,
            builder,
            retry: RetryPolicy::default(),
            cancel,
            gateway: GATEWAY_BASE.to_string(),
            navigation_delay: NAVIGATION_DELAY,
            work_root: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = gateway.into();
        self
    }

    /// Creates the temporary project under `root` instead of the system temp dir.
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    /// Deploys the wrapper for `request.base_id` and returns its manifest id.
    pub async fn provision(&self, request: &WrapperRequest) -> Result<TxId, PublishError> {
        if request.base_id.trim().is_empty() {
            return Err(PublishError::Scaffold("base id must be provided".into()));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("evoapp-wrapper-");
        let workdir = match &self.work_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let project = workdir.path();

        let config = templates::WrapperConfig::new(
            &request.base_id,
            &request.title,
            &self.gateway,
            self.navigation_delay,
        );
        templates::write_project(project, &config)?;

        self.builder.run(project, &["install"]).await?;
        self.builder.run(project, &["build"]).await?;

        let dist = project.join("dist");
        if !dist.is_dir() {
            return Err(PublishError::Scaffold(
                "build did not produce a dist directory".into(),
            ));
        }

        let published_ms = chrono::Utc::now().timestamp_millis();
        let options = DirectoryUpload {
            index_file: DEFAULT_INDEX.to_string(),
            tags: wrapper_tags(request, published_ms),
        };
        let id = upload_directory(self.storage, &dist, &options, self.retry, self.cancel.clone())
            .await?;

        workdir.close()?;
        info!(id = %id, base = %request.base_id, "wrapper deployed");
        Ok(id)
    }
}

/// Manifest tags identifying a wrapper deployment.
pub fn wrapper_tags(request: &WrapperRequest, published_ms: i64) -> Vec<Tag> {
    let mut out = vec![
        Tag::new(tags::DATA_PROTOCOL, DATA_PROTOCOL),
        Tag::new(tags::TYPE, WRAPPER_TYPE),
        Tag::new(tags::TITLE, &request.title),
        Tag::new(tags::DESCRIPTION, &request.description),
        Tag::new(tags::WRAPPER_FOR, &request.base_id),
        Tag::new(tags::LOGO, request.logo.as_deref().unwrap_or_default()),
        Tag::new(tags::PUBLISHED, published_ms.to_string()),
    ];
    out.extend(
        request
            .topics
            .iter()
            .map(|topic| Tag::new(format!("{}{topic}", tags::TOPIC_PREFIX), topic)),
    );
    out
}
