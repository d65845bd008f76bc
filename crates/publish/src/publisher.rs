//! Publish pipeline.
//!
//! Runs the stages of `evoapp create` against the collaborators in a
//! [`PublishContext`], emitting progress events and tagging every error
//! with the stage that produced it.

use std::path::{Path, PathBuf};

use evoapp_protocol::constants::{MANIFEST_CONTENT_TYPE, tags};
use evoapp_protocol::{AppKind, AssetInfo, Balances, Manifest, Tag, TxId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::UploadCache;
use crate::content_type::parse_topics;
use crate::error::{PublishError, Stage, StageError};
use crate::manifest::{rewrite_keys, root_label, write_snapshot};
use crate::scanner::{ScanReport, scan_directory};
use crate::storage::{AssetRegistry, AssetRequest, ContractState, StorageNetwork};
use crate::types::{AppDraft, PublishEvent, UploadQuote, WrapperRequest};
use crate::upload::{RetryPolicy, UploadCoordinator};
use crate::wrapper::{BuildRunner, WrapperProvisioner};

/// Asset type recorded for published app versions.
pub const APP_ASSET_TYPE: &str = "app";

/// Collaborators and policy for one publish run.
pub struct PublishContext<'a> {
    pub storage: &'a dyn StorageNetwork,
    pub registry: &'a dyn AssetRegistry,
    pub contracts: &'a dyn ContractState,
    pub builder: &'a dyn BuildRunner,
    pub retry: RetryPolicy,
    pub concurrency: usize,
    pub gateway: String,
}

/// Runs publish stages and reports progress.
pub struct Publisher<'a> {
    ctx: PublishContext<'a>,
    events_tx: mpsc::Sender<PublishEvent>,
    events_rx: Option<mpsc::Receiver<PublishEvent>>,
    cancel: CancellationToken,
}

impl<'a> Publisher<'a> {
    pub fn new(ctx: PublishContext<'a>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            ctx,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<PublishEvent>> {
        self.events_rx.take()
    }

    /// Returns a token that aborts in-flight work when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Lists the files to publish.
    pub async fn scan(&self, folder: &Path) -> Result<ScanReport, StageError> {
        self.stage(Stage::Scanning, async {
            let report = scan_directory(folder)?;
            info!(files = report.files.len(), bytes = report.total_bytes, "scan complete");
            Ok(report)
        })
        .await
    }

    /// Prices the upload of everything in `report`.
    pub async fn quote(&self, report: &ScanReport) -> Result<UploadQuote, StageError> {
        self.stage(Stage::Pricing, async {
            let price = self.ctx.storage.price_for(report.total_bytes).await?;
            debug!(bytes = report.total_bytes, winston = %price, "upload priced");
            Ok(UploadQuote {
                files: report.files.len(),
                bytes: report.total_bytes,
                price,
            })
        })
        .await
    }

    /// Uploads every scanned file and returns the manifest with
    /// manifest-relative keys.
    pub async fn upload(
        &self,
        folder: &Path,
        report: &ScanReport,
        index: Option<&str>,
        cache: Option<&mut UploadCache>,
    ) -> Result<Manifest, StageError> {
        self.stage(Stage::Uploading, async {
            let mut manifest = Manifest::new(index);
            let coordinator = UploadCoordinator::new(self.ctx.storage, self.cancel.clone())
                .with_retry(self.ctx.retry)
                .with_concurrency(self.ctx.concurrency)
                .with_events(self.events_tx.clone());

            coordinator
                .upload(folder, &report.files, &mut manifest.paths, cache)
                .await?;

            rewrite_keys(manifest, &root_label(folder))
        })
        .await
    }

    /// Persists the manifest snapshot next to the working directory.
    pub async fn write_manifest(
        &self,
        manifest: &Manifest,
        folder: &Path,
        out_dir: &Path,
    ) -> Result<PathBuf, StageError> {
        self.stage(Stage::ManifestWriting, async {
            write_snapshot(manifest, folder, out_dir)
        })
        .await
    }

    /// Looks up the version being forked.
    pub async fn fork_source(&self, id: &TxId) -> Result<AssetInfo, StageError> {
        self.stage(Stage::ForkLookup, async {
            let info = self.ctx.registry.get(id.as_str()).await?;
            debug!(id = %id, group_id = %info.group_id, "fork source found");
            Ok(info)
        })
        .await
    }

    /// Mints the app asset whose payload is `manifest`.
    pub async fn create_asset(
        &self,
        draft: &AppDraft,
        manifest: &Manifest,
    ) -> Result<TxId, StageError> {
        let mut balances = Balances::new();
        balances.insert(draft.owner.clone(), draft.balance);

        if let (AppKind::Fork, Some(parent)) = (draft.kind, &draft.forks) {
            let inherited = self
                .stage(Stage::ForkLookup, async {
                    Ok(self.ctx.contracts.read_balances(parent.as_str()).await?)
                })
                .await?;
            merge_balances(&mut balances, inherited);
        }

        self.stage(Stage::AssetCreation, async {
            let request = AssetRequest {
                asset_type: APP_ASSET_TYPE.to_string(),
                group_id: draft.group_id.clone().unwrap_or_default(),
                title: draft.title.clone(),
                description: draft.description.clone(),
                topics: parse_topics(&draft.topics),
                balances,
                forks: draft.forks.clone(),
                data: serde_json::to_string(manifest)?,
                content_type: MANIFEST_CONTENT_TYPE.to_string(),
                meta: draft.release_notes.clone(),
                custom_tags: custom_tags(draft),
            };

            let id = self.ctx.registry.create(request).await?;
            info!(id = %id, kind = %draft.kind, "asset created");
            Ok(id)
        })
        .await
    }

    /// Scaffolds, builds and uploads the wrapper for a base version.
    pub async fn deploy_wrapper(&self, request: &WrapperRequest) -> Result<TxId, StageError> {
        self.stage(Stage::WrapperDeployment, async {
            WrapperProvisioner::new(self.ctx.storage, self.ctx.builder, self.cancel.clone())
                .with_retry(self.ctx.retry)
                .with_gateway(self.ctx.gateway.clone())
                .provision(request)
                .await
        })
        .await
    }

    /// Runs one stage: emits start/complete events and tags errors.
    async fn stage<T>(
        &self,
        stage: Stage,
        work: impl Future<Output = Result<T, PublishError>>,
    ) -> Result<T, StageError> {
        if self.cancel.is_cancelled() {
            return Err(PublishError::Cancelled.at(stage));
        }
        let _ = self.events_tx.try_send(PublishEvent::StageStarted { stage });

        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(PublishError::Cancelled),
            result = work => result,
        };

        match result {
            Ok(value) => {
                let _ = self.events_tx.try_send(PublishEvent::StageCompleted { stage });
                Ok(value)
            }
            Err(e) => {
                tracing::error!(%stage, error = %e, "publish stage failed");
                Err(e.at(stage))
            }
        }
    }
}

/// Adds the parent's balances. An address present in both keeps the
/// parent's amount.
pub fn merge_balances(balances: &mut Balances, inherited: Balances) {
    balances.extend(inherited);
}

fn custom_tags(draft: &AppDraft) -> Vec<Tag> {
    let mut out = Vec::new();
    if let Some(source) = &draft.source_code {
        out.push(Tag::new(tags::SOURCE_CODE, source.as_str()));
    }
    if let Some(logo) = &draft.logo {
        out.push(Tag::new(tags::LOGO, logo.as_str()));
    }
    out
}
