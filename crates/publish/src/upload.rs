//! Per-file upload coordination.
//!
//! Every scanned file becomes one signed upload unit tagged with its
//! content type. Accepted identifiers are recorded in the path map under
//! the file's directory-rooted key. The first failure aborts the batch:
//! nothing after it is submitted and in-flight uploads are dropped.

use std::collections::HashMap;
use std::path::Path;
use std::pin::pin;
use std::sync::Mutex;
use std::time::Duration;

use evoapp_protocol::constants::tags;
use evoapp_protocol::{FileRecord, PathMap, PathRecord, Tag, TxId, UploadRecord};
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::UploadCache;
use crate::content_type::detect_content_type;
use crate::error::PublishError;
use crate::manifest::{directory_rooted_key, root_label};
use crate::storage::{SignedUnit, StorageNetwork, UploadUnit};
use crate::types::PublishEvent;

/// Retry policy for submitting a signed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per unit, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after `attempt` (1-based) failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor)
    }
}

type SharedCache<'c> = Mutex<Option<&'c mut UploadCache>>;

/// Uploads a batch of scanned files to the storage network.
pub struct UploadCoordinator<'a> {
    storage: &'a dyn StorageNetwork,
    retry: RetryPolicy,
    concurrency: usize,
    cancel: CancellationToken,
    events_tx: Option<mpsc::Sender<PublishEvent>>,
}

impl<'a> UploadCoordinator<'a> {
    /// Creates a strictly sequential coordinator with the default retry policy.
    pub fn new(storage: &'a dyn StorageNetwork, cancel: CancellationToken) -> Self {
        Self {
            storage,
            retry: RetryPolicy::default(),
            concurrency: 1,
            cancel,
            events_tx: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the maximum number of uploads in flight (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_events(mut self, events_tx: mpsc::Sender<PublishEvent>) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    /// Uploads `files` (relative to `root`) and records each identifier in
    /// `paths` under its directory-rooted key.
    ///
    /// Returns the upload records in scan order. On error `paths` holds only
    /// the files accepted before the failure.
    pub async fn upload(
        &self,
        root: &Path,
        files: &[FileRecord],
        paths: &mut PathMap,
        cache: Option<&mut UploadCache>,
    ) -> Result<Vec<UploadRecord>, PublishError> {
        let label = root_label(root);
        let total = files.len();
        let batch = self.cancel.child_token();
        let cache: SharedCache<'_> = Mutex::new(cache);

        let label = &label;
        let batch_ref = &batch;
        let cache_ref = &cache;

        let mut pending = pin!(
            stream::iter(files.iter().enumerate())
                .map(|(index, file)| async move {
                    let result = self
                        .upload_one(root, label, file, batch_ref, cache_ref)
                        .await;
                    (index, result)
                })
                .buffer_unordered(self.concurrency)
        );

        let mut uploaded: Vec<(usize, UploadRecord, bool)> = Vec::with_capacity(total);

        while let Some((index, result)) = pending.next().await {
            let (record, cached) = match result {
                Ok(done) => done,
                Err(e) => {
                    // First error wins: stop everything still in flight.
                    batch.cancel();
                    warn!(
                        file = %files[index].relative_path,
                        uploaded = uploaded.len(),
                        error = %e,
                        "upload batch aborted"
                    );
                    return Err(e);
                }
            };

            paths.insert(
                record.source_path.clone(),
                PathRecord {
                    id: record.content_identifier.clone(),
                },
            );

            // Progress is best effort; a full or closed channel never stalls uploads.
            if let Some(tx) = &self.events_tx {
                let _ = tx.try_send(PublishEvent::FileUploaded {
                    path: record.source_path.clone(),
                    id: record.content_identifier.clone(),
                    cached,
                    done: uploaded.len() + 1,
                    total,
                });
            }

            uploaded.push((index, record, cached));
        }

        uploaded.sort_by_key(|(index, _, _)| *index);

        if self.concurrency > 1 {
            // Completion order is arbitrary; keep the manifest in scan order.
            let rank: HashMap<&str, usize> = uploaded
                .iter()
                .map(|(index, record, _)| (record.source_path.as_str(), *index))
                .collect();
            let rank_of = |key: &String| rank.get(key.as_str()).map(|r| (1, *r)).unwrap_or((0, 0));
            paths.sort_by(|a, _, b, _| rank_of(a).cmp(&rank_of(b)));
        }

        let cached = uploaded.iter().filter(|(_, _, cached)| *cached).count();
        info!(files = total, cached, "upload batch complete");

        Ok(uploaded.into_iter().map(|(_, record, _)| record).collect())
    }

    /// Uploads a single file. Returns the record and whether it came from the cache.
    async fn upload_one(
        &self,
        root: &Path,
        label: &str,
        file: &FileRecord,
        batch: &CancellationToken,
        cache: &SharedCache<'_>,
    ) -> Result<(UploadRecord, bool), PublishError> {
        if batch.is_cancelled() {
            return Err(PublishError::Cancelled);
        }

        let key = directory_rooted_key(label, &file.relative_path);
        let content_type = detect_content_type(&file.relative_path);

        let data = tokio::fs::read(root.join(&file.relative_path))
            .await
            .map_err(|e| upload_error(&key, format!("read failed: {e}")))?;

        if let Some(id) = cache_lookup(cache, &data, content_type) {
            debug!(path = %key, id = %id, "upload cache hit");
            return Ok((record(key, id, content_type), true));
        }

        let unit = UploadUnit::new(data, vec![Tag::new(tags::CONTENT_TYPE, content_type)]);
        let data_for_cache = cache_enabled(cache).then(|| unit.data.clone());

        let signed = tokio::select! {
            _ = batch.cancelled() => return Err(PublishError::Cancelled),
            signed = self.storage.sign(unit) => signed.map_err(|e| wrap(&key, e))?,
        };

        let id = self.submit_with_retry(&key, &signed, batch).await?;
        debug!(path = %key, id = %id, content_type, "file uploaded");

        if let Some(data) = data_for_cache {
            cache_insert(cache, &data, content_type, id.clone());
        }

        Ok((record(key, id, content_type), false))
    }

    /// Submits the same signed unit until it is accepted or attempts run out.
    async fn submit_with_retry(
        &self,
        key: &str,
        signed: &SignedUnit,
        batch: &CancellationToken,
    ) -> Result<TxId, PublishError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = tokio::select! {
                _ = batch.cancelled() => return Err(PublishError::Cancelled),
                result = self.storage.submit(signed) => result,
            };

            match result {
                Ok(id) => return Ok(id),
                Err(PublishError::Cancelled) => return Err(PublishError::Cancelled),
                Err(e) if attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(path = %key, attempt, error = %e, ?delay, "submit failed, retrying");
                    tokio::select! {
                        _ = batch.cancelled() => return Err(PublishError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(e) => return Err(wrap(key, e)),
            }
        }
    }
}

fn record(key: String, id: TxId, content_type: &str) -> UploadRecord {
    UploadRecord {
        source_path: key,
        content_identifier: id,
        content_type: content_type.to_string(),
    }
}

fn upload_error(key: &str, reason: impl Into<String>) -> PublishError {
    PublishError::Upload {
        path: key.to_string(),
        reason: reason.into(),
    }
}

/// Attaches the file path to a collaborator error.
fn wrap(key: &str, e: PublishError) -> PublishError {
    match e {
        PublishError::Cancelled | PublishError::Upload { .. } => e,
        other => upload_error(key, other.to_string()),
    }
}

fn cache_enabled(cache: &SharedCache<'_>) -> bool {
    cache
        .lock()
        .map(|guard| guard.is_some())
        .unwrap_or(false)
}

fn cache_lookup(cache: &SharedCache<'_>, data: &[u8], content_type: &str) -> Option<TxId> {
    let guard = cache.lock().ok()?;
    guard.as_ref()?.get(data, content_type).cloned()
}

fn cache_insert(cache: &SharedCache<'_>, data: &[u8], content_type: &str, id: TxId) {
    if let Ok(mut guard) = cache.lock()
        && let Some(cache) = guard.as_mut()
    {
        cache.insert(data, content_type, id);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::scanner::scan_directory;
    use crate::storage::{BoxFuture, Winston};
    use std::collections::HashSet;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// In-memory storage network. Identifiers are derived from a counter.
    pub(crate) struct MockStorage {
        /// Payload that always fails to submit.
        pub fail_content: Option<Vec<u8>>,
        /// Number of submit failures to inject before succeeding.
        pub transient_failures: AtomicUsize,
        pub signed: AtomicUsize,
        pub signed_tags: Mutex<Vec<Vec<Tag>>>,
        pub submitted: Mutex<Vec<(TxId, Vec<u8>)>>,
        pub submit_delay: Option<Duration>,
    }

    impl MockStorage {
        pub fn new() -> Self {
            Self {
                fail_content: None,
                transient_failures: AtomicUsize::new(0),
                signed: AtomicUsize::new(0),
                signed_tags: Mutex::new(Vec::new()),
                submitted: Mutex::new(Vec::new()),
                submit_delay: None,
            }
        }

        pub fn submitted_data(&self) -> Vec<Vec<u8>> {
            self.submitted
                .lock()
                .unwrap()
                .iter()
                .map(|(_, d)| d.clone())
                .collect()
        }
    }

    pub(crate) fn mock_id(n: usize) -> TxId {
        TxId::parse(&format!("{n:0>43}")).unwrap()
    }

    impl StorageNetwork for MockStorage {
        fn price_for(&self, bytes: u64) -> BoxFuture<'_, Result<Winston, PublishError>> {
            Box::pin(async move { Ok(Winston(bytes as u128 * 1000)) })
        }

        fn sign(&self, unit: UploadUnit) -> BoxFuture<'_, Result<SignedUnit, PublishError>> {
            Box::pin(async move {
                let n = self.signed.fetch_add(1, Ordering::SeqCst) + 1;
                self.signed_tags.lock().unwrap().push(unit.tags.clone());
                Ok(SignedUnit {
                    id: mock_id(n),
                    bytes: unit.data,
                })
            })
        }

        fn submit<'b>(
            &'b self,
            unit: &'b SignedUnit,
        ) -> BoxFuture<'b, Result<TxId, PublishError>> {
            Box::pin(async move {
                if let Some(delay) = self.submit_delay {
                    tokio::time::sleep(delay).await;
                }
                if self.fail_content.as_deref() == Some(unit.bytes.as_slice()) {
                    return Err(PublishError::Network("node rejected".into()));
                }
                if self
                    .transient_failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
                {
                    return Err(PublishError::Network("503".into()));
                }
                self.submitted
                    .lock()
                    .unwrap()
                    .push((unit.id.clone(), unit.bytes.clone()));
                Ok(unit.id.clone())
            })
        }
    }

    /// Five files, scanned in the order f1..f5.
    fn five_files() -> TempDir {
        let dir = TempDir::new().unwrap();
        for i in 1..=5 {
            fs::write(dir.path().join(format!("f{i}.js")), format!("file {i}")).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn uploads_every_file_with_directory_rooted_keys() {
        let dir = five_files();
        let report = scan_directory(dir.path()).unwrap();
        let storage = MockStorage::new();
        let coordinator = UploadCoordinator::new(&storage, CancellationToken::new());

        let mut paths = PathMap::new();
        let records = coordinator
            .upload(dir.path(), &report.files, &mut paths, None)
            .await
            .unwrap();

        assert_eq!(records.len(), 5);
        let label = root_label(dir.path());
        let keys: Vec<String> = paths.keys().cloned().collect();
        let expected: Vec<String> = (1..=5).map(|i| format!("{label}/f{i}.js")).collect();
        assert_eq!(keys, expected);
        assert_eq!(records[0].content_type, "application/javascript");
        assert_eq!(storage.submitted_data()[0], b"file 1".to_vec());
    }

    #[tokio::test]
    async fn unknown_extension_tagged_text_plain() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("LICENSE"), b"MIT").unwrap();
        let report = scan_directory(dir.path()).unwrap();
        let storage = MockStorage::new();
        let coordinator = UploadCoordinator::new(&storage, CancellationToken::new());

        let mut paths = PathMap::new();
        let records = coordinator
            .upload(dir.path(), &report.files, &mut paths, None)
            .await
            .unwrap();
        assert_eq!(records[0].content_type, "text/plain");
    }

    #[tokio::test]
    async fn failure_aborts_remaining_batch() {
        let dir = five_files();
        let report = scan_directory(dir.path()).unwrap();
        let mut storage = MockStorage::new();
        storage.fail_content = Some(b"file 3".to_vec());
        let coordinator = UploadCoordinator::new(&storage, CancellationToken::new())
            .with_retry(RetryPolicy::none());

        let mut paths = PathMap::new();
        let err = coordinator
            .upload(dir.path(), &report.files, &mut paths, None)
            .await
            .unwrap_err();

        match err {
            PublishError::Upload { path, reason } => {
                assert!(path.ends_with("/f3.js"));
                assert!(reason.contains("node rejected"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(paths.len(), 2);
        let submitted = storage.submitted_data();
        assert_eq!(submitted, vec![b"file 1".to_vec(), b"file 2".to_vec()]);
        // Files 4 and 5 were never even signed.
        assert_eq!(storage.signed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_retries_same_unit() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), b"<html>").unwrap();
        let report = scan_directory(dir.path()).unwrap();
        let storage = MockStorage::new();
        storage.transient_failures.store(2, Ordering::SeqCst);
        let coordinator = UploadCoordinator::new(&storage, CancellationToken::new());

        let mut paths = PathMap::new();
        let records = coordinator
            .upload(dir.path(), &report.files, &mut paths, None)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(storage.signed.load(Ordering::SeqCst), 1);
        assert_eq!(storage.submitted_data().len(), 1);
        assert_eq!(records[0].content_identifier, mock_id(1));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_exhausted_reports_upload_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), b"<html>").unwrap();
        let report = scan_directory(dir.path()).unwrap();
        let storage = MockStorage::new();
        storage.transient_failures.store(10, Ordering::SeqCst);
        let coordinator = UploadCoordinator::new(&storage, CancellationToken::new());

        let mut paths = PathMap::new();
        let err = coordinator
            .upload(dir.path(), &report.files, &mut paths, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Upload { .. }));
        assert!(paths.is_empty());
        // Three attempts consumed three injected failures.
        assert_eq!(storage.transient_failures.load(Ordering::SeqCst), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_upload_keeps_scan_order() {
        let dir = five_files();
        let report = scan_directory(dir.path()).unwrap();
        let mut storage = MockStorage::new();
        storage.submit_delay = Some(Duration::from_millis(10));
        let coordinator =
            UploadCoordinator::new(&storage, CancellationToken::new()).with_concurrency(3);

        let mut paths = PathMap::new();
        let records = coordinator
            .upload(dir.path(), &report.files, &mut paths, None)
            .await
            .unwrap();

        let label = root_label(dir.path());
        let keys: Vec<String> = paths.keys().cloned().collect();
        let expected: Vec<String> = (1..=5).map(|i| format!("{label}/f{i}.js")).collect();
        assert_eq!(keys, expected);
        let sources: Vec<&str> = records.iter().map(|r| r.source_path.as_str()).collect();
        assert_eq!(sources, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_failure_cancels_in_flight() {
        let dir = five_files();
        let report = scan_directory(dir.path()).unwrap();
        let mut storage = MockStorage::new();
        storage.fail_content = Some(b"file 1".to_vec());
        storage.submit_delay = Some(Duration::from_millis(10));
        let coordinator = UploadCoordinator::new(&storage, CancellationToken::new())
            .with_retry(RetryPolicy::none())
            .with_concurrency(2);

        let mut paths = PathMap::new();
        let result = coordinator
            .upload(dir.path(), &report.files, &mut paths, None)
            .await;
        assert!(result.is_err());
        // Never more than the in-flight window got through.
        assert!(paths.len() <= 1);
        assert!(storage.submitted_data().len() <= 1);
    }

    #[tokio::test]
    async fn cancelled_token_aborts() {
        let dir = five_files();
        let report = scan_directory(dir.path()).unwrap();
        let storage = MockStorage::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let coordinator = UploadCoordinator::new(&storage, cancel);

        let mut paths = PathMap::new();
        let err = coordinator
            .upload(dir.path(), &report.files, &mut paths, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Cancelled));
        assert!(storage.submitted_data().is_empty());
    }

    #[tokio::test]
    async fn cache_hits_skip_submission() {
        let dir = five_files();
        fs::write(dir.path().join("f6.js"), "file 1").unwrap();
        let report = scan_directory(dir.path()).unwrap();
        let storage = MockStorage::new();
        let coordinator = UploadCoordinator::new(&storage, CancellationToken::new());
        let mut cache = UploadCache::in_memory();

        let mut paths = PathMap::new();
        coordinator
            .upload(dir.path(), &report.files, &mut paths, Some(&mut cache))
            .await
            .unwrap();

        // f6.js duplicates f1.js and reuses its identifier.
        assert_eq!(storage.submitted_data().len(), 5);
        let label = root_label(dir.path());
        assert_eq!(
            paths[&format!("{label}/f6.js")],
            paths[&format!("{label}/f1.js")]
        );

        // A second run uploads nothing new.
        let mut again = PathMap::new();
        coordinator
            .upload(dir.path(), &report.files, &mut again, Some(&mut cache))
            .await
            .unwrap();
        assert_eq!(storage.submitted_data().len(), 5);
        assert_eq!(again, paths);

        let ids: HashSet<&TxId> = paths.values().map(|r| &r.id).collect();
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn emits_progress_events() {
        let dir = five_files();
        let report = scan_directory(dir.path()).unwrap();
        let storage = MockStorage::new();
        let (tx, mut rx) = mpsc::channel(16);
        let coordinator = UploadCoordinator::new(&storage, CancellationToken::new()).with_events(tx);

        let mut paths = PathMap::new();
        coordinator
            .upload(dir.path(), &report.files, &mut paths, None)
            .await
            .unwrap();
        drop(coordinator);

        let mut done = Vec::new();
        while let Some(event) = rx.recv().await {
            if let PublishEvent::FileUploaded { done: n, total, .. } = event {
                assert_eq!(total, 5);
                done.push(n);
            }
        }
        assert_eq!(done, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn retry_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2000));
    }
}
