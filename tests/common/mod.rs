//! Test helpers for upload and drive integration tests.
//!
//! Provides GatedDrive, a MemoryDrive wrapper whose uploads and video
//! lookups can be held open or failed on demand, plus setup helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::AsyncWrite;
use tokio::sync::Semaphore;

use vidstash::config::{StorageConfig, UploadConfig};
use vidstash::drive::{DriveQuery, RemoteFile, FOLDER_MEDIA_TYPE};
use vidstash::{
    DriveBackend, DriveStorage, MemoryDrive, OwnerId, Result, UploadService, Video, VideoContent,
    VideoError,
};

/// Default timeout for waiting on background progress.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Drive wrapper that can hold or fail video uploads and video lookups.
///
/// Folder traffic passes straight through unless folder queries are failed
/// on purpose or every call is made to yield first.
pub struct GatedDrive {
    inner: MemoryDrive,
    hold_uploads: AtomicBool,
    upload_gate: Semaphore,
    fail_uploads: AtomicBool,
    uploads_started: AtomicUsize,
    hold_lookups: AtomicBool,
    lookup_gate: Semaphore,
    fail_lookups: AtomicBool,
    lookups_waiting: AtomicUsize,
    fail_folder_queries: AtomicBool,
    yield_calls: AtomicBool,
}

impl GatedDrive {
    pub fn new() -> Self {
        Self {
            inner: MemoryDrive::new(),
            hold_uploads: AtomicBool::new(false),
            upload_gate: Semaphore::new(0),
            fail_uploads: AtomicBool::new(false),
            uploads_started: AtomicUsize::new(0),
            hold_lookups: AtomicBool::new(false),
            lookup_gate: Semaphore::new(0),
            fail_lookups: AtomicBool::new(false),
            lookups_waiting: AtomicUsize::new(0),
            fail_folder_queries: AtomicBool::new(false),
            yield_calls: AtomicBool::new(false),
        }
    }

    /// The wrapped in-memory drive.
    pub fn inner(&self) -> &MemoryDrive {
        &self.inner
    }

    /// Make every video upload wait for [`release_uploads`](Self::release_uploads).
    pub fn hold_uploads(&self) {
        self.hold_uploads.store(true, Ordering::SeqCst);
    }

    /// Let `n` held uploads proceed.
    pub fn release_uploads(&self, n: usize) {
        self.upload_gate.add_permits(n);
    }

    /// Make every video upload fail with a transport error.
    pub fn fail_uploads(&self) {
        self.fail_uploads.store(true, Ordering::SeqCst);
    }

    /// Number of video uploads that have reached the drive.
    pub fn uploads_started(&self) -> usize {
        self.uploads_started.load(Ordering::SeqCst)
    }

    /// Make video lookups evaluate immediately but return only after
    /// [`release_lookups`](Self::release_lookups).
    pub fn hold_lookups(&self) {
        self.hold_lookups.store(true, Ordering::SeqCst);
    }

    /// Let `n` held lookups return.
    pub fn release_lookups(&self, n: usize) {
        self.lookup_gate.add_permits(n);
    }

    /// Make every video lookup fail with a transport error.
    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }

    /// Make every folder query fail with a transport error.
    pub fn fail_folder_queries(&self) {
        self.fail_folder_queries.store(true, Ordering::SeqCst);
    }

    /// Yield to the scheduler at the start of every create and query.
    pub fn yield_calls(&self) {
        self.yield_calls.store(true, Ordering::SeqCst);
    }

    async fn maybe_yield(&self) {
        if self.yield_calls.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }

    /// Number of lookups currently held.
    pub fn lookups_waiting(&self) -> usize {
        self.lookups_waiting.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DriveBackend for GatedDrive {
    async fn create(
        &self,
        name: &str,
        parent_id: &str,
        media_type: &str,
        content: VideoContent,
    ) -> Result<String> {
        self.maybe_yield().await;
        if media_type == FOLDER_MEDIA_TYPE {
            return self.inner.create(name, parent_id, media_type, content).await;
        }

        self.uploads_started.fetch_add(1, Ordering::SeqCst);
        if self.hold_uploads.load(Ordering::SeqCst) {
            self.upload_gate
                .acquire()
                .await
                .expect("upload gate closed")
                .forget();
        }
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(VideoError::Transport("upload refused".to_string()));
        }
        self.inner.create(name, parent_id, media_type, content).await
    }

    async fn query(&self, query: &DriveQuery) -> Result<Vec<RemoteFile>> {
        self.maybe_yield().await;
        let is_lookup = query.media_type.as_deref() != Some(FOLDER_MEDIA_TYPE);
        if !is_lookup && self.fail_folder_queries.load(Ordering::SeqCst) {
            return Err(VideoError::Transport("folder query refused".to_string()));
        }
        if is_lookup && self.fail_lookups.load(Ordering::SeqCst) {
            return Err(VideoError::Transport("lookup refused".to_string()));
        }

        let result = self.inner.query(query).await;
        if is_lookup && self.hold_lookups.load(Ordering::SeqCst) {
            self.lookups_waiting.fetch_add(1, Ordering::SeqCst);
            self.lookup_gate
                .acquire()
                .await
                .expect("lookup gate closed")
                .forget();
            self.lookups_waiting.fetch_sub(1, Ordering::SeqCst);
        }
        result
    }

    async fn download(
        &self,
        file_id: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()> {
        self.inner.download(file_id, sink).await
    }
}

/// Upload service wired to a gated in-memory drive.
pub struct TestEnv {
    pub drive: Arc<GatedDrive>,
    pub service: UploadService,
    _staging: TempDir,
}

/// Build a service with the given per-owner limit.
pub fn setup(parallel_limit: usize) -> TestEnv {
    let staging = TempDir::new().unwrap();
    let drive = Arc::new(GatedDrive::new());
    let storage = DriveStorage::new(Arc::clone(&drive), &StorageConfig::default())
        .with_staging_dir(staging.path());
    let config = UploadConfig {
        parallel_limit,
        workers: 16,
    };
    let service = UploadService::new(Arc::new(storage), &config, "VideosApp");
    TestEnv {
        drive,
        service,
        _staging: staging,
    }
}

/// Create a fresh owner.
pub fn new_owner() -> OwnerId {
    OwnerId::from(uuid::Uuid::new_v4())
}

/// Create a video with small content derived from its name.
pub fn video(owner: OwnerId, name: &str) -> Video {
    Video::from_bytes(owner, name, format!("content of {name}").into_bytes()).unwrap()
}

/// Poll `condition` until it holds or the default timeout elapses.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(DEFAULT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
