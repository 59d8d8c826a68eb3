//! Admission-controlled video uploads.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::lock::OwnerLocks;
use super::pool::{InFlightEntry, InFlightPool};
use crate::config::{Config, UploadConfig};
use crate::drive::VideoStorage;
use crate::video::{OwnerId, Video, VideoInfo};
use crate::{Result, VideoError};

/// Completion handle for an admitted upload.
///
/// Awaiting [`wait`](Self::wait) yields the transfer result. Dropping the
/// handle detaches it; the upload still runs to completion.
#[derive(Debug)]
pub struct UploadHandle {
    owner: OwnerId,
    name: String,
    join: JoinHandle<Result<()>>,
}

impl UploadHandle {
    /// Owner of the upload.
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Name of the uploaded video.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true once the transfer has finished, either way.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the transfer to finish.
    ///
    /// By the time this returns, the upload's in-flight slot has been freed.
    pub async fn wait(self) -> Result<()> {
        self.join.await?
    }
}

/// Frees an in-flight slot when dropped.
///
/// Lives inside the transfer task, so the slot is released exactly once
/// whether the transfer succeeds, fails, panics or is dropped unpolled.
struct InFlightTicket {
    entry: InFlightEntry,
    pool: Arc<InFlightPool>,
    locks: Arc<OwnerLocks>,
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        let entry = &self.entry;
        let pool = &self.pool;
        self.locks.with_lock(entry.owner, || pool.remove(entry));
    }
}

/// Upload service enforcing per-owner quota and name uniqueness.
///
/// Each owner's videos live in the folder `<app_root>/<owner>`. Admission
/// for one owner is serialized by that owner's lock; different owners are
/// admitted in parallel. Transfers run on spawned tasks, at most `workers`
/// at a time.
///
/// Quota is checked under the owner lock before anything else, so an owner
/// at the limit is refused without touching the drive. The persisted-name
/// check then queries the drive outside the lock, since the lock must not be
/// held across I/O, and quota and names are checked again under the lock
/// before admitting. A save that finishes between that query and the
/// admission of a same-named upload is not detected, so the drive can end up
/// with two videos of that name.
#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn VideoStorage>,
    pool: Arc<InFlightPool>,
    locks: Arc<OwnerLocks>,
    workers: Arc<Semaphore>,
    app_root: String,
}

impl UploadService {
    /// Create a new upload service.
    pub fn new(
        storage: Arc<dyn VideoStorage>,
        config: &UploadConfig,
        app_root: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            pool: Arc::new(InFlightPool::new(config.parallel_limit)),
            locks: Arc::new(OwnerLocks::new()),
            workers: Arc::new(Semaphore::new(config.workers)),
            app_root: app_root.into(),
        }
    }

    /// Create an upload service from the full configuration.
    pub fn from_config(storage: Arc<dyn VideoStorage>, config: &Config) -> Self {
        Self::new(storage, &config.upload, config.storage.app_root.clone())
    }

    /// Folder path holding `owner`'s videos.
    pub fn owner_path(&self, owner: OwnerId) -> Vec<String> {
        vec![self.app_root.clone(), owner.to_string()]
    }

    /// Create `owner`'s folder in the drive if it does not exist yet.
    pub async fn register_owner(&self, owner: OwnerId) -> Result<()> {
        let folder_id = self.storage.ensure_path(&self.owner_path(owner)).await?;
        info!(%owner, folder_id = %folder_id, "owner folder ready");
        Ok(())
    }

    /// Submit a video for upload.
    ///
    /// Rejections are returned here, before any transfer starts:
    /// - `QuotaExceeded` if the owner already has the limit in flight
    /// - `DuplicateName` if the name is in flight or stored for the owner
    /// - `Transport` if the drive could not be asked about the name
    ///
    /// On admission the transfer is handed to a worker and the returned
    /// handle reports its outcome.
    pub async fn submit(&self, video: Video) -> Result<UploadHandle> {
        let owner = video.owner();
        let name = video.name().to_string();
        let path = self.owner_path(owner);

        self.locks
            .with_lock(owner, || self.check_quota(owner))
            .inspect_err(|e| warn!(%owner, name = %name, "upload rejected: {e}"))?;

        let persisted = self.storage.exists(&name, &path).await?;

        let entry = InFlightEntry::new(owner, name.clone());
        self.locks
            .with_lock(owner, || {
                self.check_quota(owner)?;
                if persisted || self.pool.has_name(owner, &name) {
                    return Err(VideoError::DuplicateName {
                        owner,
                        name: name.clone(),
                    });
                }
                self.pool.add(entry.clone());
                Ok(())
            })
            .inspect_err(|e| warn!(%owner, name = %name, "upload rejected: {e}"))?;

        info!(%owner, name = %name, "upload admitted");

        let ticket = InFlightTicket {
            entry,
            pool: Arc::clone(&self.pool),
            locks: Arc::clone(&self.locks),
        };
        let storage = Arc::clone(&self.storage);
        let workers = Arc::clone(&self.workers);
        let task_name = name.clone();
        let join = tokio::spawn(async move {
            let _ticket = ticket;
            let _permit = workers
                .acquire_owned()
                .await
                .map_err(|_| VideoError::Worker("worker pool closed".to_string()))?;

            let result = storage.save(video, &path).await;
            match &result {
                Ok(()) => info!(%owner, name = %task_name, "upload completed"),
                Err(e) => warn!(%owner, name = %task_name, "upload failed: {e}"),
            }
            result
        });

        Ok(UploadHandle { owner, name, join })
    }

    fn check_quota(&self, owner: OwnerId) -> Result<()> {
        if self.pool.can_admit_more(owner) {
            Ok(())
        } else {
            Err(VideoError::QuotaExceeded {
                owner,
                limit: self.pool.limit(),
            })
        }
    }

    /// Returns true if `owner` has a video named `name` stored or uploading.
    ///
    /// Reads the in-flight pool without the owner lock, so the answer may
    /// lag an admission happening at the same moment.
    pub async fn has_video(&self, owner: OwnerId, name: &str) -> Result<bool> {
        if self.pool.has_name(owner, name) {
            return Ok(true);
        }
        self.storage.exists(name, &self.owner_path(owner)).await
    }

    /// Open a stored video for reading.
    pub async fn get_video(&self, owner: OwnerId, name: &str) -> Result<Video> {
        let content = self
            .storage
            .open_stream(name, &self.owner_path(owner))
            .await?
            .ok_or_else(|| VideoError::NotFound(format!("video '{name}'")))?;
        Ok(Video::from_stored(owner, name, content))
    }

    /// List `owner`'s stored videos. Uploads still in flight are not included.
    pub async fn list_video_infos(&self, owner: OwnerId) -> Result<Vec<VideoInfo>> {
        let names = self.storage.list_names(&self.owner_path(owner)).await?;
        Ok(names.into_iter().map(VideoInfo::from).collect())
    }

    /// Number of uploads `owner` has in flight.
    pub fn in_flight_count(&self, owner: OwnerId) -> usize {
        self.pool.count(owner)
    }

    /// How many more uploads `owner` may start right now.
    pub fn remaining_slots(&self, owner: OwnerId) -> usize {
        self.pool.limit().saturating_sub(self.pool.count(owner))
    }

    /// Per-owner parallel upload limit.
    pub fn parallel_limit(&self) -> usize {
        self.pool.limit()
    }
}
