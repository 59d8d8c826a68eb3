//! Video storage on top of a folder-addressed drive.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::backend::{DriveBackend, DriveQuery, RemoteFile, FOLDER_MEDIA_TYPE};
use super::resolver::PathResolver;
use crate::config::StorageConfig;
use crate::video::{Video, VideoContent};
use crate::{Result, VideoError};

/// Storage operations the upload service needs.
///
/// Every operation takes a folder path (a list of folder names under the
/// drive root) and resolves it before acting.
#[async_trait]
pub trait VideoStorage: Send + Sync {
    /// Store the video under `path`.
    ///
    /// Performs exactly one write and does not check for an existing entry
    /// with the same name. Fails with `NotFound` if `path` does not resolve.
    async fn save(&self, video: Video, path: &[String]) -> Result<()>;

    /// Returns true if a video named `name` sits directly under `path`.
    async fn exists(&self, name: &str, path: &[String]) -> Result<bool>;

    /// Open a stream over the video named `name` under `path`.
    ///
    /// Returns `Ok(None)` when the path or the video is missing.
    async fn open_stream(&self, name: &str, path: &[String]) -> Result<Option<VideoContent>>;

    /// Names of all videos directly under `path`, in drive order.
    ///
    /// Empty when `path` does not resolve.
    async fn list_names(&self, path: &[String]) -> Result<Vec<String>>;

    /// Create whichever folders of `path` are missing and return the id of
    /// the last one.
    async fn ensure_path(&self, path: &[String]) -> Result<String>;
}

/// [`VideoStorage`] backed by a [`DriveBackend`].
///
/// Downloads are staged under `staging_dir` because the drive writes into a
/// sink while callers want something to read from. A later download of the
/// same name under the same path overwrites the staged copy.
///
/// Folder creation through [`ensure_path`](VideoStorage::ensure_path) is
/// serialized per storage, so concurrent callers never create two folders
/// with the same name under one parent.
pub struct DriveStorage<B> {
    backend: B,
    root_id: String,
    media_type: String,
    staging_dir: PathBuf,
    list_page_size: usize,
    provisioning: Mutex<()>,
}

impl<B: DriveBackend> DriveStorage<B> {
    /// Create a storage over `backend` using the drive settings in `config`.
    pub fn new(backend: B, config: &StorageConfig) -> Self {
        Self {
            backend,
            root_id: config.root_id.clone(),
            media_type: config.media_type.clone(),
            staging_dir: PathBuf::from(&config.staging_dir),
            list_page_size: config.list_page_size,
            provisioning: Mutex::new(()),
        }
    }

    /// Override the staging directory.
    pub fn with_staging_dir(mut self, staging_dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = staging_dir.into();
        self
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Directory downloads are staged in.
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    fn resolver(&self) -> PathResolver<'_, B> {
        PathResolver::new(&self.backend, &self.root_id)
    }

    async fn find_video(&self, name: &str, path: &[String]) -> Result<Option<RemoteFile>> {
        let Some(folder_id) = self.resolver().resolve(path).await? else {
            return Ok(None);
        };
        let query = DriveQuery::in_folder(folder_id)
            .with_name(name)
            .with_media_type(&self.media_type);
        Ok(self.backend.query(&query).await?.into_iter().next())
    }

    /// Staging location for `name` under `path`.
    ///
    /// Separators are flattened so neither the path nor the name can leave
    /// the staging directory.
    fn staging_path(&self, name: &str, path: &[String]) -> PathBuf {
        path.iter()
            .map(|segment| flatten(segment))
            .fold(self.staging_dir.clone(), |dir, segment| dir.join(segment))
            .join(flatten(name))
    }
}

fn flatten(component: &str) -> String {
    match component.replace(['/', '\\'], "_") {
        s if s == "." || s == ".." || s.is_empty() => format!("_{s}"),
        s => s,
    }
}

#[async_trait]
impl<B: DriveBackend> VideoStorage for DriveStorage<B> {
    async fn save(&self, video: Video, path: &[String]) -> Result<()> {
        let folder_id = self
            .resolver()
            .resolve(path)
            .await?
            .ok_or_else(|| VideoError::NotFound(format!("folder '{}'", path.join("/"))))?;

        let (owner, name, content) = video.into_parts();
        let id = self
            .backend
            .create(&name, &folder_id, &self.media_type, content)
            .await?;
        info!(%owner, name = %name, id = %id, "video stored");
        Ok(())
    }

    async fn exists(&self, name: &str, path: &[String]) -> Result<bool> {
        Ok(self.find_video(name, path).await?.is_some())
    }

    async fn open_stream(&self, name: &str, path: &[String]) -> Result<Option<VideoContent>> {
        let Some(remote) = self.find_video(name, path).await? else {
            return Ok(None);
        };

        let staged = self.staging_path(name, path);
        if let Some(parent) = staged.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staged)
            .await?;
        self.backend.download(&remote.id, &mut file).await?;
        file.flush().await?;
        file.seek(SeekFrom::Start(0)).await?;

        debug!(name, staged = %staged.display(), "video staged for streaming");
        let content: VideoContent = Box::pin(file);
        Ok(Some(content))
    }

    async fn list_names(&self, path: &[String]) -> Result<Vec<String>> {
        let Some(folder_id) = self.resolver().resolve(path).await? else {
            return Ok(Vec::new());
        };
        let query = DriveQuery::in_folder(folder_id)
            .with_media_type(&self.media_type)
            .with_page_size(self.list_page_size);
        let files = self.backend.query(&query).await?;
        if files.len() >= self.list_page_size {
            warn!(
                folder = %path.join("/"),
                page_size = self.list_page_size,
                "video listing filled a whole page and may be truncated"
            );
        }
        Ok(files.into_iter().map(|f| f.name).collect())
    }

    async fn ensure_path(&self, path: &[String]) -> Result<String> {
        let _provisioning = self.provisioning.lock().await;
        let resolver = self.resolver();
        let mut current = self.root_id.clone();
        for segment in path {
            current = match resolver.find_folder(&current, segment).await? {
                Some(id) => id,
                None => {
                    let empty: VideoContent = Box::pin(tokio::io::empty());
                    let id = self
                        .backend
                        .create(segment, &current, FOLDER_MEDIA_TYPE, empty)
                        .await?;
                    info!(parent = %current, segment = %segment, id = %id, "folder created");
                    id
                }
            };
        }
        Ok(current)
    }
}
