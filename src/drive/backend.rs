//! Backend seam for the remote drive.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::video::VideoContent;
use crate::Result;

/// Well-known id of the drive root.
pub const ROOT_FOLDER_ID: &str = "root";

/// Media type that marks an entry as a folder.
pub const FOLDER_MEDIA_TYPE: &str = "application/vnd.google-apps.folder";

/// An entry returned by a drive query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Drive-assigned id.
    pub id: String,
    /// Entry name.
    pub name: String,
}

/// Filter for listing entries directly under one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveQuery {
    /// Parent folder id.
    pub parent_id: String,
    /// Exact name to match.
    pub name: Option<String>,
    /// Exact media type to match.
    pub media_type: Option<String>,
    /// Maximum number of entries to return.
    pub page_size: usize,
}

impl DriveQuery {
    /// Query everything directly under `parent_id`, one entry per page.
    pub fn in_folder(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            name: None,
            media_type: None,
            page_size: 1,
        }
    }

    /// Match only entries with this name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Match only entries with this media type.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Operations a drive client must provide.
///
/// Any failure talking to the drive is reported as
/// [`VideoError::Transport`](crate::VideoError::Transport); an empty query
/// result is the only way to express "missing".
#[async_trait]
pub trait DriveBackend: Send + Sync {
    /// Create an entry under `parent_id` and return its id.
    async fn create(
        &self,
        name: &str,
        parent_id: &str,
        media_type: &str,
        content: VideoContent,
    ) -> Result<String>;

    /// List entries matching the query, in store order.
    async fn query(&self, query: &DriveQuery) -> Result<Vec<RemoteFile>>;

    /// Write the bytes of entry `file_id` into `sink`.
    async fn download(
        &self,
        file_id: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()>;
}

#[async_trait]
impl<B: DriveBackend + ?Sized> DriveBackend for Arc<B> {
    async fn create(
        &self,
        name: &str,
        parent_id: &str,
        media_type: &str,
        content: VideoContent,
    ) -> Result<String> {
        (**self).create(name, parent_id, media_type, content).await
    }

    async fn query(&self, query: &DriveQuery) -> Result<Vec<RemoteFile>> {
        (**self).query(query).await
    }

    async fn download(
        &self,
        file_id: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()> {
        (**self).download(file_id, sink).await
    }
}
