//! In-process drive backend.
//!
//! Keeps every entry in one flat list, the same shape a remote drive exposes:
//! folders are ordinary entries tagged with [`FOLDER_MEDIA_TYPE`] and
//! hierarchy exists only through parent ids. Nothing is persisted.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::backend::{DriveBackend, DriveQuery, RemoteFile, FOLDER_MEDIA_TYPE};
use crate::video::VideoContent;
use crate::{Result, VideoError};

#[derive(Debug, Clone)]
struct StoredEntry {
    id: String,
    name: String,
    parent_id: String,
    media_type: String,
    data: Vec<u8>,
}

impl StoredEntry {
    fn matches(&self, query: &DriveQuery) -> bool {
        self.parent_id == query.parent_id
            && query.name.as_deref().map_or(true, |n| n == self.name)
            && query
                .media_type
                .as_deref()
                .map_or(true, |m| m == self.media_type)
    }
}

/// Drive backend held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryDrive {
    entries: RwLock<Vec<StoredEntry>>,
    next_id: AtomicU64,
    queries: AtomicUsize,
}

impl MemoryDrive {
    /// Create an empty drive. Only the root exists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queries served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of entries, folders included.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a folder directly, bypassing duplicate checks.
    pub fn insert_folder(&self, name: &str, parent_id: &str) -> String {
        self.insert(name, parent_id, FOLDER_MEDIA_TYPE, Vec::new())
    }

    /// Create a non-folder entry directly.
    pub fn insert_file(
        &self,
        name: &str,
        parent_id: &str,
        media_type: &str,
        data: Vec<u8>,
    ) -> String {
        self.insert(name, parent_id, media_type, data)
    }

    fn insert(&self, name: &str, parent_id: &str, media_type: &str, data: Vec<u8>) -> String {
        let id = format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let entry = StoredEntry {
            id: id.clone(),
            name: name.to_string(),
            parent_id: parent_id.to_string(),
            media_type: media_type.to_string(),
            data,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        id
    }
}

#[async_trait]
impl DriveBackend for MemoryDrive {
    async fn create(
        &self,
        name: &str,
        parent_id: &str,
        media_type: &str,
        mut content: VideoContent,
    ) -> Result<String> {
        let mut data = Vec::new();
        content
            .read_to_end(&mut data)
            .await
            .map_err(|e| VideoError::Transport(format!("reading upload body: {e}")))?;
        Ok(self.insert(name, parent_id, media_type, data))
    }

    async fn query(&self, query: &DriveQuery) -> Result<Vec<RemoteFile>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .iter()
            .filter(|e| e.matches(query))
            .take(query.page_size)
            .map(|e| RemoteFile {
                id: e.id.clone(),
                name: e.name.clone(),
            })
            .collect())
    }

    async fn download(
        &self,
        file_id: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()> {
        let data = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .find(|e| e.id == file_id)
                .map(|e| e.data.clone())
                .ok_or_else(|| VideoError::Transport(format!("no entry with id {file_id}")))?
        };
        sink.write_all(&data).await?;
        sink.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::ROOT_FOLDER_ID;

    fn body(bytes: &[u8]) -> VideoContent {
        Box::pin(std::io::Cursor::new(bytes.to_vec()))
    }

    #[tokio::test]
    async fn test_create_and_query_by_name() {
        let drive = MemoryDrive::new();
        let id = drive
            .create("a.mp4", ROOT_FOLDER_ID, "video/mp4", body(b"abc"))
            .await
            .unwrap();

        let found = drive
            .query(&DriveQuery::in_folder(ROOT_FOLDER_ID).with_name("a.mp4"))
            .await
            .unwrap();

        assert_eq!(
            found,
            vec![RemoteFile {
                id,
                name: "a.mp4".to_string()
            }]
        );
        assert_eq!(drive.query_count(), 1);
    }

    #[tokio::test]
    async fn test_query_filters_media_type_and_parent() {
        let drive = MemoryDrive::new();
        let folder = drive.insert_folder("clips", ROOT_FOLDER_ID);
        drive.insert_file("clips", ROOT_FOLDER_ID, "video/mp4", Vec::new());
        drive.insert_file("inner.mp4", &folder, "video/mp4", Vec::new());

        let folders = drive
            .query(
                &DriveQuery::in_folder(ROOT_FOLDER_ID)
                    .with_name("clips")
                    .with_media_type(FOLDER_MEDIA_TYPE),
            )
            .await
            .unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].id, folder);

        let under_root = drive
            .query(
                &DriveQuery::in_folder(ROOT_FOLDER_ID)
                    .with_media_type("video/mp4")
                    .with_page_size(10),
            )
            .await
            .unwrap();
        assert_eq!(under_root.len(), 1);
        assert_eq!(under_root[0].name, "clips");
    }

    #[tokio::test]
    async fn test_query_respects_page_size() {
        let drive = MemoryDrive::new();
        for i in 0..5 {
            drive.insert_file(&format!("{i}.mp4"), ROOT_FOLDER_ID, "video/mp4", Vec::new());
        }

        let page = drive
            .query(&DriveQuery::in_folder(ROOT_FOLDER_ID).with_page_size(3))
            .await
            .unwrap();

        let names: Vec<_> = page.into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["0.mp4", "1.mp4", "2.mp4"]);
    }

    #[tokio::test]
    async fn test_download_writes_bytes() {
        let drive = MemoryDrive::new();
        let id = drive.insert_file("a.mp4", ROOT_FOLDER_ID, "video/mp4", b"payload".to_vec());

        let mut sink = Vec::new();
        drive.download(&id, &mut sink).await.unwrap();

        assert_eq!(sink, b"payload");
    }

    #[tokio::test]
    async fn test_download_unknown_id_is_transport_error() {
        let drive = MemoryDrive::new();
        let mut sink = Vec::new();

        let result = drive.download("mem-404", &mut sink).await;

        assert!(matches!(result, Err(VideoError::Transport(_))));
    }

    #[test]
    fn test_ids_are_unique() {
        let drive = MemoryDrive::new();
        let a = drive.insert_folder("a", ROOT_FOLDER_ID);
        let b = drive.insert_folder("a", ROOT_FOLDER_ID);
        assert_ne!(a, b);
        assert_eq!(drive.len(), 2);
    }
}
