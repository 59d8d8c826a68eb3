//! Folder path resolution over a flat drive.

use tracing::debug;

use super::backend::{DriveBackend, DriveQuery, FOLDER_MEDIA_TYPE};
use crate::Result;

/// Resolves a sequence of folder names to the id of the last folder.
///
/// Resolution walks the path left to right with one single-entry query per
/// segment and stops at the first segment that has no matching folder. It
/// never creates folders and keeps no cache, so each call observes the
/// current state of the drive.
pub struct PathResolver<'a, B: ?Sized> {
    backend: &'a B,
    root_id: &'a str,
}

impl<'a, B: DriveBackend + ?Sized> PathResolver<'a, B> {
    /// Create a resolver rooted at `root_id`.
    pub fn new(backend: &'a B, root_id: &'a str) -> Self {
        Self { backend, root_id }
    }

    /// Resolve `segments` to a folder id.
    ///
    /// Returns `Ok(None)` as soon as one segment is missing; later segments
    /// are not queried. An empty path resolves to the root. Transport
    /// failures are returned as errors, never as `None`.
    pub async fn resolve<S: AsRef<str>>(&self, segments: &[S]) -> Result<Option<String>> {
        let mut current = self.root_id.to_string();
        for segment in segments {
            let segment = segment.as_ref();
            match self.find_folder(&current, segment).await? {
                Some(id) => current = id,
                None => {
                    debug!(parent = %current, segment, "folder path segment not found");
                    return Ok(None);
                }
            }
        }
        Ok(Some(current))
    }

    /// Find a folder named `name` directly under `parent_id`.
    ///
    /// Folder names are assumed unique under a parent; the first match wins.
    pub async fn find_folder(&self, parent_id: &str, name: &str) -> Result<Option<String>> {
        let query = DriveQuery::in_folder(parent_id)
            .with_name(name)
            .with_media_type(FOLDER_MEDIA_TYPE);
        let found = self.backend.query(&query).await?;
        Ok(found.into_iter().next().map(|f| f.id))
    }

    /// Root id this resolver starts from.
    pub fn root_id(&self) -> &str {
        self.root_id
    }
}
