//! Video identity and name validation.

use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use uuid::Uuid;

use crate::{Result, VideoError};

/// Extension every video name must end with.
pub const VIDEO_EXTENSION: &str = ".mp4";

/// Readable byte stream carried by a video. Consumed at most once.
pub type VideoContent = Pin<Box<dyn AsyncRead + Send>>;

/// Opaque owner identifier used as the partition key for quota and naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OwnerId(Uuid);

impl From<Uuid> for OwnerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for OwnerId {
    type Err = VideoError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| VideoError::InvalidOwner(format!("'{s}': {e}")))
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Check that `name` ends with [`VIDEO_EXTENSION`] and has a non-empty stem.
pub fn validate_name(name: &str) -> Result<()> {
    match name.strip_suffix(VIDEO_EXTENSION) {
        Some(stem) if !stem.is_empty() => Ok(()),
        Some(_) => Err(VideoError::InvalidName(format!(
            "'{name}' has an empty name before {VIDEO_EXTENSION}"
        ))),
        None => Err(VideoError::InvalidName(format!(
            "'{name}' must end with {VIDEO_EXTENSION}"
        ))),
    }
}

/// A named video belonging to an owner.
///
/// Construction validates the name, so every `Video` in circulation has a
/// well-formed name. The content stream is moved out exactly once, by the
/// transfer worker or by whoever reads a downloaded video.
pub struct Video {
    owner: OwnerId,
    name: String,
    content: VideoContent,
}

impl Video {
    /// Create a video over an arbitrary byte stream.
    pub fn new(
        owner: OwnerId,
        name: impl Into<String>,
        content: impl AsyncRead + Send + 'static,
    ) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            owner,
            name,
            content: Box::pin(content),
        })
    }

    /// Create a video over an in-memory buffer.
    pub fn from_bytes(
        owner: OwnerId,
        name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        Self::new(owner, name, std::io::Cursor::new(bytes.into()))
    }

    /// Wrap a stream read back from storage. The name is taken as stored.
    pub(crate) fn from_stored(owner: OwnerId, name: &str, content: VideoContent) -> Self {
        Self {
            owner,
            name: name.to_string(),
            content,
        }
    }

    /// Owner of this video.
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Video name, including the extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Split into owner, name and content stream.
    pub fn into_parts(self) -> (OwnerId, String, VideoContent) {
        (self.owner, self.name, self.content)
    }

    /// Drain the content stream into memory.
    pub async fn read_to_end(self) -> Result<Vec<u8>> {
        let mut content = self.content;
        let mut buf = Vec::new();
        content.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

impl fmt::Debug for Video {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Video")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Listing entry for a stored video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoInfo {
    /// Video name.
    pub name: String,
}

impl From<String> for VideoInfo {
    fn from(name: String) -> Self {
        Self { name }
    }
}
