//! vidstash - per-owner video uploads into a folder-addressed drive.
//!
//! Owners upload named videos into their own folder of a remote drive. The
//! upload service caps how many uploads each owner has in flight and refuses
//! names that are already uploading or stored for that owner.

pub mod config;
pub mod drive;
pub mod error;
pub mod logging;
pub mod upload;
pub mod video;

pub use config::Config;
pub use drive::{DriveBackend, DriveStorage, MemoryDrive, PathResolver, VideoStorage};
pub use error::{Result, VideoError};
pub use upload::{InFlightEntry, InFlightPool, OwnerLocks, UploadHandle, UploadService};
pub use video::{validate_name, OwnerId, Video, VideoContent, VideoInfo, VIDEO_EXTENSION};
