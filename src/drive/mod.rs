//! Remote drive access for vidstash.
//!
//! The drive is a flat store: every entry (folder or video) has an id, a
//! name, a parent id and a media type. This module provides:
//! - The backend seam a concrete drive client implements
//! - Folder path resolution over that seam
//! - The video storage port used by the upload service
//! - An in-process drive for local runs and tests

mod backend;
mod memory;
mod resolver;
mod storage;

pub use backend::{DriveBackend, DriveQuery, RemoteFile, FOLDER_MEDIA_TYPE, ROOT_FOLDER_ID};
pub use memory::MemoryDrive;
pub use resolver::PathResolver;
pub use storage::{DriveStorage, VideoStorage};
