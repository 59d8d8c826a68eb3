//! Upload admission and transfer.
//!
//! This module provides:
//! - Per-owner bookkeeping of uploads in flight
//! - A keyed lock table serializing admission per owner
//! - The upload service that admits, transfers and releases uploads

mod lock;
mod pool;
mod service;

pub use lock::OwnerLocks;
pub use pool::{InFlightEntry, InFlightPool, DEFAULT_PARALLEL_LIMIT};
pub use service::{UploadHandle, UploadService};
