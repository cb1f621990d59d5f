//! Storage module
//!
//! File-level access to the shared reports directory: locked atomic
//! writes, contention-aware reads, and discovery of the latest snapshot.

pub mod locator;
pub mod snapshot_file;

pub use locator::{SnapshotEntry, SnapshotLocator};
pub use snapshot_file::{SnapshotBytes, WriteLock};
