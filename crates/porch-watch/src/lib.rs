//! Change watcher for porch sites.
//!
//! Periodically snapshots the modification times of the watched directories
//! and runs a full rebuild whenever a snapshot differs from the previous one.

pub mod runner;
pub mod snapshot;
pub mod watcher;

pub use runner::{BuildOutcome, BuildRunner, CommandRunner};
pub use snapshot::{Snapshot, SnapshotDiff};
pub use watcher::{ChangeWatcher, WatchConfig, WatchError, WatchMode, MIN_INTERVAL};
