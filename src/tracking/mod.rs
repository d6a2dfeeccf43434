//! Durable tracking and checkpoint stores.
//!
//! Both are single-document JSON files written with the same
//! temp-file-write-sync-rename pattern, so a crash between steps never
//! leaves a truncated file where the previous good state was.

mod atomic_write;
pub mod checkpoint_store;
pub mod tracking_store;

pub use atomic_write::write_json_atomic;
pub use checkpoint_store::{Checkpoint, CheckpointStore};
pub use tracking_store::{TrackingStatus, TrackingStore};
