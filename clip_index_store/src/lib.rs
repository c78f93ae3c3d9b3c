#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::unwrap_used)]

//! Disk-backed persistence for the offline indexer's output: a
//! `VideoId -> IndexRecord` map, bincode-serialized and written atomically,
//! that re-indexes a source video automatically once its file on disk
//! changes.

mod error;
mod fs_cache;
mod store;

pub use clip_locator_core::VideoId;
pub use error::{IndexStoreError, StoreResult};
pub use store::ClipIndexStore;
