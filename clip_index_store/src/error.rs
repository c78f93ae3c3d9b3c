use std::path::PathBuf;

use thiserror::Error;

pub type StoreResult<T> = Result<T, IndexStoreError>;

#[derive(Error, Debug)]
pub enum IndexStoreError {
    #[error("error accessing index store file {path}: {source}")]
    CacheFileIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no index entry for {0}")]
    KeyMissing(crate::VideoId),

    #[error("failed to serialize index store to {path}: {source}")]
    Serialization {
        path: PathBuf,
        source: bincode::Error,
    },

    #[error("failed to deserialize index store from {path}: {source}")]
    Deserialization {
        path: PathBuf,
        source: bincode::Error,
    },

    #[error("failed to index {video_id} from {path}: {source}")]
    Indexing {
        video_id: crate::VideoId,
        path: PathBuf,
        source: clip_locator_core::HashError,
    },
}
