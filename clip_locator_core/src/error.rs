use thiserror::Error;

use crate::model::VideoId;

/// Errors raised while deriving an [`crate::model::IndexRecord`] from a source video.
#[derive(Error, Debug, Clone)]
pub enum HashError {
    #[error("could not read frames for {video_id}: {source}")]
    FrameRead {
        video_id: VideoId,
        source: frame_io::FrameIoError,
    },

    #[error("video {video_id} has a malformed header (unknown fps or zero frame count)")]
    MalformedHeader { video_id: VideoId },

    #[error("video {video_id} produced no frames to hash")]
    NoFrames { video_id: VideoId },
}

/// Errors raised while locating a clip within a single candidate source video.
/// Most variants are reported and skipped rather than propagated; see
/// `LocateError::is_fatal`.
#[derive(Error, Debug, Clone)]
pub enum LocateError {
    #[error("query clip {0:?} is unreadable")]
    QueryClipUnreadable(std::path::PathBuf),

    #[error("missing or unreadable rgb companion file for {video_id} at frame {frame_index:?}")]
    RgbUnverifiable {
        video_id: VideoId,
        frame_index: Option<u64>,
    },

    #[error("missing or corrupt index entry for candidate {video_id}")]
    CorruptIndexEntry { video_id: VideoId },

    #[error("malformed video header for candidate {video_id}")]
    MalformedHeader { video_id: VideoId },
}

impl LocateError {
    /// Only the query-clip-unreadable case is fatal to the whole locate call;
    /// every other variant is reported at `warn!` and the candidate is skipped.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::QueryClipUnreadable(_))
    }
}
