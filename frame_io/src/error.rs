use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while probing or decoding a video file.
#[derive(Error, Debug, Clone)]
pub enum FrameIoError {
    #[error("ffmpeg/ffprobe not found on PATH")]
    ToolNotFound,

    #[error("io error running ffmpeg/ffprobe for {path}: {source}")]
    Io { path: PathBuf, source: String },

    #[error("ffmpeg/ffprobe exited with an error for {path}: {message}")]
    ToolFailed { path: PathBuf, message: String },

    #[error("could not parse video stats for {path}: {message}")]
    StatsParse { path: PathBuf, message: String },

    #[error("video {path} has a malformed header (zero frame count or unknown fps)")]
    MalformedHeader { path: PathBuf },

    #[error("frame index {frame_index} is out of range for {path} ({frame_count} frames)")]
    SeekOutOfRange {
        path: PathBuf,
        frame_index: u64,
        frame_count: u64,
    },

    #[error("reader for {path} is already closed")]
    ReaderClosed { path: PathBuf },
}
