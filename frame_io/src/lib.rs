#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::unwrap_used)]

//! Sequential raw-frame decoding of video files via the `ffmpeg`/`ffprobe`
//! command line tools.
//!
//! This crate knows nothing about hashing or matching; it only turns a video
//! file on disk into a stream of RGB24 [`Frame`]s plus the [`VideoInfo`]
//! needed to size and seek within that stream.
//!
//! ```no_run
//! use frame_io::FrameReader;
//!
//! let mut reader = FrameReader::open("clip.mp4").unwrap();
//! while let Some(frame) = reader.read_next().unwrap() {
//!     println!("frame {} is {}x{}", frame.index, frame.width, frame.height);
//! }
//! ```

mod error;
mod reader;
mod video_info;

pub use error::FrameIoError;
pub use reader::{frame_count, fps, resolution, Frame, FrameReader};
pub use video_info::VideoInfo;
