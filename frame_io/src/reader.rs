use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::error::FrameIoError;
use crate::video_info::VideoInfo;

/// One decoded RGB24 frame plus the index it was read at.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    /// Row-major RGB24 pixel bytes, `height * width * 3` long.
    pub pixels: Vec<u8>,
}

/// Sequentially decodes raw RGB24 frames from a video file by piping `ffmpeg`'s
/// stdout. Frames are read on demand; there is no seeking within a single
/// reader. To seek, call [`FrameReader::seek`], which respawns the
/// underlying process with `-ss`.
pub struct FrameReader {
    src_path: PathBuf,
    info: VideoInfo,
    child: Child,
    next_index: u64,
    frame_bytes: usize,
    finished: bool,
}

impl FrameReader {
    /// Open `src_path` and start decoding from frame 0.
    pub fn open(src_path: impl AsRef<Path>) -> Result<Self, FrameIoError> {
        Self::open_from(src_path, 0)
    }

    /// Open `src_path` and start decoding from `start_frame`.
    pub fn open_from(src_path: impl AsRef<Path>, start_frame: u64) -> Result<Self, FrameIoError> {
        let src_path = src_path.as_ref().to_path_buf();
        let info = VideoInfo::probe(&src_path)?;

        if start_frame >= info.frame_count() {
            return Err(FrameIoError::SeekOutOfRange {
                path: src_path,
                frame_index: start_frame,
                frame_count: info.frame_count(),
            });
        }

        let child = spawn_decoder(&src_path, &info, start_frame)?;
        let (width, height) = info.resolution();
        let frame_bytes = width as usize * height as usize * 3;

        Ok(Self {
            src_path,
            info,
            child,
            next_index: start_frame,
            frame_bytes,
            finished: false,
        })
    }

    #[must_use]
    pub const fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// Read the next sequential frame, or `Ok(None)` at end of stream.
    pub fn read_next(&mut self) -> Result<Option<Frame>, FrameIoError> {
        if self.finished {
            return Ok(None);
        }

        let (width, height) = self.info.resolution();
        let mut buf = vec![0u8; self.frame_bytes];

        let stdout = self
            .child
            .stdout
            .as_mut()
            .ok_or_else(|| FrameIoError::ReaderClosed {
                path: self.src_path.clone(),
            })?;

        let mut head = 0;
        while head < buf.len() {
            match stdout.read(&mut buf[head..]) {
                Ok(0) => {
                    self.close();
                    return Ok(None);
                }
                Ok(n) => head += n,
                Err(e) => {
                    self.close();
                    return Err(FrameIoError::Io {
                        path: self.src_path.clone(),
                        source: e.to_string(),
                    });
                }
            }
        }

        let index = self.next_index;
        self.next_index += 1;

        Ok(Some(Frame {
            index,
            width,
            height,
            pixels: buf,
        }))
    }

    /// Respawn decoding from `frame_index`, discarding the current process.
    pub fn seek(&mut self, frame_index: u64) -> Result<(), FrameIoError> {
        if frame_index >= self.info.frame_count() {
            return Err(FrameIoError::SeekOutOfRange {
                path: self.src_path.clone(),
                frame_index,
                frame_count: self.info.frame_count(),
            });
        }

        self.close();
        self.child = spawn_decoder(&self.src_path, &self.info, frame_index)?;
        self.next_index = frame_index;
        self.finished = false;
        Ok(())
    }

    fn close(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
            self.finished = true;
        }
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_decoder(src_path: &Path, info: &VideoInfo, start_frame: u64) -> Result<Child, FrameIoError> {
    let seek_secs = f64::from(start_frame as u32) / f64::from(info.fps().max(1.0));
    let seek_arg_string = format!("{seek_secs:.6}");

    #[rustfmt::skip]
    let args: Vec<&OsStr> = vec![
        OsStr::new("-hide_banner"),
        OsStr::new("-loglevel"), OsStr::new("error"),
        OsStr::new("-nostats"),
        OsStr::new("-ss"), OsStr::new(&seek_arg_string),
        OsStr::new("-i"), OsStr::new(src_path),
        OsStr::new("-pix_fmt"), OsStr::new("rgb24"),
        OsStr::new("-c:v"), OsStr::new("rawvideo"),
        OsStr::new("-f"), OsStr::new("image2pipe"),
        OsStr::new("-"),
    ];

    let mut child = Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FrameIoError::ToolNotFound,
            _ => FrameIoError::Io {
                path: src_path.to_path_buf(),
                source: e.to_string(),
            },
        })?;

    // Prevent lockup if ffmpeg fills its stderr pipe; we don't read it.
    std::mem::drop(child.stderr.take());

    Ok(child)
}

/// Frame count of `src_path` without opening a decode pipe.
pub fn frame_count(src_path: impl AsRef<Path>) -> Result<u64, FrameIoError> {
    Ok(VideoInfo::probe(src_path)?.frame_count())
}

/// Frames-per-second of `src_path` without opening a decode pipe.
pub fn fps(src_path: impl AsRef<Path>) -> Result<f32, FrameIoError> {
    Ok(VideoInfo::probe(src_path)?.fps())
}

/// `(width, height)` of `src_path` without opening a decode pipe.
pub fn resolution(src_path: impl AsRef<Path>) -> Result<(u32, u32), FrameIoError> {
    Ok(VideoInfo::probe(src_path)?.resolution())
}
