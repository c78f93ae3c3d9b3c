use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::Value;

use crate::error::FrameIoError;

/// Stats about a video file obtained from `ffprobe`, used to size the raw-frame
/// pipe and to validate the header before indexing or locating against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    frame_count: u64,
    fps: f32,
    resolution: (u32, u32),
}

impl VideoInfo {
    /// Probe `src_path` with ffprobe. Returns `MalformedHeader` if the video
    /// reports zero frames or an unparseable framerate.
    pub fn probe(src_path: impl AsRef<Path>) -> Result<Self, FrameIoError> {
        let src_path = src_path.as_ref();
        let stdout = run_ffprobe(src_path)?;

        let parsed: Value =
            serde_json::from_str(&stdout).map_err(|e| FrameIoError::StatsParse {
                path: src_path.to_path_buf(),
                message: e.to_string(),
            })?;

        let stream = first_video_stream(&parsed).ok_or_else(|| FrameIoError::StatsParse {
            path: src_path.to_path_buf(),
            message: "no video stream in ffprobe output".to_string(),
        })?;

        let width = stream["width"].as_u64().unwrap_or(0) as u32;
        let height = stream["height"].as_u64().unwrap_or(0) as u32;

        let fps = parse_frame_rate(&stream["avg_frame_rate"])
            .or_else(|| parse_frame_rate(&stream["r_frame_rate"]))
            .unwrap_or(0.0);

        let frame_count = stream["nb_frames"]
            .as_str()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or_else(|| estimate_frame_count(&parsed, fps));

        if frame_count == 0 || fps <= 0.0 {
            return Err(FrameIoError::MalformedHeader {
                path: src_path.to_path_buf(),
            });
        }

        Ok(Self {
            frame_count,
            fps,
            resolution: (width, height),
        })
    }

    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[must_use]
    pub const fn fps(&self) -> f32 {
        self.fps
    }

    #[must_use]
    pub const fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}

fn first_video_stream(parsed: &Value) -> Option<&Value> {
    parsed["streams"].as_array()?.iter().find(|s| {
        matches!(s["codec_type"].as_str(), Some("video"))
    })
}

/// `avg_frame_rate`/`r_frame_rate` are reported as `"30000/1001"`-style fractions.
fn parse_frame_rate(val: &Value) -> Option<f32> {
    let s = val.as_str()?;
    let mut parts = s.split('/');
    let num: f64 = parts.next()?.parse().ok()?;
    let den: f64 = parts.next()?.parse().ok()?;
    if den == 0.0 {
        return None;
    }
    let rate = num / den;
    if rate.is_finite() && rate > 0.0 {
        Some(rate as f32)
    } else {
        None
    }
}

fn estimate_frame_count(parsed: &Value, fps: f32) -> u64 {
    let duration: f64 = parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);
    (duration * f64::from(fps)).round() as u64
}

fn run_ffprobe(src_path: &Path) -> Result<String, FrameIoError> {
    #[rustfmt::skip]
    let args: &[&OsStr] = &[
        OsStr::new("-v"), OsStr::new("quiet"),
        OsStr::new("-show_format"), OsStr::new("-show_streams"),
        OsStr::new("-print_format"), OsStr::new("json"),
        OsStr::new(src_path),
    ];

    let output = Command::new("ffprobe")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FrameIoError::ToolNotFound,
            _ => FrameIoError::Io {
                path: src_path.to_path_buf(),
                source: e.to_string(),
            },
        })?;

    if !output.status.success() {
        return Err(FrameIoError::ToolFailed {
            path: src_path.to_path_buf(),
            message: String::from_utf8_lossy(&output.stderr)
                .chars()
                .take(500)
                .collect(),
        });
    }

    String::from_utf8(output.stdout).map_err(|_| FrameIoError::StatsParse {
        path: src_path.to_path_buf(),
        message: "ffprobe output was not valid utf8".to_string(),
    })
}
