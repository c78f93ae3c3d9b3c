use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::LocateError;
use crate::histogram::{histogram, similarity};
use crate::model::{FrameHistogramTable, Histogram, ShotBoundaryList, VideoId};

/// Dimensions of the headerless `.rgb` companion files used for the
/// byte-exact verification step. Treated as configuration rather than a
/// hard-coded literal; defaults match the reference corpus (352x288).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgbDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for RgbDimensions {
    fn default() -> Self {
        Self {
            width: 352,
            height: 288,
        }
    }
}

impl RgbDimensions {
    #[must_use]
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Tuning for the Fine Locator.
#[derive(Clone, Copy, Debug)]
pub struct FineLocatorConfig {
    pub frame_threshold: f32,
    pub rgb_dimensions: RgbDimensions,
}

impl Default for FineLocatorConfig {
    fn default() -> Self {
        Self {
            frame_threshold: 0.95,
            rgb_dimensions: RgbDimensions::default(),
        }
    }
}

/// Maximum number of evenly spaced key frames drawn from the query clip.
pub const MAX_KEY_FRAMES: usize = 120;

/// Histograms of up to [`MAX_KEY_FRAMES`] evenly spaced frames drawn from the
/// query clip, plus the derived `avg_hist`/`clip_hist` used for shot ranking
/// and the first-frame comparison.
pub struct ClipKeyFrames {
    /// 0-based frame index within the clip, for each key frame.
    indices: Vec<u64>,
    histograms: Vec<Histogram>,
    avg_hist: Histogram,
}

impl ClipKeyFrames {
    /// Decode `clip_path` sequentially and extract its key frames.
    pub fn extract(clip_path: impl AsRef<Path>) -> Result<Self, LocateError> {
        let clip_path = clip_path.as_ref();

        let mut reader = frame_io::FrameReader::open(clip_path)
            .map_err(|_| LocateError::QueryClipUnreadable(clip_path.to_path_buf()))?;

        let total_clip_frames = reader.info().frame_count();
        let frame_step = (total_clip_frames / MAX_KEY_FRAMES as u64).max(1);

        let mut indices = Vec::new();
        let mut histograms = Vec::new();

        let mut i = 0u64;
        while let Some(frame) = reader
            .read_next()
            .map_err(|_| LocateError::QueryClipUnreadable(clip_path.to_path_buf()))?
        {
            if i == 0 || i % frame_step == 0 {
                indices.push(i);
                histograms.push(histogram(&frame.pixels));
            }
            i += 1;
        }

        if histograms.is_empty() {
            return Err(LocateError::QueryClipUnreadable(clip_path.to_path_buf()));
        }

        let avg_hist = average_histogram(&histograms);

        Ok(Self {
            indices,
            histograms,
            avg_hist,
        })
    }

    #[must_use]
    pub fn clip_hist(&self) -> &Histogram {
        &self.histograms[0]
    }

    /// Build key frames directly from precomputed histograms, bypassing file
    /// decoding. Useful when the caller already has per-frame histograms (or,
    /// in tests, a synthetic fixture standing in for a decoded clip).
    #[must_use]
    pub fn from_histograms(indices: Vec<u64>, histograms: Vec<Histogram>) -> Self {
        let avg_hist = average_histogram(&histograms);
        Self {
            indices,
            histograms,
            avg_hist,
        }
    }
}

/// Arithmetic mean of histograms, summed in a single fixed order and widened
/// to f64 for the reduction, per the floating-point-reproducibility design note.
fn average_histogram(histograms: &[Histogram]) -> Histogram {
    let bin_count = histograms[0].bins().len();
    let mut sums = vec![0f64; bin_count];

    for h in histograms {
        for (sum, &v) in sums.iter_mut().zip(h.bins()) {
            *sum += f64::from(v);
        }
    }

    let n = histograms.len() as f64;
    Histogram::from_bins(sums.into_iter().map(|s| (s / n) as f32).collect())
}

struct ScanCandidate {
    start_frame: u64,
    avg_similarity: f32,
}

/// Result of a [`locate`] call: a found start frame, an exhausted search, or
/// an early exit because `cancel` was observed set partway through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocateOutcome {
    Found(u64),
    NotFound,
    Cancelled,
}

/// Locates the start frame of `key_frames` within one candidate source video.
/// `cancel` is checked before scanning each shot segment; if it is observed
/// set, the scan stops and returns `Ok(LocateOutcome::Cancelled)` rather than
/// scanning the remaining shots. `Err` is reserved for failures the caller
/// should log and skip (missing rgb files, malformed headers) per the "skip,
/// report, continue" error policy.
pub fn locate(
    video_id: &VideoId,
    shot_boundaries: &ShotBoundaryList,
    histograms: &FrameHistogramTable,
    source_rgb_path: &Path,
    key_frames: &ClipKeyFrames,
    clip_rgb_path: &Path,
    use_rgb_verification: bool,
    config: &FineLocatorConfig,
    cancel: &AtomicBool,
) -> Result<LocateOutcome, LocateError> {
    if histograms.is_empty() {
        return Err(LocateError::MalformedHeader {
            video_id: video_id.clone(),
        });
    }

    let ranked_segments = rank_segments(shot_boundaries, histograms, &key_frames.avg_hist);

    let clip_first_frame = if use_rgb_verification {
        Some(read_rgb_frame(clip_rgb_path, 0, config.rgb_dimensions)?)
    } else {
        None
    };

    for (start, end) in ranked_segments {
        if cancel.load(Ordering::Acquire) {
            return Ok(LocateOutcome::Cancelled);
        }

        let mut candidates = scan_segment(start, end, histograms, key_frames, config.frame_threshold);

        if candidates.is_empty() {
            continue;
        }

        if !use_rgb_verification {
            candidates.sort_by(|a, b| {
                b.avg_similarity
                    .partial_cmp(&a.avg_similarity)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            return Ok(LocateOutcome::Found(candidates[0].start_frame));
        }

        candidates.sort_by(|a, b| {
            b.avg_similarity
                .partial_cmp(&a.avg_similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let clip_first_frame = clip_first_frame
            .as_ref()
            .expect("clip_first_frame is populated whenever use_rgb_verification is true");

        for candidate in &candidates {
            let source_frame = read_rgb_frame(
                source_rgb_path,
                candidate.start_frame,
                config.rgb_dimensions,
            )
            .map_err(|_| LocateError::RgbUnverifiable {
                video_id: video_id.clone(),
                frame_index: Some(candidate.start_frame),
            })?;

            if source_frame == *clip_first_frame {
                return Ok(LocateOutcome::Found(candidate.start_frame));
            }
        }
    }

    Ok(LocateOutcome::NotFound)
}

/// Orders the source's shot segments by the similarity of their starting
/// histogram to the clip's average key-frame histogram, descending, and
/// pairs each boundary with the `(start, end)` frame range of its segment in
/// the video's original (temporal) boundary order.
fn rank_segments(
    shot_boundaries: &ShotBoundaryList,
    histograms: &FrameHistogramTable,
    avg_hist: &Histogram,
) -> Vec<(u64, u64)> {
    let original = shot_boundaries.as_slice();

    // Segment bounds follow the reference algorithm exactly: a boundary's
    // segment starts right after *itself* (not the previous boundary) unless
    // it is the first boundary in the list, and ends at the *next* boundary's
    // value inclusive (not next-minus-one) unless it is the last.
    let mut segments: Vec<(u64, u64, u64)> = original
        .iter()
        .enumerate()
        .map(|(idx, &boundary)| {
            let start = if idx == 0 { 0 } else { boundary + 1 };
            let end = if idx + 1 < original.len() {
                original[idx + 1]
            } else {
                histograms.len() as u64 - 1
            };
            (boundary, start, end)
        })
        .collect();

    segments.sort_by(|(b1, _, _), (b2, _, _)| {
        let s1 = histograms.get(*b1).map_or(-1.0, |h| similarity(avg_hist, h));
        let s2 = histograms.get(*b2).map_or(-1.0, |h| similarity(avg_hist, h));
        s2.partial_cmp(&s1).unwrap_or(std::cmp::Ordering::Equal)
    });

    segments.into_iter().map(|(_, start, end)| (start, end)).collect()
}

fn scan_segment(
    start: u64,
    end: u64,
    histograms: &FrameHistogramTable,
    key_frames: &ClipKeyFrames,
    frame_threshold: f32,
) -> Vec<ScanCandidate> {
    let mut candidates = Vec::new();

    let mut i = start;
    while i <= end {
        let mut total_similarity = 0f64;
        let mut passed = true;

        for (k, &key_offset) in key_frames.indices.iter().enumerate() {
            let source_index = i + key_offset;
            match histograms.get(source_index) {
                Some(source_hist) => {
                    let s = similarity(&key_frames.histograms[k], source_hist);
                    if s < frame_threshold {
                        passed = false;
                        break;
                    }
                    total_similarity += f64::from(s);
                }
                None => {
                    passed = false;
                    break;
                }
            }
        }

        if passed {
            let avg = (total_similarity / key_frames.indices.len() as f64) as f32;
            candidates.push(ScanCandidate {
                start_frame: i,
                avg_similarity: avg,
            });
        }

        i += 1;
    }

    candidates
}

fn read_rgb_frame(
    path: &Path,
    frame_index: u64,
    dims: RgbDimensions,
) -> Result<Vec<u8>, LocateError> {
    let frame_bytes = dims.frame_bytes();
    let offset = frame_index * frame_bytes as u64;

    let mut file = File::open(path).map_err(|_| LocateError::RgbUnverifiable {
        video_id: VideoId::new(path.to_string_lossy().into_owned()),
        frame_index: Some(frame_index),
    })?;

    file.seek(SeekFrom::Start(offset))
        .map_err(|_| LocateError::RgbUnverifiable {
            video_id: VideoId::new(path.to_string_lossy().into_owned()),
            frame_index: Some(frame_index),
        })?;

    let mut buf = vec![0u8; frame_bytes];
    file.read_exact(&mut buf)
        .map_err(|_| LocateError::RgbUnverifiable {
            video_id: VideoId::new(path.to_string_lossy().into_owned()),
            frame_index: Some(frame_index),
        })?;

    Ok(buf)
}
