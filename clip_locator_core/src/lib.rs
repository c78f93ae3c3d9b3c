#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::unwrap_used)]

//! Core matching pipeline for locating where a short clip begins inside a
//! corpus of longer source videos: histograms, perceptual segment hashes,
//! shot segmentation, coarse ranking, fine locating, and the orchestrator
//! that ties them together.

mod coarse_ranker;
mod error;
mod fine_locator;
mod histogram;
mod model;
mod orchestrator;
mod segment_hasher;
mod shot_segmenter;

pub use coarse_ranker::{rank, RankedCandidate, EARLY_EXIT_DISTANCE};
pub use error::{HashError, LocateError};
pub use fine_locator::{
    locate as locate_candidate, ClipKeyFrames, FineLocatorConfig, LocateOutcome, RgbDimensions,
};
pub use histogram::{histogram, similarity};
pub use model::{
    FrameHistogramTable, Histogram, IndexRecord, MatchResult, SegmentHash, SegmentHashList,
    ShotBoundaryList, VideoId, HISTOGRAM_BINS, HISTOGRAM_BINS_PER_CHANNEL,
};
pub use orchestrator::{locate, OrchestratorConfig, DEFAULT_POOL_SIZE, SEQUENTIAL_CANDIDATES};
pub use segment_hasher::{SegmentHasher, SegmentHasherConfig};
pub use shot_segmenter::ShotSegmenter;

/// Runs the offline indexing pipeline (Shot Segmenter + Segment Hasher) over
/// a single source video, producing the [`IndexRecord`] the Index Store
/// persists for it.
pub fn build_index_record(
    video_id: &VideoId,
    src_path: &std::path::Path,
    hasher_config: SegmentHasherConfig,
) -> Result<IndexRecord, HashError> {
    let mut reader =
        frame_io::FrameReader::open(src_path).map_err(|source| HashError::FrameRead {
            video_id: video_id.clone(),
            source,
        })?;

    let fps = reader.info().fps();
    let mut hasher = SegmentHasher::new(hasher_config, fps);
    let mut segmenter = ShotSegmenter::new();
    let mut segment_hashes = Vec::new();
    let mut any_frame = false;

    while let Some(frame) = reader
        .read_next()
        .map_err(|source| HashError::FrameRead {
            video_id: video_id.clone(),
            source,
        })?
    {
        any_frame = true;
        segmenter.push(&frame.pixels);

        let image = image::RgbImage::from_raw(frame.width, frame.height, frame.pixels)
            .ok_or_else(|| HashError::MalformedHeader {
                video_id: video_id.clone(),
            })?;
        let gray = image::imageops::grayscale(&image);
        if let Some(hash) = hasher.push(&gray) {
            segment_hashes.push(hash);
        }
    }

    if !any_frame {
        return Err(HashError::NoFrames {
            video_id: video_id.clone(),
        });
    }

    if let Some(hash) = hasher.finish() {
        segment_hashes.push(hash);
    }

    let (shot_boundaries, histograms) = segmenter.finish();

    Ok(IndexRecord {
        segment_hashes: SegmentHashList::new(segment_hashes),
        shot_boundaries,
        histograms,
    })
}
