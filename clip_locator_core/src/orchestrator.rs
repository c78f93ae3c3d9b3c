use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::ThreadPoolBuilder;

use crate::coarse_ranker::{self, RankedCandidate};
use crate::error::LocateError;
use crate::fine_locator::{self, ClipKeyFrames, FineLocatorConfig};
use crate::model::{IndexRecord, MatchResult, SegmentHashList, VideoId};
use crate::segment_hasher::SegmentHasherConfig;

/// Number of top-ranked candidates probed sequentially before falling back to
/// the concurrent worker pool.
pub const SEQUENTIAL_CANDIDATES: usize = 2;
/// Default size of the bounded worker pool used for the remaining candidates.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Tuning for a single [`locate`] call.
#[derive(Clone, Copy, Debug)]
pub struct OrchestratorConfig {
    pub segment_hasher: SegmentHasherConfig,
    pub fine_locator: FineLocatorConfig,
    /// Applies uniformly to the sequential phase and the parallel phase; per
    /// the resolved Open Question, there is no separate toggle for
    /// candidates beyond the sequential top-K.
    pub use_rgb_verification: bool,
    pub pool_size: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            segment_hasher: SegmentHasherConfig::default(),
            fine_locator: FineLocatorConfig::default(),
            use_rgb_verification: true,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

struct WinningCandidate {
    rank: usize,
    video_id: VideoId,
    start_frame: u64,
}

/// Drives the Coarse Ranker then the Fine Locator over a loaded corpus index
/// to answer "where does this clip come from".
pub fn locate(
    clip_path: &Path,
    clip_rgb_path: &Path,
    index: &HashMap<VideoId, IndexRecord>,
    config: &OrchestratorConfig,
) -> Result<Option<MatchResult>, LocateError> {
    let clip_hashes = compute_clip_segment_hashes(clip_path, &config.segment_hasher)?;

    let t0 = Instant::now();
    let corpus_hashes: HashMap<VideoId, SegmentHashList> = index
        .iter()
        .map(|(id, record)| (id.clone(), record.segment_hashes.clone()))
        .collect();
    let ranked = coarse_ranker::rank(&clip_hashes, &corpus_hashes);
    debug!(
        "coarse ranking of {} candidates took {:?}",
        ranked.len(),
        t0.elapsed()
    );

    if ranked.is_empty() {
        return Ok(None);
    }

    let key_frames = ClipKeyFrames::extract(clip_path)?;

    let t1 = Instant::now();
    let (sequential, remainder) = ranked.split_at(ranked.len().min(SEQUENTIAL_CANDIDATES));

    // No other worker runs concurrently with this phase, so a fresh flag that
    // never gets set is the right cancellation token here.
    let no_cancel = AtomicBool::new(false);

    for candidate in sequential {
        if let Some(start_frame) = try_candidate(
            candidate,
            index,
            &key_frames,
            clip_rgb_path,
            config.use_rgb_verification,
            &config.fine_locator,
            &no_cancel,
        ) {
            info!(
                "matched {} at frame {} in the sequential phase ({:?})",
                candidate.video_id,
                start_frame,
                t1.elapsed()
            );
            return Ok(Some(MatchResult {
                video_id: candidate.video_id.clone(),
                start_frame,
            }));
        }
    }

    if remainder.is_empty() {
        return Ok(None);
    }

    let t2 = Instant::now();
    let result = locate_concurrently(remainder, index, &key_frames, clip_rgb_path, config);
    debug!("parallel phase took {:?}", t2.elapsed());

    Ok(result.map(|w| MatchResult {
        video_id: w.video_id,
        start_frame: w.start_frame,
    }))
}

fn try_candidate(
    candidate: &RankedCandidate,
    index: &HashMap<VideoId, IndexRecord>,
    key_frames: &ClipKeyFrames,
    clip_rgb_path: &Path,
    use_rgb_verification: bool,
    fine_config: &FineLocatorConfig,
    cancel: &AtomicBool,
) -> Option<u64> {
    let record = match index.get(&candidate.video_id) {
        Some(r) => r,
        None => {
            let e = LocateError::CorruptIndexEntry {
                video_id: candidate.video_id.clone(),
            };
            warn!("skipping candidate {}: {e}", candidate.video_id);
            return None;
        }
    };

    let source_rgb_path = rgb_companion_path(&candidate.video_id);

    match fine_locator::locate(
        &candidate.video_id,
        &record.shot_boundaries,
        &record.histograms,
        &source_rgb_path,
        key_frames,
        clip_rgb_path,
        use_rgb_verification,
        fine_config,
        cancel,
    ) {
        Ok(fine_locator::LocateOutcome::Found(start_frame)) => Some(start_frame),
        Ok(fine_locator::LocateOutcome::NotFound | fine_locator::LocateOutcome::Cancelled) => None,
        Err(e) => {
            warn!("skipping candidate {}: {e}", candidate.video_id);
            None
        }
    }
}

fn rgb_companion_path(video_id: &VideoId) -> std::path::PathBuf {
    std::path::PathBuf::from(video_id.as_str()).with_extension("rgb")
}

fn locate_concurrently(
    candidates: &[RankedCandidate],
    index: &HashMap<VideoId, IndexRecord>,
    key_frames: &ClipKeyFrames,
    clip_rgb_path: &Path,
    config: &OrchestratorConfig,
) -> Option<WinningCandidate> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.pool_size)
        .build()
        .expect("failed to build the fine-locator worker pool");

    let found = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<WinningCandidate>();

    pool.scope(|scope| {
        for (rank, candidate) in candidates.iter().enumerate() {
            // `rank` here is the candidate's position after the sequential
            // prefix, used only for the "lower coarse rank wins" tie-break.
            let absolute_rank = SEQUENTIAL_CANDIDATES + rank;
            let found = Arc::clone(&found);
            let tx = tx.clone();
            let candidate = candidate.clone();

            scope.spawn(move |_| {
                if found.load(Ordering::Acquire) {
                    return;
                }

                if let Some(start_frame) = try_candidate(
                    &candidate,
                    index,
                    key_frames,
                    clip_rgb_path,
                    config.use_rgb_verification,
                    &config.fine_locator,
                    &found,
                ) {
                    if !found.swap(true, Ordering::AcqRel) {
                        let _ = tx.send(WinningCandidate {
                            rank: absolute_rank,
                            video_id: candidate.video_id,
                            start_frame,
                        });
                    }
                }
            });
        }
    });

    drop(tx);

    // Multiple workers may have sent before `found` was observed; keep the
    // lowest coarse rank (ties by VideoId) per the tie-break rule.
    let mut winners: Vec<WinningCandidate> = rx.into_iter().collect();
    winners.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.video_id.cmp(&b.video_id)));
    winners.into_iter().next()
}

fn compute_clip_segment_hashes(
    clip_path: &Path,
    config: &SegmentHasherConfig,
) -> Result<SegmentHashList, LocateError> {
    use crate::segment_hasher::SegmentHasher;
    use image::imageops::grayscale;

    let mut reader = frame_io::FrameReader::open(clip_path)
        .map_err(|_| LocateError::QueryClipUnreadable(clip_path.to_path_buf()))?;

    let fps = reader.info().fps();
    let mut hasher = SegmentHasher::new(*config, fps);
    let mut hashes = Vec::new();

    while let Some(frame) = reader
        .read_next()
        .map_err(|_| LocateError::QueryClipUnreadable(clip_path.to_path_buf()))?
    {
        let image = image::RgbImage::from_raw(frame.width, frame.height, frame.pixels)
            .ok_or_else(|| LocateError::QueryClipUnreadable(clip_path.to_path_buf()))?;
        let gray = grayscale(&image);
        if let Some(hash) = hasher.push(&gray) {
            hashes.push(hash);
        }
    }

    if let Some(hash) = hasher.finish() {
        hashes.push(hash);
    }

    Ok(SegmentHashList::new(hashes))
}
