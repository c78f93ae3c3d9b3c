//! Scenario tests for the coarse ranker and fine locator: exact hits, near
//! misses, multi-shot clips, and ambiguous corpora. These exercise the Fine
//! Locator and Coarse Ranker directly against synthetically constructed
//! fixtures rather than real video files, since no video assets ship with
//! this repository.

use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use clip_locator_core::{
    histogram, rank, ClipKeyFrames, FineLocatorConfig, FrameHistogramTable, Histogram,
    LocateOutcome, RankedCandidate, RgbDimensions, SegmentHash, SegmentHashList, ShotBoundaryList,
    VideoId,
};

const FIXTURE_DIMS: RgbDimensions = RgbDimensions {
    width: 4,
    height: 4,
};

fn fixture_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("clip_locator_core_scenario_{name}"))
}

fn solid_rgb_frame(rgb: [u8; 3]) -> Vec<u8> {
    rgb.repeat(FIXTURE_DIMS.width as usize * FIXTURE_DIMS.height as usize)
}

fn write_rgb_file(path: &Path, frames: &[Vec<u8>]) {
    let mut file = File::create(path).expect("create fixture rgb file");
    for frame in frames {
        file.write_all(frame).expect("write fixture frame");
    }
}

/// Deterministic but varied color for frame `i`, used so that most frames of
/// a synthetic source video are histogram-distinguishable from one another.
fn color_for(i: u64) -> [u8; 3] {
    [
        ((i * 37) % 256) as u8,
        ((i * 59 + 11) % 256) as u8,
        ((i * 83 + 29) % 256) as u8,
    ]
}

/// S1: Corpus = {V1} with 1000 frames; clip = frames [500..550) of V1.
/// Expect (V1, 500).
#[test]
fn s1_self_match_at_exact_offset() {
    let source_colors: Vec<[u8; 3]> = (0..1000u64).map(color_for).collect();
    let source_frames: Vec<Vec<u8>> = source_colors.iter().map(|&c| solid_rgb_frame(c)).collect();
    let histograms =
        FrameHistogramTable::new(source_frames.iter().map(|f| histogram(f)).collect());
    let shot_boundaries = ShotBoundaryList::new(vec![0]);

    let source_rgb_path = fixture_path("s1_source");
    write_rgb_file(&source_rgb_path, &source_frames);

    let clip_colors = &source_colors[500..550];
    let clip_frames: Vec<Vec<u8>> = clip_colors.iter().map(|&c| solid_rgb_frame(c)).collect();
    let clip_rgb_path = fixture_path("s1_clip");
    write_rgb_file(&clip_rgb_path, &clip_frames);

    let key_histograms: Vec<Histogram> = clip_frames.iter().map(|f| histogram(f)).collect();
    let key_indices: Vec<u64> = (0..clip_colors.len() as u64).collect();
    let key_frames = ClipKeyFrames::from_histograms(key_indices, key_histograms);

    let video_id = VideoId::new("V1");
    let config = FineLocatorConfig {
        frame_threshold: 0.95,
        rgb_dimensions: FIXTURE_DIMS,
    };

    let result = clip_locator_core::locate_candidate(
        &video_id,
        &shot_boundaries,
        &histograms,
        &source_rgb_path,
        &key_frames,
        &clip_rgb_path,
        true,
        &config,
        &AtomicBool::new(false),
    )
    .expect("locate should not error");

    assert_eq!(result, LocateOutcome::Found(500));

    let _ = fs::remove_file(&source_rgb_path);
    let _ = fs::remove_file(&clip_rgb_path);
}

/// S2: Two candidates share the same histogram shape at different offsets
/// (so their coarse hash distance ties), but only one candidate's raw bytes
/// actually match the clip. Fine locator must pick it through RGB
/// verification, not through histogram similarity alone.
#[test]
fn s2_rgb_verification_breaks_a_histogram_tie() {
    let shared_color = [120u8, 130, 140];
    let mut v1_colors: Vec<[u8; 3]> = (0..1000u64).map(color_for).collect();
    let mut v2_colors: Vec<[u8; 3]> = (0..1000u64).map(color_for).collect();

    for c in &mut v1_colors[200..260] {
        *c = shared_color;
    }
    for c in &mut v2_colors[300..360] {
        *c = shared_color;
    }

    let v1_frames: Vec<Vec<u8>> = v1_colors.iter().map(|&c| solid_rgb_frame(c)).collect();
    let v2_frames: Vec<Vec<u8>> = v2_colors.iter().map(|&c| solid_rgb_frame(c)).collect();

    // Make v1's bytes in the shared shot one shade off, so the histogram
    // bucket is identical (same >>5 bin) but byte comparison fails.
    let mut v1_frames_offset = v1_frames.clone();
    for frame in &mut v1_frames_offset[200..260] {
        for byte in frame.iter_mut() {
            *byte = byte.wrapping_add(1);
        }
    }

    let v1_histograms =
        FrameHistogramTable::new(v1_frames_offset.iter().map(|f| histogram(f)).collect());
    let v2_histograms = FrameHistogramTable::new(v2_frames.iter().map(|f| histogram(f)).collect());

    let v1_rgb_path = fixture_path("s2_v1");
    let v2_rgb_path = fixture_path("s2_v2");
    write_rgb_file(&v1_rgb_path, &v1_frames_offset);
    write_rgb_file(&v2_rgb_path, &v2_frames);

    let clip_colors = &v2_colors[300..360];
    let clip_frames: Vec<Vec<u8>> = clip_colors.iter().map(|&c| solid_rgb_frame(c)).collect();
    let clip_rgb_path = fixture_path("s2_clip");
    write_rgb_file(&clip_rgb_path, &clip_frames);

    let key_histograms: Vec<Histogram> = clip_frames.iter().map(|f| histogram(f)).collect();
    let key_indices: Vec<u64> = (0..clip_colors.len() as u64).collect();
    let key_frames = ClipKeyFrames::from_histograms(key_indices, key_histograms);

    let config = FineLocatorConfig {
        frame_threshold: 0.95,
        rgb_dimensions: FIXTURE_DIMS,
    };
    let shot_boundaries = ShotBoundaryList::new(vec![0]);

    let v1_result = clip_locator_core::locate_candidate(
        &VideoId::new("V1"),
        &shot_boundaries,
        &v1_histograms,
        &v1_rgb_path,
        &key_frames,
        &clip_rgb_path,
        true,
        &config,
        &AtomicBool::new(false),
    )
    .expect("locate should not error");

    let v2_result = clip_locator_core::locate_candidate(
        &VideoId::new("V2"),
        &shot_boundaries,
        &v2_histograms,
        &v2_rgb_path,
        &key_frames,
        &clip_rgb_path,
        true,
        &config,
        &AtomicBool::new(false),
    )
    .expect("locate should not error");

    assert_eq!(v1_result, LocateOutcome::NotFound);
    assert_eq!(v2_result, LocateOutcome::Found(300));

    let _ = fs::remove_file(&v1_rgb_path);
    let _ = fs::remove_file(&v2_rgb_path);
    let _ = fs::remove_file(&clip_rgb_path);
}

/// S3: A synthetic clip with histograms uncorrelated to every source frame
/// returns "no match".
#[test]
fn s3_uncorrelated_clip_returns_no_match() {
    let source_frames: Vec<Vec<u8>> = (0..100u64).map(|i| solid_rgb_frame(color_for(i))).collect();
    let histograms =
        FrameHistogramTable::new(source_frames.iter().map(|f| histogram(f)).collect());
    let shot_boundaries = ShotBoundaryList::new(vec![0]);

    let source_rgb_path = fixture_path("s3_source");
    write_rgb_file(&source_rgb_path, &source_frames);

    // A clip that alternates between colors never seen in the source.
    let clip_frames: Vec<Vec<u8>> = (0..20u64)
        .map(|i| {
            if i % 2 == 0 {
                solid_rgb_frame([1, 250, 1])
            } else {
                solid_rgb_frame([250, 1, 250])
            }
        })
        .collect();
    let clip_rgb_path = fixture_path("s3_clip");
    write_rgb_file(&clip_rgb_path, &clip_frames);

    let key_histograms: Vec<Histogram> = clip_frames.iter().map(|f| histogram(f)).collect();
    let key_indices: Vec<u64> = (0..clip_frames.len() as u64).collect();
    let key_frames = ClipKeyFrames::from_histograms(key_indices, key_histograms);

    let config = FineLocatorConfig {
        frame_threshold: 0.95,
        rgb_dimensions: FIXTURE_DIMS,
    };

    let result = clip_locator_core::locate_candidate(
        &VideoId::new("V1"),
        &shot_boundaries,
        &histograms,
        &source_rgb_path,
        &key_frames,
        &clip_rgb_path,
        true,
        &config,
        &AtomicBool::new(false),
    )
    .expect("locate should not error");

    assert_eq!(result, LocateOutcome::NotFound);

    let _ = fs::remove_file(&source_rgb_path);
    let _ = fs::remove_file(&clip_rgb_path);
}

/// A clip that would otherwise match in a later shot is abandoned as soon as
/// a pre-set cancel flag is observed, before that shot is ever scanned.
#[test]
fn locate_returns_cancelled_once_the_flag_is_already_set() {
    let source_colors: Vec<[u8; 3]> = (0..200u64).map(color_for).collect();
    let source_frames: Vec<Vec<u8>> = source_colors.iter().map(|&c| solid_rgb_frame(c)).collect();
    let histograms =
        FrameHistogramTable::new(source_frames.iter().map(|f| histogram(f)).collect());
    // Two shots, so there is a second segment that a real (uncancelled) scan
    // would have reached.
    let shot_boundaries = ShotBoundaryList::new(vec![0, 100]);

    let source_rgb_path = fixture_path("cancel_source");
    write_rgb_file(&source_rgb_path, &source_frames);

    let clip_colors = &source_colors[150..160];
    let clip_frames: Vec<Vec<u8>> = clip_colors.iter().map(|&c| solid_rgb_frame(c)).collect();
    let clip_rgb_path = fixture_path("cancel_clip");
    write_rgb_file(&clip_rgb_path, &clip_frames);

    let key_histograms: Vec<Histogram> = clip_frames.iter().map(|f| histogram(f)).collect();
    let key_indices: Vec<u64> = (0..clip_colors.len() as u64).collect();
    let key_frames = ClipKeyFrames::from_histograms(key_indices, key_histograms);

    let config = FineLocatorConfig {
        frame_threshold: 0.95,
        rgb_dimensions: FIXTURE_DIMS,
    };

    let result = clip_locator_core::locate_candidate(
        &VideoId::new("V1"),
        &shot_boundaries,
        &histograms,
        &source_rgb_path,
        &key_frames,
        &clip_rgb_path,
        true,
        &config,
        &AtomicBool::new(true),
    )
    .expect("locate should not error");

    assert_eq!(result, LocateOutcome::Cancelled);

    let _ = fs::remove_file(&source_rgb_path);
    let _ = fs::remove_file(&clip_rgb_path);
}

/// S6: Coarse Ranker given `clip_hashes=[h]` and `corpus={A:[h], B:[h XOR 1]}`
/// returns `[(A,0),(B,1)]`.
#[test]
fn s6_coarse_ranker_orders_by_distance_then_video_id() {
    use std::collections::HashMap;

    let h = SegmentHash::from_bits(0xABCD_1234_0000_0001);
    let clip_hashes = SegmentHashList::new(vec![h]);

    let mut corpus = HashMap::new();
    corpus.insert(
        VideoId::new("A"),
        SegmentHashList::new(vec![SegmentHash::from_bits(h.bits())]),
    );
    corpus.insert(
        VideoId::new("B"),
        SegmentHashList::new(vec![SegmentHash::from_bits(h.bits() ^ 1)]),
    );

    let ranked = rank(&clip_hashes, &corpus);

    assert_eq!(
        ranked,
        vec![
            RankedCandidate {
                video_id: VideoId::new("A"),
                min_distance: 0
            },
            RankedCandidate {
                video_id: VideoId::new("B"),
                min_distance: 1
            },
        ]
    );
}
