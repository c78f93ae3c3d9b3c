use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for a source video across index and query sessions.
/// Typically the source file's path without its extension.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Number of bins per channel in the color histogram (8 bins x 3 channels = 512 total).
pub const HISTOGRAM_BINS_PER_CHANNEL: usize = 8;
/// Total bin count of a [`Histogram`].
pub const HISTOGRAM_BINS: usize = HISTOGRAM_BINS_PER_CHANNEL.pow(3);

/// A 512-bin (8x8x8) RGB color histogram, L1-normalized so any two histograms
/// are comparable by correlation without rescaling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    bins: Vec<f32>,
}

impl Histogram {
    /// Two histograms are considered to belong to the same shot above this
    /// correlation threshold.
    pub const SHOT_SIMILARITY_THRESHOLD: f32 = 0.5;
    /// Two histograms are considered to describe matching frame content above
    /// this correlation threshold.
    pub const FRAME_MATCH_THRESHOLD: f32 = 0.95;

    /// Construct a histogram from pre-normalized bins. `bins.len()` must equal
    /// [`HISTOGRAM_BINS`].
    #[must_use]
    pub fn from_bins(bins: Vec<f32>) -> Self {
        debug_assert_eq!(bins.len(), HISTOGRAM_BINS);
        Self { bins }
    }

    #[must_use]
    pub fn bins(&self) -> &[f32] {
        &self.bins
    }
}

/// A 64-bit perceptual hash of the temporal mean image of a fixed-length
/// window of frames.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct SegmentHash(u64);

impl SegmentHash {
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Number of differing bits between this hash and `other`.
    #[must_use]
    pub fn hamming_distance(&self, other: &Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Debug for SegmentHashList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SegmentHashList").field(&self.0.len()).finish()
    }
}

/// Ordered sequence of [`SegmentHash`] for one source video; position in the
/// list corresponds to window position in time.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentHashList(Vec<SegmentHash>);

impl SegmentHashList {
    #[must_use]
    pub const fn new(hashes: Vec<SegmentHash>) -> Self {
        Self(hashes)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[SegmentHash] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Ordered, strictly increasing list of shot-boundary frame indices. Always
/// nonempty: seeded with `[0]` when no discontinuity is detected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShotBoundaryList(Vec<u64>);

impl ShotBoundaryList {
    #[must_use]
    pub const fn new(boundaries: Vec<u64>) -> Self {
        Self(boundaries)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }
}

/// Per-frame [`Histogram`] table for a source video, indexed by frame number.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameHistogramTable(Vec<Histogram>);

impl FrameHistogramTable {
    #[must_use]
    pub const fn new(histograms: Vec<Histogram>) -> Self {
        Self(histograms)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Histogram] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, frame_index: u64) -> Option<&Histogram> {
        usize::try_from(frame_index).ok().and_then(|i| self.0.get(i))
    }
}

/// The persisted unit per source video: everything the offline indexer derives
/// from a single pass over that video.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexRecord {
    pub segment_hashes: SegmentHashList,
    pub shot_boundaries: ShotBoundaryList,
    pub histograms: FrameHistogramTable,
}

/// Final output of the core: the source video and frame at which a clip was
/// found to begin, or nothing if no candidate passed the fine locator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub video_id: VideoId,
    pub start_frame: u64,
}
