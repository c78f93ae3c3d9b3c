use crate::histogram::{histogram, similarity};
use crate::model::{FrameHistogramTable, Histogram, ShotBoundaryList};

/// Single-pass shot-boundary detector. Feed frames in order via [`push`];
/// call [`finish`] once the stream ends to get the boundary list and the
/// per-frame histogram table.
///
/// [`push`]: ShotSegmenter::push
/// [`finish`]: ShotSegmenter::finish
pub struct ShotSegmenter {
    prev_hist: Option<Histogram>,
    boundaries: Vec<u64>,
    histograms: Vec<Histogram>,
    next_index: u64,
}

impl Default for ShotSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl ShotSegmenter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            prev_hist: None,
            boundaries: Vec::new(),
            histograms: Vec::new(),
            next_index: 0,
        }
    }

    /// Feed one RGB24 frame's pixels.
    pub fn push(&mut self, pixels: &[u8]) {
        let hist = histogram(pixels);
        let index = self.next_index;
        self.next_index += 1;

        if let Some(prev) = &self.prev_hist {
            if similarity(prev, &hist) < Histogram::SHOT_SIMILARITY_THRESHOLD {
                self.boundaries.push(index);
            }
        }

        self.prev_hist = Some(hist.clone());
        self.histograms.push(hist);
    }

    /// Consume the segmenter and emit the boundary list (seeded with `[0]` if
    /// no discontinuity was found) and the per-frame histogram table.
    #[must_use]
    pub fn finish(self) -> (ShotBoundaryList, FrameHistogramTable) {
        let boundaries = if self.boundaries.is_empty() {
            vec![0]
        } else {
            self.boundaries
        };

        (
            ShotBoundaryList::new(boundaries),
            FrameHistogramTable::new(self.histograms),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn solid_rgb_frame(width: usize, height: usize, rgb: [u8; 3]) -> Vec<u8> {
        let mut pixels = Vec::with_capacity(width * height * 3);
        for _ in 0..(width * height) {
            pixels.extend_from_slice(&rgb);
        }
        pixels
    }

    #[test]
    fn two_constant_clips_produce_single_boundary() {
        // Two 50-frame constant-color clips back to back produce a boundary
        // list of exactly [50].
        let mut seg = ShotSegmenter::new();
        for _ in 0..50 {
            seg.push(&solid_rgb_frame(4, 4, [10, 10, 10]));
        }
        for _ in 0..50 {
            seg.push(&solid_rgb_frame(4, 4, [250, 10, 10]));
        }

        let (boundaries, histograms) = seg.finish();
        assert_eq!(boundaries.as_slice(), &[50]);
        assert_eq!(histograms.len(), 100);
    }

    #[test]
    fn no_discontinuity_seeds_zero() {
        let mut seg = ShotSegmenter::new();
        for _ in 0..20 {
            seg.push(&solid_rgb_frame(4, 4, [1, 2, 3]));
        }
        let (boundaries, _) = seg.finish();
        assert_eq!(boundaries.as_slice(), &[0]);
    }

    #[test]
    fn boundaries_are_strictly_increasing_and_in_range() {
        let mut seg = ShotSegmenter::new();
        let colors = [[0u8, 0, 0], [255, 0, 0], [0, 255, 0], [0, 0, 255]];
        for color in colors {
            for _ in 0..10 {
                seg.push(&solid_rgb_frame(4, 4, color));
            }
        }
        let (boundaries, histograms) = seg.finish();
        let mut prev = None;
        for &b in boundaries.as_slice() {
            if let Some(p) = prev {
                assert!(b > p);
            }
            assert!((b as usize) < histograms.len());
            prev = Some(b);
        }
    }
}
