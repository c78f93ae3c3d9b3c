use image::{GrayImage, Luma};
use rustdct::DctPlanner;

use crate::model::SegmentHash;

/// Side of the square luminance image the temporal-mean frame is downscaled to
/// before the DCT is taken.
pub const DCT_SIZE: u32 = 32;
/// Side of the low-frequency block kept from the top-left of the DCT output.
pub const HASH_BLOCK_SIZE: usize = 8;

/// Configuration for windowing frames into segments before hashing.
#[derive(Clone, Copy, Debug)]
pub struct SegmentHasherConfig {
    pub segment_length_seconds: f32,
    pub overlap_fraction: f32,
}

impl Default for SegmentHasherConfig {
    fn default() -> Self {
        Self {
            segment_length_seconds: 3.0,
            overlap_fraction: 0.30,
        }
    }
}

impl SegmentHasherConfig {
    #[must_use]
    pub fn segment_frames(&self, fps: f32) -> usize {
        (fps * self.segment_length_seconds).round().max(1.0) as usize
    }

    #[must_use]
    pub fn overlap_frames(&self, fps: f32) -> usize {
        (self.segment_frames(fps) as f32 * self.overlap_fraction).round() as usize
    }
}

/// Accumulates luminance frames into overlapping windows and emits one
/// [`SegmentHash`] per full window, plus a final hash over any remaining
/// frames at end-of-stream.
pub struct SegmentHasher {
    config: SegmentHasherConfig,
    segment_frames: usize,
    overlap_frames: usize,
    buffer: Vec<GrayImage>,
    frame_count: usize,
}

impl SegmentHasher {
    #[must_use]
    pub fn new(config: SegmentHasherConfig, fps: f32) -> Self {
        Self {
            segment_frames: config.segment_frames(fps),
            overlap_frames: config.overlap_frames(fps),
            config,
            buffer: Vec::new(),
            frame_count: 0,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SegmentHasherConfig {
        &self.config
    }

    /// Feed one luminance frame. Returns `Some(hash)` if this frame completed
    /// a window. A window completes every `segment_frames` frames, not
    /// counting frame 0 (so a stream whose length is an exact multiple of
    /// `segment_frames` never fires here and is instead emitted once by
    /// [`SegmentHasher::finish`]).
    pub fn push(&mut self, frame: &GrayImage) -> Option<SegmentHash> {
        self.buffer.push(frame.clone());

        let triggered = self.frame_count % self.segment_frames == 0 && self.frame_count != 0;
        self.frame_count += 1;

        if !triggered {
            return None;
        }

        let hash = hash_mean_frame(&self.buffer);

        let keep_from = self.buffer.len().saturating_sub(self.overlap_frames);
        self.buffer.drain(..keep_from);

        Some(hash)
    }

    /// Call after the last frame has been pushed. Emits one final hash over
    /// the remaining buffered frames, if any.
    pub fn finish(mut self) -> Option<SegmentHash> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(hash_mean_frame(&self.buffer))
        }
    }
}

fn hash_mean_frame(frames: &[GrayImage]) -> SegmentHash {
    let mean = mean_image(frames);
    let downscaled = image::imageops::resize(
        &mean,
        DCT_SIZE,
        DCT_SIZE,
        image::imageops::FilterType::Triangle,
    );
    phash(&downscaled)
}

fn mean_image(frames: &[GrayImage]) -> GrayImage {
    let (width, height) = frames[0].dimensions();
    let pixel_count = (width * height) as usize;
    let mut sums = vec![0u64; pixel_count];

    for frame in frames {
        for (i, px) in frame.pixels().enumerate() {
            sums[i] += u64::from(px.0[0]);
        }
    }

    let n = frames.len() as u64;
    let averaged: Vec<u8> = sums.into_iter().map(|s| (s / n) as u8).collect();

    GrayImage::from_fn(width, height, |x, y| {
        Luma([averaged[(y * width + x) as usize]])
    })
}

/// DCT of a `DCT_SIZE x DCT_SIZE` luminance image; keeps the top-left
/// `HASH_BLOCK_SIZE x HASH_BLOCK_SIZE` block excluding the DC term, thresholds
/// each coefficient against the block's median.
fn phash(image: &GrayImage) -> SegmentHash {
    let dimension = DCT_SIZE as usize;
    let mut samples: Vec<f64> = image.pixels().map(|p| f64::from(p.0[0])).collect();
    debug_assert_eq!(samples.len(), dimension * dimension);

    let mut planner = DctPlanner::new();
    let dct = planner.plan_dct2(dimension);

    samples.chunks_exact_mut(dimension).for_each(|row| {
        dct.process_dct2(row);
    });

    let mut scratch = vec![0f64; dimension];
    transpose::transpose_inplace(&mut samples, &mut scratch, dimension, dimension);

    samples.chunks_exact_mut(dimension).for_each(|col| {
        dct.process_dct2(col);
    });

    transpose::transpose_inplace(&mut samples, &mut scratch, dimension, dimension);

    let mut block = Vec::with_capacity(HASH_BLOCK_SIZE * HASH_BLOCK_SIZE - 1);
    for row in 0..HASH_BLOCK_SIZE {
        for col in 0..HASH_BLOCK_SIZE {
            if row == 0 && col == 0 {
                continue;
            }
            block.push(samples[row * dimension + col]);
        }
    }

    let median = median_of(&block);

    let mut bits: u64 = 0;
    for (i, &coeff) in block.iter().enumerate() {
        if coeff >= median {
            bits |= 1 << i;
        }
    }

    SegmentHash::from_bits(bits)
}

fn median_of(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("DCT coefficients are never NaN"));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
