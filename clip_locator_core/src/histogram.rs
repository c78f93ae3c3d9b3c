use rayon::prelude::*;

use crate::model::{Histogram, HISTOGRAM_BINS, HISTOGRAM_BINS_PER_CHANNEL};

/// Computes the 8x8x8 (512-bin) color histogram over an RGB24 pixel buffer and
/// normalizes it to sum to 1 (L1 normalization), so any two histograms are
/// comparable by correlation without rescaling.
#[must_use]
pub fn histogram(pixels: &[u8]) -> Histogram {
    debug_assert_eq!(pixels.len() % 3, 0);

    let counts = pixels
        .par_chunks_exact(3)
        .fold(
            || vec![0u32; HISTOGRAM_BINS],
            |mut bins, rgb| {
                bins[bin_index(rgb[0], rgb[1], rgb[2])] += 1;
                bins
            },
        )
        .reduce(
            || vec![0u32; HISTOGRAM_BINS],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b.iter()) {
                    *x += y;
                }
                a
            },
        );

    let pixel_count = (pixels.len() / 3) as f32;
    let bins = if pixel_count > 0.0 {
        counts.iter().map(|&c| c as f32 / pixel_count).collect()
    } else {
        vec![0.0; HISTOGRAM_BINS]
    };

    Histogram::from_bins(bins)
}

fn bin_index(r: u8, g: u8, b: u8) -> usize {
    let r = (r >> 5) as usize;
    let g = (g >> 5) as usize;
    let b = (b >> 5) as usize;
    (r * HISTOGRAM_BINS_PER_CHANNEL + g) * HISTOGRAM_BINS_PER_CHANNEL + b
}

/// Pearson-correlation-style comparison of two histograms, in `[-1, 1]`.
/// Mirrors OpenCV's `HISTCMP_CORREL`.
#[must_use]
pub fn similarity(h1: &Histogram, h2: &Histogram) -> f32 {
    let (b1, b2) = (h1.bins(), h2.bins());
    debug_assert_eq!(b1.len(), b2.len());

    let n = b1.len() as f64;
    let mean1 = b1.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let mean2 = b2.iter().map(|&v| f64::from(v)).sum::<f64>() / n;

    let mut numerator = 0.0f64;
    let mut denom1 = 0.0f64;
    let mut denom2 = 0.0f64;

    for (&v1, &v2) in b1.iter().zip(b2.iter()) {
        let d1 = f64::from(v1) - mean1;
        let d2 = f64::from(v2) - mean2;
        numerator += d1 * d2;
        denom1 += d1 * d1;
        denom2 += d2 * d2;
    }

    let denom = (denom1 * denom2).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        (numerator / denom) as f32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn histogram_bins_sum_to_one() {
        let pixels = [10u8, 200, 50, 0, 0, 0, 255, 255, 255];
        let h = histogram(&pixels);
        let sum: f32 = h.bins().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn identical_histograms_have_similarity_one() {
        let pixels = [10u8, 200, 50, 0, 0, 0, 255, 255, 255, 128, 64, 32];
        let h1 = histogram(&pixels);
        let h2 = histogram(&pixels);
        assert!((similarity(&h1, &h2) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn disjoint_histograms_have_low_similarity() {
        let black = vec![0u8; 300];
        let white = vec![255u8; 300];
        let h1 = histogram(&black);
        let h2 = histogram(&white);
        assert!(similarity(&h1, &h2) < Histogram::SHOT_SIMILARITY_THRESHOLD);
    }

    #[test]
    fn empty_pixel_buffer_yields_zeroed_histogram() {
        let h = histogram(&[]);
        assert!(h.bins().iter().all(|&v| v == 0.0));
    }
}
