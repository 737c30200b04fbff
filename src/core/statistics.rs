use crate::types::{MaskImage, Real, RealImage};
use ndarray::Zip;
use num_traits::Float;
use std::cmp::Ordering;

/// Percentile `q` (0..=100) of `values`, interpolating linearly between the
/// two closest ranks. Non-finite values are ignored; returns `None` when no
/// finite value remains.
pub fn percentile<T: Float + Send>(values: &[T], q: f64) -> Option<T> {
    percentile_of_sorted(&sorted_finite(values), q)
}

/// Several percentiles of the same population, sorting it once
pub fn percentiles<T: Float + Send>(values: &[T], qs: &[f64]) -> Option<Vec<T>> {
    let sorted = sorted_finite(values);
    qs.iter().map(|&q| percentile_of_sorted(&sorted, q)).collect()
}

fn sorted_finite<T: Float + Send>(values: &[T]) -> Vec<T> {
    let mut sorted: Vec<T> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let compare = |a: &T, b: &T| a.partial_cmp(b).unwrap_or(Ordering::Equal);

    #[cfg(feature = "parallel")]
    {
        use rayon::slice::ParallelSliceMut;
        sorted.par_sort_unstable_by(compare);
    }
    #[cfg(not(feature = "parallel"))]
    sorted.sort_unstable_by(compare);

    sorted
}

fn percentile_of_sorted<T: Float>(sorted: &[T], q: f64) -> Option<T> {
    if sorted.is_empty() {
        return None;
    }

    let rank = q.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction: T = num_traits::cast(rank - lower as f64)?;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Values of `image` where `mask` is set
pub fn masked_values(image: &RealImage, mask: &MaskImage) -> Vec<Real> {
    let mut values = Vec::new();
    Zip::from(image).and(mask).for_each(|&value, &selected| {
        if selected {
            values.push(value);
        }
    });
    values
}

/// Number of set pixels in a mask
pub fn count_true(mask: &MaskImage) -> usize {
    mask.iter().filter(|&&m| m).count()
}

/// Pixel counts of one cloud masking run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaskSummary {
    pub total_pixels: usize,
    pub valid_pixels: usize,
    pub pcp_pixels: usize,
    pub water_pixels: usize,
    pub cloud_pixels: usize,
    /// Cloud pixels as a percentage of valid pixels
    pub cloud_percentage: f64,
}

impl MaskSummary {
    pub fn compute(valid: &MaskImage, pcp: &MaskImage, water: &MaskImage, cloud: &MaskImage) -> Self {
        let valid_pixels = count_true(valid);
        let cloud_pixels = count_true(cloud);

        Self {
            total_pixels: valid.len(),
            valid_pixels,
            pcp_pixels: count_true(pcp),
            water_pixels: count_true(water),
            cloud_pixels,
            cloud_percentage: if valid_pixels > 0 {
                100.0 * cloud_pixels as f64 / valid_pixels as f64
            } else {
                0.0
            },
        }
    }
}
