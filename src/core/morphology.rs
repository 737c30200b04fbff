use crate::types::{CloudMaskError, CloudMaskResult, MaskImage};
use ndarray::{ArrayView1, ArrayViewMut1, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Optional morphological cleanup of the potential cloud layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupParams {
    /// Minimum filter window (rows, cols); removes isolated cloud pixels
    pub minimum_filter: Option<(usize, usize)>,
    /// Maximum filter window (rows, cols); buffers cloud edges
    pub maximum_filter: Option<(usize, usize)>,
}

impl CleanupParams {
    /// Windows used by the rio-cloudmask command line tool
    pub fn outlier_removal_and_buffering() -> Self {
        Self {
            minimum_filter: Some((3, 3)),
            maximum_filter: Some((21, 21)),
        }
    }

    pub fn validate(&self) -> CloudMaskResult<()> {
        for (name, window) in [("minimum_filter", self.minimum_filter), ("maximum_filter", self.maximum_filter)] {
            if let Some((rows, cols)) = window {
                if rows == 0 || cols == 0 {
                    return Err(CloudMaskError::InvalidParameter(format!(
                        "{} window must be non-empty, got {}x{}",
                        name, rows, cols
                    )));
                }
            }
        }
        Ok(())
    }

    /// Apply the configured filters, minimum first. Pixels outside `valid`
    /// are never set in the result.
    pub fn apply(&self, mask: &MaskImage, valid: &MaskImage) -> MaskImage {
        let mut cleaned = mask.clone();
        if let Some(size) = self.minimum_filter {
            log::debug!("Removing outliers with {}x{} minimum filter", size.0, size.1);
            cleaned = minimum_filter(&cleaned, size);
        }
        if let Some(size) = self.maximum_filter {
            log::debug!("Buffering edges with {}x{} maximum filter", size.0, size.1);
            cleaned = maximum_filter(&cleaned, size);
        }
        cleaned.zip_mut_with(valid, |c, &ok| *c = *c && ok);
        cleaned
    }
}

/// A pixel stays set only if every pixel in its window is set.
///
/// Windows are clipped at the image border. For even sizes the window
/// extends one pixel further before the centre than after it.
pub fn minimum_filter(mask: &MaskImage, size: (usize, usize)) -> MaskImage {
    let rows = filter_lanes(mask, Axis(0), size.0, true);
    filter_lanes(&rows, Axis(1), size.1, true)
}

/// A pixel is set if any pixel in its window is set
pub fn maximum_filter(mask: &MaskImage, size: (usize, usize)) -> MaskImage {
    let rows = filter_lanes(mask, Axis(0), size.0, false);
    filter_lanes(&rows, Axis(1), size.1, false)
}

/// One-dimensional all/any window pass along `axis`
fn filter_lanes(mask: &MaskImage, axis: Axis, size: usize, require_all: bool) -> MaskImage {
    let before = size / 2;
    let after = size.saturating_sub(1 + before);
    let mut out = MaskImage::from_elem(mask.dim(), false);

    #[cfg(feature = "parallel")]
    Zip::from(out.lanes_mut(axis))
        .and(mask.lanes(axis))
        .par_for_each(|out_lane, in_lane| filter_lane(out_lane, in_lane, before, after, require_all));
    #[cfg(not(feature = "parallel"))]
    Zip::from(out.lanes_mut(axis))
        .and(mask.lanes(axis))
        .for_each(|out_lane, in_lane| filter_lane(out_lane, in_lane, before, after, require_all));

    out
}

fn filter_lane(
    mut out_lane: ArrayViewMut1<'_, bool>,
    in_lane: ArrayView1<'_, bool>,
    before: usize,
    after: usize,
    require_all: bool,
) {
    let n = in_lane.len();
    let mut prefix = vec![0usize; n + 1];
    for (i, &set) in in_lane.iter().enumerate() {
        prefix[i + 1] = prefix[i] + usize::from(set);
    }

    for i in 0..n {
        let start = i.saturating_sub(before);
        let end = (i + after + 1).min(n);
        let count = prefix[end] - prefix[start];
        out_lane[i] = if require_all { count == end - start } else { count > 0 };
    }
}
