use crate::types::{BandBundle, CloudMaskError, CloudMaskResult, MaskImage, Real, RealImage};
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Parameters of the derived spectral indices
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexParams {
    /// Red weight in the haze optimized transform
    pub hot_red_coefficient: Real,
    /// Offset subtracted in the haze optimized transform (TOA reflectance)
    pub hot_offset: Real,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            hot_red_coefficient: 0.5,  // Zhang et al. (2002)
            hot_offset: 0.08,          // Zhu & Woodcock (2012), eq. 3
        }
    }
}

impl IndexParams {
    pub fn validate(&self) -> CloudMaskResult<()> {
        if !self.hot_red_coefficient.is_finite() || !self.hot_offset.is_finite() {
            return Err(CloudMaskError::InvalidParameter(format!(
                "HOT coefficients must be finite, got {} and {}",
                self.hot_red_coefficient, self.hot_offset
            )));
        }
        Ok(())
    }
}

/// Normalized difference `(a - b) / (a + b)`, bounded to [-1, 1].
///
/// Non-finite inputs give NaN. A zero denominator saturates to the sign of
/// `a - b` instead of dividing.
pub fn normalized_difference(a: Real, b: Real) -> Real {
    if !a.is_finite() || !b.is_finite() {
        return Real::NAN;
    }

    let diff = a - b;
    let sum = a + b;
    if sum == 0.0 {
        return if diff > 0.0 {
            1.0
        } else if diff < 0.0 {
            -1.0
        } else {
            0.0
        };
    }

    (diff / sum).clamp(-1.0, 1.0)
}

/// Spectral flatness of the visible bands (Zhu & Woodcock 2012, eq. 2).
///
/// Sum of absolute deviations from the visible mean, normalized by the mean.
/// Clouds are flat ("white") and score near zero.
pub fn whiteness(blue: Real, green: Real, red: Real) -> Real {
    let mean = (blue + green + red) / 3.0;
    if mean == 0.0 {
        return if blue == green && green == red { 0.0 } else { Real::INFINITY };
    }

    ((blue - mean).abs() + (green - mean).abs() + (red - mean).abs()) / mean.abs()
}

/// Haze optimized transform
pub fn haze_optimized_transform(blue: Real, red: Real, params: &IndexParams) -> Real {
    blue - params.hot_red_coefficient * red - params.hot_offset
}

/// Ratio of two bands where a zero denominator yields a signed infinity
/// (zero when the numerator is also zero).
pub fn band_ratio(numerator: Real, denominator: Real) -> Real {
    if denominator == 0.0 {
        if numerator > 0.0 {
            Real::INFINITY
        } else if numerator < 0.0 {
            Real::NEG_INFINITY
        } else {
            0.0
        }
    } else {
        numerator / denominator
    }
}

/// Derived index layers for one scene
#[derive(Debug, Clone)]
pub struct SpectralIndices {
    /// Normalized difference vegetation index, (NIR - Red) / (NIR + Red)
    pub ndvi: RealImage,
    /// Normalized difference snow index, (Green - SWIR1) / (Green + SWIR1)
    pub ndsi: RealImage,
    /// Visible-band whiteness
    pub whiteness: RealImage,
    /// Haze optimized transform
    pub hot: RealImage,
}

/// Spectral index calculator
pub struct IndexCalculator {
    params: IndexParams,
}

impl IndexCalculator {
    pub fn new(params: IndexParams) -> Self {
        Self { params }
    }

    pub fn standard() -> Self {
        Self::new(IndexParams::default())
    }

    /// Compute every index layer. Pixels outside `valid` are NaN in all outputs.
    pub fn compute(&self, bands: &BandBundle, valid: &MaskImage) -> SpectralIndices {
        log::debug!("Computing spectral indices for {:?} scene", bands.dim());
        let params = &self.params;

        let ndvi = zip_collect!(
            Zip::from(bands.nir()).and(bands.red()).and(valid),
            |&nir, &red, &ok| if ok { normalized_difference(nir, red) } else { Real::NAN }
        );

        let ndsi = zip_collect!(
            Zip::from(bands.green()).and(bands.swir1()).and(valid),
            |&green, &swir1, &ok| if ok { normalized_difference(green, swir1) } else { Real::NAN }
        );

        let whiteness = zip_collect!(
            Zip::from(bands.blue()).and(bands.green()).and(bands.red()).and(valid),
            |&b, &g, &r, &ok| if ok { whiteness(b, g, r) } else { Real::NAN }
        );

        let hot = zip_collect!(
            Zip::from(bands.blue()).and(bands.red()).and(valid),
            |&b, &r, &ok| if ok { haze_optimized_transform(b, r, params) } else { Real::NAN }
        );

        SpectralIndices { ndvi, ndsi, whiteness, hot }
    }
}
