//! cloudmask: Potential Cloud Masking for Multispectral Imagery
//!
//! This library classifies each pixel of a calibrated multispectral scene as
//! potential cloud or clear, following the spectral decision rules of Fmask
//! (Zhu & Woodcock 2012, 2015). Input bands must already be TOA reflectance
//! and brightness temperature; reading and writing rasters is left to the caller.
//!
//! The pipeline runs in four stages, each a pure function of the previous one:
//! spectral indices, basic spectral tests (potential cloud pixels), clear-sky
//! probability over water and land, and a scene-adaptive threshold combiner.

/// Collect a `Zip` into a new array, through rayon when the `parallel`
/// feature is enabled. The closure must be `Fn + Send + Sync`.
macro_rules! zip_collect {
    ($zip:expr, $f:expr) => {{
        #[cfg(feature = "parallel")]
        let collected = $zip.par_map_collect($f);
        #[cfg(not(feature = "parallel"))]
        let collected = $zip.map_collect($f);
        collected
    }};
}

pub mod types;
pub mod core;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    Band, BandBundle, CloudMaskError, CloudMaskResult, MaskImage, Real, RealImage,
    TemperatureUnit,
};

pub use crate::core::{
    cloudmask, CloudMaskConfig, CloudMaskOutput, CloudMaskProcessor, CloudProbability,
    DynamicThresholds, SceneStatistics, SpectralIndices, SpectralTestMasks,
};
