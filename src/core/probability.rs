use crate::core::indices::SpectralIndices;
use crate::core::spectral_tests::SpectralTestMasks;
use crate::core::statistics::{count_true, masked_values, percentile, percentiles};
use crate::types::{BandBundle, CloudMaskError, CloudMaskResult, MaskImage, Real, RealImage};
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Parameters of the water and land cloud probability models
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityParams {
    /// Clear-sky water must be darker than this in SWIR2 (eq. 7)
    pub clear_water_swir2_max: Real,
    /// Percentile of clear-sky water temperature used as the water baseline (eq. 8)
    pub water_temperature_percentile: f64,
    /// Temperature span mapping water coldness to probability (eq. 9)
    pub water_temperature_scale: Real,
    /// NIR reflectance of the brightest water (eq. 10)
    pub water_brightness_nir_max: Real,
    /// Low percentile of clear-sky land temperature (eq. 13)
    pub land_temperature_low_percentile: f64,
    /// High percentile of clear-sky land temperature (eq. 13)
    pub land_temperature_high_percentile: f64,
    /// Buffer widening the clear-sky land temperature range (eq. 14)
    pub land_temperature_buffer: Real,
    /// Cirrus reflectance mapping to a probability of one (Zhu & Woodcock 2015).
    /// `None` drops the cirrus term.
    pub cirrus_normalization: Option<Real>,
}

impl Default for ProbabilityParams {
    fn default() -> Self {
        Self {
            clear_water_swir2_max: 0.03,
            water_temperature_percentile: 82.5,
            water_temperature_scale: 4.0,
            water_brightness_nir_max: 0.11,
            land_temperature_low_percentile: 17.5,
            land_temperature_high_percentile: 82.5,
            land_temperature_buffer: 4.0,
            cirrus_normalization: Some(0.04),
        }
    }
}

impl ProbabilityParams {
    pub fn validate(&self) -> CloudMaskResult<()> {
        for (name, q) in [
            ("water_temperature_percentile", self.water_temperature_percentile),
            ("land_temperature_low_percentile", self.land_temperature_low_percentile),
            ("land_temperature_high_percentile", self.land_temperature_high_percentile),
        ] {
            if !(0.0..=100.0).contains(&q) {
                return Err(CloudMaskError::InvalidParameter(format!(
                    "{} must be within [0, 100], got {}",
                    name, q
                )));
            }
        }

        if self.land_temperature_low_percentile > self.land_temperature_high_percentile {
            return Err(CloudMaskError::InvalidParameter(format!(
                "land temperature percentiles are inverted: {} > {}",
                self.land_temperature_low_percentile, self.land_temperature_high_percentile
            )));
        }

        let scales = [
            ("water_temperature_scale", Some(self.water_temperature_scale)),
            ("water_brightness_nir_max", Some(self.water_brightness_nir_max)),
            ("land_temperature_buffer", Some(self.land_temperature_buffer)),
            ("cirrus_normalization", self.cirrus_normalization),
        ];
        for (name, value) in scales {
            if let Some(value) = value {
                if value.is_nan() || value <= 0.0 {
                    return Err(CloudMaskError::InvalidParameter(format!(
                        "{} must be positive, got {}",
                        name, value
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Clear-sky land temperature range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureRange {
    pub low: Real,
    pub high: Real,
}

/// Scene-wide statistics of the clear-sky population.
///
/// A statistic is `None` when its population is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneStatistics {
    /// Baseline temperature of clear-sky water
    pub water_temperature: Option<Real>,
    /// Temperature range of clear-sky land
    pub land_temperature: Option<TemperatureRange>,
    pub clear_water_pixels: usize,
    pub clear_land_pixels: usize,
}

/// Clear-sky water: water, not PCP, dark in SWIR2
pub fn clear_sky_water(tests: &SpectralTestMasks, swir2: &RealImage, swir2_max: Real) -> MaskImage {
    zip_collect!(
        Zip::from(&tests.water).and(&tests.pcp).and(swir2),
        |&water, &pcp, &s2| water && !pcp && s2 < swir2_max
    )
}

/// Clear-sky land: valid, neither PCP nor water
pub fn clear_sky_land(tests: &SpectralTestMasks, valid: &MaskImage) -> MaskImage {
    zip_collect!(
        Zip::from(valid).and(&tests.pcp).and(&tests.water),
        |&ok, &pcp, &water| ok && !pcp && !water
    )
}

/// Water temperature probability (eq. 9)
pub fn water_temperature_probability(water_temperature: Real, temperature: Real, scale: Real) -> Real {
    ((water_temperature - temperature) / scale).clamp(0.0, 1.0)
}

/// Brightness probability over water (eq. 10)
pub fn brightness_probability(nir: Real, nir_max: Real) -> Real {
    (nir.min(nir_max) / nir_max).clamp(0.0, 1.0)
}

/// Land temperature probability (eq. 14)
pub fn land_temperature_probability(temperature: Real, range: TemperatureRange, buffer: Real) -> Real {
    let warm = range.high + buffer;
    let cold = range.low - buffer;
    ((warm - temperature) / (warm - cold)).clamp(0.0, 1.0)
}

/// Spectral variability probability (eq. 15)
pub fn variability_probability(ndvi: Real, ndsi: Real, whiteness: Real) -> Real {
    let extremity = ndvi.abs().max(ndsi.abs()).max(whiteness);
    (1.0 - extremity).clamp(0.0, 1.0)
}

/// Cirrus contribution to the cloud probability
pub fn cirrus_probability(cirrus: Real, normalization: Option<Real>) -> Real {
    normalization.map_or(0.0, |n| cirrus / n)
}

/// Cloud probability per surface type. Each layer is NaN off its surface.
#[derive(Debug, Clone)]
pub struct CloudProbability {
    /// Cloud probability over water (eq. 11)
    pub water: RealImage,
    /// Cloud probability over land (eq. 16)
    pub land: RealImage,
}

impl CloudProbability {
    /// Single layer taking the water probability on water pixels and the land
    /// probability elsewhere
    pub fn merged(&self, water: &MaskImage) -> RealImage {
        zip_collect!(
            Zip::from(&self.water).and(&self.land).and(water),
            |&w, &l, &is_water| if is_water { w } else { l }
        )
    }

    /// Probability that a pixel is clear, the complement of [`merged`](Self::merged)
    pub fn clear_sky(&self, water: &MaskImage) -> RealImage {
        self.merged(water).mapv(|p| 1.0 - p)
    }
}

/// Scene-adaptive cloud probability model for water and land
pub struct CloudProbabilityModel {
    params: ProbabilityParams,
}

impl CloudProbabilityModel {
    pub fn new(params: ProbabilityParams) -> Self {
        Self { params }
    }

    pub fn standard() -> Self {
        Self::new(ProbabilityParams::default())
    }

    pub fn params(&self) -> &ProbabilityParams {
        &self.params
    }

    /// Temperature statistics of the clear-sky water and land populations
    pub fn estimate_statistics(
        &self,
        bands: &BandBundle,
        tests: &SpectralTestMasks,
        valid: &MaskImage,
    ) -> SceneStatistics {
        let clear_water = clear_sky_water(tests, bands.swir2(), self.params.clear_water_swir2_max);
        let clear_land = clear_sky_land(tests, valid);

        let water_temps = masked_values(bands.thermal(), &clear_water);
        let water_temperature = percentile(&water_temps, self.params.water_temperature_percentile);
        if water_temperature.is_none() && count_true(&tests.water) > 0 {
            log::warn!("No clear-sky water pixels; water temperature probability contributes zero");
        }

        let land_temps = masked_values(bands.thermal(), &clear_land);
        let land_temperature = percentiles(
            &land_temps,
            &[
                self.params.land_temperature_low_percentile,
                self.params.land_temperature_high_percentile,
            ],
        )
        .map(|p| TemperatureRange { low: p[0], high: p[1] });
        if land_temperature.is_none() {
            log::warn!("No clear-sky land pixels; land temperature probability contributes zero");
        }

        let stats = SceneStatistics {
            water_temperature,
            land_temperature,
            clear_water_pixels: water_temps.len(),
            clear_land_pixels: land_temps.len(),
        };
        log::debug!("Clear-sky statistics: {:?}", stats);
        stats
    }

    /// Cloud probability over water and land for the given scene statistics
    pub fn compute(
        &self,
        bands: &BandBundle,
        indices: &SpectralIndices,
        tests: &SpectralTestMasks,
        valid: &MaskImage,
        stats: &SceneStatistics,
    ) -> CloudProbability {
        let params = &self.params;

        let water = zip_collect!(
            Zip::from(bands.thermal())
                .and(bands.nir())
                .and(bands.cirrus())
                .and(&tests.water),
            |&bt, &nir, &cirrus, &is_water| {
                if !is_water {
                    return Real::NAN;
                }
                let temperature = stats.water_temperature.map_or(0.0, |tw| {
                    water_temperature_probability(tw, bt, params.water_temperature_scale)
                });
                let brightness = brightness_probability(nir, params.water_brightness_nir_max);
                (temperature * brightness + cirrus_probability(cirrus, params.cirrus_normalization))
                    .clamp(0.0, 1.0)
            }
        );

        let variability = zip_collect!(
            Zip::from(&indices.ndvi).and(&indices.ndsi).and(&indices.whiteness),
            |&ndvi, &ndsi, &w| variability_probability(ndvi, ndsi, w)
        );

        let land = zip_collect!(
            Zip::from(bands.thermal())
                .and(&variability)
                .and(bands.cirrus())
                .and(valid)
                .and(&tests.water),
            |&bt, &var, &cirrus, &ok, &is_water| {
                if !ok || is_water {
                    return Real::NAN;
                }
                let temperature = stats.land_temperature.map_or(0.0, |range| {
                    land_temperature_probability(bt, range, params.land_temperature_buffer)
                });
                (temperature * var + cirrus_probability(cirrus, params.cirrus_normalization))
                    .clamp(0.0, 1.0)
            }
        );

        CloudProbability { water, land }
    }
}
