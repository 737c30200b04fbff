use crate::core::probability::{CloudProbability, SceneStatistics};
use crate::core::statistics::{masked_values, percentile};
use crate::types::{CloudMaskError, CloudMaskResult, MaskImage, Real, RealImage};
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Parameters of the dynamic thresholds and the final combination rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    /// Percentile of clear-sky land cloud probability (eq. 17)
    pub land_percentile: f64,
    /// Offset added to the land probability percentile (eq. 17)
    pub land_offset: Real,
    /// Upper bound on the land threshold, if any
    pub max_land_threshold: Option<Real>,
    /// Fixed cloud probability cutoff over water
    pub water_threshold: Real,
    /// Land cloud probability marking cloud without the PCP test.
    /// `None` disables the high-confidence term.
    pub high_confidence_land: Option<Real>,
    /// Pixels this much colder than the low clear-sky land temperature are cloud
    pub cold_cloud_offset: Real,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            land_percentile: 82.5,
            land_offset: 0.2,
            max_land_threshold: None,
            water_threshold: 0.5,
            high_confidence_land: Some(0.99),
            cold_cloud_offset: 35.0,
        }
    }
}

impl ThresholdParams {
    pub fn validate(&self) -> CloudMaskResult<()> {
        if !(0.0..=100.0).contains(&self.land_percentile) {
            return Err(CloudMaskError::InvalidParameter(format!(
                "land_percentile must be within [0, 100], got {}",
                self.land_percentile
            )));
        }
        if self.water_threshold.is_nan() || self.land_offset.is_nan() || self.cold_cloud_offset.is_nan() {
            return Err(CloudMaskError::InvalidParameter(
                "threshold parameters must not be NaN".to_string(),
            ));
        }
        Ok(())
    }
}

/// Thresholds derived for one scene
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicThresholds {
    /// Land cloud probability cutoff; `None` when clear-sky land is empty,
    /// in which case PCP alone decides over land
    pub land: Option<Real>,
    pub water: Real,
    /// Brightness temperature below which a pixel is cloud regardless of PCP
    pub cold_cloud_temperature: Option<Real>,
}

/// Final combination rule (eq. 18) for one pixel
pub fn potential_cloud(
    pcp: bool,
    is_water: bool,
    water_probability: Real,
    land_probability: Real,
    temperature: Real,
    thresholds: &DynamicThresholds,
    high_confidence_land: Option<Real>,
) -> bool {
    let over_water = pcp && is_water && water_probability > thresholds.water;
    let over_land = pcp
        && !is_water
        && thresholds.land.map_or(true, |threshold| land_probability > threshold);
    let confident_land = !is_water && high_confidence_land.map_or(false, |p| land_probability > p);
    let very_cold = thresholds.cold_cloud_temperature.map_or(false, |t| temperature < t);

    over_water || over_land || confident_land || very_cold
}

/// Scene-adaptive threshold derivation and final potential cloud rule
pub struct DynamicThresholdCombiner {
    params: ThresholdParams,
}

impl DynamicThresholdCombiner {
    pub fn new(params: ThresholdParams) -> Self {
        Self { params }
    }

    pub fn standard() -> Self {
        Self::new(ThresholdParams::default())
    }

    pub fn params(&self) -> &ThresholdParams {
        &self.params
    }

    /// Derive the scene thresholds from the land probability over clear-sky land
    pub fn derive_thresholds(
        &self,
        probability: &CloudProbability,
        clear_land: &MaskImage,
        stats: &SceneStatistics,
    ) -> DynamicThresholds {
        let land = percentile(&masked_values(&probability.land, clear_land), self.params.land_percentile)
            .map(|p| {
                let threshold = p + self.params.land_offset;
                self.params.max_land_threshold.map_or(threshold, |cap| threshold.min(cap))
            });
        if land.is_none() {
            log::warn!("No clear-sky land probability; PCP alone decides cloud over land");
        }

        let thresholds = DynamicThresholds {
            land,
            water: self.params.water_threshold,
            cold_cloud_temperature: stats
                .land_temperature
                .map(|range| range.low - self.params.cold_cloud_offset),
        };
        log::debug!("Dynamic thresholds: {:?}", thresholds);
        thresholds
    }

    /// Apply the combination rule. Invalid pixels are never cloud.
    pub fn combine(
        &self,
        pcp: &MaskImage,
        water: &MaskImage,
        valid: &MaskImage,
        temperature: &RealImage,
        probability: &CloudProbability,
        thresholds: &DynamicThresholds,
    ) -> MaskImage {
        let high_confidence = self.params.high_confidence_land;

        let candidate = zip_collect!(
            Zip::from(pcp)
                .and(water)
                .and(&probability.water)
                .and(&probability.land)
                .and(temperature),
            |&p, &w, &wp, &lp, &bt| potential_cloud(p, w, wp, lp, bt, thresholds, high_confidence)
        );

        zip_collect!(Zip::from(&candidate).and(valid), |&c, &ok| c && ok)
    }
}
