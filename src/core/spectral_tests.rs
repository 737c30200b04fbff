use crate::core::indices::{band_ratio, SpectralIndices};
use crate::core::statistics::count_true;
use crate::types::{BandBundle, CloudMaskError, CloudMaskResult, MaskImage, Real};
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Thresholds of the basic spectral tests and the water test.
///
/// Defaults are the published Fmask values (Zhu & Woodcock 2012, 2015).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralTestParams {
    /// Basic test: NDVI must be below this
    pub basic_ndvi_max: Real,
    /// Basic test: NDSI must be below this
    pub basic_ndsi_max: Real,
    /// Basic test: SWIR2 reflectance must exceed this
    pub basic_swir2_min: Real,
    /// Basic test: brightness temperature must be below this (degrees Celsius)
    pub basic_temperature_max_celsius: Real,
    /// Whiteness must be below this
    pub whiteness_max: Real,
    /// HOT must exceed this
    pub hot_min: Real,
    /// NIR/SWIR1 ratio must exceed this
    pub nir_swir1_ratio_min: Real,
    /// Cirrus reflectance above this is a potential cloud pixel on its own
    pub cirrus_min: Real,
    /// Water test, first clause: NDVI below this ...
    pub water_ndvi_max: Real,
    /// ... and NIR below this
    pub water_nir_max: Real,
    /// Water test, second clause: NDVI below this ...
    pub water_ndvi_max_dark: Real,
    /// ... and NIR below this
    pub water_nir_max_dark: Real,
}

impl Default for SpectralTestParams {
    fn default() -> Self {
        Self {
            basic_ndvi_max: 0.8,
            basic_ndsi_max: 0.8,
            basic_swir2_min: 0.03,
            basic_temperature_max_celsius: 27.0,
            whiteness_max: 0.7,
            hot_min: 0.0,
            nir_swir1_ratio_min: 0.75,  // Irish (2000)
            cirrus_min: 0.01,           // Wilson & Oreopoulos (2013)
            water_ndvi_max: 0.01,
            water_nir_max: 0.11,
            water_ndvi_max_dark: 0.1,
            water_nir_max_dark: 0.05,
        }
    }
}

impl SpectralTestParams {
    pub fn validate(&self) -> CloudMaskResult<()> {
        let thresholds = [
            ("basic_ndvi_max", self.basic_ndvi_max),
            ("basic_ndsi_max", self.basic_ndsi_max),
            ("basic_swir2_min", self.basic_swir2_min),
            ("basic_temperature_max_celsius", self.basic_temperature_max_celsius),
            ("whiteness_max", self.whiteness_max),
            ("hot_min", self.hot_min),
            ("nir_swir1_ratio_min", self.nir_swir1_ratio_min),
            ("cirrus_min", self.cirrus_min),
            ("water_ndvi_max", self.water_ndvi_max),
            ("water_nir_max", self.water_nir_max),
            ("water_ndvi_max_dark", self.water_ndvi_max_dark),
            ("water_nir_max_dark", self.water_nir_max_dark),
        ];
        match thresholds.iter().find(|(_, value)| value.is_nan()) {
            Some((name, _)) => Err(CloudMaskError::InvalidParameter(format!("{} must not be NaN", name))),
            None => Ok(()),
        }
    }
}

/// Basic cloud test (eq. 1): cold, bright in SWIR2, neither vegetation nor snow.
///
/// `temperature_max` must already be in the unit of `temperature`.
pub fn basic_test(
    ndvi: Real,
    ndsi: Real,
    swir2: Real,
    temperature: Real,
    temperature_max: Real,
    params: &SpectralTestParams,
) -> bool {
    swir2 > params.basic_swir2_min
        && temperature < temperature_max
        && ndsi < params.basic_ndsi_max
        && ndvi < params.basic_ndvi_max
}

/// Whiteness test (eq. 2)
pub fn whiteness_test(whiteness: Real, params: &SpectralTestParams) -> bool {
    whiteness < params.whiteness_max
}

/// HOT test (eq. 3)
pub fn hot_test(hot: Real, params: &SpectralTestParams) -> bool {
    hot > params.hot_min
}

/// NIR/SWIR1 test (eq. 4), excludes bright rock and desert
pub fn nir_swir_test(nir: Real, swir1: Real, params: &SpectralTestParams) -> bool {
    band_ratio(nir, swir1) > params.nir_swir1_ratio_min
}

/// Cirrus test (Zhu & Woodcock 2015)
pub fn cirrus_test(cirrus: Real, params: &SpectralTestParams) -> bool {
    cirrus > params.cirrus_min
}

/// Water test (eq. 5)
pub fn water_test(ndvi: Real, nir: Real, params: &SpectralTestParams) -> bool {
    (ndvi < params.water_ndvi_max && nir < params.water_nir_max)
        || (ndvi < params.water_ndvi_max_dark && nir < params.water_nir_max_dark)
}

/// Potential cloud pixel rule (eq. 6)
pub fn potential_cloud_pixel(basic: bool, white: bool, hot: bool, nir_swir: bool, cirrus: bool) -> bool {
    (basic && white && hot && nir_swir) || cirrus
}

/// Individual and combined test masks. Every mask is false on invalid pixels.
#[derive(Debug, Clone)]
pub struct SpectralTestMasks {
    pub basic: MaskImage,
    pub whiteness: MaskImage,
    pub hot: MaskImage,
    pub nir_swir: MaskImage,
    pub cirrus: MaskImage,
    /// Potential cloud pixels
    pub pcp: MaskImage,
    pub water: MaskImage,
}

/// Evaluator for the first-pass spectral tests
pub struct BasicTestEvaluator {
    params: SpectralTestParams,
}

impl BasicTestEvaluator {
    pub fn new(params: SpectralTestParams) -> Self {
        Self { params }
    }

    pub fn standard() -> Self {
        Self::new(SpectralTestParams::default())
    }

    pub fn params(&self) -> &SpectralTestParams {
        &self.params
    }

    /// Run every test and combine them into the potential cloud pixel mask
    pub fn evaluate(
        &self,
        bands: &BandBundle,
        indices: &SpectralIndices,
        valid: &MaskImage,
    ) -> SpectralTestMasks {
        let params = &self.params;
        let temperature_max = bands
            .temperature_unit()
            .convert_celsius(params.basic_temperature_max_celsius);

        log::debug!(
            "Basic test thresholds: NDVI < {}, NDSI < {}, SWIR2 > {}, BT < {} ({:?})",
            params.basic_ndvi_max,
            params.basic_ndsi_max,
            params.basic_swir2_min,
            temperature_max,
            bands.temperature_unit()
        );

        let basic = zip_collect!(
            Zip::from(&indices.ndvi)
                .and(&indices.ndsi)
                .and(bands.swir2())
                .and(bands.thermal())
                .and(valid),
            |&ndvi, &ndsi, &swir2, &bt, &ok| {
                ok && basic_test(ndvi, ndsi, swir2, bt, temperature_max, params)
            }
        );

        let whiteness = zip_collect!(
            Zip::from(&indices.whiteness).and(valid),
            |&w, &ok| ok && whiteness_test(w, params)
        );

        let hot = zip_collect!(
            Zip::from(&indices.hot).and(valid),
            |&h, &ok| ok && hot_test(h, params)
        );

        let nir_swir = zip_collect!(
            Zip::from(bands.nir()).and(bands.swir1()).and(valid),
            |&nir, &swir1, &ok| ok && nir_swir_test(nir, swir1, params)
        );

        let cirrus = zip_collect!(
            Zip::from(bands.cirrus()).and(valid),
            |&c, &ok| ok && cirrus_test(c, params)
        );

        let pcp = zip_collect!(
            Zip::from(&basic).and(&whiteness).and(&hot).and(&nir_swir).and(&cirrus),
            |&b, &w, &h, &ns, &c| potential_cloud_pixel(b, w, h, ns, c)
        );

        let water = zip_collect!(
            Zip::from(&indices.ndvi).and(bands.nir()).and(valid),
            |&ndvi, &nir, &ok| ok && water_test(ndvi, nir, params)
        );

        log::debug!(
            "Spectral tests: {} basic, {} cirrus, {} PCP, {} water pixels",
            count_true(&basic),
            count_true(&cirrus),
            count_true(&pcp),
            count_true(&water)
        );

        SpectralTestMasks { basic, whiteness, hot, nir_swir, cirrus, pcp, water }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literature_defaults() {
        let p = SpectralTestParams::default();
        assert_eq!(p.basic_ndvi_max, 0.8);
        assert_eq!(p.basic_ndsi_max, 0.8);
        assert_eq!(p.basic_swir2_min, 0.03);
        assert_eq!(p.basic_temperature_max_celsius, 27.0);
        assert_eq!(p.whiteness_max, 0.7);
        assert_eq!(p.hot_min, 0.0);
        assert_eq!(p.nir_swir1_ratio_min, 0.75);
        assert_eq!(p.cirrus_min, 0.01);
        assert_eq!(p.water_ndvi_max, 0.01);
        assert_eq!(p.water_nir_max, 0.11);
        assert_eq!(p.water_ndvi_max_dark, 0.1);
        assert_eq!(p.water_nir_max_dark, 0.05);
        assert!(p.validate().is_ok());

        let p = SpectralTestParams { cirrus_min: f32::NAN, ..Default::default() };
        assert!(matches!(p.validate(), Err(CloudMaskError::InvalidParameter(_))));
    }

    #[test]
    fn test_basic_test() {
        let p = SpectralTestParams::default();
        // Cold, bright, non-vegetated
        assert!(basic_test(0.1, 0.1, 0.2, -10.0, 27.0, &p));
        // Too warm
        assert!(!basic_test(0.1, 0.1, 0.2, 30.0, 27.0, &p));
        // Dense vegetation
        assert!(!basic_test(0.85, 0.1, 0.2, -10.0, 27.0, &p));
        // Snow
        assert!(!basic_test(0.1, 0.9, 0.2, -10.0, 27.0, &p));
        // Dark in SWIR2
        assert!(!basic_test(0.1, 0.1, 0.02, -10.0, 27.0, &p));
        // Invalid
        assert!(!basic_test(f32::NAN, 0.1, 0.2, -10.0, 27.0, &p));
    }

    #[test]
    fn test_whiteness_hot_and_ratio() {
        let p = SpectralTestParams::default();
        assert!(whiteness_test(0.2, &p));
        assert!(!whiteness_test(0.7, &p));
        assert!(!whiteness_test(f32::NAN, &p));

        assert!(hot_test(0.01, &p));
        assert!(!hot_test(0.0, &p));

        assert!(nir_swir_test(0.4, 0.3, &p));
        assert!(!nir_swir_test(0.2, 0.3, &p));
        assert!(nir_swir_test(0.2, 0.0, &p));
        assert!(!nir_swir_test(0.0, 0.0, &p));
    }

    #[test]
    fn test_water() {
        let p = SpectralTestParams::default();
        assert!(water_test(-0.3, 0.05, &p));
        assert!(water_test(0.05, 0.04, &p));
        assert!(!water_test(0.05, 0.08, &p));
        assert!(!water_test(0.5, 0.02, &p));
        assert!(!water_test(f32::NAN, 0.02, &p));
    }

    #[test]
    fn test_cirrus_is_independent_of_the_and_chain() {
        assert!(potential_cloud_pixel(false, false, false, false, true));
        assert!(potential_cloud_pixel(true, true, true, true, false));
        assert!(!potential_cloud_pixel(true, true, true, false, false));
        assert!(!potential_cloud_pixel(false, true, true, true, false));
    }
}
