use crate::core::indices::{IndexCalculator, IndexParams, SpectralIndices};
use crate::core::morphology::CleanupParams;
use crate::core::probability::{clear_sky_land, CloudProbability, CloudProbabilityModel, ProbabilityParams, SceneStatistics};
use crate::core::spectral_tests::{BasicTestEvaluator, SpectralTestMasks, SpectralTestParams};
use crate::core::statistics::MaskSummary;
use crate::core::threshold::{DynamicThresholdCombiner, DynamicThresholds, ThresholdParams};
use crate::types::{BandBundle, CloudMaskResult, MaskImage, RealImage};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Byte value of clear, valid pixels in the GDAL-style mask
pub const GDAL_MASK_CLEAR: u8 = 255;
/// Byte value of cloud and nodata pixels in the GDAL-style mask
pub const GDAL_MASK_MASKED: u8 = 0;

/// Complete cloud masking configuration.
///
/// Every section defaults to the published Fmask values, so a partial
/// override only touches the fields it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudMaskConfig {
    pub indices: IndexParams,
    pub spectral_tests: SpectralTestParams,
    pub probability: ProbabilityParams,
    pub thresholds: ThresholdParams,
    pub cleanup: CleanupParams,
}

impl CloudMaskConfig {
    pub fn validate(&self) -> CloudMaskResult<()> {
        self.indices.validate()?;
        self.spectral_tests.validate()?;
        self.probability.validate()?;
        self.thresholds.validate()?;
        self.cleanup.validate()?;
        Ok(())
    }
}

/// Everything produced by one run of the pipeline
#[derive(Debug, Clone)]
pub struct CloudMaskOutput {
    /// Final cloud mask, after the optional cleanup filters
    pub cloud_mask: MaskImage,
    /// Potential cloud layer before cleanup
    pub potential_cloud: MaskImage,
    /// Pixels where every band is usable
    pub valid_mask: MaskImage,
    pub indices: SpectralIndices,
    pub tests: SpectralTestMasks,
    pub probability: CloudProbability,
    pub statistics: SceneStatistics,
    pub thresholds: DynamicThresholds,
    pub summary: MaskSummary,
}

impl CloudMaskOutput {
    /// Byte mask for a raster alpha band: 255 on valid clear pixels,
    /// 0 on cloud and nodata
    pub fn to_gdal_mask(&self) -> Array2<u8> {
        zip_collect!(
            Zip::from(&self.cloud_mask).and(&self.valid_mask),
            |&cloud, &valid| if valid && !cloud { GDAL_MASK_CLEAR } else { GDAL_MASK_MASKED }
        )
    }

    /// Probability that each pixel is clear, taken per surface type
    pub fn clear_sky_probability(&self) -> RealImage {
        self.probability.clear_sky(&self.tests.water)
    }
}

/// Potential cloud mask processor running the four stages in order
pub struct CloudMaskProcessor {
    config: CloudMaskConfig,
}

impl CloudMaskProcessor {
    pub fn new(config: CloudMaskConfig) -> Self {
        Self { config }
    }

    /// Processor with the published default thresholds
    pub fn standard() -> Self {
        Self::new(CloudMaskConfig::default())
    }

    pub fn config(&self) -> &CloudMaskConfig {
        &self.config
    }

    /// Run the full pipeline on one scene.
    ///
    /// The configuration is validated before any band is touched; on error
    /// nothing is returned.
    pub fn process(&self, bands: &BandBundle) -> CloudMaskResult<CloudMaskOutput> {
        self.config.validate()?;

        let (rows, cols) = bands.dim();
        log::info!(
            "Starting cloud masking for {}x{} scene ({:?} brightness temperature)",
            rows,
            cols,
            bands.temperature_unit()
        );

        let valid_mask = bands.validity_mask();

        log::info!("Step 1: Spectral indices");
        let indices = IndexCalculator::new(self.config.indices.clone()).compute(bands, &valid_mask);

        log::info!("Step 2: Basic spectral tests");
        let tests = BasicTestEvaluator::new(self.config.spectral_tests.clone())
            .evaluate(bands, &indices, &valid_mask);

        log::info!("Step 3: Clear-sky probability");
        let model = CloudProbabilityModel::new(self.config.probability.clone());
        let statistics = model.estimate_statistics(bands, &tests, &valid_mask);
        let probability = model.compute(bands, &indices, &tests, &valid_mask, &statistics);

        log::info!("Step 4: Dynamic thresholds");
        let combiner = DynamicThresholdCombiner::new(self.config.thresholds.clone());
        let clear_land = clear_sky_land(&tests, &valid_mask);
        let thresholds = combiner.derive_thresholds(&probability, &clear_land, &statistics);
        let potential_cloud = combiner.combine(
            &tests.pcp,
            &tests.water,
            &valid_mask,
            bands.thermal(),
            &probability,
            &thresholds,
        );

        let cloud_mask = self.config.cleanup.apply(&potential_cloud, &valid_mask);

        let summary = MaskSummary::compute(&valid_mask, &tests.pcp, &tests.water, &cloud_mask);
        log::info!(
            "Cloud masking complete: {} of {} valid pixels cloud ({:.2}%), {} PCP, {} water",
            summary.cloud_pixels,
            summary.valid_pixels,
            summary.cloud_percentage,
            summary.pcp_pixels,
            summary.water_pixels
        );

        Ok(CloudMaskOutput {
            cloud_mask,
            potential_cloud,
            valid_mask,
            indices,
            tests,
            probability,
            statistics,
            thresholds,
            summary,
        })
    }
}

/// Potential cloud mask of a scene with the default configuration, as a
/// byte mask: [`GDAL_MASK_CLEAR`] on valid clear pixels, [`GDAL_MASK_MASKED`]
/// on cloud and invalid pixels.
///
/// Use [`CloudMaskProcessor::process`] to get the cloud and validity layers
/// separately.
pub fn cloudmask(bands: &BandBundle) -> CloudMaskResult<Array2<u8>> {
    CloudMaskProcessor::standard()
        .process(bands)
        .map(|output| output.to_gdal_mask())
}
