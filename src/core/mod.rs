//! Core cloud masking stages

pub mod indices;
pub mod spectral_tests;
pub mod probability;
pub mod threshold;
pub mod statistics;
pub mod morphology;
pub mod cloud_mask;

// Re-export main types
pub use indices::{IndexCalculator, IndexParams, SpectralIndices};
pub use spectral_tests::{BasicTestEvaluator, SpectralTestMasks, SpectralTestParams};
pub use probability::{CloudProbability, CloudProbabilityModel, ProbabilityParams, SceneStatistics};
pub use threshold::{DynamicThresholdCombiner, DynamicThresholds, ThresholdParams};
pub use statistics::{percentile, MaskSummary};
pub use morphology::{maximum_filter, minimum_filter, CleanupParams};
pub use cloud_mask::{cloudmask, CloudMaskConfig, CloudMaskOutput, CloudMaskProcessor};
