//! Synthetic Landsat 8 scenes shared by the integration tests

#![allow(dead_code)]

use cloudmask::{BandBundle, RealImage, TemperatureUnit};
use ndarray::Array2;

/// Band values in `Band::ALL` order: blue, green, red, nir, swir1, swir2,
/// cirrus, thermal (Celsius)
pub type Pixel = [f32; 8];

/// Warm, densely vegetated land
pub const VEGETATION: Pixel = [0.04, 0.07, 0.05, 0.35, 0.2, 0.1, 0.001, 30.0];

/// Cold, bright, spectrally flat cloud top
pub const COLD_CLOUD: Pixel = [0.5, 0.5, 0.5, 0.5, 0.4, 0.3, 0.001, -20.0];

/// Clear open water
pub const WATER: Pixel = [0.06, 0.05, 0.04, 0.02, 0.01, 0.005, 0.001, 15.0];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Uniform scene of one surface type
pub fn uniform_arrays(shape: (usize, usize), pixel: Pixel) -> [RealImage; 8] {
    pixel.map(|value| Array2::from_elem(shape, value))
}

/// Overwrite a rectangular block of every band with `pixel`
pub fn paint(arrays: &mut [RealImage; 8], rows: std::ops::Range<usize>, cols: std::ops::Range<usize>, pixel: Pixel) {
    for (array, value) in arrays.iter_mut().zip(pixel) {
        for i in rows.clone() {
            for j in cols.clone() {
                array[[i, j]] = value;
            }
        }
    }
}

pub fn bundle(arrays: [RealImage; 8]) -> BandBundle {
    BandBundle::from_arrays(arrays, TemperatureUnit::Celsius).expect("Failed to build band bundle")
}

/// 10x10 vegetated scene with a 4x4 cold cloud block at rows/cols 3..7
pub fn cold_patch_arrays() -> [RealImage; 8] {
    let mut arrays = uniform_arrays((10, 10), VEGETATION);
    paint(&mut arrays, 3..7, 3..7, COLD_CLOUD);
    arrays
}

pub fn in_patch(i: usize, j: usize) -> bool {
    (3..7).contains(&i) && (3..7).contains(&j)
}

pub fn count(mask: &Array2<bool>) -> usize {
    mask.iter().filter(|&&m| m).count()
}
