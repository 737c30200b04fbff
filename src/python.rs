//! Python bindings for the cloud masking pipeline

use crate::core::{CleanupParams, CloudMaskConfig, CloudMaskProcessor};
use crate::types::{BandBundle, RealImage, TemperatureUnit};
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::prelude::*;

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(cloudmask, m)?)?;
    Ok(())
}

/// Potential cloud mask of a Landsat 8 scene.
///
/// Takes TOA reflectance for blue, green, red, nir, swir1, swir2 and cirrus
/// and brightness temperature for tirs1 (Celsius unless `kelvin` is set).
/// Returns a uint8 array: 255 for clear pixels, 0 for cloud and nodata.
///
/// `min_filter` (default 3x3) removes isolated cloud pixels and `max_filter`
/// (default 21x21) buffers cloud edges; pass `None` to skip either. Thermal pixels equal to `tirs_nodata`
/// (0 in Landsat products) are nodata, as are pixels equal to `nodata` in
/// any band.
#[pyfunction]
#[pyo3(signature = (
    blue, green, red, nir, swir1, swir2, cirrus, tirs1,
    min_filter = CleanupParams::outlier_removal_and_buffering().minimum_filter,
    max_filter = CleanupParams::outlier_removal_and_buffering().maximum_filter,
    nodata = None,
    tirs_nodata = Some(0.0),
    kelvin = false
))]
#[allow(clippy::too_many_arguments)]
fn cloudmask<'py>(
    py: Python<'py>,
    blue: PyReadonlyArray2<'py, f32>,
    green: PyReadonlyArray2<'py, f32>,
    red: PyReadonlyArray2<'py, f32>,
    nir: PyReadonlyArray2<'py, f32>,
    swir1: PyReadonlyArray2<'py, f32>,
    swir2: PyReadonlyArray2<'py, f32>,
    cirrus: PyReadonlyArray2<'py, f32>,
    tirs1: PyReadonlyArray2<'py, f32>,
    min_filter: Option<(usize, usize)>,
    max_filter: Option<(usize, usize)>,
    nodata: Option<f32>,
    tirs_nodata: Option<f32>,
    kelvin: bool,
) -> PyResult<&'py PyArray2<u8>> {
    let owned = |array: PyReadonlyArray2<'py, f32>| -> RealImage { array.as_array().to_owned() };
    let arrays = [
        owned(blue),
        owned(green),
        owned(red),
        owned(nir),
        owned(swir1),
        owned(swir2),
        owned(cirrus),
        owned(tirs1),
    ];

    let unit = if kelvin { TemperatureUnit::Kelvin } else { TemperatureUnit::Celsius };
    let mut bands = BandBundle::from_arrays(arrays, unit)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)))?;
    if let Some(value) = nodata {
        bands = bands.with_nodata(value);
    }
    if let Some(value) = tirs_nodata {
        bands = bands.with_thermal_nodata(value);
    }

    let config = CloudMaskConfig {
        cleanup: CleanupParams { minimum_filter: min_filter, maximum_filter: max_filter },
        ..Default::default()
    };
    let processor = CloudMaskProcessor::new(config);
    let output = py
        .allow_threads(|| processor.process(&bands))
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", e)))?;

    Ok(output.to_gdal_mask().into_pyarray(py))
}
