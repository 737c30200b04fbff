use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Real-valued reflectance, index or temperature sample
pub type Real = f32;

/// 2D raster of real values (rows x cols)
pub type RealImage = Array2<Real>;

/// 2D boolean raster (rows x cols)
pub type MaskImage = Array2<bool>;

/// Spectral bands consumed by the cloud masking core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    Blue,
    Green,
    Red,
    Nir,
    Swir1,
    Swir2,
    Cirrus,
    /// Thermal brightness temperature
    Thermal,
}

impl Band {
    /// Every required band, in the order used by [`BandBundle::from_arrays`]
    pub const ALL: [Band; 8] = [
        Band::Blue,
        Band::Green,
        Band::Red,
        Band::Nir,
        Band::Swir1,
        Band::Swir2,
        Band::Cirrus,
        Band::Thermal,
    ];

    /// Landsat 8 OLI/TIRS band number
    pub fn landsat8_number(self) -> u8 {
        match self {
            Band::Blue => 2,
            Band::Green => 3,
            Band::Red => 4,
            Band::Nir => 5,
            Band::Swir1 => 6,
            Band::Swir2 => 7,
            Band::Cirrus => 9,
            Band::Thermal => 10,
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Band::Blue => "blue",
            Band::Green => "green",
            Band::Red => "red",
            Band::Nir => "nir",
            Band::Swir1 => "swir1",
            Band::Swir2 => "swir2",
            Band::Cirrus => "cirrus",
            Band::Thermal => "thermal",
        };
        write!(f, "{} (B{})", name, self.landsat8_number())
    }
}

/// Unit of the thermal band brightness temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Kelvin,
}

impl TemperatureUnit {
    const KELVIN_OFFSET: Real = 273.15;

    /// Express a Celsius temperature in this unit.
    ///
    /// Only absolute temperatures need converting; differences are the same
    /// in both units.
    pub fn convert_celsius(self, celsius: Real) -> Real {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Kelvin => celsius + Self::KELVIN_OFFSET,
        }
    }
}

/// Co-registered TOA reflectance and brightness temperature bands of one scene
#[derive(Debug, Clone)]
pub struct BandBundle {
    blue: RealImage,
    green: RealImage,
    red: RealImage,
    nir: RealImage,
    swir1: RealImage,
    swir2: RealImage,
    cirrus: RealImage,
    thermal: RealImage,
    temperature_unit: TemperatureUnit,
    nodata: Option<Real>,
    thermal_nodata: Option<Real>,
}

impl BandBundle {
    /// Build a bundle from named bands.
    ///
    /// Fails if any required band is missing, if any band differs in shape
    /// from the others, or if the grid is empty.
    pub fn new(
        mut bands: HashMap<Band, RealImage>,
        temperature_unit: TemperatureUnit,
    ) -> CloudMaskResult<Self> {
        let mut take = |band: Band| bands.remove(&band).ok_or(CloudMaskError::MissingBand(band));

        let bundle = Self {
            blue: take(Band::Blue)?,
            green: take(Band::Green)?,
            red: take(Band::Red)?,
            nir: take(Band::Nir)?,
            swir1: take(Band::Swir1)?,
            swir2: take(Band::Swir2)?,
            cirrus: take(Band::Cirrus)?,
            thermal: take(Band::Thermal)?,
            temperature_unit,
            nodata: None,
            thermal_nodata: None,
        };

        bundle.validate_shapes()?;
        Ok(bundle)
    }

    /// Build a bundle from arrays ordered as [`Band::ALL`]
    pub fn from_arrays(
        arrays: [RealImage; 8],
        temperature_unit: TemperatureUnit,
    ) -> CloudMaskResult<Self> {
        let bands = Band::ALL.into_iter().zip(arrays).collect();
        Self::new(bands, temperature_unit)
    }

    /// Mark pixels equal to `value` in any band as invalid
    pub fn with_nodata(mut self, value: Real) -> Self {
        self.nodata = Some(value);
        self
    }

    /// Mark pixels where the thermal band equals `value` as invalid.
    /// Landsat brightness temperature products fill missing thermal data with 0.
    pub fn with_thermal_nodata(mut self, value: Real) -> Self {
        self.thermal_nodata = Some(value);
        self
    }

    fn validate_shapes(&self) -> CloudMaskResult<()> {
        let expected = self.blue.dim();
        if expected.0 == 0 || expected.1 == 0 {
            return Err(CloudMaskError::EmptyScene(expected));
        }

        for band in Band::ALL {
            let found = self.band(band).dim();
            if found != expected {
                return Err(CloudMaskError::ShapeMismatch { band, expected, found });
            }
        }
        Ok(())
    }

    pub fn band(&self, band: Band) -> &RealImage {
        match band {
            Band::Blue => &self.blue,
            Band::Green => &self.green,
            Band::Red => &self.red,
            Band::Nir => &self.nir,
            Band::Swir1 => &self.swir1,
            Band::Swir2 => &self.swir2,
            Band::Cirrus => &self.cirrus,
            Band::Thermal => &self.thermal,
        }
    }

    pub fn blue(&self) -> &RealImage {
        &self.blue
    }

    pub fn green(&self) -> &RealImage {
        &self.green
    }

    pub fn red(&self) -> &RealImage {
        &self.red
    }

    pub fn nir(&self) -> &RealImage {
        &self.nir
    }

    pub fn swir1(&self) -> &RealImage {
        &self.swir1
    }

    pub fn swir2(&self) -> &RealImage {
        &self.swir2
    }

    pub fn cirrus(&self) -> &RealImage {
        &self.cirrus
    }

    pub fn thermal(&self) -> &RealImage {
        &self.thermal
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        self.temperature_unit
    }

    pub fn nodata(&self) -> Option<Real> {
        self.nodata
    }

    pub fn thermal_nodata(&self) -> Option<Real> {
        self.thermal_nodata
    }

    /// Scene dimensions (rows, cols)
    pub fn dim(&self) -> (usize, usize) {
        self.blue.dim()
    }

    /// Per-pixel validity: true when every band holds a finite, non-nodata value
    pub fn validity_mask(&self) -> MaskImage {
        let nodata = self.nodata;
        let thermal_nodata = self.thermal_nodata;
        let usable = move |value: Real| value.is_finite() && Some(value) != nodata;

        let visible_nir = zip_collect!(
            Zip::from(&self.blue)
                .and(&self.green)
                .and(&self.red)
                .and(&self.nir),
            |&b, &g, &r, &n| usable(b) && usable(g) && usable(r) && usable(n)
        );

        zip_collect!(
            Zip::from(&visible_nir)
                .and(&self.swir1)
                .and(&self.swir2)
                .and(&self.cirrus)
                .and(&self.thermal),
            |&ok, &s1, &s2, &c, &t| {
                ok && usable(s1) && usable(s2) && usable(c) && usable(t) && Some(t) != thermal_nodata
            }
        )
    }
}

/// Error types for cloud masking
#[derive(Debug, thiserror::Error)]
pub enum CloudMaskError {
    #[error("Missing required band: {0}")]
    MissingBand(Band),

    #[error("Shape mismatch: band {band} is {found:?}, expected {expected:?}")]
    ShapeMismatch {
        band: Band,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Empty scene: grid has shape {0:?}")]
    EmptyScene((usize, usize)),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for cloud masking operations
pub type CloudMaskResult<T> = Result<T, CloudMaskError>;
