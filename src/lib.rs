//! Convert radiometric R-JPEGs from FLIR cameras into
//! calibrated temperature maps.
//!
//! The crate provides two functionalities:
//!
//! 1. Compute [temperatures](crate::pipeline::convert) from raw
//! sensor values, the camera's factory calibration and the
//! scene parameters (emissivity, distance, ambient
//! conditions). The sensor response is inverted after
//! removing the radiance contributed by the atmosphere and
//! by reflections.
//!
//! 2. [Read](crate::image::ThermalImage) the raw sensor values and
//! the calibration from image metadata: natively from
//! R-JPEGs with FFF encoded FLIR data, or from the JSON
//! output of `exiftool -j -b`.
//!
//! # Usage
//!
//! ```rust
//! # fn test_compile() -> anyhow::Result<()> {
//! use radiometric::{EnvironmentOverrides, ThermalImage};
//!
//! let image = ThermalImage::try_from_rjpeg_path("image.jpg")?;
//! let temps = image.temperatures(&EnvironmentOverrides {
//!     emissivity: Some(0.97),
//!     distance: Some(100.),
//!     ..Default::default()
//! })?;
//! radiometric::output::write_temperature_tiff_path(&temps, "image.tif".as_ref())?;
//! # Ok(())
//! # }
//! ```
//!
//! Scene parameters left unset are read from the metadata.
//! The conversion fails as a whole (see [`ConversionError`])
//! if any parameter is missing or out of range, or if any
//! pixel cannot be inverted.

#[macro_use]
mod parse;
pub(crate) mod flir;

pub mod atmosphere;
pub mod calibration;
pub mod correction;
pub mod environment;
pub mod error;
pub mod image;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod planck;

#[cfg(feature = "cli")]
pub mod cli;

pub use crate::calibration::CalibrationParameterSet;
pub use crate::environment::{EnvironmentOverrides, EnvironmentParameters};
pub use crate::error::ConversionError;
pub use crate::image::{ThermalExiftoolJson, ThermalImage};
pub use crate::metadata::{CameraMetadata, MetadataTag, TagValue};
pub use crate::pipeline::{convert, RawThermalFrame, TemperatureRaster};
