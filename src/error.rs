//! Errors raised by the radiometric conversion.
//!
//! Each kind aborts the conversion of the whole image; a
//! partial raster is never returned.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// A Planck or atmospheric constant could not be
    /// resolved, or resolved to a non-finite value.
    #[error("missing calibration constant `{tag}`")]
    MissingCalibration { tag: &'static str },

    /// An environment value is outside its physical domain,
    /// or was neither supplied nor found in the metadata.
    #[error("invalid environment parameter `{parameter}`: {reason}")]
    InvalidEnvironmentParameter {
        parameter: &'static str,
        reason: String,
    },

    /// Emissivity or transmission is (numerically) zero, or
    /// the calibration curve is undefined at an ambient
    /// temperature.
    #[error("degenerate calibration: `{parameter}` = {value} leaves the correction undefined")]
    DegenerateCalibration { parameter: &'static str, value: f64 },

    /// The corrected radiance of a pixel cannot be inverted
    /// through the Planck curve.
    #[error(
        "corrected radiance {radiance} at pixel (row {row}, col {col}) is outside the domain of the Planck curve"
    )]
    RadianceOutOfDomain {
        row: usize,
        col: usize,
        radiance: f64,
    },
}

pub type Result<T> = std::result::Result<T, ConversionError>;

impl ConversionError {
    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        ConversionError::InvalidEnvironmentParameter {
            parameter,
            reason: reason.into(),
        }
    }
}
