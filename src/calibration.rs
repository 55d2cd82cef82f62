//! Factory calibration constants of a thermal camera.

use crate::{
    error::{ConversionError, Result},
    metadata::{CameraMetadata, MetadataTag},
};

pub const CELSIUS_OFFSET: f64 = 273.15;

/// Constants of the sensor response (Planck) curve.
///
/// `raw = R1 / (R2 * (exp(B / T) - F)) - O`, with `T` in
/// kelvin and `raw` in sensor units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanckConstants {
    pub b: f64,
    pub f: f64,
    pub o: f64,
    pub r1: f64,
    pub r2: f64,
}

/// Coefficients of the two-term atmospheric transmission
/// mixture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericConstants {
    pub alpha_1: f64,
    pub alpha_2: f64,
    pub beta_1: f64,
    pub beta_2: f64,
    pub x: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParameterSet {
    pub planck: PlanckConstants,
    pub atmosphere: AtmosphericConstants,
}

impl PlanckConstants {
    /// Sensor units emitted by a black body at `celsius`.
    #[inline]
    pub fn temp_to_raw(&self, celsius: f64) -> f64 {
        self.r1 / (self.r2 * ((self.b / (celsius + CELSIUS_OFFSET)).exp() - self.f)) - self.o
    }

    /// Argument of the logarithm in [`raw_to_temp`][Self::raw_to_temp].
    #[inline]
    pub fn log_argument(&self, raw: f64) -> f64 {
        self.r1 / (self.r2 * (raw + self.o)) + self.f
    }

    /// Inverse of [`temp_to_raw`][Self::temp_to_raw]. Not
    /// checked; see [`PlanckInverter`][crate::planck::PlanckInverter].
    #[inline]
    pub fn raw_to_temp(&self, raw: f64) -> f64 {
        self.b / self.log_argument(raw).ln() - CELSIUS_OFFSET
    }
}

impl CalibrationParameterSet {
    /// Read all ten constants from metadata.
    pub fn from_metadata(meta: &CameraMetadata) -> Result<Self> {
        let get = |tag: MetadataTag| {
            meta.get(tag)
                .ok_or(ConversionError::MissingCalibration { tag: tag.name() })
        };

        let params = CalibrationParameterSet {
            planck: PlanckConstants {
                b: get(MetadataTag::PlanckB)?,
                f: get(MetadataTag::PlanckF)?,
                o: get(MetadataTag::PlanckO)?,
                r1: get(MetadataTag::PlanckR1)?,
                r2: get(MetadataTag::PlanckR2)?,
            },
            atmosphere: AtmosphericConstants {
                alpha_1: get(MetadataTag::AtmosphericTransAlpha1)?,
                alpha_2: get(MetadataTag::AtmosphericTransAlpha2)?,
                beta_1: get(MetadataTag::AtmosphericTransBeta1)?,
                beta_2: get(MetadataTag::AtmosphericTransBeta2)?,
                x: get(MetadataTag::AtmosphericTransX)?,
            },
        };
        params.validate()?;
        Ok(params)
    }

    /// Every constant must be finite.
    pub fn validate(&self) -> Result<()> {
        let PlanckConstants { b, f, o, r1, r2 } = self.planck;
        let AtmosphericConstants {
            alpha_1,
            alpha_2,
            beta_1,
            beta_2,
            x,
        } = self.atmosphere;

        let values = [
            (MetadataTag::PlanckB, b),
            (MetadataTag::PlanckF, f),
            (MetadataTag::PlanckO, o),
            (MetadataTag::PlanckR1, r1),
            (MetadataTag::PlanckR2, r2),
            (MetadataTag::AtmosphericTransAlpha1, alpha_1),
            (MetadataTag::AtmosphericTransAlpha2, alpha_2),
            (MetadataTag::AtmosphericTransBeta1, beta_1),
            (MetadataTag::AtmosphericTransBeta2, beta_2),
            (MetadataTag::AtmosphericTransX, x),
        ];
        match values.iter().find(|(_, v)| !v.is_finite()) {
            Some((tag, _)) => Err(ConversionError::MissingCalibration { tag: tag.name() }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn reference_calibration() -> CalibrationParameterSet {
        CalibrationParameterSet {
            planck: PlanckConstants {
                b: 1428.0,
                f: 1.0,
                o: -7340.0,
                r1: 14200.0,
                r2: 0.0293,
            },
            atmosphere: AtmosphericConstants {
                alpha_1: 0.0066,
                alpha_2: 0.0126,
                beta_1: -0.0023,
                beta_2: -0.0067,
                x: 1.9,
            },
        }
    }

    pub(crate) fn reference_metadata() -> CameraMetadata {
        CameraMetadata::default()
            .with(MetadataTag::PlanckB, 1428.0)
            .with(MetadataTag::PlanckF, 1.0)
            .with(MetadataTag::PlanckO, -7340.0)
            .with(MetadataTag::PlanckR1, 14200.0)
            .with(MetadataTag::PlanckR2, 0.0293)
            .with(MetadataTag::AtmosphericTransAlpha1, 0.0066)
            .with(MetadataTag::AtmosphericTransAlpha2, 0.0126)
            .with(MetadataTag::AtmosphericTransBeta1, -0.0023)
            .with(MetadataTag::AtmosphericTransBeta2, -0.0067)
            .with(MetadataTag::AtmosphericTransX, 1.9)
            .with(MetadataTag::Emissivity, 0.95)
            .with(MetadataTag::ObjectDistance, 1.0)
            .with(MetadataTag::AtmosphericTemperature, 20.0)
            .with(MetadataTag::ReflectedApparentTemperature, 20.0)
            .with(MetadataTag::RelativeHumidity, 50.0)
    }

    #[test]
    fn reads_constants_from_metadata() {
        let params = CalibrationParameterSet::from_metadata(&reference_metadata()).unwrap();
        assert_eq!(params, reference_calibration());
    }

    #[test]
    fn missing_constant_is_named() {
        let mut meta = CameraMetadata::default();
        for tag in MetadataTag::ALL.iter().copied() {
            if tag != MetadataTag::AtmosphericTransBeta2 {
                meta.set(tag, 1.0);
            }
        }
        assert_eq!(
            CalibrationParameterSet::from_metadata(&meta),
            Err(ConversionError::MissingCalibration {
                tag: "AtmosphericTransBeta2"
            })
        );
    }

    #[test]
    fn non_finite_constant_is_missing() {
        let mut params = reference_calibration();
        params.planck.r2 = f64::NAN;
        assert_eq!(
            params.validate(),
            Err(ConversionError::MissingCalibration { tag: "PlanckR2" })
        );
    }

    #[test]
    fn planck_round_trip() {
        let planck = reference_calibration().planck;
        for &t in &[-20.0, 0.0, 15.0, 36.6, 105.0] {
            let back = planck.raw_to_temp(planck.temp_to_raw(t));
            assert!((back - t).abs() < 1e-9, "{} != {}", back, t);
        }
    }
}
