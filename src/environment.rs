//! Scene parameters: emissivity, distance, ambient
//! conditions.

use crate::{
    calibration::CELSIUS_OFFSET,
    error::{ConversionError, Result},
    metadata::{CameraMetadata, MetadataTag, TagValue},
};

/// Emissivity or transmission at or below this magnitude is
/// treated as zero.
pub const DEGENERACY_THRESHOLD: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentParameters {
    /// Object emissivity, in (0, 1].
    pub emissivity: f64,
    /// Object distance in meters.
    pub distance: f64,
    /// Atmospheric temperature in celsius.
    pub ambient_temperature: f64,
    /// Reflected apparent temperature in celsius.
    pub reflected_temperature: f64,
    /// Relative humidity in percent.
    pub relative_humidity: f64,
}

/// Caller-supplied values that take precedence over the
/// image metadata. Fields left `None` are read from the
/// metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvironmentOverrides {
    pub emissivity: Option<f64>,
    pub distance: Option<f64>,
    pub ambient_temperature: Option<f64>,
    pub reflected_temperature: Option<f64>,
    pub relative_humidity: Option<f64>,
}

impl EnvironmentOverrides {
    /// Merge with metadata fallbacks and validate.
    pub fn resolve(&self, meta: &CameraMetadata) -> Result<EnvironmentParameters> {
        let pick = |value: Option<f64>, tag: MetadataTag| match (value, meta.value(tag)) {
            (Some(val), _) | (None, Some(&TagValue::Number(val))) => Ok(val),
            (None, Some(TagValue::Unparseable(text))) => Err(ConversionError::invalid(
                tag.name(),
                format!("not supplied and metadata value `{}` is not a number", text),
            )),
            (None, None) => Err(ConversionError::invalid(
                tag.name(),
                "not supplied and absent from metadata",
            )),
        };

        let env = EnvironmentParameters {
            emissivity: pick(self.emissivity, MetadataTag::Emissivity)?,
            distance: pick(self.distance, MetadataTag::ObjectDistance)?,
            ambient_temperature: pick(
                self.ambient_temperature,
                MetadataTag::AtmosphericTemperature,
            )?,
            reflected_temperature: pick(
                self.reflected_temperature,
                MetadataTag::ReflectedApparentTemperature,
            )?,
            relative_humidity: pick(self.relative_humidity, MetadataTag::RelativeHumidity)?,
        };
        env.validate()?;
        Ok(env)
    }
}

impl EnvironmentParameters {
    pub fn validate(&self) -> Result<()> {
        let e = self.emissivity;
        if e.is_finite() && e.abs() <= DEGENERACY_THRESHOLD {
            return Err(ConversionError::DegenerateCalibration {
                parameter: MetadataTag::Emissivity.name(),
                value: e,
            });
        }
        if !(e > 0. && e <= 1.) {
            return Err(ConversionError::invalid(
                MetadataTag::Emissivity.name(),
                format!("{} is outside (0, 1]", e),
            ));
        }

        validate_distance(self.distance)?;
        validate_humidity(self.relative_humidity)?;

        for &(tag, t) in &[
            (MetadataTag::AtmosphericTemperature, self.ambient_temperature),
            (
                MetadataTag::ReflectedApparentTemperature,
                self.reflected_temperature,
            ),
        ] {
            if !(t.is_finite() && t > -CELSIUS_OFFSET) {
                return Err(ConversionError::invalid(
                    tag.name(),
                    format!("{} C is below absolute zero or not a number", t),
                ));
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_distance(distance: f64) -> Result<()> {
    if distance.is_finite() && distance >= 0. {
        Ok(())
    } else {
        Err(ConversionError::invalid(
            MetadataTag::ObjectDistance.name(),
            format!("{} m is negative or not a number", distance),
        ))
    }
}

pub(crate) fn validate_humidity(rh: f64) -> Result<()> {
    if (0. ..=100.).contains(&rh) {
        Ok(())
    } else {
        Err(ConversionError::invalid(
            MetadataTag::RelativeHumidity.name(),
            format!("{} % is outside [0, 100]", rh),
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::calibration::tests::reference_metadata;

    pub(crate) fn reference_environment() -> EnvironmentParameters {
        EnvironmentParameters {
            emissivity: 0.97,
            distance: 100.,
            ambient_temperature: 15.,
            reflected_temperature: 15.,
            relative_humidity: 75.,
        }
    }

    #[test]
    fn falls_back_to_metadata() {
        let env = EnvironmentOverrides::default()
            .resolve(&reference_metadata())
            .unwrap();
        assert_eq!(
            env,
            EnvironmentParameters {
                emissivity: 0.95,
                distance: 1.0,
                ambient_temperature: 20.0,
                reflected_temperature: 20.0,
                relative_humidity: 50.0,
            }
        );
    }

    #[test]
    fn overrides_take_precedence() {
        let overrides = EnvironmentOverrides {
            emissivity: Some(0.97),
            distance: Some(100.),
            ambient_temperature: Some(15.),
            reflected_temperature: Some(15.),
            relative_humidity: Some(75.),
        };
        let env = overrides.resolve(&CameraMetadata::default()).unwrap();
        assert_eq!(env, reference_environment());
    }

    #[test]
    fn absent_value_is_an_error() {
        let overrides = EnvironmentOverrides {
            emissivity: Some(0.97),
            ..Default::default()
        };
        let err = overrides.resolve(&CameraMetadata::default()).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::InvalidEnvironmentParameter {
                parameter: "ObjectDistance",
                ..
            }
        ));
    }

    fn metadata_with_unparseable_humidity() -> CameraMetadata {
        serde_json::from_str(
            r#"{
                "Emissivity": 0.95,
                "ObjectDistance": "1.00 m",
                "ReflectedApparentTemperature": "20.0 C",
                "AtmosphericTemperature": "20.0 C",
                "RelativeHumidity": "n/a"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn override_replaces_unparseable_metadata() {
        let overrides = EnvironmentOverrides {
            relative_humidity: Some(40.),
            ..Default::default()
        };
        let env = overrides
            .resolve(&metadata_with_unparseable_humidity())
            .unwrap();
        assert_eq!(env.relative_humidity, 40.);
        assert_eq!(env.emissivity, 0.95);
    }

    #[test]
    fn unparseable_metadata_without_override_is_named() {
        let err = EnvironmentOverrides::default()
            .resolve(&metadata_with_unparseable_humidity())
            .unwrap_err();
        match err {
            ConversionError::InvalidEnvironmentParameter { parameter, reason } => {
                assert_eq!(parameter, "RelativeHumidity");
                assert!(reason.contains("n/a"), "{}", reason);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut env = reference_environment();
        env.relative_humidity = 150.;
        assert!(matches!(
            env.validate(),
            Err(ConversionError::InvalidEnvironmentParameter {
                parameter: "RelativeHumidity",
                ..
            })
        ));

        let mut env = reference_environment();
        env.distance = -1.;
        assert!(matches!(
            env.validate(),
            Err(ConversionError::InvalidEnvironmentParameter {
                parameter: "ObjectDistance",
                ..
            })
        ));

        let mut env = reference_environment();
        env.emissivity = 1.2;
        assert!(matches!(
            env.validate(),
            Err(ConversionError::InvalidEnvironmentParameter {
                parameter: "Emissivity",
                ..
            })
        ));

        let mut env = reference_environment();
        env.ambient_temperature = -300.;
        assert!(matches!(
            env.validate(),
            Err(ConversionError::InvalidEnvironmentParameter {
                parameter: "AtmosphericTemperature",
                ..
            })
        ));
    }

    #[test]
    fn zero_emissivity_is_degenerate() {
        let mut env = reference_environment();
        env.emissivity = 0.;
        assert_eq!(
            env.validate(),
            Err(ConversionError::DegenerateCalibration {
                parameter: "Emissivity",
                value: 0.
            })
        );
    }
}
