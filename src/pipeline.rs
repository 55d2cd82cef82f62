//! Raw sensor frame to temperature raster.

use ndarray::{Array2, ArrayBase, Data, Ix2};
use tracing::debug;

use crate::{
    atmosphere::AtmosphericModel,
    calibration::CalibrationParameterSet,
    correction::RadianceCorrector,
    environment::EnvironmentParameters,
    error::Result,
    planck::PlanckInverter,
};

/// Raw sensor counts, indexed `(row, col)`.
pub type RawThermalFrame = Array2<u16>;

/// Temperatures in celsius, indexed `(row, col)`.
pub type TemperatureRaster = Array2<f32>;

/// Convert raw sensor counts to object temperatures.
///
/// The whole frame is converted or none of it: any invalid
/// parameter or out-of-domain pixel fails the call. The
/// result has the same dimensions as `frame`, and the
/// function holds no state, so equal inputs give equal
/// rasters.
pub fn convert<S>(
    frame: &ArrayBase<S, Ix2>,
    calibration: &CalibrationParameterSet,
    env: &EnvironmentParameters,
) -> Result<TemperatureRaster>
where
    S: Data<Elem = u16>,
{
    calibration.validate()?;
    env.validate()?;

    let model = AtmosphericModel::compute(
        env.distance,
        env.ambient_temperature,
        env.reflected_temperature,
        env.relative_humidity,
        env.emissivity,
        &calibration.planck,
        &calibration.atmosphere,
    )?;
    let corrector = RadianceCorrector::from_model(&model, env.emissivity)?;
    let inverter = PlanckInverter::new(calibration.planck);

    let (height, width) = frame.dim();
    debug!(width, height, "converting raw frame");

    let u_obj = corrector.correct(frame);
    let temps = inverter.invert(&u_obj)?;
    debug_assert_eq!(temps.dim(), frame.dim());
    Ok(temps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calibration::tests::reference_calibration,
        environment::tests::reference_environment, error::ConversionError,
    };

    const REFERENCE_TEMPERATURE: f32 = 105.411_63;

    #[test]
    fn reference_scene() {
        let frame = RawThermalFrame::from_elem((4, 5), 18000);
        let temps = convert(&frame, &reference_calibration(), &reference_environment()).unwrap();

        assert_eq!(temps.dim(), (4, 5));
        let first = temps[(0, 0)];
        assert!(temps.iter().all(|&t| t.to_bits() == first.to_bits()));
        assert!((first - REFERENCE_TEMPERATURE).abs() < 1e-3, "{}", first);
    }

    #[test]
    fn deterministic() {
        let frame = RawThermalFrame::from_shape_fn((48, 64), |(r, c)| 16000 + (r * 64 + c) as u16);
        let cal = reference_calibration();
        let env = reference_environment();
        let a = convert(&frame, &cal, &env).unwrap();
        let b = convert(&frame, &cal, &env).unwrap();
        assert!(a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits()));
    }

    #[test]
    fn warmer_pixels_stay_warmer() {
        let frame = ndarray::array![[17000u16, 18000, 19000]];
        let temps = convert(&frame, &reference_calibration(), &reference_environment()).unwrap();
        assert!(temps[(0, 0)] < temps[(0, 1)] && temps[(0, 1)] < temps[(0, 2)]);
    }

    #[test]
    fn rejects_humidity_out_of_range() {
        let frame = RawThermalFrame::from_elem((2, 2), 18000);
        let mut env = reference_environment();
        env.relative_humidity = 150.;
        assert!(matches!(
            convert(&frame, &reference_calibration(), &env),
            Err(ConversionError::InvalidEnvironmentParameter {
                parameter: "RelativeHumidity",
                ..
            })
        ));
    }

    #[test]
    fn rejects_zero_emissivity() {
        let frame = RawThermalFrame::from_elem((2, 2), 18000);
        let mut env = reference_environment();
        env.emissivity = 0.;
        assert!(matches!(
            convert(&frame, &reference_calibration(), &env),
            Err(ConversionError::DegenerateCalibration {
                parameter: "Emissivity",
                ..
            })
        ));
    }

    #[test]
    fn rejects_incomplete_calibration() {
        let frame = RawThermalFrame::from_elem((2, 2), 18000);
        let mut cal = reference_calibration();
        cal.atmosphere.x = f64::INFINITY;
        assert_eq!(
            convert(&frame, &cal, &reference_environment()),
            Err(ConversionError::MissingCalibration {
                tag: "AtmosphericTransX"
            })
        );
    }

    #[test]
    fn names_pixel_out_of_domain() {
        let mut frame = RawThermalFrame::from_elem((3, 4), 18000);
        frame[(2, 1)] = 0;
        match convert(&frame, &reference_calibration(), &reference_environment()) {
            Err(ConversionError::RadianceOutOfDomain { row, col, radiance }) => {
                assert_eq!((row, col), (2, 1));
                assert!(radiance < 0.);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
