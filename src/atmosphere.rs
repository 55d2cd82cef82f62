//! Atmospheric transmission, and the radiance reaching the
//! sensor from the atmosphere and from reflections.
//!
//! Transmission follows the two-term model of Minkina and
//! Dudzik's *Infrared Thermography*, with the coefficients
//! stored by the camera at calibration.

use tracing::debug;

use crate::{
    calibration::{AtmosphericConstants, PlanckConstants},
    environment::{validate_distance, validate_humidity},
    error::{ConversionError, Result},
    metadata::MetadataTag,
};

/// Radiance (in sensor units) that did not originate from
/// the object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericModel {
    /// Fraction of object radiance surviving the path.
    pub tau: f64,
    /// Radiance emitted by the atmosphere: `(1 - tau) * uAtm`.
    pub att_atm: f64,
    /// Reflected ambient radiance: `(1 - E) * tau * uRefl`.
    pub att_refl: f64,
}

/// Absolute water vapour content of air at `ambient`
/// celsius and `rh` percent humidity.
///
/// The last term squares the temperature a second time
/// instead of cubing it, as the vendor's published formula
/// does.
pub fn water_vapour_content(ambient: f64, rh: f64) -> f64 {
    let t2 = ambient * ambient;
    (rh / 100.) * (1.5587 + 6.939e-2 * ambient - 2.7816e-4 * t2 + 6.8455e-7 * t2).exp()
}

/// Transmission of the air column between object and
/// sensor.
pub fn compute_transmission(
    distance: f64,
    ambient: f64,
    rh: f64,
    atm: &AtmosphericConstants,
) -> Result<f64> {
    validate_distance(distance)?;
    validate_humidity(rh)?;
    if !ambient.is_finite() {
        return Err(ConversionError::invalid(
            MetadataTag::AtmosphericTemperature.name(),
            "not a number",
        ));
    }

    let h2o_sqrt = water_vapour_content(ambient, rh).sqrt();
    let dist_factor = distance.sqrt();

    let term1 = (-dist_factor * (atm.alpha_1 + atm.beta_1 * h2o_sqrt)).exp();
    let term2 = (-dist_factor * (atm.alpha_2 + atm.beta_2 * h2o_sqrt)).exp();
    Ok(atm.x * term1 + (1. - atm.x) * term2)
}

/// Radiance emitted by the atmosphere at `ambient` celsius.
pub fn compute_atmospheric_radiance(
    ambient: f64,
    planck: &PlanckConstants,
    tau: f64,
) -> Result<f64> {
    let u_atm = black_body_radiance(MetadataTag::AtmosphericTemperature, ambient, planck)?;
    Ok((1. - tau) * u_atm)
}

/// Ambient radiance at `reflected` celsius, reflected off
/// the object into the sensor.
pub fn compute_reflected_radiance(
    reflected: f64,
    emissivity: f64,
    planck: &PlanckConstants,
    tau: f64,
) -> Result<f64> {
    let u_refl = black_body_radiance(
        MetadataTag::ReflectedApparentTemperature,
        reflected,
        planck,
    )?;
    Ok((1. - emissivity) * tau * u_refl)
}

fn black_body_radiance(tag: MetadataTag, celsius: f64, planck: &PlanckConstants) -> Result<f64> {
    let raw = planck.temp_to_raw(celsius);
    if raw.is_finite() {
        Ok(raw)
    } else {
        Err(ConversionError::DegenerateCalibration {
            parameter: tag.name(),
            value: celsius,
        })
    }
}

impl AtmosphericModel {
    pub fn compute(
        distance: f64,
        ambient: f64,
        reflected: f64,
        rh: f64,
        emissivity: f64,
        planck: &PlanckConstants,
        atm: &AtmosphericConstants,
    ) -> Result<Self> {
        let tau = compute_transmission(distance, ambient, rh, atm)?;
        let att_atm = compute_atmospheric_radiance(ambient, planck, tau)?;
        let att_refl = compute_reflected_radiance(reflected, emissivity, planck, tau)?;
        debug!(tau, att_atm, att_refl, "atmospheric model");
        Ok(AtmosphericModel {
            tau,
            att_atm,
            att_refl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::tests::reference_calibration;

    #[test]
    fn dry_air_has_no_water_vapour() {
        assert_eq!(water_vapour_content(15., 0.), 0.);
        assert_eq!(water_vapour_content(-30., 0.), 0.);
    }

    #[test]
    fn dry_air_transmission_ignores_humidity_coefficients() {
        let atm = reference_calibration().atmosphere;
        let tau = compute_transmission(100., 15., 0., &atm).unwrap();
        let expected = atm.x * (-10. * atm.alpha_1).exp() + (1. - atm.x) * (-10. * atm.alpha_2).exp();
        assert_eq!(tau, expected);

        let mut no_beta = atm;
        no_beta.beta_1 = 0.;
        no_beta.beta_2 = 0.;
        assert_eq!(compute_transmission(100., 15., 0., &no_beta).unwrap(), tau);
    }

    #[test]
    fn transmission_reference_values() {
        let atm = reference_calibration().atmosphere;
        let h2o = water_vapour_content(15., 75.);
        assert!((h2o - 9.482_385_800).abs() < 1e-6, "{}", h2o);

        let tau = compute_transmission(100., 15., 75., &atm).unwrap();
        assert!((tau - 0.933_922_849).abs() < 1e-6, "{}", tau);

        let tau_zero = compute_transmission(0., 15., 75., &atm).unwrap();
        assert!((tau_zero - 1.).abs() < 1e-12);
    }

    #[test]
    fn rejects_invalid_path_parameters() {
        let atm = reference_calibration().atmosphere;
        assert!(matches!(
            compute_transmission(-1., 15., 75., &atm),
            Err(ConversionError::InvalidEnvironmentParameter {
                parameter: "ObjectDistance",
                ..
            })
        ));
        assert!(matches!(
            compute_transmission(10., 15., 150., &atm),
            Err(ConversionError::InvalidEnvironmentParameter {
                parameter: "RelativeHumidity",
                ..
            })
        ));
        assert!(matches!(
            compute_transmission(10., 15., f64::NAN, &atm),
            Err(ConversionError::InvalidEnvironmentParameter { .. })
        ));
    }

    #[test]
    fn radiance_contributions() {
        let planck = reference_calibration().planck;
        let tau = 0.933_922_849_328_757_5;

        let att_atm = compute_atmospheric_radiance(15., &planck, tau).unwrap();
        assert!((att_atm - 712.142_119).abs() < 1e-3, "{}", att_atm);

        let att_refl = compute_reflected_radiance(15., 0.97, &planck, tau).unwrap();
        assert!((att_refl - 301.958_751).abs() < 1e-3, "{}", att_refl);

        assert_eq!(compute_atmospheric_radiance(15., &planck, 1.).unwrap(), 0.);
        assert_eq!(compute_reflected_radiance(15., 1., &planck, tau).unwrap(), 0.);
    }

    #[test]
    fn undefined_planck_curve_is_degenerate() {
        let mut planck = reference_calibration().planck;
        planck.r2 = 0.;
        assert!(matches!(
            compute_atmospheric_radiance(15., &planck, 0.9),
            Err(ConversionError::DegenerateCalibration {
                parameter: "AtmosphericTemperature",
                ..
            })
        ));
    }
}
