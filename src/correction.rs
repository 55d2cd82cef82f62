//! Removal of atmospheric and reflected radiance from the
//! measured frame.

use ndarray::{Array2, ArrayBase, Data, Ix2, Zip};

use crate::{
    atmosphere::AtmosphericModel,
    environment::DEGENERACY_THRESHOLD,
    error::{ConversionError, Result},
    metadata::MetadataTag,
};

/// Per-pixel affine map from measured radiance to the
/// radiance emitted by the object:
/// `uObj = (uTot - attAtm - attRefl) / E / tau`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadianceCorrector {
    att_atm: f64,
    att_refl: f64,
    emissivity: f64,
    tau: f64,
}

impl RadianceCorrector {
    pub fn new(att_atm: f64, att_refl: f64, emissivity: f64, tau: f64) -> Result<Self> {
        check_divisor(MetadataTag::Emissivity.name(), emissivity)?;
        check_divisor("transmission", tau)?;
        Ok(RadianceCorrector {
            att_atm,
            att_refl,
            emissivity,
            tau,
        })
    }

    pub fn from_model(model: &AtmosphericModel, emissivity: f64) -> Result<Self> {
        Self::new(model.att_atm, model.att_refl, emissivity, model.tau)
    }

    #[inline]
    pub fn correct_one(&self, u_tot: f64) -> f64 {
        (u_tot - self.att_atm - self.att_refl) / self.emissivity / self.tau
    }

    /// Correct every pixel of `u_tot`.
    pub fn correct<S, A>(&self, u_tot: &ArrayBase<S, Ix2>) -> Array2<f64>
    where
        S: Data<Elem = A>,
        A: Copy + Into<f64> + Sync,
    {
        Zip::from(u_tot).par_map_collect(|&u| self.correct_one(u.into()))
    }
}

fn check_divisor(parameter: &'static str, value: f64) -> Result<()> {
    if value > DEGENERACY_THRESHOLD && value.is_finite() {
        Ok(())
    } else {
        Err(ConversionError::DegenerateCalibration { parameter, value })
    }
}
