//! Inversion of the sensor response curve.

use ndarray::{Array2, ArrayBase, Data, Ix2, Zip};
use rayon::prelude::*;

use crate::{
    calibration::{PlanckConstants, CELSIUS_OFFSET},
    error::{ConversionError, Result},
};

/// Maps object radiance (sensor units) to temperature in
/// celsius: `T = B / ln(R1 / (R2 * (uObj + O)) + F) - 273.15`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanckInverter {
    planck: PlanckConstants,
}

impl PlanckInverter {
    pub fn new(planck: PlanckConstants) -> Self {
        PlanckInverter { planck }
    }

    /// Temperature for a single radiance value, or `None` if
    /// the radiance is outside the domain of the curve or maps
    /// to absolute zero or below.
    #[inline]
    pub fn invert_one(&self, u_obj: f64) -> Option<f64> {
        let arg = self.planck.log_argument(u_obj);
        if !(arg > 0. && arg.is_finite()) {
            return None;
        }
        let temp = self.planck.raw_to_temp(u_obj);
        (temp.is_finite() && temp > -CELSIUS_OFFSET).then(|| temp)
    }

    /// Temperatures for every pixel of `u_obj`.
    ///
    /// Fails with [`ConversionError::RadianceOutOfDomain`]
    /// naming the first offending pixel in row-major order.
    pub fn invert<S>(&self, u_obj: &ArrayBase<S, Ix2>) -> Result<Array2<f32>>
    where
        S: Data<Elem = f64>,
    {
        let temps = Zip::from(u_obj).par_map_collect(|&u| self.invert_one(u).map(|t| t as f32));

        let first_bad = match temps.as_slice() {
            Some(flat) => {
                let ncols = temps.ncols();
                flat.par_iter()
                    .position_first(Option::is_none)
                    .map(|i| (i / ncols, i % ncols))
            }
            None => temps
                .indexed_iter()
                .find(|(_, t)| t.is_none())
                .map(|(idx, _)| idx),
        };
        if let Some((row, col)) = first_bad {
            return Err(ConversionError::RadianceOutOfDomain {
                row,
                col,
                radiance: u_obj[(row, col)],
            });
        }
        // every pixel is `Some` here
        Ok(temps.mapv(|t| t.unwrap_or(f32::NAN)))
    }
}
