//! Integration parameters for gyrFalcON runs
//!
//! `GyrfalconParameters` holds the settings derived from the initial model:
//! - softening length from the mean interparticle distance,
//! - block-step level `kmax` (tau = 2^-kmax) from the escape velocity,
//! - dynamical time of the system

use crate::error::{Error, Result};

/// Default accuracy parameter for the time step estimate
pub const DEFAULT_ETA: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GyrfalconParameters {
    pub eps: f64,   // softening length
    pub kmax: i32,  // time step is 2^-kmax
    pub t_dyn: f64, // dynamical time r0 / v_esc
}

impl GyrfalconParameters {
    /// `n` particles, characteristic radius `r0`, central potential `phi0` (< 0)
    pub fn compute(n: u64, r0: f64, phi0: f64, eta: f64) -> Result<Self> {
        if n == 0 {
            return Err(Error::Validation("particle count must be positive".into()));
        }
        if r0 <= 0.0 {
            return Err(Error::Validation(format!("r0 must be positive, got {r0}")));
        }
        if phi0 >= 0.0 {
            return Err(Error::Validation(format!(
                "central potential must be negative, got {phi0}"
            )));
        }

        let eps = r0 / (n as f64).cbrt();

        let v_esc = (-2.0 * phi0).sqrt();
        let t_dyn = r0 / v_esc;

        // tau = 2^-kmax, +0.5 rounds up
        let tau = eta * eps / v_esc;
        let kmax = (0.5 - tau.log2()).trunc() as i32;

        Ok(Self { eps, kmax, t_dyn })
    }
}
