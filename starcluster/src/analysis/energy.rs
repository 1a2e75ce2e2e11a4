//! Exact kinetic/potential energy of a frame and N-body unit scaling
//!
//! Reference calculation used to check snapshots before handing them to an
//! integrator: direct pairwise summation with Plummer softening, then the
//! factors that bring the frame to Henon units (G = M = 1, E = -1/4).

use crate::analysis::states::{Frame, ScaleFactors};
use crate::error::{Error, Result};

/// Energy budget of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Energies {
    pub kinetic: f64,   // T
    pub potential: f64, // W
}

impl Energies {
    pub fn total(&self) -> f64 {
        self.kinetic + self.potential
    }

    /// 2T/W, as printed by `snapvratio`
    pub fn virial_ratio(&self) -> f64 {
        2.0 * self.kinetic / self.potential
    }
}

/// Direct-sum energies with softening `eps` and gravitational constant `g`
pub fn energies(frame: &Frame, eps: f64, g: f64) -> Energies {
    let n = frame.len();
    let eps2 = eps * eps;

    let kinetic = frame
        .particles
        .iter()
        .map(|p| 0.5 * p.m * p.v.norm_squared())
        .sum();

    let mut potential = 0.0;
    for i in 0..n {
        let bi = &frame.particles[i];
        for j in (i + 1)..n {
            let bj = &frame.particles[j];

            // Softened separation |r_ij|^2 + eps^2
            let d2 = (bi.x - bj.x).norm_squared() + eps2;
            potential -= g * bi.m * bj.m / d2.sqrt();
        }
    }

    Energies { kinetic, potential }
}

/// Scale factors to N-body units and the corresponding unit sizes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NbodyScaling {
    pub energies: Energies,
    pub virial_radius: f64, // R = -G M^2 / (4E)
    pub factors: ScaleFactors,
}

/// Compute the factors that rescale `frame` to Henon units
///
/// Needs a bound system: a non-negative total energy is rejected.
pub fn nbody_scaling(frame: &Frame, g: f64) -> Result<NbodyScaling> {
    if frame.is_empty() {
        return Err(Error::Validation("cannot scale an empty frame".into()));
    }
    let energies = energies(frame, 0.0, g);
    let e = energies.total();
    if e >= 0.0 {
        return Err(Error::Validation(format!(
            "system is not bound (E = {e}), N-body units are undefined"
        )));
    }

    let m = frame.total_mass();
    let virial_radius = -0.25 * g * m * m / e;

    let mscale = m.recip();
    let rscale = virial_radius.recip();
    let vscale = (mscale / rscale / g).sqrt();

    Ok(NbodyScaling {
        energies,
        virial_radius,
        factors: ScaleFactors::new(rscale, vscale, mscale)?,
    })
}
