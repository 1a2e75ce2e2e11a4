//! Lagrange radii and membership masks
//!
//! The external `lagrange` manipulator gives the radius for big snapshots;
//! the functions here work on an in-memory [`Frame`] and are what the
//! membership mask is built from.

use crate::analysis::states::{Frame, NVec3};
use crate::error::{Error, Result};

/// Fraction of mass used when none is given (half-mass radius)
pub const DEFAULT_FRACTION: f64 = 0.5;

pub fn check_fraction(fraction: f64) -> Result<()> {
    if fraction > 0.0 && fraction <= 1.0 {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "mass fraction must be in (0, 1], got {fraction}"
        )))
    }
}

/// Radius of the smallest sphere about `centre` holding `fraction` of the total mass
pub fn lagrange_radius_about(frame: &Frame, centre: &NVec3, fraction: f64) -> Result<f64> {
    check_fraction(fraction)?;
    if frame.is_empty() {
        return Err(Error::Validation("lagrange radius of an empty frame".into()));
    }

    let mut shells: Vec<(f64, f64)> = frame
        .particles
        .iter()
        .map(|p| ((p.x - centre).norm(), p.m))
        .collect();
    shells.sort_by(|a, b| a.0.total_cmp(&b.0));

    let target = fraction * frame.total_mass();
    let mut enclosed = 0.0;
    for (r, m) in &shells {
        enclosed += m;
        if enclosed >= target {
            return Ok(*r);
        }
    }

    // Only reachable through rounding when fraction == 1
    Ok(shells.last().map(|s| s.0).unwrap_or(0.0))
}

/// `true` for every particle strictly inside `radius` around `centre`
pub fn lagrange_mask(frame: &Frame, centre: &NVec3, radius: f64) -> Vec<bool> {
    frame
        .particles
        .iter()
        .map(|p| (p.x - centre).norm() < radius)
        .collect()
}

/// `true` for every particle strictly inside `radius` around the origin
pub fn tidal_mask(frame: &Frame, radius: f64) -> Vec<bool> {
    lagrange_mask(frame, &NVec3::zeros(), radius)
}

/// Masses of a frame together with the radius and mask that selected them
#[derive(Debug, Clone, PartialEq)]
pub struct LagrangeMembership {
    pub masses: Vec<f64>,
    pub radius: f64,
    pub mask: Vec<bool>,
}

impl LagrangeMembership {
    pub fn from_frame(frame: &Frame, centre: &NVec3, radius: f64) -> Self {
        Self {
            masses: frame.masses(),
            radius,
            mask: lagrange_mask(frame, centre, radius),
        }
    }

    pub fn inside(&self) -> Vec<f64> {
        self.masses
            .iter()
            .zip(&self.mask)
            .filter(|(_, inside)| **inside)
            .map(|(m, _)| *m)
            .collect()
    }

    pub fn count_inside(&self) -> usize {
        self.mask.iter().filter(|inside| **inside).count()
    }

    pub fn total_mass(&self) -> f64 {
        self.masses.iter().sum()
    }
}
