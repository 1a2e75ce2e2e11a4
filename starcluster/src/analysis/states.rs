//! Core particle/frame types for snapshot analysis.
//!
//! A [`Frame`] is one time slice of a snapshot: the time `t` plus mass,
//! position and velocity for every particle. Frames are produced by reading
//! an external snapshot and are never shared between runs.

use approx::abs_diff_eq;
use nalgebra::{DMatrix, Vector3};

use crate::error::{Error, Result};

pub type NVec3 = Vector3<f64>;

/// Number of scalars per particle in the flat representation (m, x, y, z, vx, vy, vz)
pub const PARTICLE_COLUMNS: usize = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub m: f64,   // mass
    pub x: NVec3, // position
    pub v: NVec3, // velocity
}

impl Particle {
    pub fn new(m: f64, x: [f64; 3], v: [f64; 3]) -> Self {
        Self {
            m,
            x: x.into(),
            v: v.into(),
        }
    }

    /// Build from one `m x y z vx vy vz` row
    pub fn from_row(row: &[f64]) -> Option<Self> {
        if row.len() != PARTICLE_COLUMNS {
            return None;
        }
        Some(Self::new(
            row[0],
            [row[1], row[2], row[3]],
            [row[4], row[5], row[6]],
        ))
    }

    pub fn to_row(&self) -> [f64; PARTICLE_COLUMNS] {
        [
            self.m, self.x.x, self.x.y, self.x.z, self.v.x, self.v.y, self.v.z,
        ]
    }
}

/// Orientation of the matrix returned by [`Frame::to_matrix`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLayout {
    /// `[7, N]`: one row per quantity (the transposed layout)
    ComponentMajor,
    /// `[N, 7]`: one row per particle
    ParticleMajor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub t: f64,                   // time of the frame
    pub particles: Vec<Particle>, // all particles at `t`
}

impl Frame {
    pub fn new(t: f64, particles: Vec<Particle>) -> Self {
        Self { t, particles }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn masses(&self) -> Vec<f64> {
        self.particles.iter().map(|p| p.m).collect()
    }

    pub fn total_mass(&self) -> f64 {
        self.particles.iter().map(|p| p.m).sum()
    }

    pub fn mean_mass(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.total_mass() / self.len() as f64)
        }
    }

    /// Flat matrix view with columns/rows ordered m, x, y, z, vx, vy, vz
    pub fn to_matrix(&self, layout: FrameLayout) -> DMatrix<f64> {
        let n = self.len();
        match layout {
            FrameLayout::ParticleMajor => DMatrix::from_fn(n, PARTICLE_COLUMNS, |i, k| {
                self.particles[i].to_row()[k]
            }),
            FrameLayout::ComponentMajor => DMatrix::from_fn(PARTICLE_COLUMNS, n, |k, i| {
                self.particles[i].to_row()[k]
            }),
        }
    }

    /// Copy of the frame with r, v and m multiplied by the given factors
    pub fn scaled(&self, factors: ScaleFactors) -> Frame {
        let particles = self
            .particles
            .iter()
            .map(|p| Particle {
                m: p.m * factors.m,
                x: p.x * factors.r,
                v: p.v * factors.v,
            })
            .collect();
        Frame::new(self.t, particles)
    }

    /// Copy of the frame with every position and velocity shifted
    pub fn shifted(&self, dr: NVec3, dv: NVec3) -> Frame {
        let particles = self
            .particles
            .iter()
            .map(|p| Particle {
                m: p.m,
                x: p.x + dr,
                v: p.v + dv,
            })
            .collect();
        Frame::new(self.t, particles)
    }

    /// Keep only the particles whose mask entry is `true`
    pub fn select(&self, mask: &[bool]) -> Frame {
        let particles = self
            .particles
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(p, _)| p.clone())
            .collect();
        Frame::new(self.t, particles)
    }
}

/// Multiplicative factors for positions, velocities and masses
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub r: f64,
    pub v: f64,
    pub m: f64,
}

impl ScaleFactors {
    pub fn new(r: f64, v: f64, m: f64) -> Result<Self> {
        for (name, value) in [("rscale", r), ("vscale", v), ("mscale", m)] {
            if !(value.is_finite() && value != 0.0) {
                return Err(Error::Validation(format!(
                    "{name} must be finite and non-zero, got {value}"
                )));
            }
        }
        Ok(Self { r, v, m })
    }

    pub fn inverse(&self) -> Self {
        Self {
            r: self.r.recip(),
            v: self.v.recip(),
            m: self.m.recip(),
        }
    }
}

/// Tolerance used when comparing snapshots written by external tools (single precision)
pub const ROUND_TRIP_TOLERANCE: f64 = 5e-6;

fn check_close(what: &str, index: usize, expected: f64, got: f64, tol: f64) -> Result<()> {
    if abs_diff_eq!(expected, got, epsilon = tol) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{what} of particle {index} differs: expected {expected}, got {got}"
        )))
    }
}

fn check_vec(what: &str, index: usize, expected: &NVec3, got: &NVec3, tol: f64) -> Result<()> {
    for k in 0..3 {
        check_close(what, index, expected[k], got[k], tol)?;
    }
    Ok(())
}

/// Check that `after` equals `before` scaled by `factors`, particle by particle
pub fn verify_scaled(before: &Frame, after: &Frame, factors: ScaleFactors, tol: f64) -> Result<()> {
    if before.len() != after.len() {
        return Err(Error::Validation(format!(
            "particle count changed: {} -> {}",
            before.len(),
            after.len()
        )));
    }
    for (i, (b, a)) in before.particles.iter().zip(&after.particles).enumerate() {
        check_close("mass", i, b.m, a.m / factors.m, tol)?;
        check_vec("position", i, &b.x, &(a.x / factors.r), tol)?;
        check_vec("velocity", i, &b.v, &(a.v / factors.v), tol)?;
    }
    Ok(())
}

/// Check that `after` equals `before` shifted by `(dr, dv)`
pub fn verify_shifted(before: &Frame, after: &Frame, dr: NVec3, dv: NVec3, tol: f64) -> Result<()> {
    if before.len() != after.len() {
        return Err(Error::Validation(format!(
            "particle count changed: {} -> {}",
            before.len(),
            after.len()
        )));
    }
    for (i, (b, a)) in before.particles.iter().zip(&after.particles).enumerate() {
        check_vec("position", i, &b.x, &(a.x - dr), tol)?;
        check_vec("velocity", i, &b.v, &(a.v - dv), tol)?;
    }
    Ok(())
}
