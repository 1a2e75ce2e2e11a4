//! Direct binary-pair detection on a single frame
//!
//! Counts bound pairs with the same criterion as NEMO's `snapbinary`
//! (G = 1): for every particle the partner is the neighbour with the deepest
//! pairwise potential among those that are bound and closer than a threshold.
//!
//! This is a direct O(N^2) scan. It is meant for small N or for a handful of
//! sampled timestamps; [`BinaryScan`] logs a warning when N exceeds its
//! `warn_above` limit instead of silently running for a long time.

use tracing::warn;

use crate::analysis::states::Frame;
use crate::error::{Error, Result};

/// A detected pair, `i < j`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryPair {
    pub i: usize,       // lower particle index
    pub j: usize,       // its partner
    pub separation: f64,
    pub energy: f64,    // specific kinetic + potential energy of the pair
}

/// Pairwise binary search settings
#[derive(Debug, Clone, Copy)]
pub struct BinaryScan {
    pub r_threshold: f64, // maximum separation of a bound pair
    pub warn_above: usize, // particle count that triggers the cost warning
}

impl BinaryScan {
    pub fn new(r_threshold: f64, warn_above: usize) -> Result<Self> {
        if r_threshold.is_nan() || r_threshold <= 0.0 {
            return Err(Error::Validation(format!(
                "binary separation threshold must be positive, got {r_threshold}"
            )));
        }
        Ok(Self {
            r_threshold,
            warn_above,
        })
    }

    /// Find the best bound partner of every particle and keep each pair once
    pub fn find_binaries(&self, frame: &Frame) -> Vec<BinaryPair> {
        let n = frame.len();
        if n > self.warn_above {
            warn!(
                "binary scan over {n} particles at t={} is O(N^2) ({} pair checks)",
                frame.t,
                n * (n - 1)
            );
        }

        let mut pairs = Vec::new();

        for i in 0..n {
            let pi = &frame.particles[i];

            // Best candidate so far: (index, potential, separation, total energy)
            let mut best: Option<(usize, f64, f64, f64)> = None;

            for j in 0..n {
                if j == i {
                    continue;
                }
                let pj = &frame.particles[j];

                let dr = (pi.x - pj.x).norm();
                let dv = (pi.v - pj.v).norm();
                let m = pi.m + pj.m;

                let ekin = 0.5 * dv * dv;
                let epot = -m / dr;

                // Bound, close enough, and deeper than the current candidate.
                // Strict `<` keeps the lowest index on ties.
                let deeper = best.map_or(true, |(_, epot_min, _, _)| epot < epot_min);
                if ekin + epot < 0.0 && dr < self.r_threshold && deeper {
                    best = Some((j, epot, dr, ekin + epot));
                }
            }

            // Only the lower index of a pair reports it
            if let Some((j, _, separation, energy)) = best {
                if j > i {
                    pairs.push(BinaryPair {
                        i,
                        j,
                        separation,
                        energy,
                    });
                }
            }
        }

        pairs
    }

    pub fn count_binaries(&self, frame: &Frame) -> usize {
        self.find_binaries(frame).len()
    }
}
