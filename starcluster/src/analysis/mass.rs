//! Mass-spectrum model and histogram helpers
//!
//! Initial conditions draw masses from a shifted/scaled log-normal
//! distribution, parametrised like `scipy.stats.lognorm`:
//! `y = (x - mu) / scale`, shape `sigma`.

use std::f64::consts::PI;

use crate::error::{Error, Result};

/// Upper bound on the particle count the scripts accept
pub const MAX_PARTICLES: u64 = 10_000_000;

/// Log-normal mass spectrum plus the cluster size it was sampled for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassModel {
    pub n: u64,     // number of particles
    pub mu: f64,    // location (solar masses)
    pub scale: f64, // scale (solar masses)
    pub sigma: f64, // shape, dimensionless
}

impl MassModel {
    pub fn new(n: u64, mu: f64, scale: f64, sigma: f64) -> Result<Self> {
        if !(1..=MAX_PARTICLES).contains(&n) {
            return Err(Error::Validation(format!(
                "got invalid N={n}, should be 0 < N <= {MAX_PARTICLES}"
            )));
        }
        if mu < 0.0 {
            return Err(Error::Validation(format!(
                "got invalid mu={mu} of the mass spectrum, should not be negative"
            )));
        }
        if sigma <= 0.0 {
            return Err(Error::Validation(format!(
                "got invalid sigma={sigma} of the mass spectrum, should be positive"
            )));
        }
        if scale <= 0.0 {
            return Err(Error::Validation(format!(
                "got invalid s={scale} of the mass spectrum, should be positive"
            )));
        }
        Ok(Self { n, mu, scale, sigma })
    }

    pub fn pdf(&self, x: f64) -> f64 {
        lognormal_pdf(x, self.mu, self.scale, self.sigma)
    }

    pub fn mean_mass(&self) -> f64 {
        lognormal_mean(self.mu, self.scale, self.sigma)
    }

    /// Expected total mass of `n` samples
    pub fn total_mass(&self) -> f64 {
        self.n as f64 * self.mean_mass()
    }

    /// Legend title used on every plot of a run
    pub fn label(&self) -> String {
        if self.mu == 0.0 && self.scale == 1.0 {
            format!("σ = {}", self.sigma)
        } else if (self.mu, self.scale, self.sigma) == (10.0, 1.5, 0.954) {
            "M & A".to_string()
        } else {
            format!("{}_{}_{}", self.mu, self.scale, self.sigma)
        }
    }
}

pub fn lognormal_pdf(x: f64, mu: f64, scale: f64, sigma: f64) -> f64 {
    let y = (x - mu) / scale;
    if y <= 0.0 {
        return 0.0;
    }
    let ln_y = y.ln();
    (-ln_y * ln_y / (2.0 * sigma * sigma)).exp() / (sigma * y * (2.0 * PI).sqrt()) / scale
}

/// E[x] of the shifted log-normal distribution
pub fn lognormal_mean(mu: f64, scale: f64, sigma: f64) -> f64 {
    mu + scale * (0.5 * sigma * sigma).exp()
}

/// `n` points spaced evenly in log10 between `10^a` and `10^b`
pub fn log_space(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![10f64.powf(a)],
        _ => {
            let step = (b - a) / (n - 1) as f64;
            (0..n).map(|i| 10f64.powf(a + step * i as f64)).collect()
        }
    }
}

/// Probability density per bin for ascending `edges`
///
/// Values outside `[edges[0], edges[last]]` are ignored; the last bin is closed.
/// The result integrates to 1 over the bins (all zeros when nothing falls in range).
pub fn density_histogram(values: &[f64], edges: &[f64]) -> Vec<f64> {
    if edges.len() < 2 {
        return Vec::new();
    }
    let bins = edges.len() - 1;
    let mut counts = vec![0usize; bins];

    let lo = edges[0];
    let hi = edges[bins];
    for &x in values {
        if x < lo || x > hi || x.is_nan() {
            continue;
        }
        // First edge strictly greater than x, minus one
        let k = edges.partition_point(|e| *e <= x);
        let bin = k.saturating_sub(1).min(bins - 1);
        counts[bin] += 1;
    }

    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0.0; bins];
    }
    counts
        .iter()
        .enumerate()
        .map(|(i, &c)| c as f64 / (total as f64 * (edges[i + 1] - edges[i])))
        .collect()
}

/// Plummer sphere density at radius `r` for total mass `m` and scale radius `a`
///
/// The reference curve drawn next to measured spherical profiles.
pub fn plummer_density(r: f64, m: f64, a: f64) -> f64 {
    let a3 = a * a * a;
    3.0 * m / (4.0 * PI * a3) * (1.0 + r * r / (a * a)).powf(-2.5)
}
