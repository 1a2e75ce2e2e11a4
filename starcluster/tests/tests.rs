use approx::{assert_abs_diff_eq, assert_relative_eq};

use starcluster::analysis::energy::{energies, nbody_scaling};
use starcluster::analysis::lagrange::{lagrange_mask, lagrange_radius_about, tidal_mask};
use starcluster::analysis::lagrange::LagrangeMembership;
use starcluster::analysis::mass::{density_histogram, log_space, lognormal_mean, lognormal_pdf};
use starcluster::analysis::mass::{plummer_density, MassModel};
use starcluster::analysis::params::GyrfalconParameters;
use starcluster::analysis::states::{verify_scaled, verify_shifted, ROUND_TRIP_TOLERANCE};
use starcluster::analysis::states::{Frame, FrameLayout, NVec3, Particle, ScaleFactors};
use starcluster::configuration::config::ToolsConfig;
use starcluster::visualization::plots::{file_label, render, render_grid, LinePlot, Series};
use starcluster::{BinaryScan, Error};

use std::path::Path;

/// Deterministic uniform numbers in [0, 1) (64-bit LCG)
pub struct Lcg(u64);

impl Lcg {
    pub fn next(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// `n` equal-mass particles uniformly inside the unit sphere, at rest
pub fn uniform_sphere(n: usize, seed: u64) -> Frame {
    let mut rng = Lcg(seed);
    let mut particles = Vec::with_capacity(n);
    while particles.len() < n {
        let x = [2.0 * rng.next() - 1.0, 2.0 * rng.next() - 1.0, 2.0 * rng.next() - 1.0];
        if x.iter().map(|c| c * c).sum::<f64>() < 1.0 {
            particles.push(Particle::new(1.0, x, [0.0; 3]));
        }
    }
    Frame::new(0.0, particles)
}

/// Two bodies on the x axis moving apart along y
pub fn two_body_frame(dist: f64, speed: f64) -> Frame {
    Frame::new(
        0.5,
        vec![
            Particle::new(1.0, [-dist / 2.0, 0.0, 0.0], [0.0, -speed, 0.0]),
            Particle::new(1.0, [dist / 2.0, 0.0, 0.0], [0.0, speed, 0.0]),
        ],
    )
}

pub fn small_frame() -> Frame {
    Frame::new(
        1.25,
        vec![
            Particle::new(0.5, [1.0, 2.0, 3.0], [0.1, 0.2, 0.3]),
            Particle::new(1.5, [-1.0, 0.5, 0.0], [0.0, -0.4, 0.2]),
            Particle::new(2.0, [0.3, -0.7, 1.1], [-0.5, 0.0, 0.1]),
        ],
    )
}

// ==================================================================================
// Frames
// ==================================================================================

#[test]
fn frame_matrix_layouts() {
    let frame = small_frame();

    let by_component = frame.to_matrix(FrameLayout::ComponentMajor);
    assert_eq!(by_component.shape(), (7, 3));
    assert_eq!(by_component[(0, 1)], 1.5); // mass row
    assert_eq!(by_component[(3, 2)], 1.1); // z row

    let by_particle = frame.to_matrix(FrameLayout::ParticleMajor);
    assert_eq!(by_particle.shape(), (3, 7));
    assert_eq!(by_particle, by_component.transpose());
}

#[test]
fn frame_masses_and_mean() {
    let frame = small_frame();
    assert_eq!(frame.masses(), vec![0.5, 1.5, 2.0]);
    assert_relative_eq!(frame.total_mass(), 4.0);
    assert_relative_eq!(frame.mean_mass().unwrap(), 4.0 / 3.0);
    assert!(Frame::new(0.0, vec![]).mean_mass().is_none());
}

#[test]
fn scale_then_inverse_restores_frame() {
    let frame = small_frame();
    let factors = ScaleFactors::new(3.7, 0.21, 1.0e3).unwrap();

    let scaled = frame.scaled(factors);
    verify_scaled(&frame, &scaled, factors, ROUND_TRIP_TOLERANCE).unwrap();

    let restored = scaled.scaled(factors.inverse());
    let identity = ScaleFactors::new(1.0, 1.0, 1.0).unwrap();
    verify_scaled(&frame, &restored, identity, ROUND_TRIP_TOLERANCE).unwrap();
}

#[test]
fn verify_scaled_reports_mismatch() {
    let frame = small_frame();
    let factors = ScaleFactors::new(2.0, 2.0, 2.0).unwrap();
    let wrong = frame.scaled(ScaleFactors::new(2.0, 2.0, 2.1).unwrap());

    let err = verify_scaled(&frame, &wrong, factors, ROUND_TRIP_TOLERANCE).unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "unexpected error {err:?}");
}

#[test]
fn shift_then_back_restores_frame() {
    let frame = small_frame();
    let dr = NVec3::new(10.0, -5.0, 0.25);
    let dv = NVec3::new(0.0, 1.0, -1.0);

    let shifted = frame.shifted(dr, dv);
    verify_shifted(&frame, &shifted, dr, dv, ROUND_TRIP_TOLERANCE).unwrap();

    let back = shifted.shifted(-dr, -dv);
    verify_shifted(&frame, &back, NVec3::zeros(), NVec3::zeros(), ROUND_TRIP_TOLERANCE).unwrap();
}

#[test]
fn zero_scale_factor_is_rejected() {
    assert!(matches!(ScaleFactors::new(1.0, 0.0, 1.0), Err(Error::Validation(_))));
    assert!(matches!(ScaleFactors::new(f64::NAN, 1.0, 1.0), Err(Error::Validation(_))));
}

// ==================================================================================
// Energies
// ==================================================================================

#[test]
fn two_body_energies() {
    let frame = two_body_frame(1.0, 0.1);
    let e = energies(&frame, 0.0, 1.0);

    assert_relative_eq!(e.kinetic, 0.01, epsilon = 1e-12);
    assert_relative_eq!(e.potential, -1.0, epsilon = 1e-12);
    assert_relative_eq!(e.virial_ratio(), -0.02, epsilon = 1e-12);
}

#[test]
fn softening_reduces_binding() {
    let frame = two_body_frame(1e-6, 0.0);
    let hard = energies(&frame, 0.0, 1.0);
    let soft = energies(&frame, 0.1, 1.0);

    assert!(soft.potential > hard.potential);
    assert!(soft.potential > -10.0 - 1e-9, "softened W too deep: {}", soft.potential);
}

#[test]
fn nbody_scaling_reaches_henon_units() {
    let mut frame = two_body_frame(0.8, 0.01);
    frame.particles.push(Particle::new(0.5, [0.0, 0.6, 0.1], [0.005, 0.0, 0.0]));

    let g = 4.3e-3;
    let scaling = nbody_scaling(&frame, g).unwrap();
    let scaled = frame.scaled(scaling.factors);

    let e = energies(&scaled, 0.0, 1.0);
    assert_relative_eq!(scaled.total_mass(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(e.total(), -0.25, epsilon = 1e-9);
}

#[test]
fn nbody_scaling_rejects_unbound_system() {
    let frame = two_body_frame(1.0, 10.0);
    assert!(matches!(nbody_scaling(&frame, 1.0), Err(Error::Validation(_))));
}

// ==================================================================================
// Lagrange radius
// ==================================================================================

#[test]
fn half_mass_radius_of_uniform_sphere() {
    let n = 2000;
    let frame = uniform_sphere(n, 7);
    let centre = NVec3::zeros();

    let r = lagrange_radius_about(&frame, &centre, 0.5).unwrap();
    assert_abs_diff_eq!(r, 0.5f64.cbrt(), epsilon = 0.05);

    // The particle sitting on the radius itself is not strictly inside
    let membership = LagrangeMembership::from_frame(&frame, &centre, r);
    assert_eq!(membership.count_inside(), n / 2 - 1);
    assert_relative_eq!(membership.total_mass(), n as f64);
}

#[test]
fn lagrange_mask_is_strict() {
    let frame = Frame::new(
        0.0,
        vec![
            Particle::new(1.0, [0.5, 0.0, 0.0], [0.0; 3]),
            Particle::new(1.0, [1.0, 0.0, 0.0], [0.0; 3]),
            Particle::new(1.0, [0.0, 0.0, 1.5], [0.0; 3]),
        ],
    );
    let mask = lagrange_mask(&frame, &NVec3::zeros(), 1.0);
    assert_eq!(mask, vec![true, false, false]);

    let selected = frame.select(&mask);
    assert_eq!(selected.len(), 1);
}

#[test]
fn tidal_mask_measures_from_origin() {
    // Off-centre cluster: the tidal cut ignores where the particles sit
    let frame = Frame::new(
        3.0,
        vec![
            Particle::new(1.0, [5.0, 0.0, 0.0], [0.0; 3]),
            Particle::new(1.0, [0.0, -2.0, 0.0], [1.0, 0.0, 0.0]),
            Particle::new(1.0, [0.0, 0.0, 0.5], [0.0; 3]),
        ],
    );
    assert_eq!(tidal_mask(&frame, 2.0), vec![false, false, true]);
    assert_eq!(tidal_mask(&frame, 5.5), vec![true; 3]);

    let kept = frame.select(&tidal_mask(&frame, 2.5));
    assert_eq!(kept.len(), 2);
    assert_eq!(kept.t, 3.0);
}

#[test]
fn lagrange_radius_about_offset_centre() {
    let frame = Frame::new(
        0.0,
        vec![
            Particle::new(1.0, [10.0, 0.0, 0.0], [0.0; 3]),
            Particle::new(1.0, [11.0, 0.0, 0.0], [0.0; 3]),
            Particle::new(2.0, [13.0, 0.0, 0.0], [0.0; 3]),
        ],
    );
    let centre = NVec3::new(10.0, 0.0, 0.0);
    assert_relative_eq!(lagrange_radius_about(&frame, &centre, 0.5).unwrap(), 1.0);
    assert_relative_eq!(lagrange_radius_about(&frame, &centre, 1.0).unwrap(), 3.0);
}

#[test]
fn lagrange_fraction_must_be_in_unit_interval() {
    let frame = small_frame();
    for fraction in [0.0, -0.1, 1.5] {
        let result = lagrange_radius_about(&frame, &NVec3::zeros(), fraction);
        assert!(matches!(result, Err(Error::Validation(_))), "fraction {fraction} accepted");
    }
}

// ==================================================================================
// Binaries
// ==================================================================================

#[test]
fn no_binaries_among_distant_particles() {
    let frame = Frame::new(
        0.0,
        (0..5)
            .map(|i| Particle::new(1.0, [10.0 * i as f64, 0.0, 0.0], [0.0; 3]))
            .collect(),
    );
    let scan = BinaryScan::new(0.1, 2000).unwrap();
    assert_eq!(scan.count_binaries(&frame), 0);
}

#[test]
fn close_pair_counted_once() {
    let mut particles = vec![
        Particle::new(1.0, [0.0, 0.0, 0.0], [0.0; 3]),
        Particle::new(1.0, [50.0, 0.0, 0.0], [0.0; 3]),
        Particle::new(1.0, [50.01, 0.0, 0.0], [0.0, 0.5, 0.0]),
    ];
    particles.push(Particle::new(1.0, [-40.0, 3.0, 0.0], [0.0; 3]));
    let frame = Frame::new(0.0, particles);

    let scan = BinaryScan::new(0.1, 2000).unwrap();
    let pairs = scan.find_binaries(&frame);

    assert_eq!(pairs.len(), 1);
    assert_eq!((pairs[0].i, pairs[0].j), (1, 2));
    assert_relative_eq!(pairs[0].separation, 0.01, epsilon = 1e-9);
    assert!(pairs[0].energy < 0.0);
}

#[test]
fn fast_pair_is_not_bound() {
    let frame = Frame::new(
        0.0,
        vec![
            Particle::new(1.0, [0.0, 0.0, 0.0], [0.0; 3]),
            Particle::new(1.0, [0.01, 0.0, 0.0], [100.0, 0.0, 0.0]),
        ],
    );
    let scan = BinaryScan::new(0.1, 2000).unwrap();
    assert_eq!(scan.count_binaries(&frame), 0);
}

#[test]
fn binary_threshold_must_be_positive() {
    assert!(matches!(BinaryScan::new(0.0, 10), Err(Error::Validation(_))));
    assert!(matches!(BinaryScan::new(f64::NAN, 10), Err(Error::Validation(_))));
}

// ==================================================================================
// Mass spectrum and model helpers
// ==================================================================================

#[test]
fn lognormal_mean_matches_closed_form() {
    assert_relative_eq!(lognormal_mean(0.0, 1.0, 1.0), 0.5f64.exp());
    let expected = 10.0 + 1.5 * (0.5 * 0.954f64 * 0.954).exp();
    assert_relative_eq!(lognormal_mean(10.0, 1.5, 0.954), expected);
}

#[test]
fn lognormal_pdf_integrates_to_one() {
    let xs = log_space(-4.0, 3.0, 4000);
    let integral: f64 = xs
        .windows(2)
        .map(|w| {
            let (a, b) = (lognormal_pdf(w[0], 0.0, 1.0, 1.0), lognormal_pdf(w[1], 0.0, 1.0, 1.0));
            0.5 * (a + b) * (w[1] - w[0])
        })
        .sum();
    assert_abs_diff_eq!(integral, 1.0, epsilon = 1e-3);

    // Zero below the location parameter
    assert_eq!(lognormal_pdf(0.5, 1.0, 1.0, 1.0), 0.0);
}

#[test]
fn log_space_endpoints() {
    let xs = log_space(-2.0, 2.0, 5);
    let expected = [0.01, 0.1, 1.0, 10.0, 100.0];
    for (x, e) in xs.iter().zip(expected) {
        assert_relative_eq!(*x, e, max_relative = 1e-12);
    }
    assert!(log_space(0.0, 1.0, 0).is_empty());
}

#[test]
fn density_histogram_is_normalised() {
    let edges = [0.0, 1.0, 3.0, 4.0];
    let values = [0.5, 0.7, 1.5, 2.5, 3.9, 4.0, 7.0];
    let hist = density_histogram(&values, &edges);

    // 4.0 falls in the closed last bin, 7.0 is outside
    assert_relative_eq!(hist[0], 2.0 / 6.0);
    assert_relative_eq!(hist[1], 2.0 / (6.0 * 2.0));
    assert_relative_eq!(hist[2], 2.0 / 6.0);

    let integral: f64 = hist.iter().zip(edges.windows(2)).map(|(h, w)| h * (w[1] - w[0])).sum();
    assert_relative_eq!(integral, 1.0);
}

#[test]
fn mass_model_validation_and_label() {
    assert!(matches!(MassModel::new(0, 0.0, 1.0, 1.0), Err(Error::Validation(_))));
    assert!(matches!(MassModel::new(10_000_001, 0.0, 1.0, 1.0), Err(Error::Validation(_))));
    assert!(matches!(MassModel::new(100, -1.0, 1.0, 1.0), Err(Error::Validation(_))));
    assert!(matches!(MassModel::new(100, 0.0, 0.0, 1.0), Err(Error::Validation(_))));
    assert!(matches!(MassModel::new(100, 0.0, 1.0, 0.0), Err(Error::Validation(_))));

    assert_eq!(MassModel::new(100, 0.0, 1.0, 0.5).unwrap().label(), "σ = 0.5");
    assert_eq!(MassModel::new(100, 10.0, 1.5, 0.954).unwrap().label(), "M & A");
    assert_eq!(MassModel::new(100, 2.0, 1.5, 0.5).unwrap().label(), "2_1.5_0.5");

    let model = MassModel::new(1000, 0.0, 1.0, 1.0).unwrap();
    assert_relative_eq!(model.total_mass(), 1000.0 * 0.5f64.exp());
}

#[test]
fn plummer_density_profile() {
    let (m, a) = (1000.0, 2.0);
    let centre = 3.0 * m / (4.0 * std::f64::consts::PI * a * a * a);
    assert_relative_eq!(plummer_density(0.0, m, a), centre);
    assert_relative_eq!(plummer_density(a, m, a), centre * 2f64.powf(-2.5));
}

#[test]
fn gyrfalcon_parameters() {
    let p = GyrfalconParameters::compute(1000, 1.0, -2.0, 0.5).unwrap();
    assert_relative_eq!(p.eps, 0.1, epsilon = 1e-12);
    assert_relative_eq!(p.t_dyn, 0.5);
    assert_eq!(p.kmax, 5);

    assert!(matches!(GyrfalconParameters::compute(1000, 1.0, 0.0, 0.5), Err(Error::Validation(_))));
    assert!(matches!(GyrfalconParameters::compute(0, 1.0, -1.0, 0.5), Err(Error::Validation(_))));
}

// ==================================================================================
// Configuration
// ==================================================================================

#[test]
fn config_defaults_fill_missing_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tools.yaml");
    std::fs::write(&path, "nemo:\n  bin_dir: /opt/nemo/bin\ndensity:\n  neighbours: 64\n").unwrap();

    let cfg = ToolsConfig::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.nemo.program("s2a"), "/opt/nemo/bin/s2a");
    assert_eq!(cfg.nemo.time_fuzz, 1.0e-6);
    assert!(!cfg.nemo.keep_artifacts);
    assert_eq!(cfg.density.neighbours, 64);
    assert_eq!(cfg.binaries.warn_above, 2000);
}

#[test]
fn config_without_file_uses_defaults() {
    let cfg = ToolsConfig::load(None).unwrap();
    assert_eq!(cfg.nemo.program("snaptrim"), "snaptrim");
    assert_eq!(cfg.density.neighbours, 500);
}

#[test]
fn missing_config_file_is_reported() {
    let err = ToolsConfig::load(Some(Path::new("/nonexistent/tools.yaml"))).unwrap_err();
    assert!(matches!(err, Error::MissingInput(_)));
}

// ==================================================================================
// Plots
// ==================================================================================

#[test]
fn nothing_to_plot_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.png");

    assert!(matches!(render_grid(&[], &path), Err(Error::Validation(_))));

    // Non-positive values cannot be shown on a log axis
    let plot = LinePlot::new("rho", "r", "rho")
        .log_y(true)
        .with_series(Series::new("zero", vec![(1.0, 0.0), (2.0, -1.0)]));
    assert!(matches!(render(&plot, &path), Err(Error::Validation(_))));
    assert!(!path.exists());
}

#[test]
fn histogram_series_is_a_step_line() {
    let series = Series::histogram("h", &[0.0, 1.0, 2.0], &[0.25, 0.75]);
    assert_eq!(
        series.points,
        vec![(0.0, 0.25), (1.0, 0.25), (1.0, 0.75), (2.0, 0.75)]
    );
}

#[test]
fn scatter_series_keeps_points() {
    let series = Series::scatter("run", vec![(30.0, 20.0), (10.0, 5.0)]);
    assert!(series.scatter);
    assert_eq!(series.points, vec![(30.0, 20.0), (10.0, 5.0)]);
    assert!(!Series::new("line", vec![(0.0, 1.0)]).scatter);
}

#[test]
fn run_label_from_directory_name() {
    let path = Path::new("/runs/snap_mu0_s1_sigma1_r10_N10000_king_w5/out.nemo");
    assert_eq!(file_label(path), "king_w5");
    assert_eq!(file_label(Path::new("/runs/plain/out.nemo")), "plain");
}
