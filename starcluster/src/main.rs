use starcluster::analysis::mass::{density_histogram, log_space, plummer_density};
use starcluster::analysis::states::{verify_scaled, ROUND_TRIP_TOLERANCE};
use starcluster::input::kz::parse_kz_list;
use starcluster::input::layout::read_input_file;
use starcluster::nbody6::events::parse_events_file;
use starcluster::nbody6::global::{parse_global_file, TIDAL_RADIUS_COLUMN};
use starcluster::nbody6::lagr::{fraction_label, lagrange_radii_astro, parse_fort14_file};
use starcluster::nbody6::mergers::{merger_count, parse_collisions_file, MASS_COLUMNS};
use starcluster::nbody6::log::{parse_adjust_file, parse_output_file, parse_scaling_file};
use starcluster::nbody6::log::{OutputLayout, PLOT_COLUMNS};
use starcluster::visualization::plots::file_label;
use starcluster::{nbody_scaling, render, render_grid, summarize_events};
use starcluster::{GyrfalconParameters, InputSummary, IntegratorVersion};
use starcluster::{LinePlot, MassModel, Series};
use starcluster::{BinaryScan, NemoSnapshot, OutputQuantity, ProcessRunner, ScaleFactors};
use starcluster::{TableFormat, TimeTable, ToolRunner, ToolsConfig};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use std::path::{Path, PathBuf};

/// 1 kpc / (1 km/s) in Gyr, the time unit of snapshots in (kpc, Msun, km/s)
const TIME_UNIT_GYR: f64 = 0.977_79;

const KPC_TO_PC: f64 = 1e3;

/// Msun per mass unit of (kpc, km/s) snapshots with G = 1
const NBODY_MASS_UNIT: f64 = 232_533.733_133_433_27;

/// Mass ratios drawn as guides in the merger mass plot
const MASS_RATIOS: [(f64, &str); 3] = [(1.0, "q=1"), (0.5, "q=1/2"), (0.25, "q=1/4")];
const MAX_MERGER_MASS: f64 = 70.0;

#[derive(Parser, Debug)]
#[command(
    name = "starcluster",
    version,
    about = "Snapshot, log and parameter-file tooling for star-cluster N-body runs"
)]
struct Cli {
    /// YAML file with tool locations and defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every command that runs NEMO on a snapshot
#[derive(Args, Debug, Clone, Copy)]
struct RunFlags {
    /// Keep intermediate NEMO files for debugging
    #[arg(long)]
    store_artifacts: bool,

    /// Skip timestamps where the density centre does not converge
    #[arg(long)]
    remove_outliers: bool,
}

/// Log-normal mass spectrum and Plummer radius the snapshot was built from
#[derive(Args, Debug, Clone, Copy)]
struct ModelArgs {
    /// Number of particles, 0 < N <= 10^7
    #[arg(long = "N", default_value_t = 10_000)]
    n: u64,

    /// Location of the mass spectrum, y = (x - mu) / s (Msun)
    #[arg(long, default_value_t = 0.0)]
    mu: f64,

    /// Scale of the mass spectrum (Msun)
    #[arg(long, visible_alias = "s", default_value_t = 1.0)]
    scale: f64,

    /// Shape of the log-normal distribution
    #[arg(long, default_value_t = 1.0)]
    sigma: f64,

    /// Plummer radius (pc)
    #[arg(long, visible_alias = "r", default_value_t = 10.0)]
    plummer_r: f64,
}

impl ModelArgs {
    fn model(&self) -> Result<MassModel> {
        Ok(MassModel::new(self.n, self.mu, self.scale, self.sigma)?)
    }
}

/// Explicit times, or an evenly sampled subset of the file's frames
#[derive(Args, Debug, Clone)]
struct TimeSelection {
    #[arg(long, num_args = 1..)]
    times: Vec<f64>,

    /// Frames to sample when --times is not given
    #[arg(long, default_value_t = 10)]
    n_timestamps: usize,
}

impl TimeSelection {
    fn resolve<R: ToolRunner>(&self, snap: &NemoSnapshot<R>) -> Result<Vec<f64>> {
        if self.times.is_empty() {
            Ok(snap.sampled_timestamps(self.n_timestamps)?)
        } else {
            Ok(self.times.clone())
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print evenly sampled frame times of a snapshot
    Timestamps {
        #[arg(long)]
        nemo_file: PathBuf,
        #[arg(long, default_value_t = 10)]
        n_timestamps: usize,
    },

    /// Spherical or projected density profiles at given times
    DensityProfile {
        #[arg(long)]
        nemo_file: PathBuf,
        #[arg(long, num_args = 1.., required = true)]
        times: Vec<f64>,
        /// Projected profile (`projprof`) instead of `sphereprof`
        #[arg(long)]
        projprof: bool,
        /// Line of sight for --projprof
        #[arg(long, num_args = 3, allow_negative_numbers = true, value_names = ["X", "Y", "Z"])]
        proj_vector: Option<Vec<f64>>,
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Half-mass radius, particle count and mean mass inside it over time
    LagrangeRadius {
        #[arg(long, num_args = 1.., required = true)]
        nemo_files: Vec<PathBuf>,
        /// Snapshots produced by an NbodyX integrator
        #[arg(long, num_args = 1..)]
        nbody_nemo_files: Vec<PathBuf>,
        #[arg(long, num_args = 1.., required = true)]
        times: Vec<f64>,
        /// Times for --nbody-nemo-files
        #[arg(long, num_args = 1..)]
        nbody_times: Vec<f64>,
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Mass histograms at given times against the initial spectrum
    MassSpectrum {
        #[arg(long)]
        nemo_file: PathBuf,
        #[arg(long, num_args = 1.., required = true)]
        times: Vec<f64>,
        /// Only count particles inside the half-mass radius about the density centre
        #[arg(long)]
        lagrange: bool,
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Particle count and mean mass of whole snapshots over time
    ClusterStats {
        #[arg(long, num_args = 1.., required = true)]
        nemo_files: Vec<PathBuf>,
        #[arg(long, default_value_t = 100)]
        n_timestamps: usize,
        /// Time unit in Myr, one value or one per file
        #[arg(long = "time-unit-myr", num_args = 1.., default_values_t = [0.97779])]
        time_unit_myr: Vec<f64>,
        #[command(flatten)]
        model: ModelArgs,
    },

    /// Virial ratio and energies from `snapvratio`
    Virial {
        #[arg(long)]
        nemo_file: PathBuf,
        #[command(flatten)]
        times: TimeSelection,
        /// Softening used in the simulation
        #[arg(long, default_value_t = 0.0)]
        eps: f64,
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Centre of mass, mean velocity and angular momentum from `snapkinem`
    Momentum {
        #[arg(long)]
        nemo_file: PathBuf,
        #[command(flatten)]
        times: TimeSelection,
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Count bound pairs closer than a threshold (direct O(N^2) scan)
    Binaries {
        #[arg(long)]
        nemo_file: PathBuf,
        #[command(flatten)]
        times: TimeSelection,
        #[arg(long)]
        r_threshold: f64,
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Rescale a snapshot to N-body units
    NbodyUnits {
        #[arg(long)]
        nemo_file: PathBuf,
        /// Gravitational constant in the snapshot's units
        #[arg(long, default_value_t = 1.0)]
        g: f64,
        /// Frame to compute the factors from, the first one by default
        #[arg(long)]
        time: Option<f64>,
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Rescale `out.nemo` of a run to astrophysical units from `exp.out`
    AstroScale {
        /// Run directory holding `out.nemo` and `exp.out`
        #[arg(long)]
        exp: PathBuf,
    },

    /// Tables and plots from an Nbody6++GPU log
    Nbody6Log {
        #[arg(long)]
        log_file: PathBuf,
        /// Comma-separated adjust columns (E, Q, ...) and output markers (RLAGR, ...)
        #[arg(long, value_delimiter = ',', required = true)]
        values: Vec<String>,
        /// Log y axis for the energy plot
        #[arg(long)]
        logscale: bool,
        /// Convert output quantities with the PHYSICAL SCALING factors
        #[arg(long)]
        astro: bool,
        /// Where CSVs and plots go, the log's directory by default
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Scale a kpc snapshot to pc, optionally removing the central field source
    Postprocess {
        #[arg(long)]
        snap_file: PathBuf,
        /// Drop the point source of the external field (the last particle)
        #[arg(long)]
        remove_point_source: bool,
        /// Mass of the point source (Msun)
        #[arg(long, default_value_t = 4.37e10)]
        source_mass: f64,
        /// Masses are in N-body units of (kpc, km/s)
        #[arg(long)]
        nbody: bool,
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Drop particles beyond a multiple of the tidal radius from `global.30`
    RemoveEscapers {
        /// Run directory holding `global.30` and `out_scaled.nemo`
        #[arg(long)]
        exp: PathBuf,
        #[arg(long, default_value_t = 2.0)]
        factor: f64,
        #[command(flatten)]
        flags: RunFlags,
    },

    /// Plot the Lagrangian radii the integrator wrote to `fort.14`
    Fort14Lagrange {
        #[arg(long)]
        fort14_file: PathBuf,
        #[arg(long = "time-unit-myr", default_value_t = 0.977_79)]
        time_unit_myr: f64,
        #[arg(long = "length-unit-pc", default_value_t = 1.0)]
        length_unit_pc: f64,
    },

    /// Number of mergers per run against its initial black hole count
    Mergers {
        /// Run directories holding `event.35` (and `coll.13` for --mass)
        #[arg(long, num_args = 1.., required = true)]
        exp: Vec<PathBuf>,
        /// Also plot the masses of the merging pairs
        #[arg(long)]
        mass: bool,
        /// Where plots go, next to the first run by default
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Human-readable summary of an integrator parameter file
    ParseInput {
        #[arg(required_unless_present = "kz", conflicts_with = "kz")]
        file: Option<PathBuf>,
        /// Comma-separated KZ flags instead of a file
        #[arg(long)]
        kz: Option<String>,
        #[arg(long = "version", value_enum, default_value_t = IntegratorVersion::Nbody6ppGpu)]
        integrator: IntegratorVersion,
    },

    /// Event counter summary from `event.35`
    Events {
        /// Run directory holding `event.35`
        #[arg(long)]
        exp: PathBuf,
    },

    /// Softening, time step level and dynamical time for gyrFalcON
    GyrfalconParams {
        #[arg(long = "N")]
        n: u64,
        #[arg(long)]
        r0: f64,
        /// Central potential, negative
        #[arg(long, allow_negative_numbers = true)]
        phi0: f64,
        #[arg(long, default_value_t = starcluster::analysis::params::DEFAULT_ETA)]
        eta: f64,
    },

    /// Per-step summary of an Nbody6++GPU HDF5 snapshot
    #[cfg(feature = "hdf5")]
    Hdf5Summary {
        file: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = ToolsConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Command::Timestamps { nemo_file, n_timestamps } => {
            timestamps(&cfg, &nemo_file, n_timestamps)
        }
        Command::DensityProfile { nemo_file, times, projprof, proj_vector, model, flags } => {
            density_profile(&cfg, &nemo_file, &times, projprof, proj_vector, model, flags)
        }
        Command::LagrangeRadius {
            nemo_files,
            nbody_nemo_files,
            times,
            nbody_times,
            model,
            flags,
        } => lagrange_radius(
            &cfg,
            &nemo_files,
            &nbody_nemo_files,
            &times,
            &nbody_times,
            model,
            flags,
        ),
        Command::MassSpectrum { nemo_file, times, lagrange, model, flags } => {
            mass_spectrum(&cfg, &nemo_file, &times, lagrange, model, flags)
        }
        Command::ClusterStats { nemo_files, n_timestamps, time_unit_myr, model } => {
            cluster_stats(&cfg, &nemo_files, n_timestamps, &time_unit_myr, model)
        }
        Command::Virial { nemo_file, times, eps, flags } => {
            virial(&cfg, &nemo_file, &times, eps, flags)
        }
        Command::Momentum { nemo_file, times, flags } => momentum(&cfg, &nemo_file, &times, flags),
        Command::Binaries { nemo_file, times, r_threshold, flags } => {
            binaries(&cfg, &nemo_file, &times, r_threshold, flags)
        }
        Command::NbodyUnits { nemo_file, g, time, flags } => {
            nbody_units(&cfg, &nemo_file, g, time, flags)
        }
        Command::AstroScale { exp } => astro_scale(&cfg, &exp),
        Command::Nbody6Log { log_file, values, logscale, astro, out_dir } => {
            nbody6_log(&log_file, &values, logscale, astro, out_dir)
        }
        Command::ParseInput { file, kz, integrator } => {
            parse_input(file.as_deref(), kz.as_deref(), integrator)
        }
        Command::Events { exp } => events(&exp),
        Command::Postprocess { snap_file, remove_point_source, source_mass, nbody, flags } => {
            postprocess(&cfg, &snap_file, remove_point_source.then_some(source_mass), nbody, flags)
        }
        Command::RemoveEscapers { exp, factor, flags } => {
            remove_escapers(&cfg, &exp, factor, flags)
        }
        Command::Fort14Lagrange { fort14_file, time_unit_myr, length_unit_pc } => {
            fort14_lagrange(&fort14_file, time_unit_myr, length_unit_pc)
        }
        Command::Mergers { exp, mass, out_dir } => mergers(&exp, mass, out_dir),
        Command::GyrfalconParams { n, r0, phi0, eta } => gyrfalcon_params(n, r0, phi0, eta),
        #[cfg(feature = "hdf5")]
        Command::Hdf5Summary { file } => hdf5_summary(&file),
    }
}

// ==================================================================================
// Helpers
// ==================================================================================

fn open_snapshot(
    cfg: &ToolsConfig,
    path: &Path,
    flags: RunFlags,
) -> Result<NemoSnapshot<ProcessRunner>> {
    let snap = NemoSnapshot::open(path, ProcessRunner, cfg)
        .with_context(|| format!("cannot open snapshot {}", path.display()))?;
    Ok(snap.keep_artifacts(flags.store_artifacts))
}

/// `Ok(None)` for a non-converged estimate when outliers may be dropped
fn unless_outlier<T>(result: starcluster::Result<T>, flags: RunFlags, t: f64) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_converged() && flags.remove_outliers => {
            warn!("skipping t={t}: {e}");
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("at t={t}")),
    }
}

/// Directory next to the run directories: `<save_dir>/<run>/out.nemo`
fn runs_dir(path: &Path) -> PathBuf {
    path.parent()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn file_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn time_label(t: f64) -> String {
    format!("t={:.2}", t * TIME_UNIT_GYR)
}

fn with_title(title: &str, model: &MassModel) -> String {
    format!("{title} ({})", model.label())
}

// ==================================================================================
// Snapshot commands
// ==================================================================================

fn timestamps(cfg: &ToolsConfig, path: &Path, n: usize) -> Result<()> {
    let snap = NemoSnapshot::open(path, ProcessRunner, cfg)?;
    let times = snap.sampled_timestamps(n)?;
    let joined = times.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" ");
    println!("Printing the timestamps of a NEMO snapshot...\n\t {joined}");
    Ok(())
}

fn density_profile(
    cfg: &ToolsConfig,
    path: &Path,
    times: &[f64],
    projprof: bool,
    proj_vector: Option<Vec<f64>>,
    model: ModelArgs,
    flags: RunFlags,
) -> Result<()> {
    let mass_model = model.model()?;
    let snap = open_snapshot(cfg, path, flags)?;

    let projection = match (projprof, proj_vector) {
        (false, _) => None,
        (true, Some(v)) => Some([v[0], v[1], v[2]]),
        (true, None) => bail!("--proj-vector should be set when using --projprof"),
    };

    let base = if projection.is_some() {
        LinePlot::new(
            with_title("Projected density of the cluster", &mass_model),
            "r, pc",
            "rho, Msun / pc^2",
        )
    } else {
        let r = log_space(0.0, 2.0, 50);
        let rho: Vec<f64> = r
            .iter()
            .map(|r| plummer_density(*r, mass_model.total_mass(), model.plummer_r))
            .collect();
        LinePlot::new(
            with_title("Spherical density of the cluster", &mass_model),
            "r, pc",
            "rho, Msun / pc^3",
        )
        .with_series(Series::from_xy("original rho(r)", &r, &rho))
    };
    let mut plot = base.log_x(true).log_y(true);

    for &t in times {
        let Some(profile) = unless_outlier(snap.density_profile(t, projection), flags, t)? else {
            continue;
        };
        plot = plot.with_series(Series::from_xy(time_label(t), &profile.radius, &profile.density));
    }

    render(&plot, &file_dir(path).join("density_profile.png"))?;
    Ok(())
}

fn lagrange_radius(
    cfg: &ToolsConfig,
    files: &[PathBuf],
    nbody_files: &[PathBuf],
    times: &[f64],
    nbody_times: &[f64],
    model: ModelArgs,
    flags: RunFlags,
) -> Result<()> {
    let mass_model = model.model()?;
    if !nbody_files.is_empty() && nbody_times.is_empty() {
        bail!("--nbody-times should be set when using --nbody-nemo-files");
    }

    let runs: Vec<(&PathBuf, &[f64])> = files
        .iter()
        .map(|f| (f, times))
        .chain(nbody_files.iter().map(|f| (f, nbody_times)))
        .collect();

    // Fail on a missing file before any tool runs
    let snaps = runs
        .iter()
        .map(|(f, _)| open_snapshot(cfg, f, flags))
        .collect::<Result<Vec<_>>>()?;

    let mut radius_plot = LinePlot::new(
        with_title("Lagrange radii for 50% of mass", &mass_model),
        "t, Gyr",
        "Lagrange radius, pc",
    )
    .markers(true);
    let mut count_plot = LinePlot::new(
        with_title("Number of particles in cluster", &mass_model),
        "t, Gyr",
        "N(t) / N(t=0)",
    )
    .markers(true);
    let mut mass_plot = LinePlot::new(
        with_title("Mean mass of particles in cluster", &mass_model),
        "t, Gyr",
        "M(t), Msun",
    )
    .markers(true);

    let neighbours = Some(cfg.density.neighbours);
    for (snap, (file, run_times)) in snaps.iter().zip(&runs) {
        let mut t_gyr = Vec::new();
        let mut radii = Vec::new();
        let mut counts = Vec::new();
        let mut mean_mass = Vec::new();

        for &t in run_times.iter() {
            let members = snap.masses_in_lagrange_radius(t, neighbours);
            let Some(members) = unless_outlier(members, flags, t)? else {
                continue;
            };
            let inside = members.inside();
            t_gyr.push(t * TIME_UNIT_GYR);
            radii.push(members.radius);
            counts.push(inside.len() as f64);
            mean_mass.push(inside.iter().sum::<f64>() / inside.len().max(1) as f64);
        }

        info!("{}: {} of {} times used", file.display(), t_gyr.len(), run_times.len());
        let label = if runs.len() > 1 { file_label(file) } else { String::new() };
        let n0 = counts.first().copied().unwrap_or(1.0);
        let relative: Vec<f64> = counts.iter().map(|c| c / n0).collect();

        radius_plot = radius_plot.with_series(Series::from_xy(label.clone(), &t_gyr, &radii));
        count_plot = count_plot.with_series(Series::from_xy(label.clone(), &t_gyr, &relative));
        mass_plot = mass_plot.with_series(Series::from_xy(label, &t_gyr, &mean_mass));
    }

    let save_dir = runs_dir(&files[0]);
    render(&radius_plot, &save_dir.join("lagrange_radii.png"))?;
    render(&count_plot, &save_dir.join("N_lagrange_radii.png"))?;
    render(&mass_plot, &save_dir.join("M_lagrange_radii.png"))?;
    Ok(())
}

fn mass_spectrum(
    cfg: &ToolsConfig,
    path: &Path,
    times: &[f64],
    lagrange: bool,
    model: ModelArgs,
    flags: RunFlags,
) -> Result<()> {
    let mass_model = model.model()?;
    let snap = open_snapshot(cfg, path, flags)?;

    let edges = log_space(-2.0, 2.0, 50);
    let pdf: Vec<f64> = edges.iter().map(|m| mass_model.pdf(*m)).collect();
    let mut plot = LinePlot::new(
        with_title("Mass distribution in cluster", &mass_model),
        "M, Msun",
        "dN/dM",
    )
    .log_x(true)
    .with_series(Series::from_xy("orig pdf", &edges, &pdf));

    for &t in times {
        let masses = if lagrange {
            let neighbours = Some(cfg.density.neighbours);
            let members = snap.masses_in_lagrange_radius(t, neighbours);
            let Some(members) = unless_outlier(members, flags, t)? else {
                continue;
            };
            members.inside()
        } else {
            snap.frame(t)?.masses()
        };
        let hist = density_histogram(&masses, &edges);
        plot = plot.with_series(Series::histogram(time_label(t), &edges, &hist));
    }

    render(&plot, &file_dir(path).join("mass_spectrum.png"))?;
    Ok(())
}

fn cluster_stats(
    cfg: &ToolsConfig,
    files: &[PathBuf],
    n_timestamps: usize,
    time_unit_myr: &[f64],
    model: ModelArgs,
) -> Result<()> {
    let mass_model = model.model()?;
    let units: Vec<f64> = match time_unit_myr.len() {
        1 => vec![time_unit_myr[0]; files.len()],
        n if n == files.len() => time_unit_myr.to_vec(),
        n => bail!(
            "--time-unit-myr should have the same length as --nemo-files (or 1), got len={n}"
        ),
    };

    let snaps = files
        .iter()
        .map(|f| open_snapshot(cfg, f, RunFlags { store_artifacts: false, remove_outliers: false }))
        .collect::<Result<Vec<_>>>()?;

    let mut count_plot = LinePlot::new(
        with_title("Number of particles in cluster", &mass_model),
        "t, Gyr",
        "N(t) / N(t=0)",
    )
    .markers(true);
    let mut mass_plot = LinePlot::new(
        with_title("Mean mass of particles in cluster", &mass_model),
        "t, Gyr",
        "M(t), Msun",
    )
    .markers(true);

    for ((snap, file), unit) in snaps.iter().zip(files).zip(&units) {
        let mut t_gyr = Vec::new();
        let mut counts = Vec::new();
        let mut mean_mass = Vec::new();

        for t in snap.sampled_timestamps(n_timestamps)? {
            let frame = snap.frame(t)?;
            t_gyr.push(t * 1e-3 * unit);
            counts.push(frame.len() as f64);
            mean_mass.push(frame.mean_mass().unwrap_or(0.0));
        }

        let label = if files.len() > 1 { file.display().to_string() } else { String::new() };
        let n0 = counts.first().copied().unwrap_or(1.0);
        let relative: Vec<f64> = counts.iter().map(|c| c / n0).collect();
        count_plot = count_plot.with_series(Series::from_xy(label.clone(), &t_gyr, &relative));
        mass_plot = mass_plot.with_series(Series::from_xy(label, &t_gyr, &mean_mass));
    }

    let save_dir = runs_dir(&files[0]);
    render(&count_plot, &save_dir.join("N_cluster.png"))?;
    render(&mass_plot, &save_dir.join("M_cluster.png"))?;
    Ok(())
}

fn virial(
    cfg: &ToolsConfig,
    path: &Path,
    selection: &TimeSelection,
    eps: f64,
    flags: RunFlags,
) -> Result<()> {
    let snap = open_snapshot(cfg, path, flags)?;

    let columns = ["2T/W", "T+W", "T", "W_acc", "W_phi", "W_exact", "M"];
    let mut table = TimeTable::new(columns.iter().map(|c| c.to_string()).collect());
    for t in selection.resolve(&snap)? {
        let r = snap.virial(t, eps)?;
        table.insert(r.t, vec![r.ratio, r.energy, r.kinetic, r.w_acc, r.w_phi, r.w_exact, r.mass])?;
    }
    println!("{}", table.render(&TableFormat::default()));

    let ratio = table.column("2T/W").unwrap_or_default();
    let plot = LinePlot::new("Virial ratio", "time", "2T/W")
        .markers(true)
        .with_series(Series::from_xy(file_label(path), table.index(), &ratio));
    render(&plot, &file_dir(path).join("virial_ratio.png"))?;
    Ok(())
}

fn momentum(
    cfg: &ToolsConfig,
    path: &Path,
    selection: &TimeSelection,
    flags: RunFlags,
) -> Result<()> {
    let snap = open_snapshot(cfg, path, flags)?;

    let columns = ["pos", "x", "y", "z", "vel", "vx", "vy", "vz", "l", "lx", "ly", "lz"];
    let mut table = TimeTable::new(columns.iter().map(|c| c.to_string()).collect());
    for t in selection.resolve(&snap)? {
        let m = snap.momentum(t)?;
        let row = [m.pos, m.vel, m.jvec]
            .iter()
            .flat_map(|tv| [tv.norm, tv.vec.x, tv.vec.y, tv.vec.z])
            .collect();
        table.insert(t, row)?;
    }
    println!("{}", table.render(&TableFormat::default()));
    Ok(())
}

fn binaries(
    cfg: &ToolsConfig,
    path: &Path,
    selection: &TimeSelection,
    r_threshold: f64,
    flags: RunFlags,
) -> Result<()> {
    let scan = BinaryScan::new(r_threshold, cfg.binaries.warn_above)?;
    let snap = open_snapshot(cfg, path, flags)?;

    for t in selection.resolve(&snap)? {
        let frame = snap.frame(t)?;
        println!("t={t}: {} binaries among {} particles", scan.count_binaries(&frame), frame.len());
    }
    Ok(())
}

fn nbody_units(
    cfg: &ToolsConfig,
    path: &Path,
    g: f64,
    time: Option<f64>,
    flags: RunFlags,
) -> Result<()> {
    let snap = open_snapshot(cfg, path, flags)?;
    let t = match time {
        Some(t) => t,
        None => snap
            .timestamps()?
            .next()
            .context("snapshot has no frames")??,
    };

    let frame = snap.frame(t)?;
    let scaling = nbody_scaling(&frame, g)?;
    let e = scaling.energies;
    println!(
        "E = {}, T / E = {}, W / E = {}",
        e.total(),
        e.kinetic / e.total(),
        e.potential / e.total()
    );
    let f = scaling.factors;
    println!("mscale={}, rscale={}, vscale={}", f.m, f.r, f.v);
    println!(
        "Rbar={}, Zmbar={}, Q={}",
        scaling.virial_radius,
        frame.mean_mass().unwrap_or(0.0),
        e.kinetic / e.potential
    );

    let out = PathBuf::from(path.to_string_lossy().replace(".nemo", "_NBODY_UNITS.nemo"));
    snap.scale_snapshot(&out, f)?;
    info!("wrote {}", out.display());

    // Check conversion
    let scaled =
        NemoSnapshot::open(&out, ProcessRunner, cfg)?.keep_artifacts(flags.store_artifacts);
    let after = scaled.frame(t)?;
    verify_scaled(&frame, &after, f, ROUND_TRIP_TOLERANCE)
        .context("scaled snapshot does not match")?;
    let check = nbody_scaling(&after, 1.0)?;
    println!(
        "after scaling: E = {}, mscale={}, rscale={}, vscale={}",
        check.energies.total(),
        check.factors.m,
        check.factors.r,
        check.factors.v
    );
    Ok(())
}

fn astro_scale(cfg: &ToolsConfig, exp: &Path) -> Result<()> {
    let scaling = parse_scaling_file(&exp.join("exp.out"))?;
    println!(
        "Scale coefficients: R*={}[pc], V*={}[km/s], T*={}[Myr], M*={}[Msun]",
        scaling.r, scaling.v, scaling.t, scaling.m
    );

    let snap = NemoSnapshot::open(exp.join("out.nemo"), ProcessRunner, cfg)?;
    let factors = ScaleFactors::new(scaling.r, scaling.v, scaling.m)?;
    let out = exp.join("out_scaled.nemo");
    snap.scale_snapshot(&out, factors)?;
    info!("wrote {}", out.display());
    Ok(())
}

// ==================================================================================
// Log and parameter-file commands
// ==================================================================================

fn nbody6_log(
    log_file: &Path,
    values: &[String],
    logscale: bool,
    astro: bool,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let out_dir = out_dir.unwrap_or_else(|| file_dir(log_file));
    let format = TableFormat::default();

    let mut quantities = Vec::new();
    let mut adjust_columns = Vec::new();
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        match OutputQuantity::from_marker(value) {
            Some(q) if !quantities.contains(&q) => quantities.push(q),
            Some(_) => {}
            None => adjust_columns.push(value),
        }
    }

    if !adjust_columns.is_empty() {
        let table = parse_adjust_file(log_file)?;
        let selected = table
            .select(&adjust_columns)
            .with_context(|| format!("available adjust columns: {}", table.columns().join(", ")))?;
        println!("{}", selected.render(&format));
        table.write_csv(&out_dir.join("adjust.csv"))?;

        let mut plot = LinePlot::new(
            "Energy evolution",
            "Time t [nbody units]",
            "Energy E [nbody units]",
        )
        .log_y(logscale);
        for name in &adjust_columns {
            let ys = selected.column(name).unwrap_or_default();
            plot = plot.with_series(Series::from_xy(*name, selected.index(), &ys));
        }
        render(&plot, &out_dir.join("adjust.png"))?;
    }

    if !quantities.is_empty() {
        let tables = parse_output_file(log_file, &OutputLayout::default())?;
        let scaling = if astro { Some(parse_scaling_file(log_file)?) } else { None };
        let time_unit = if scaling.is_some() { "Myr" } else { "nbody units" };

        let mut plots = Vec::new();
        for q in &quantities {
            let Some(table) = tables.get(*q) else {
                continue;
            };
            let table = match &scaling {
                Some(s) => table.scaled(s.t, q.astro_factor(s)),
                None => table.clone(),
            };
            table.write_csv(&out_dir.join(format!("{}.csv", q.marker())))?;

            let shown = table.select(&PLOT_COLUMNS)?;
            println!("{}\n{}", q.marker(), shown.render(&format));

            let mut plot = LinePlot::new(
                format!("{} time evolution", q.marker()),
                format!("Time t [{time_unit}]"),
                q.marker(),
            )
            .log_y(q.log_scale());
            for column in PLOT_COLUMNS {
                let ys = shown.column(column).unwrap_or_default();
                plot = plot.with_series(Series::from_xy(column, shown.index(), &ys));
            }
            plots.push(plot);
        }
        render_grid(&plots, &out_dir.join("output.png"))?;
    }
    Ok(())
}

fn parse_input(file: Option<&Path>, kz: Option<&str>, version: IntegratorVersion) -> Result<()> {
    let summary = match (file, kz) {
        (_, Some(kz)) => InputSummary::from_kz(&parse_kz_list(kz, version)?, version),
        (Some(file), None) => {
            let record = read_input_file(file, version)
                .with_context(|| format!("cannot parse {} as {version} input", file.display()))?;
            InputSummary::new(&record)
        }
        (None, None) => bail!("either an input file or --kz is required"),
    };
    print!("{}", summary.render());
    Ok(())
}

fn events(exp: &Path) -> Result<()> {
    let table = parse_events_file(&exp.join("event.35"))?;
    for summary in summarize_events(&table) {
        println!("{}: {} ({})", summary.name, summary.max, summary.description);
        for (value, t) in &summary.changes {
            println!("\t Event {value} happened at T[NB]={t}");
        }
    }
    Ok(())
}

fn postprocess(
    cfg: &ToolsConfig,
    path: &Path,
    source_mass: Option<f64>,
    nbody: bool,
    flags: RunFlags,
) -> Result<()> {
    let snap = open_snapshot(cfg, path, flags)?;
    let m_scale = if nbody { NBODY_MASS_UNIT } else { 1.0 };
    let out = postprocessed_path(path);
    snap.postprocess(&out, KPC_TO_PC, m_scale, source_mass)?;
    info!("wrote {}", out.display());
    Ok(())
}

/// `<stem>_postprocessed.<ext>` next to the input
fn postprocessed_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_postprocessed.{}", ext.to_string_lossy()),
        None => format!("{stem}_postprocessed"),
    };
    path.with_file_name(name)
}

fn remove_escapers(cfg: &ToolsConfig, exp: &Path, factor: f64, flags: RunFlags) -> Result<()> {
    let global = parse_global_file(&exp.join("global.30"))?;
    let rtide = global
        .column(TIDAL_RADIUS_COLUMN)
        .context("global.30 has no tidal radius column")?;

    let snap = open_snapshot(cfg, &exp.join("out_scaled.nemo"), flags)?;
    let out = exp.join(format!("out_{factor}rtide.nemo"));
    let kept = snap.remove_escapers(&out, &rtide, factor)?;
    for (i, n) in kept.iter().enumerate() {
        println!("{i}: kept {n} particles");
    }
    info!("wrote {}", out.display());
    Ok(())
}

fn fort14_lagrange(path: &Path, time_unit_myr: f64, length_unit_pc: f64) -> Result<()> {
    let table = parse_fort14_file(path)?;
    let astro = lagrange_radii_astro(&table, time_unit_myr, length_unit_pc);
    println!("{}", astro.render(&TableFormat::default()));

    let save_dir = file_dir(path);
    let title = format!("Lagrange radii for '{}'", save_dir.display());
    let mut nbody = LinePlot::new(
        title.clone(),
        "t [nbody units]",
        "Lagrange radius log10(r) [nbody units]",
    );
    let mut physical = LinePlot::new(title, "t [Gyr]", "Lagrange radius [pc]");
    for column in table.columns() {
        let label = fraction_label(column);
        let ys = table.column(column).unwrap_or_default();
        nbody = nbody.with_series(Series::from_xy(label.clone(), table.index(), &ys));
        let ys = astro.column(column).unwrap_or_default();
        physical = physical.with_series(Series::from_xy(label, astro.index(), &ys));
    }

    astro.write_csv(&save_dir.join("lagrange_radii.csv"))?;
    render(&nbody, &save_dir.join("lagrange_radii_nbody.png"))?;
    render(&physical, &save_dir.join("lagrange_radii.png"))?;
    Ok(())
}

fn mergers(exps: &[PathBuf], mass: bool, out_dir: Option<PathBuf>) -> Result<()> {
    let Some(first) = exps.first() else {
        bail!("at least one --exp is needed");
    };
    let out_dir = out_dir.unwrap_or_else(|| file_dir(first));

    let mut counts = LinePlot::new("The number of mergers", "N", "N mergers").markers(true);
    let mut masses = LinePlot::new(
        "Mass distribution for mergers",
        format!("{} [Msun]", MASS_COLUMNS.0),
        format!("{} [Msun]", MASS_COLUMNS.1),
    );

    for exp in exps {
        let label = exp
            .file_name()
            .map_or_else(|| exp.display().to_string(), |n| n.to_string_lossy().into_owned());
        let events = parse_events_file(&exp.join("event.35"))?;
        let count = merger_count(&events).with_context(|| format!("run {}", exp.display()))?;
        println!("{label}: N={} mergers={}", count.particles, count.mergers);
        counts = counts.with_series(Series::new(
            label.clone(),
            vec![(count.particles, count.mergers)],
        ));

        if mass {
            let pairs = parse_collisions_file(&exp.join("coll.13"))?.pair_masses()?;
            masses = masses.with_series(Series::scatter(label, pairs));
        }
    }
    render(&counts, &out_dir.join("mergers.png"))?;

    if mass {
        for (q, label) in MASS_RATIOS {
            let line = vec![(0.0, 0.0), (MAX_MERGER_MASS, q * MAX_MERGER_MASS)];
            masses = masses.with_series(Series::new(label, line));
        }
        render(&masses, &out_dir.join("merger_masses.png"))?;
    }
    Ok(())
}

fn gyrfalcon_params(n: u64, r0: f64, phi0: f64, eta: f64) -> Result<()> {
    let p = GyrfalconParameters::compute(n, r0, phi0, eta)?;
    println!("eps = {}, kmax = {} (tau = 2^-{}), t_dyn = {}", p.eps, p.kmax, p.kmax, p.t_dyn);
    Ok(())
}

#[cfg(feature = "hdf5")]
fn hdf5_summary(path: &Path) -> Result<()> {
    use starcluster::Hdf5Snapshot;

    let snapshot = Hdf5Snapshot::open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    for frame in snapshot {
        let frame = frame?;
        println!(
            "{}: TTOT={} N={} NPAIRS={} singles={} binaries={} mergers={} stellar={}",
            frame.step,
            frame.ttot(),
            frame.n(),
            frame.npairs(),
            frame.singles.len(),
            frame.binaries.as_ref().map_or(0, |b| b.len()),
            frame.mergers.as_ref().map_or(0, |m| m.len()),
            frame.has_stellar_data()
        );
        for warning in &frame.warnings {
            println!("  warning: {warning}");
        }
    }
    Ok(())
}
