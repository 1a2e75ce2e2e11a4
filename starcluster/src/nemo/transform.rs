//! Snapshot rewriting through `snapscale`, `snapshift`, `snapmask`, `snapstack`
//! and `tabtos`
//!
//! All of these produce a new snapshot file; an existing output file is
//! removed first so NEMO does not refuse to overwrite it.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use approx::relative_eq;
use tracing::{info, warn};

use crate::analysis::lagrange::tidal_mask;
use crate::analysis::states::{Frame, NVec3, Particle, ScaleFactors};
use crate::configuration::config::NemoConfig;
use crate::error::{require_exists, Error, Result};
use crate::nemo::guard::{artifact_path, remove_if_exists, ArtifactGuard};
use crate::nemo::runner::{Pipeline, Stage, ToolRunner};
use crate::nemo::snap::NemoSnapshot;

fn clear_output(out: &Path) -> Result<()> {
    if remove_if_exists(out)? {
        info!("{} already exists, removed", out.display());
    }
    Ok(())
}

fn join3(v: &NVec3) -> String {
    format!("{},{},{}", v.x, v.y, v.z)
}

impl<R: ToolRunner> NemoSnapshot<R> {
    /// Multiply positions, velocities and masses of every frame
    pub fn scale_snapshot(&self, out: &Path, factors: ScaleFactors) -> Result<()> {
        clear_output(out)?;
        let pipeline = Pipeline::new(out).pipe(
            self.tool("snapscale")
                .kv("in", self.path().display())
                .kv("out", out.display())
                .kv("rscale", factors.r)
                .kv("vscale", factors.v)
                .kv("mscale", factors.m),
        );
        self.runner().run(&pipeline)
    }

    /// Add `dr` to every position and `dv` to every velocity
    pub fn shift_snapshot(&self, out: &Path, dr: NVec3, dv: NVec3) -> Result<()> {
        clear_output(out)?;
        let pipeline = Pipeline::new(out).pipe(
            self.tool("snapshift")
                .kv("in", self.path().display())
                .kv("out", out.display())
                .kv("rshift", join3(&dr))
                .kv("vshift", join3(&dv)),
        );
        self.runner().run(&pipeline)
    }

    /// Scale lengths and masses, dropping the field source first when given
    ///
    /// The source must be the last particle of the frame at t = 0, at rest at
    /// the origin, with mass `source_mass / m_scale`.
    pub fn postprocess(
        &self,
        out: &Path,
        r_scale: f64,
        m_scale: f64,
        source_mass: Option<f64>,
    ) -> Result<()> {
        clear_output(out)?;
        let scale = self
            .tool("snapscale")
            .kv("in", self.path().display())
            .kv("rscale", r_scale)
            .kv("mscale", m_scale);

        let pipeline = match source_mass {
            None => Pipeline::new(out).pipe(scale.kv("out", out.display())),
            Some(mass) => {
                let n = self.check_point_source(mass / m_scale)?;
                Pipeline::new(out).pipe(scale.kv("out", "-")).pipe(
                    self.tool("snapmask")
                        .kv("in", "-")
                        .kv("out", out.display())
                        .kv("select", format!("0:{}", n - 2)),
                )
            }
        };
        self.runner().run(&pipeline)
    }

    /// Number of particles at t = 0 if the last one is a point of mass `mass`
    fn check_point_source(&self, mass: f64) -> Result<usize> {
        if mass <= 0.0 {
            return Err(Error::Validation(format!(
                "source mass should be positive, got {mass}"
            )));
        }
        let frame = self.frame(0.0)?;
        let Some(last) = frame.particles.last() else {
            return Err(Error::Validation("snapshot has no particles at t=0".into()));
        };
        if frame.len() < 2 {
            return Err(Error::Validation(
                "snapshot holds nothing besides the point source".into(),
            ));
        }
        if last.x.norm() > 1e-7 || last.v.norm() > 1e-7 {
            return Err(Error::Validation(format!(
                "last particle is not at rest at the origin: x={:?} v={:?}",
                last.x, last.v
            )));
        }
        if !relative_eq!(last.m, mass, epsilon = 1e-8, max_relative = 1e-5) {
            return Err(Error::Validation(format!(
                "last particle has mass {}, expected {mass}",
                last.m
            )));
        }
        Ok(frame.len())
    }

    /// Keep, in frame `i`, the particles closer to the origin than
    /// `factor * rtide[i]` and write the frames one after another to `out`
    ///
    /// Returns the number of particles kept per frame. Frames left empty are
    /// skipped.
    pub fn remove_escapers(&self, out: &Path, rtide: &[f64], factor: f64) -> Result<Vec<usize>> {
        let times = self.timestamps()?.collect::<Result<Vec<_>>>()?;
        if rtide.len() < times.len() {
            return Err(Error::Validation(format!(
                "{} tidal radii for {} frames",
                rtide.len(),
                times.len()
            )));
        }
        clear_output(out)?;

        let mut kept = Vec::with_capacity(times.len());
        for (i, (&t, &r)) in times.iter().zip(rtide).enumerate() {
            let frame = self.frame(t)?;
            let inside = frame.select(&tidal_mask(&frame, factor * r));
            info!("{i}: kept {} of {} particles", inside.len(), frame.len());
            kept.push(inside.len());
            if inside.is_empty() {
                warn!("{i}: no particles inside {} at t={t}, frame skipped", factor * r);
                continue;
            }

            let part = self.guard(&format!("_frame{i}.nemo"))?;
            write_snapshot(self.runner(), self.config(), part.path(), &inside)?;
            append_file(part.path(), out)?;
        }
        Ok(kept)
    }
}

/// NEMO snapshots are structured streams, so frames concatenate
fn append_file(from: &Path, to: &Path) -> Result<()> {
    let mut source = File::open(from)?;
    let mut target = OpenOptions::new().create(true).append(true).open(to)?;
    io::copy(&mut source, &mut target)?;
    Ok(())
}

/// Concatenate the particles of two snapshots into `out`
pub fn stack_snapshots<R: ToolRunner>(
    runner: &R,
    nemo: &NemoConfig,
    first: &Path,
    second: &Path,
    out: &Path,
) -> Result<()> {
    clear_output(out)?;
    require_exists(first)?;
    require_exists(second)?;

    let pipeline = Pipeline::new(out).pipe(
        Stage::new(nemo.program("snapstack"))
            .kv("in1", first.display())
            .kv("in2", second.display())
            .kv("out", out.display()),
    );
    runner.run(&pipeline)
}

/// Write an in-memory frame as a NEMO snapshot
pub fn write_snapshot<R: ToolRunner>(
    runner: &R,
    nemo: &NemoConfig,
    out: &Path,
    frame: &Frame,
) -> Result<()> {
    if frame.is_empty() {
        return Err(Error::Validation("cannot write an empty snapshot".into()));
    }
    clear_output(out)?;

    // tabtos reads the table from a file, one particle per line in block order
    let table = ArtifactGuard::acquire(artifact_path(out, "_table.txt"), nemo.keep_artifacts)?;
    let text: String = frame
        .particles
        .iter()
        .map(|p| {
            format!(
                "{} {} {} {} {} {} {}\n",
                p.x.x, p.x.y, p.x.z, p.v.x, p.v.y, p.v.z, p.m
            )
        })
        .collect();
    std::fs::write(table.path(), text)?;

    let pipeline = Pipeline::new(out).pipe(
        Stage::new(nemo.program("tabtos"))
            .kv("in", table.path().display())
            .kv("out", out.display())
            .kv("nbody", frame.len())
            .kv("block1", "x,y,z,vx,vy,vz,m")
            .kv("times", frame.t),
    );
    runner.run(&pipeline)
}

/// Single particle of mass `mass` at rest at the origin
pub fn write_point_mass<R: ToolRunner>(
    runner: &R,
    nemo: &NemoConfig,
    out: &Path,
    mass: f64,
) -> Result<()> {
    let frame = Frame::new(0.0, vec![Particle::new(mass, [0.0; 3], [0.0; 3])]);
    write_snapshot(runner, nemo, out, &frame)
}
