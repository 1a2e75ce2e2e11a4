//! NEMO snapshot handle: frames and timestamps
//!
//! [`NemoSnapshot`] never reads the binary snapshot format itself. Every
//! query cuts the requested time with `snaptrim`, hands it to a conversion or
//! manipulator program and parses the text the program leaves behind.

use std::path::{Path, PathBuf};

use nalgebra::DMatrix;
use tracing::debug;

use crate::analysis::states::{Frame, FrameLayout, Particle, PARTICLE_COLUMNS};
use crate::configuration::config::{NemoConfig, ToolsConfig};
use crate::error::{require_exists, Error, Result};
use crate::nemo::guard::{artifact_path, ArtifactGuard};
use crate::nemo::runner::{read_product, LineStream, Pipeline, Stage, ToolRunner};

pub struct NemoSnapshot<R> {
    path: PathBuf,
    runner: R,
    nemo: NemoConfig,
}

impl<R: ToolRunner> NemoSnapshot<R> {
    /// The file must exist; nothing is run yet
    pub fn open(path: impl Into<PathBuf>, runner: R, config: &ToolsConfig) -> Result<Self> {
        let path = path.into();
        require_exists(&path)?;
        Ok(Self {
            path,
            runner,
            nemo: config.nemo.clone(),
        })
    }

    /// Keep intermediate files (`--store-artifacts`)
    pub fn keep_artifacts(mut self, keep: bool) -> Self {
        self.nemo.keep_artifacts = self.nemo.keep_artifacts || keep;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn runner(&self) -> &R {
        &self.runner
    }

    pub(crate) fn config(&self) -> &NemoConfig {
        &self.nemo
    }

    pub(crate) fn guard(&self, suffix: &str) -> Result<ArtifactGuard> {
        ArtifactGuard::acquire(artifact_path(&self.path, suffix), self.nemo.keep_artifacts)
    }

    pub(crate) fn tool(&self, name: &str) -> Stage {
        Stage::new(self.nemo.program(name))
    }

    /// `snaptrim` stage writing the frame at `t` to stdout
    pub(crate) fn trim(&self, t: f64) -> Stage {
        self.tool("snaptrim")
            .kv("in", self.path.display())
            .kv("out", "-")
            .kv("times", t)
            .kv("timefuzz", self.nemo.time_fuzz)
    }

    // =====================================================================
    // Frames
    // =====================================================================

    /// Particles of the frame at time `t`
    pub fn frame(&self, t: f64) -> Result<Frame> {
        let guard = self.guard(&format!("{t}.txt"))?;
        let pipeline = Pipeline::new(guard.path())
            .pipe(self.trim(t))
            .pipe(
                self.tool("s2a")
                    .kv("in", "-")
                    .kv("out", guard.path().display()),
            );
        self.runner.run(&pipeline)?;

        let source = guard.path().display().to_string();
        let rows = parse_rows(&source, &read_product(guard.path())?)?;

        let particles = rows
            .iter()
            .enumerate()
            .map(|(k, row)| {
                Particle::from_row(row).ok_or_else(|| {
                    Error::parse(
                        &source,
                        format!(
                            "row {k} has {} columns, expected {PARTICLE_COLUMNS}",
                            row.len()
                        ),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("read {} particles at t={t}", particles.len());
        Ok(Frame::new(t, particles))
    }

    /// Frame at `t` as a `[7, N]` or `[N, 7]` matrix
    pub fn frame_matrix(&self, t: f64, layout: FrameLayout) -> Result<DMatrix<f64>> {
        Ok(self.frame(t)?.to_matrix(layout))
    }

    // =====================================================================
    // Timestamps
    // =====================================================================

    /// Lazily list the time of every frame in the file
    ///
    /// The iterator drives one `tsf` process and can only be consumed once.
    pub fn timestamps(&self) -> Result<TimestampIter> {
        let pipeline = Pipeline::new(PathBuf::new()).pipe(
            self.tool("tsf")
                .kv("in", self.path.display())
                .kv("maxline", 1),
        );
        Ok(TimestampIter {
            lines: self.runner.stream(&pipeline)?,
            source: self.path.display().to_string(),
        })
    }

    /// At most `n` timestamps, evenly spaced by index
    pub fn sampled_timestamps(&self, n: usize) -> Result<Vec<f64>> {
        if n == 0 {
            return Err(Error::Validation(
                "number of timestamps should be positive, got 0".into(),
            ));
        }
        let all = self.timestamps()?.collect::<Result<Vec<_>>>()?;
        sample_evenly(&all, n)
    }
}

/// Frame times read from `tsf` output (`double Time <value>` lines)
pub struct TimestampIter {
    lines: LineStream,
    source: String,
}

impl Iterator for TimestampIter {
    type Item = Result<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            let Some(value) = line.trim().strip_prefix("double Time") else {
                continue;
            };
            return Some(value.trim().parse::<f64>().map_err(|e| {
                Error::parse(&self.source, format!("bad time value '{}': {e}", value.trim()))
            }));
        }
        None
    }
}

/// Pick entries at indices `i * len / n`, or everything when there are fewer than `n`
pub fn sample_evenly(values: &[f64], n: usize) -> Result<Vec<f64>> {
    if n == 0 {
        return Err(Error::Validation(
            "number of samples should be positive, got 0".into(),
        ));
    }
    if values.len() < n {
        return Ok(values.to_vec());
    }
    Ok((0..n).map(|i| values[i * values.len() / n]).collect())
}

/// Whitespace-separated numeric table, `#` comments and blank lines skipped
pub fn parse_rows(source: &str, text: &str) -> Result<Vec<Vec<f64>>> {
    let mut rows = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>().map_err(|_| {
                    Error::parse(source, format!("line {}: '{tok}' is not a number", lineno + 1))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }
    Ok(rows)
}
