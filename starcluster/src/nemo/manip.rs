//! Statistics computed by NEMO programs on a single frame
//!
//! - centres (`manipulate manipname=centre_of_mass|dens_centre`)
//! - Lagrange radius and the membership mask built from it
//! - spherical / projected density profiles
//! - virial ratio (`snapvratio`) and momentum (`snapkinem`)
//!
//! Manipulators write one block of numbers per frame they see. `snaptrim`
//! normally passes exactly one frame, but when neighbouring frames fall into
//! the time window several rows come back; only the first row is used.

use tracing::info;

use crate::analysis::lagrange::{check_fraction, LagrangeMembership, DEFAULT_FRACTION};
use crate::analysis::states::NVec3;
use crate::error::{Error, Result};
use crate::nemo::guard::ArtifactGuard;
use crate::nemo::runner::{read_product, Pipeline, ToolRunner};
use crate::nemo::snap::{parse_rows, NemoSnapshot};

/// Which centre estimate to ask `manipulate` for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CenterKind {
    MassCentroid,
    Density { neighbours: u32 },
}

impl CenterKind {
    fn manipname(&self) -> &'static str {
        match self {
            CenterKind::MassCentroid => "centre_of_mass",
            CenterKind::Density { .. } => "dens_centre",
        }
    }

    fn manippars(&self) -> String {
        match self {
            CenterKind::MassCentroid => String::new(),
            CenterKind::Density { neighbours } => neighbours.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Center {
    pub t: f64,
    pub x: NVec3,
    pub v: NVec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagrangeRadius {
    pub t: f64,
    pub radius: f64,
}

/// One row of `snapvratio` output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirialRecord {
    pub t: f64,
    pub ratio: f64,   // 2T/W
    pub energy: f64,  // T+W
    pub kinetic: f64, // T
    pub w_acc: f64,
    pub w_phi: f64,
    pub w_exact: f64,
    pub mass: f64,
}

impl VirialRecord {
    pub const COLUMNS: usize = 8;

    fn from_row(row: &[f64]) -> Option<Self> {
        match *row {
            [t, ratio, energy, kinetic, w_acc, w_phi, w_exact, mass, ..] => Some(Self {
                t,
                ratio,
                energy,
                kinetic,
                w_acc,
                w_phi,
                w_exact,
                mass,
            }),
            _ => None,
        }
    }
}

/// Magnitude plus components, as printed by `snapkinem`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaggedVector {
    pub norm: f64,
    pub vec: NVec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumRecord {
    pub pos: TaggedVector,  // centre of mass
    pub vel: TaggedVector,  // mean velocity
    pub jvec: TaggedVector, // angular momentum
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DensityProfile {
    pub radius: Vec<f64>,
    pub density: Vec<f64>,
}

impl DensityProfile {
    pub fn len(&self) -> usize {
        self.radius.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radius.is_empty()
    }
}

fn first_row(rows: Vec<Vec<f64>>) -> Option<Vec<f64>> {
    rows.into_iter().find(|row| !row.is_empty())
}

impl<R: ToolRunner> NemoSnapshot<R> {
    /// `snaptrim | manipulate` with the result file owned by `guard`
    fn manipulate(
        &self,
        t: f64,
        manipname: &str,
        manippars: &str,
        manipfile: &str,
        guard: &ArtifactGuard,
    ) -> Result<Vec<Vec<f64>>> {
        let pipeline = Pipeline::new(guard.path()).pipe(self.trim(t)).pipe(
            self.tool("manipulate")
                .kv("in", "-")
                .kv("out", ".")
                .kv("manipname", manipname)
                .kv("manippars", manippars)
                .kv("manipfile", manipfile),
        );
        self.runner().run(&pipeline)?;

        // An estimator that gave up leaves no file at all
        if !guard.path().exists() {
            return Ok(Vec::new());
        }
        parse_rows(&guard.path().display().to_string(), &read_product(guard.path())?)
    }

    /// Centre of mass or density centre of the frame at `t`
    pub fn center(&self, t: f64, kind: CenterKind) -> Result<Center> {
        let manipname = kind.manipname();
        let guard = self.guard(&format!("_{manipname}{t}"))?;
        let manipfile = guard.path().display().to_string();

        let rows = self.manipulate(t, manipname, &kind.manippars(), &manipfile, &guard)?;
        let row = first_row(rows).ok_or_else(|| Error::NotConverged {
            what: manipname.to_string(),
            t,
        })?;

        match *row {
            [t, x, y, z, vx, vy, vz, ..] => Ok(Center {
                t,
                x: NVec3::new(x, y, z),
                v: NVec3::new(vx, vy, vz),
            }),
            _ => Err(Error::parse(
                manipfile,
                format!("expected t, x, y, z, vx, vy, vz, got {} values", row.len()),
            )),
        }
    }

    /// Radius holding `fraction` of the mass, optionally about the density centre
    pub fn lagrange_radius(
        &self,
        t: f64,
        fraction: f64,
        neighbours: Option<u32>,
    ) -> Result<LagrangeRadius> {
        check_fraction(fraction)?;

        let guard = self.guard(&format!("_lagrange{t}"))?;
        let path = guard.path().display().to_string();

        // Chained manipulators take one `;`-separated entry each
        let (manipname, manippars, manipfile) = match neighbours {
            Some(n) => (
                "dens_centre+lagrange",
                format!("{n};{fraction}"),
                format!(";{path}"),
            ),
            None => ("lagrange", fraction.to_string(), path.clone()),
        };

        let rows = self.manipulate(t, manipname, &manippars, &manipfile, &guard)?;
        let row = first_row(rows).ok_or_else(|| Error::NotConverged {
            what: manipname.to_string(),
            t,
        })?;

        match *row {
            [t, radius, ..] => Ok(LagrangeRadius { t, radius }),
            _ => Err(Error::parse(path, "expected time and radius")),
        }
    }

    /// All masses at `t`, the half-mass radius and which particles lie inside it
    ///
    /// With `neighbours` the radius and the mask are taken about the density
    /// centre, otherwise about the origin.
    pub fn masses_in_lagrange_radius(
        &self,
        t: f64,
        neighbours: Option<u32>,
    ) -> Result<LagrangeMembership> {
        let frame = self.frame(t)?;

        let centre = match neighbours {
            Some(neighbours) => self.center(t, CenterKind::Density { neighbours })?.x,
            None => NVec3::zeros(),
        };
        let radius = self.lagrange_radius(t, DEFAULT_FRACTION, neighbours)?.radius;

        let membership = LagrangeMembership::from_frame(&frame, &centre, radius);
        info!(
            "number of particles for half-mass radius {radius}: {}",
            membership.count_inside()
        );
        Ok(membership)
    }

    /// Density profile about the density centre
    ///
    /// `projection = None` gives the spherical profile (`sphereprof`), otherwise
    /// the profile projected along that line of sight (`projprof`).
    pub fn density_profile(&self, t: f64, projection: Option<[f64; 3]>) -> Result<DensityProfile> {
        let manipname = if projection.is_some() { "projprof" } else { "sphereprof" };

        let guard = self.guard(&format!("_{manipname}{t}"))?;
        let path = guard.path().display().to_string();

        let pars = projection
            .map(|p| p.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(","))
            .unwrap_or_default();

        let rows = self.manipulate(
            t,
            &format!("dens_centre+{manipname}"),
            &format!(";{pars}"),
            &format!(";{path}"),
            &guard,
        )?;
        if rows.is_empty() {
            return Err(Error::NotConverged {
                what: manipname.to_string(),
                t,
            });
        }

        let mut profile = DensityProfile::default();
        for row in rows {
            match *row {
                [r, rho, ..] => {
                    profile.radius.push(r);
                    profile.density.push(rho);
                }
                _ => return Err(Error::parse(path, "expected radius and density columns")),
            }
        }
        Ok(profile)
    }

    /// Virial ratio and energies with softening `eps`
    pub fn virial(&self, t: f64, eps: f64) -> Result<VirialRecord> {
        let guard = self.guard(&format!("{t}_vir.txt"))?;
        let pipeline = Pipeline::new(guard.path())
            .pipe(self.trim(t))
            .pipe(
                self.tool("snapvratio")
                    .arg("-")
                    .kv("wmode", "exact")
                    .kv("eps", eps)
                    .kv("newton", "t"),
            )
            .capture();
        self.runner().run(&pipeline)?;

        let source = guard.path().display().to_string();
        let rows = parse_rows(&source, &read_product(guard.path())?)?;
        let row = first_row(rows)
            .ok_or_else(|| Error::parse(&source, "snapvratio produced no output"))?;

        VirialRecord::from_row(&row).ok_or_else(|| {
            Error::parse(
                &source,
                format!(
                    "expected {} columns, got {}",
                    VirialRecord::COLUMNS,
                    row.len()
                ),
            )
        })
    }

    /// Centre-of-mass position, velocity and angular momentum at `t`
    pub fn momentum(&self, t: f64) -> Result<MomentumRecord> {
        let guard = self.guard(&format!("{t}_momentum.txt"))?;
        let pipeline = Pipeline::new(guard.path())
            .pipe(self.trim(t))
            .pipe(self.tool("snapkinem").arg("-").kv("weight", "m"))
            .capture();
        self.runner().run(&pipeline)?;

        let source = guard.path().display().to_string();
        parse_momentum(&source, &read_product(guard.path())?)
    }
}

/// Pick the `pos:`, `vel:` and `jvec:` lines out of `snapkinem` output
pub fn parse_momentum(source: &str, text: &str) -> Result<MomentumRecord> {
    let mut tagged = [None; 3];

    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        let slot = match tokens.next() {
            Some("pos:") => 0,
            Some("vel:") => 1,
            Some("jvec:") => 2,
            _ => continue,
        };
        let values = tokens
            .map(|tok| {
                tok.parse::<f64>()
                    .map_err(|_| Error::parse(source, format!("'{tok}' is not a number")))
            })
            .collect::<Result<Vec<_>>>()?;
        let vector = match *values {
            [norm, x, y, z, ..] => TaggedVector {
                norm,
                vec: NVec3::new(x, y, z),
            },
            _ => return Err(Error::parse(source, format!("short line '{}'", line.trim()))),
        };
        tagged[slot] = Some(vector);
    }

    let missing = |tag: &str| Error::parse(source, format!("no '{tag}' line"));
    Ok(MomentumRecord {
        pos: tagged[0].ok_or_else(|| missing("pos:"))?,
        vel: tagged[1].ok_or_else(|| missing("vel:"))?,
        jvec: tagged[2].ok_or_else(|| missing("jvec:"))?,
    })
}
