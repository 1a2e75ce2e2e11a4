//! Step-by-step decoding of Nbody6++GPU HDF5 snapshots
//!
//! [`Hdf5Snapshot`] walks the step groups of a file and yields one
//! [`StepFrame`] per group. Decoding order inside a group:
//! - the scalar block (fatal when missing or short)
//! - core single-star datasets (fatal when missing)
//! - stellar-evolution datasets (optional, a warning when absent)
//! - binaries / mergers, only when the scalars say there are any
//!
//! Positions are recentred on the density centre `RDENS` and the derived
//! per-particle quantities are filled in last.

use tracing::warn;

use crate::analysis::states::NVec3;
use crate::error::{Error, Result};
use crate::hdf5file::mapping::{dataset_name, FieldCode, Schema, SCALAR_COUNT, SCALAR_DATASET};
use crate::hdf5file::source::StepSource;

/// The scalar block of one step
#[derive(Debug, Clone, PartialEq)]
pub struct Scalars {
    values: Vec<f64>,
}

impl Scalars {
    /// Value by scalar name (`"TTOT"`, `"N_BINARY"`, ...)
    pub fn get(&self, name: &str) -> Option<f64> {
        let schema = Schema::validated().ok()?;
        let code = schema.scalar_code(name)?;
        self.values.get(code as usize - 1).copied()
    }

    pub fn raw(&self) -> &[f64] {
        &self.values
    }
}

/// Named columns of one optional dataset group (binaries, mergers, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleBlock {
    columns: Vec<(&'static str, Vec<f64>)>,
}

impl ParticleBlock {
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(n, _)| *n)
    }

    /// Rows in the block (length of the first column)
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, |(_, v)| v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stellar-evolution state of single stars
#[derive(Debug, Clone, PartialEq)]
pub struct StellarData {
    pub radius: Vec<f64>,      // R*
    pub luminosity: Vec<f64>,  // L*
    pub teff: Vec<f64>,        // Teff*
    pub core_radius: Vec<f64>, // RC*
    pub core_mass: Vec<f64>,   // MC*
    pub kw: Vec<f64>,          // stellar type
}

/// Single stars of one step, positions relative to the density centre
#[derive(Debug, Clone, PartialEq)]
pub struct Singles {
    pub x: Vec<NVec3>,
    pub v: Vec<NVec3>,
    pub mass: Vec<f64>,
    pub name: Vec<i64>,
    pub kind: Vec<i64>, // `Type` dataset
    pub aspn: Vec<f64>,
    pub stellar: Option<StellarData>,

    // derived
    pub rr: Vec<f64>,      // |x|
    pub vv: Vec<f64>,      // |v|
    pub lz_spec: Vec<f64>, // sqrt(x^2 + y^2) * sqrt(vx^2 + vy^2)
    pub lz: Vec<f64>,      // m * lz_spec
}

impl Singles {
    pub fn len(&self) -> usize {
        self.mass.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mass.is_empty()
    }
}

/// Everything decoded from one step group
#[derive(Debug, Clone, PartialEq)]
pub struct StepFrame {
    pub step: String,
    pub scalars: Scalars,
    pub singles: Singles,
    pub binaries: Option<ParticleBlock>,
    pub binaries_stellar: Option<ParticleBlock>,
    pub mergers: Option<ParticleBlock>,
    pub warnings: Vec<String>, // optional data that was expected but absent
}

impl StepFrame {
    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.scalars.get(name)
    }

    pub fn ttot(&self) -> f64 {
        self.scalars.values[0]
    }

    pub fn npairs(&self) -> i64 {
        self.scalars.values[1] as i64
    }

    pub fn n(&self) -> i64 {
        self.scalars.values[4] as i64
    }

    pub fn rdens(&self) -> NVec3 {
        NVec3::new(
            self.scalars.values[6],
            self.scalars.values[7],
            self.scalars.values[8],
        )
    }

    pub fn has_stellar_data(&self) -> bool {
        self.singles.stellar.is_some()
    }
}

/// Iterator over the steps of a snapshot file
pub struct Hdf5Snapshot<S> {
    source: S,
    keys: std::vec::IntoIter<String>,
    schema: &'static Schema,
}

impl<S: StepSource> Hdf5Snapshot<S> {
    pub fn new(source: S) -> Result<Self> {
        let schema = Schema::validated()?;
        let keys = source.step_keys()?.into_iter();
        Ok(Self {
            source,
            keys,
            schema,
        })
    }

    /// Decode one named step group
    pub fn decode(&self, step: &str) -> Result<StepFrame> {
        let mut warnings = Vec::new();

        // ---- scalars ---------------------------------------------------------
        let raw = self
            .source
            .read(step, SCALAR_DATASET)?
            .ok_or_else(|| Error::MissingDataset {
                step: step.to_string(),
                dataset: SCALAR_DATASET.to_string(),
            })?;
        if raw.len() < SCALAR_COUNT {
            return Err(Error::Validation(format!(
                "step '{step}': scalar block has {} entries, expected at least {SCALAR_COUNT}",
                raw.len()
            )));
        }
        let scalars = Scalars { values: raw };

        // ---- singles ---------------------------------------------------------
        let core = self.read_required(step, self.schema.singles)?;
        let n = core[0].len();
        let stellar = match self.read_optional(step, self.schema.singles_hr, n)? {
            Some(cols) => Some(stellar_from_columns(cols)),
            None => {
                note(
                    &mut warnings,
                    format!(
                        "step '{step}': found no stellar evolution data, \
                         to enable HR output adjust KZ(12)"
                    ),
                );
                None
            }
        };
        let rdens = NVec3::new(scalars.values[6], scalars.values[7], scalars.values[8]);
        let singles = singles_from_columns(core, stellar, &rdens);

        // ---- binaries and mergers -------------------------------------------
        let n_binary = scalars.values[68];
        let n_merger = scalars.values[69];

        let mut binaries = None;
        let mut binaries_stellar = None;
        if n_binary != 0.0 {
            binaries = self.read_block(step, self.schema.binaries, "binary", &mut warnings)?;
            if binaries.is_some() && singles.stellar.is_some() {
                let fields = self.schema.binaries_hr;
                binaries_stellar =
                    self.read_block(step, fields, "binary stellar", &mut warnings)?;
            }
        }

        let mergers = if n_merger != 0.0 {
            self.read_block(step, self.schema.mergers, "merger", &mut warnings)?
        } else {
            None
        };

        Ok(StepFrame {
            step: step.to_string(),
            scalars,
            singles,
            binaries,
            binaries_stellar,
            mergers,
            warnings,
        })
    }

    /// All datasets of `fields`, equal lengths
    fn read_required(&self, step: &str, fields: &[FieldCode]) -> Result<Vec<Vec<f64>>> {
        let mut columns = Vec::with_capacity(fields.len());
        for field in fields {
            let name = dataset_name(field);
            let values = self
                .source
                .read(step, &name)?
                .ok_or_else(|| Error::MissingDataset {
                    step: step.to_string(),
                    dataset: name.clone(),
                })?;
            columns.push(values);
        }
        check_lengths(step, fields, &columns, columns[0].len())?;
        Ok(columns)
    }

    /// `None` as soon as one dataset is missing; lengths must equal `n`
    fn read_optional(
        &self,
        step: &str,
        fields: &[FieldCode],
        n: usize,
    ) -> Result<Option<Vec<Vec<f64>>>> {
        let mut columns = Vec::with_capacity(fields.len());
        for field in fields {
            match self.source.read(step, &dataset_name(field))? {
                Some(values) => columns.push(values),
                None => return Ok(None),
            }
        }
        check_lengths(step, fields, &columns, n)?;
        Ok(Some(columns))
    }

    fn read_block(
        &self,
        step: &str,
        fields: &'static [FieldCode],
        what: &str,
        warnings: &mut Vec<String>,
    ) -> Result<Option<ParticleBlock>> {
        let mut columns = Vec::with_capacity(fields.len());
        for field in fields {
            match self.source.read(step, &dataset_name(field))? {
                Some(values) => columns.push((field.1, values)),
                None => {
                    note(
                        warnings,
                        format!(
                            "step '{step}': {what} dataset '{}' is missing",
                            dataset_name(field)
                        ),
                    );
                    return Ok(None);
                }
            }
        }
        Ok(Some(ParticleBlock { columns }))
    }
}

impl<S: StepSource> Iterator for Hdf5Snapshot<S> {
    type Item = Result<StepFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = self.keys.next()?;
        Some(self.decode(&step))
    }
}

#[cfg(feature = "hdf5")]
impl Hdf5Snapshot<crate::hdf5file::h5::H5Source> {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        Self::new(crate::hdf5file::h5::H5Source::open(path)?)
    }
}

fn note(warnings: &mut Vec<String>, message: String) {
    warn!("{message}");
    warnings.push(message);
}

fn check_lengths(step: &str, fields: &[FieldCode], columns: &[Vec<f64>], n: usize) -> Result<()> {
    for (field, column) in fields.iter().zip(columns) {
        if column.len() != n {
            return Err(Error::Validation(format!(
                "step '{step}': dataset '{}' has {} entries, expected {n}",
                dataset_name(field),
                column.len()
            )));
        }
    }
    Ok(())
}

fn stellar_from_columns(cols: Vec<Vec<f64>>) -> StellarData {
    let mut it = cols.into_iter();
    let mut next = || it.next().unwrap_or_default();
    StellarData {
        radius: next(),
        luminosity: next(),
        teff: next(),
        core_radius: next(),
        core_mass: next(),
        kw: next(),
    }
}

/// Columns in `SINGLE_FIELDS` order: X1..3, V1..3, M, Name, Type, ASPN
fn singles_from_columns(
    cols: Vec<Vec<f64>>,
    stellar: Option<StellarData>,
    rdens: &NVec3,
) -> Singles {
    let n = cols[0].len();

    let x: Vec<NVec3> = (0..n)
        .map(|i| NVec3::new(cols[0][i], cols[1][i], cols[2][i]) - rdens)
        .collect();
    let v: Vec<NVec3> = (0..n)
        .map(|i| NVec3::new(cols[3][i], cols[4][i], cols[5][i]))
        .collect();
    let mass = cols[6].clone();

    let rr = x.iter().map(|x| x.norm()).collect();
    let vv = v.iter().map(|v| v.norm()).collect();
    let lz_spec: Vec<f64> = x
        .iter()
        .zip(&v)
        .map(|(x, v)| x.xy().norm() * v.xy().norm())
        .collect();
    let lz = lz_spec.iter().zip(&mass).map(|(l, m)| m * l).collect();

    Singles {
        name: cols[7].iter().map(|&c| c as i64).collect(),
        kind: cols[8].iter().map(|&c| c as i64).collect(),
        aspn: cols[9].clone(),
        x,
        v,
        mass,
        stellar,
        rr,
        vv,
        lz_spec,
        lz,
    }
}
