//! Parsers for the standard output of Nbody6 / Nbody6++GPU runs
//!
//! Three kinds of lines are picked out of the log:
//! - `ADJUST:` lines with energy bookkeeping (`name value` pairs)
//! - output-stage lines (`RLAGR`, `AVMASS`, ...) with one value per mass fraction
//! - the single `PHYSICAL SCALING:` line with the unit conversion factors

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::error::{require_exists, Error, Result};
use crate::nbody6::table::TimeTable;

pub const ADJUST_MARKER: &str = "ADJUST:";

pub(crate) fn open_log(path: &Path) -> Result<BufReader<File>> {
    require_exists(path)?;
    Ok(BufReader::new(File::open(path)?))
}

/// Fortran double exponent (`1.0D+00`) to something `f64::from_str` accepts
pub(crate) fn parse_fortran(token: &str) -> Option<f64> {
    token.replace(['D', 'd'], "E").parse().ok()
}

// =========================================================================
// Adjust stage
// =========================================================================

/// One row per `ADJUST:` line, keyed by the time after the marker
///
/// Columns come from the first matching line. Overflowed fields (`*****`)
/// become NaN.
pub fn parse_adjust<R: BufRead>(reader: R, source: &str) -> Result<TimeTable> {
    let mut table: Option<TimeTable> = None;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?.replace("*****", " nan");
        let Some(at) = line.find(ADJUST_MARKER) else {
            continue;
        };
        let tokens: Vec<&str> = line[at..].split_whitespace().collect();
        let bad = |msg: String| Error::parse(source, format!("line {}: {msg}", lineno + 1));

        if tokens.len() < 3 {
            return Err(bad("ADJUST line without a time".into()));
        }
        let t = parse_fortran(tokens[2]).ok_or_else(|| bad(format!("bad time '{}'", tokens[2])))?;

        let names: Vec<String> = tokens
            .iter()
            .skip(3)
            .step_by(2)
            .map(|name| name.trim_end_matches('=').to_string())
            .collect();
        let values = tokens
            .iter()
            .skip(4)
            .step_by(2)
            .map(|tok| parse_fortran(tok).ok_or_else(|| bad(format!("'{tok}' is not a number"))))
            .collect::<Result<Vec<_>>>()?;

        let table = table.get_or_insert_with(|| TimeTable::new(names.clone()));
        if values.len() != table.columns().len() {
            return Err(bad(format!(
                "{} values for {} columns",
                values.len(),
                table.columns().len()
            )));
        }
        table.insert(t, values)?;
    }

    Ok(table.unwrap_or_default())
}

pub fn parse_adjust_file(path: &Path) -> Result<TimeTable> {
    parse_adjust(open_log(path)?, &path.display().to_string())
}

// =========================================================================
// Output stage
// =========================================================================

/// Quantities printed per mass fraction at every output time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputQuantity {
    Rlagr,
    Avmass,
    Npartc,
    Sigr2,
    Sigt2,
    Vrot,
}

impl OutputQuantity {
    pub const ALL: [OutputQuantity; 6] = [
        OutputQuantity::Rlagr,
        OutputQuantity::Avmass,
        OutputQuantity::Npartc,
        OutputQuantity::Sigr2,
        OutputQuantity::Sigt2,
        OutputQuantity::Vrot,
    ];

    /// Text that identifies the line in the log
    pub fn marker(&self) -> &'static str {
        match self {
            OutputQuantity::Rlagr => "RLAGR",
            OutputQuantity::Avmass => "AVMASS",
            OutputQuantity::Npartc => "NPARTC",
            OutputQuantity::Sigr2 => "SIGR2",
            OutputQuantity::Sigt2 => "SIGT2",
            OutputQuantity::Vrot => "VROT",
        }
    }

    pub fn from_marker(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.marker().eq_ignore_ascii_case(name))
    }

    /// Factor that converts the quantity to astrophysical units
    pub fn astro_factor(&self, scaling: &PhysicalScaling) -> f64 {
        match self {
            OutputQuantity::Rlagr => scaling.r,
            OutputQuantity::Avmass => scaling.m,
            OutputQuantity::Npartc => 1.0,
            OutputQuantity::Sigr2 | OutputQuantity::Sigt2 | OutputQuantity::Vrot => scaling.v,
        }
    }

    /// Values spread over decades, plotted on a log axis
    pub fn log_scale(&self) -> bool {
        *self != OutputQuantity::Vrot
    }
}

/// Column names of the output-stage lines
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    pub columns: Vec<String>,
}

/// Lagrangian mass fractions followed by the core-radius column
pub const FULL_COLUMNS: [&str; 19] = [
    "0.001", "0.003", "0.005", "0.01", "0.03", "0.05", "0.1", "0.2", "0.3", "0.4", "0.5",
    "0.6", "0.7", "0.8", "0.9", "0.95", "0.99", "1.0", "<RC",
];

/// Subset used for plots
pub const PLOT_COLUMNS: [&str; 7] = ["0.01", "0.1", "0.3", "0.5", "0.9", "1.0", "<RC"];

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            columns: FULL_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// One table per output quantity, in [`OutputQuantity::ALL`] order
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTables {
    pub tables: Vec<(OutputQuantity, TimeTable)>,
}

impl OutputTables {
    pub fn get(&self, quantity: OutputQuantity) -> Option<&TimeTable> {
        self.tables
            .iter()
            .find(|(q, _)| *q == quantity)
            .map(|(_, table)| table)
    }
}

/// Collect output-stage lines
///
/// A line belongs to the first quantity whose marker it contains. Lines whose
/// first token is not a number (column headers) are skipped.
pub fn parse_output<R: BufRead>(
    reader: R,
    source: &str,
    layout: &OutputLayout,
) -> Result<OutputTables> {
    let mut tables: Vec<(OutputQuantity, TimeTable)> = OutputQuantity::ALL
        .iter()
        .map(|q| (*q, TimeTable::new(layout.columns.clone())))
        .collect();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(slot) = OutputQuantity::ALL
            .iter()
            .position(|q| line.contains(q.marker()))
        else {
            continue;
        };

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(t) = tokens.first().and_then(|tok| parse_fortran(tok)) else {
            debug!("{source}:{}: skipping header line", lineno + 1);
            continue;
        };

        let bad = |msg: String| Error::parse(source, format!("line {}: {msg}", lineno + 1));
        let values = tokens
            .iter()
            .skip(2)
            .map(|tok| parse_fortran(tok).ok_or_else(|| bad(format!("'{tok}' is not a number"))))
            .collect::<Result<Vec<_>>>()?;
        if values.len() != layout.columns.len() {
            return Err(bad(format!(
                "{} values for {} columns",
                values.len(),
                layout.columns.len()
            )));
        }

        tables[slot].1.insert(t, values)?;
    }

    Ok(OutputTables { tables })
}

pub fn parse_output_file(path: &Path, layout: &OutputLayout) -> Result<OutputTables> {
    parse_output(open_log(path)?, &path.display().to_string(), layout)
}

// =========================================================================
// Physical scaling
// =========================================================================

/// N-body to astrophysical unit factors (pc, Msun, km/s, Myr)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalScaling {
    pub r: f64, // R*
    pub m: f64, // M*
    pub v: f64, // V*
    pub t: f64, // T*
}

const SCALING_PATTERN: &str = r"(?x)
    PHYSICAL\ SCALING:             # header
    \s*R\*\s*=\s*([0-9E+.\-]+)     # R*
    \s*M\*\s*=\s*([0-9E+.\-]+)     # M*
    \s*V\*\s*=\s*([0-9E+.\-]+)     # V*
    \s*T\*\s*=\s*([0-9E+.\-]+)     # T*
";

/// Scaling factors from the first `PHYSICAL SCALING:` line
pub fn parse_scaling<R: BufRead>(reader: R, source: &str) -> Result<PhysicalScaling> {
    let pattern = Regex::new(SCALING_PATTERN).map_err(|e| Error::parse(source, e.to_string()))?;

    for line in reader.lines() {
        let line = line?;
        let Some(caps) = pattern.captures(&line) else {
            continue;
        };
        let value = |k: usize| -> Result<f64> {
            caps[k]
                .parse()
                .map_err(|_| Error::parse(source, format!("bad scaling value '{}'", &caps[k])))
        };
        return Ok(PhysicalScaling {
            r: value(1)?,
            m: value(2)?,
            v: value(3)?,
            t: value(4)?,
        });
    }

    Err(Error::parse(source, "no PHYSICAL SCALING line found"))
}

pub fn parse_scaling_file(path: &Path) -> Result<PhysicalScaling> {
    parse_scaling(open_log(path)?, &path.display().to_string())
}
