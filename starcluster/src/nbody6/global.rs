//! Global cluster diagnostics from `global.30`
//!
//! Nbody6++GPU appends one row per output time: a header line, then
//! whitespace separated values in the fixed order of [`GLOBAL_COLUMNS`].

use std::io::BufRead;
use std::path::Path;

use crate::error::{Error, Result};
use crate::nbody6::log::{open_log, parse_fortran};
use crate::nbody6::table::TimeTable;

/// Column names of `global.30`; the first one is the time index
pub const GLOBAL_COLUMNS: [&str; 64] = [
    "TIME[NB]", "TIME[Myr]", "TCR[Myr]", "DE", "BE(3)", "RSCALE[PC]", "RTIDE[PC]", "RDENS[PC]",
    "RC[PC]", "RHOD[M*]", "RHOM[M*]", "MC[M*]", "CMAX", "<Cn>", "Ir/R", "RCM", "VCM", "AZ",
    "EB/E", "EM/E", "VRMS", "N", "NS", "NPAIRS", "NUPKS", "NPKS", "NMERGE", "MULT", "<NB>", "NC",
    "NESC", "NSTEPI", "NSTEPB", "NSTEPR", "NSTEPU", "NSTEPT", "NSTEPQ", "NSTEPC", "NBLOCK",
    "NBLCKR", "NNPRED", "NBCORR", "NBFLUX", "NBFULL", "NBVOID", "NICONV", "NLSMIN", "NBSMIN",
    "NBDIS", "NBDIS2", "NCMDER", "NFAST", "NBFAST", "NKSTRY", "NKSREG", "NKSHYP", "NKSPER",
    "NKSMOD", "NTTRY", "NTRIP", "NQUAD", "NCHAIN", "NMERG", "NEWHI",
];

pub const TIDAL_RADIUS_COLUMN: &str = "RTIDE[PC]";

/// Rows of `global.30` keyed by `TIME[NB]`
pub fn parse_global<R: BufRead>(reader: R, source: &str) -> Result<TimeTable> {
    let columns = GLOBAL_COLUMNS[1..].iter().map(|c| c.to_string()).collect();
    let mut table = TimeTable::new(columns);

    // The first line is the header
    for (lineno, line) in reader.lines().enumerate().skip(1) {
        let line = line?.replace("*****", " nan");
        if line.trim().is_empty() {
            continue;
        }
        let bad = |msg: String| Error::parse(source, format!("line {}: {msg}", lineno + 1));

        let values = line
            .split_whitespace()
            .map(|tok| parse_fortran(tok).ok_or_else(|| bad(format!("'{tok}' is not a number"))))
            .collect::<Result<Vec<_>>>()?;
        if values.len() != GLOBAL_COLUMNS.len() {
            return Err(bad(format!(
                "{} values for {} columns",
                values.len(),
                GLOBAL_COLUMNS.len()
            )));
        }
        table.insert(values[0], values[1..].to_vec())?;
    }

    Ok(table)
}

pub fn parse_global_file(path: &Path) -> Result<TimeTable> {
    parse_global(open_log(path)?, &path.display().to_string())
}
