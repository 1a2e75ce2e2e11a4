//! Lagrangian radii the integrator writes to `fort.14` during the run
//!
//! ```text
//! TIME  0.01  0.1  0.5  0.9
//! 0.0  -1.52 -0.83 -0.11  0.47
//! 1.0  -1.49 -0.82 -0.11  0.48
//! ```
//!
//! The header names the mass fractions after a time label; every row holds
//! the time followed by `log10(r)` for each fraction, in N-body units.

use std::io::BufRead;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::nbody6::log::{open_log, parse_fortran};
use crate::nbody6::table::TimeTable;

const GYR_PER_MYR: f64 = 1e-3;

/// One column of `log10(r)` per mass fraction, keyed by time
pub fn parse_fort14<R: BufRead>(reader: R, source: &str) -> Result<TimeTable> {
    let mut table: Option<TimeTable> = None;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            continue;
        };
        let bad = |msg: String| Error::parse(source, format!("line {}: {msg}", lineno + 1));

        let Some(t) = parse_fortran(first) else {
            if table.is_none() {
                table = Some(header(&tokens[1..]).map_err(bad)?);
            } else {
                debug!("{source}:{}: skipping repeated header", lineno + 1);
            }
            continue;
        };

        let Some(table) = table.as_mut() else {
            return Err(bad("data before the mass fraction header".into()));
        };
        let values = tokens[1..]
            .iter()
            .map(|tok| parse_fortran(tok).ok_or_else(|| bad(format!("'{tok}' is not a number"))))
            .collect::<Result<Vec<_>>>()?;
        if values.len() != table.columns().len() {
            return Err(bad(format!(
                "{} values for {} mass fractions",
                values.len(),
                table.columns().len()
            )));
        }
        table.insert(t, values)?;
    }

    table.ok_or_else(|| Error::parse(source, "no mass fraction header"))
}

fn header(names: &[&str]) -> std::result::Result<TimeTable, String> {
    if names.is_empty() {
        return Err("header lists no mass fractions".into());
    }
    for name in names {
        match name.parse::<f64>() {
            Ok(f) if f > 0.0 && f <= 1.0 => {}
            _ => return Err(format!("'{name}' is not a mass fraction")),
        }
    }
    Ok(TimeTable::new(names.iter().map(|n| n.to_string()).collect()))
}

pub fn parse_fort14_file(path: &Path) -> Result<TimeTable> {
    parse_fort14(open_log(path)?, &path.display().to_string())
}

/// Times in Gyr and radii in pc
pub fn lagrange_radii_astro(
    table: &TimeTable,
    time_unit_myr: f64,
    length_unit_pc: f64,
) -> TimeTable {
    table.mapped(GYR_PER_MYR * time_unit_myr, |log_r| {
        length_unit_pc * 10f64.powf(log_r)
    })
}

/// Legend label of a mass fraction column, `0.5` -> `50%`
pub fn fraction_label(column: &str) -> String {
    match column.parse::<f64>() {
        Ok(f) => format!("{}%", (f * 100.0).round() as i64),
        Err(_) => column.to_string(),
    }
}
