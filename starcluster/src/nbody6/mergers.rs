//! Merger statistics of a run
//!
//! The number of mergers is the largest `NCOLL` counter in `event.35`; the
//! number of black holes the run started with is the stellar type 14 entry of
//! the per-type block in its first row. Masses of the merging pairs come from
//! `coll.13`.

use std::path::Path;

use crate::error::{require_exists, Error, Result};
use crate::nbody6::events::EventTable;
use crate::nbody6::log::parse_fortran;

/// SSE stellar type of black holes
pub const BLACK_HOLE_TYPE: usize = 14;

pub const COLLISION_COLUMN: &str = "NCOLL";

/// Primary and secondary mass columns of `coll.13`
pub const MASS_COLUMNS: (&str, &str) = ("M(I1)[M*]", "M(I2)[M*]");

/// Lines above the column header of `coll.13`
const COLL_PREAMBLE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergerCount {
    pub particles: f64, // black holes at the first output
    pub mergers: f64,   // largest collision counter
}

pub fn merger_count(events: &EventTable) -> Result<MergerCount> {
    let collisions = events
        .column(COLLISION_COLUMN)
        .ok_or_else(|| Error::Validation(format!("event table has no {COLLISION_COLUMN} column")))?;
    let Some(first) = events.rows.first() else {
        return Err(Error::Validation("event table has no rows".into()));
    };
    let k = events.type_column(BLACK_HOLE_TYPE).ok_or_else(|| {
        Error::Validation(format!("event table has no counter for type {BLACK_HOLE_TYPE}"))
    })?;

    Ok(MergerCount {
        particles: first[k],
        mergers: collisions.iter().copied().fold(0.0, f64::max),
    })
}

/// Collision records of `coll.13`
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl CollisionTable {
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let k = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[k]).collect())
    }

    /// `(M1, M2)` of every collision in units of M*
    pub fn pair_masses(&self) -> Result<Vec<(f64, f64)>> {
        let (first, second) = MASS_COLUMNS;
        let missing = |name: &str| Error::Validation(format!("collision table has no '{name}'"));
        let m1 = self.column(first).ok_or_else(|| missing(first))?;
        let m2 = self.column(second).ok_or_else(|| missing(second))?;
        Ok(m1.into_iter().zip(m2).collect())
    }
}

pub fn parse_collisions(text: &str, source: &str) -> Result<CollisionTable> {
    let mut lines = text
        .lines()
        .enumerate()
        .skip(COLL_PREAMBLE)
        .filter(|(_, l)| !l.trim().is_empty());

    let columns: Vec<String> = lines
        .next()
        .ok_or_else(|| Error::parse(source, "no collision header"))?
        .1
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (lineno, line) in lines {
        let bad = |msg: String| Error::parse(source, format!("line {}: {msg}", lineno + 1));
        let row = line
            .split_whitespace()
            .map(|tok| parse_fortran(tok).ok_or_else(|| bad(format!("'{tok}' is not a number"))))
            .collect::<Result<Vec<_>>>()?;
        if row.len() != columns.len() {
            return Err(bad(format!("{} values for {} columns", row.len(), columns.len())));
        }
        rows.push(row);
    }

    Ok(CollisionTable { columns, rows })
}

pub fn parse_collisions_file(path: &Path) -> Result<CollisionTable> {
    require_exists(path)?;
    parse_collisions(&std::fs::read_to_string(path)?, &path.display().to_string())
}
