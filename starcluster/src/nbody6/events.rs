//! Event counters from `event.35`
//!
//! The file is written with KZ(19) or KZ(27) enabled: a header line of
//! column names followed by rows of counters. The last header name stands
//! for a block of 16 per-type counters (`NTYPE_0 .. NTYPE_15`).

use std::path::Path;

use crate::error::{require_exists, Error, Result};

/// Columns the last header name expands into
pub const TYPE_COLUMNS: usize = 16;

/// Known counters and what they count
pub static EVENT_DESCRIPTIONS: [(&str, &str); 16] = [
    ("NDISS", "Tidal dissipations at pericentre (#27 > 0)"),
    ("NTIDE", "Tidal captures from hyperbolic motion (#27 > 0)"),
    ("NSYNC", "Number of synchronous binaries (#27 > 0)"),
    ("NCOLL", "Stellar collisions"),
    ("NCOAL", "Stellar coalescence"),
    ("NDD", "Double WD/NS/BH binaries"),
    ("NCIRC", "Circularized binaries (#27 > 0)"),
    ("NROCHE", "Roche stage triggered times"),
    ("NRO", "Roche binary events"),
    ("NCE", "Common envelope binaries"),
    ("NHYP", "Hyperbolic collision"),
    ("NHYPC", "Hyperbolic common envelope binaries"),
    ("NKICK", "WD/NS/BH kick"),
    ("NSESC", "Escaped single particles (#23 > 0)"),
    ("NBESC", "Escaped binaries (#23 > 0)"),
    ("NMESC", "Escaped mergers (#15 > 0&&#23 > 0)"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct EventTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl EventTable {
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let k = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[k]).collect())
    }

    /// First column, the time of each row
    pub fn times(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row[0]).collect()
    }

    /// Position of the per-type counter for stellar type `kind`
    pub fn type_column(&self, kind: usize) -> Option<usize> {
        if kind >= TYPE_COLUMNS || self.columns.len() < TYPE_COLUMNS {
            return None;
        }
        Some(self.columns.len() - TYPE_COLUMNS + kind)
    }
}

pub fn parse_events(text: &str, source: &str) -> Result<EventTable> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| Error::parse(source, "empty event file"))?
        .split_whitespace()
        .collect();
    let Some((last, names)) = header.split_last() else {
        return Err(Error::parse(source, "event header has no columns"));
    };

    let mut columns: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    columns.extend((0..TYPE_COLUMNS).map(|i| format!("{last}_{i}")));

    let mut rows = Vec::new();
    for (k, line) in lines.enumerate() {
        let row = line
            .split_whitespace()
            .map(|tok| {
                tok.replace(['D', 'd'], "E")
                    .parse::<f64>()
                    .map_err(|_| {
                        Error::parse(source, format!("row {}: '{tok}' is not a number", k + 1))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        if row.len() != columns.len() {
            return Err(Error::parse(
                source,
                format!("row {}: {} values for {} columns", k + 1, row.len(), columns.len()),
            ));
        }
        rows.push(row);
    }

    Ok(EventTable { columns, rows })
}

pub fn parse_events_file(path: &Path) -> Result<EventTable> {
    require_exists(path)?;
    parse_events(&std::fs::read_to_string(path)?, &path.display().to_string())
}

/// What happened to one counter over the run
#[derive(Debug, Clone, PartialEq)]
pub struct EventSummary {
    pub name: &'static str,
    pub description: &'static str,
    pub max: f64,
    pub changes: Vec<(f64, f64)>, // (new counter value, time it first appeared)
}

/// Summaries for the known counters present in the table
pub fn summarize_events(table: &EventTable) -> Vec<EventSummary> {
    let times = table.times();
    let mut summaries = Vec::new();

    for &(name, description) in EVENT_DESCRIPTIONS.iter() {
        let Some(values) = table.column(name) else {
            continue;
        };

        // Distinct values in order of first appearance
        let mut seen: Vec<(f64, f64)> = Vec::new();
        for (v, t) in values.iter().zip(&times) {
            if !seen.iter().any(|(s, _)| s == v) {
                seen.push((*v, *t));
            }
        }

        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        summaries.push(EventSummary {
            name,
            description,
            max,
            changes: seen.into_iter().skip(1).collect(),
        });
    }

    summaries
}
