//! Time-indexed numeric table
//!
//! Rows are keyed by simulation time. Inserting a time that is already
//! present replaces that row, so a log that repeats a step (restarts) keeps
//! only the latest values.

use std::path::Path;

use tabled::builder::Builder;

use crate::error::{Error, Result};

/// Name of the index column in CSV dumps
pub const INDEX_COLUMN: &str = "t";

/// How a table is printed to the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFormat {
    pub precision: usize,        // digits after the decimal point
    pub max_rows: Option<usize>, // show head and tail only when longer
}

impl Default for TableFormat {
    fn default() -> Self {
        Self {
            precision: 6,
            max_rows: Some(20),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeTable {
    columns: Vec<String>,
    index: Vec<f64>,
    rows: Vec<Vec<f64>>,
}

impl TimeTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            index: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &[f64] {
        &self.index
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Set the row for time `t`, replacing an existing row with the same time
    pub fn insert(&mut self, t: f64, values: Vec<f64>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::Validation(format!(
                "row at t={t} has {} values for {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        match self.index.iter().position(|&s| s == t) {
            Some(k) => self.rows[k] = values,
            None => {
                self.index.push(t);
                self.rows.push(values);
            }
        }
        Ok(())
    }

    pub fn row(&self, t: f64) -> Option<&[f64]> {
        self.index
            .iter()
            .position(|&s| s == t)
            .map(|k| self.rows[k].as_slice())
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let k = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[k]).collect())
    }

    /// Copy holding only `names`, in that order
    pub fn select(&self, names: &[&str]) -> Result<TimeTable> {
        let positions = names
            .iter()
            .map(|name| {
                self.columns
                    .iter()
                    .position(|c| c == name)
                    .ok_or_else(|| Error::Validation(format!("unknown column '{name}'")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TimeTable {
            columns: names.iter().map(|n| n.to_string()).collect(),
            index: self.index.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| positions.iter().map(|&k| row[k]).collect())
                .collect(),
        })
    }

    /// Copy with times multiplied by `time_factor` and values by `factor`
    pub fn scaled(&self, time_factor: f64, factor: f64) -> TimeTable {
        self.mapped(time_factor, |v| v * factor)
    }

    /// Copy with times multiplied by `time_factor` and `f` applied to every value
    pub fn mapped(&self, time_factor: f64, f: impl Fn(f64) -> f64) -> TimeTable {
        TimeTable {
            columns: self.columns.clone(),
            index: self.index.iter().map(|t| t * time_factor).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(|v| f(*v)).collect())
                .collect(),
        }
    }

    // =====================================================================
    // CSV
    // =====================================================================

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let header = std::iter::once(INDEX_COLUMN).chain(self.columns.iter().map(String::as_str));
        writer.write_record(header)?;
        for (t, row) in self.index.iter().zip(&self.rows) {
            writer.write_record(std::iter::once(t).chain(row).map(|v| v.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let source = path.display().to_string();
        let mut reader = csv::Reader::from_path(path)?;

        let columns: Vec<String> = reader.headers()?.iter().skip(1).map(str::to_string).collect();
        let mut table = TimeTable::new(columns);

        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let values = record
                .iter()
                .map(|field| {
                    field.trim().parse::<f64>().map_err(|_| {
                        let msg = format!("record {}: '{field}' is not a number", line + 1);
                        Error::parse(&source, msg)
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let Some((t, rest)) = values.split_first() else {
                continue;
            };
            table
                .insert(*t, rest.to_vec())
                .map_err(|e| Error::parse(&source, e.to_string()))?;
        }
        Ok(table)
    }

    // =====================================================================
    // Terminal output
    // =====================================================================

    pub fn render(&self, format: &TableFormat) -> String {
        let mut builder = Builder::default();
        builder.push_record(
            std::iter::once(INDEX_COLUMN.to_string()).chain(self.columns.iter().cloned()),
        );

        let prec = format.precision;
        let fmt_row = |t: f64, row: &[f64]| -> Vec<String> {
            std::iter::once(t)
                .chain(row.iter().copied())
                .map(|v| format!("{v:.prec$}"))
                .collect()
        };

        let n = self.len();
        match format.max_rows {
            Some(max) if n > max => {
                let head = max.div_ceil(2);
                let tail = max - head;
                for k in 0..head {
                    builder.push_record(fmt_row(self.index[k], &self.rows[k]));
                }
                builder.push_record(vec!["...".to_string(); self.columns.len() + 1]);
                for k in (n - tail)..n {
                    builder.push_record(fmt_row(self.index[k], &self.rows[k]));
                }
            }
            _ => {
                for (t, row) in self.index.iter().zip(&self.rows) {
                    builder.push_record(fmt_row(*t, row));
                }
            }
        }

        builder.build().to_string()
    }
}
