//! Human-readable summary of a parameter file

use tabled::{Table, Tabled};

use crate::input::descriptions::{kz_description, parameter_description, NO_DESCRIPTION, UNKNOWN_KZ};
use crate::input::record::InputRecord;
use crate::input::version::IntegratorVersion;

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct KzEntry {
    #[tabled(rename = "KZ")]
    pub index: usize,
    #[tabled(rename = "Value")]
    pub value: i64,
    #[tabled(rename = "Meaning")]
    pub meaning: &'static str,
}

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct FieldEntry {
    #[tabled(rename = "Parameter")]
    pub name: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Description")]
    pub description: &'static str,
}

/// Non-zero KZ options and all other fields, each with its meaning
#[derive(Debug, Clone, PartialEq)]
pub struct InputSummary {
    pub version: IntegratorVersion,
    pub kz: Vec<KzEntry>,
    pub fields: Vec<FieldEntry>,
}

impl InputSummary {
    pub fn new(record: &InputRecord) -> Self {
        Self {
            version: record.version,
            kz: nonzero_kz(&record.kz, record.version),
            fields: record
                .fields
                .iter()
                .map(|(name, value)| FieldEntry {
                    name: name.clone(),
                    value: value.to_string(),
                    description: parameter_description(name).unwrap_or(NO_DESCRIPTION),
                })
                .collect(),
        }
    }

    /// Summary of a bare flag list (`--kz`)
    pub fn from_kz(kz: &[i64], version: IntegratorVersion) -> Self {
        Self {
            version,
            kz: nonzero_kz(kz, version),
            fields: Vec::new(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!("Input summary ({})\n\nNon-zero KZ parameters:\n", self.version);
        if self.kz.is_empty() {
            out.push_str("  none\n");
        } else {
            out.push_str(&Table::new(&self.kz).to_string());
            out.push('\n');
        }

        if !self.fields.is_empty() {
            out.push_str("\nOther parameters:\n");
            out.push_str(&Table::new(&self.fields).to_string());
            out.push('\n');
        }
        out
    }
}

fn nonzero_kz(kz: &[i64], version: IntegratorVersion) -> Vec<KzEntry> {
    kz.iter()
        .enumerate()
        .filter(|(_, value)| **value != 0)
        .map(|(k, value)| KzEntry {
            index: k + 1,
            value: *value,
            meaning: kz_description(version, k + 1).unwrap_or(UNKNOWN_KZ),
        })
        .collect()
}
