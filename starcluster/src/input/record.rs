//! Parsed integrator parameter file

use std::fmt;

use crate::input::version::IntegratorVersion;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v:?}"),
            ParamValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Named fields in file order plus the KZ option flags
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    pub version: IntegratorVersion,
    pub fields: Vec<(String, ParamValue)>,
    pub kz: Vec<i64>, // KZ(1) is kz[0]
}

impl InputRecord {
    pub fn new(version: IntegratorVersion) -> Self {
        Self {
            version,
            fields: Vec::new(),
            kz: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Set a field, keeping the position of an existing one
    pub fn set(&mut self, name: &str, value: ParamValue) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// 1-based KZ option
    pub fn kz(&self, index: usize) -> Option<i64> {
        index.checked_sub(1).and_then(|k| self.kz.get(k)).copied()
    }
}
