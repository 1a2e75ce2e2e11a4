//! Fortran namelist input (Nbody6++GPU-beijing)
//!
//! ```text
//! &INNBODY6 KSTART=1 TCOMP=100000.0 TCRTP0=1.E6 /
//! &ININPUT N=1000 NFIX=1 NCRIT=10
//! KZ(1:10)= 1 2 1 0 1 0 4 0 0 2
//! ...
//! /
//! ```
//!
//! `KZ(a:b)=` ranges are placed at their 1-based indices; every other
//! `KEY=VALUE` pair is kept in the order it appears.

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::input::record::{InputRecord, ParamValue};
use crate::input::version::IntegratorVersion;

const KZ_PATTERN: &str = r"(?i)^KZ\(\s*(\d+)\s*:\s*(\d+)\s*\)\s*=\s*(.*)";
const PAIR_PATTERN: &str = r"([A-Za-z]\w*)\s*=\s*([^,/\s]+)";

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::parse("namelist pattern", e.to_string()))
}

pub fn parse_namelist(text: &str, version: IntegratorVersion) -> Result<InputRecord> {
    let kz_re = compile(KZ_PATTERN)?;
    let pair_re = compile(PAIR_PATTERN)?;

    let mut record = InputRecord::new(version);
    record.kz = vec![0; version.kz_len()];
    let mut kz_ranges = 0;

    for raw in text.lines() {
        let mut line = raw.trim();
        if line.is_empty() || line.starts_with('/') {
            continue;
        }
        // `&GROUP` opens a namelist group; the rest of the line may hold pairs
        if line.starts_with('&') {
            line = line
                .split_once(char::is_whitespace)
                .map_or("", |(_, rest)| rest.trim());
        }

        if let Some(caps) = kz_re.captures(line) {
            let (from, to) = (index(&caps[1])?, index(&caps[2])?);
            place_kz(&mut record.kz, from, to, &caps[3])?;
            kz_ranges += 1;
            continue;
        }

        for caps in pair_re.captures_iter(line) {
            let key = &caps[1];
            if key.to_ascii_uppercase().starts_with("KZ") {
                continue;
            }
            record.set(key, cast_value(&caps[2]));
        }
    }

    if record.fields.is_empty() && kz_ranges == 0 {
        return Err(Error::Validation(
            "no KEY=VALUE pairs or KZ(a:b)= ranges in namelist".into(),
        ));
    }

    debug!("namelist: {} fields, {kz_ranges} KZ ranges", record.fields.len());
    Ok(record)
}

fn index(text: &str) -> Result<usize> {
    text.parse()
        .map_err(|_| Error::Validation(format!("bad KZ index '{text}'")))
}

/// Put the values of `KZ(from:to)=` into `kz`
fn place_kz(kz: &mut [i64], from: usize, to: usize, rest: &str) -> Result<()> {
    if from == 0 || to < from || to > kz.len() {
        return Err(Error::Validation(format!(
            "KZ range {from}:{to} is outside 1:{}",
            kz.len()
        )));
    }

    let values: Vec<&str> = rest
        .split_whitespace()
        .map(|v| v.trim_end_matches(','))
        .filter(|v| !v.is_empty())
        .collect();

    let expected = to - from + 1;
    if values.len() != expected {
        return Err(Error::Validation(format!(
            "KZ indices {from}:{to} expect {expected} values but got {}",
            values.len()
        )));
    }

    for (slot, v) in kz[from - 1..to].iter_mut().zip(values) {
        *slot = v
            .parse()
            .map_err(|_| Error::Validation(format!("KZ value '{v}' is not an integer")))?;
    }
    Ok(())
}

/// Fortran literal to int, float, quoted string or the raw text
pub fn cast_value(raw: &str) -> ParamValue {
    let s = raw.trim_end_matches(',');
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        return ParamValue::Text(s.trim_matches('\'').to_string());
    }
    if let Ok(v) = s.parse::<i64>() {
        return ParamValue::Int(v);
    }
    if let Ok(v) = s.replace(['D', 'd'], "E").parse::<f64>() {
        return ParamValue::Float(v);
    }
    ParamValue::Text(s.to_string())
}
