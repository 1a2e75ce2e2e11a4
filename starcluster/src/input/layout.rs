//! Fixed positional input layouts
//!
//! NbodyX codes read their parameters with list-directed Fortran `READ`s, so
//! an input file is a fixed sequence of lines: a few header lines of named
//! values, a run of KZ option lines, then more named values. Lines past the
//! last one a layout knows about (extra input for special initial
//! conditions) are ignored.

use std::path::Path;

use tracing::debug;

use crate::error::{require_exists, Error, Result};
use crate::input::kz::parse_kz_tokens;
use crate::input::namelist::parse_namelist;
use crate::input::record::{InputRecord, ParamValue};
use crate::input::version::IntegratorVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Int,
    Float,
}

/// One input line: value kind and field names, in order
struct LineSpec {
    kind: Kind,
    names: &'static [&'static str],
}

struct InputLayout {
    version: IntegratorVersion,
    header: &'static [LineSpec],
    kz_lines: usize,
    trailer: &'static [LineSpec],
}

const fn floats(names: &'static [&'static str]) -> LineSpec {
    LineSpec {
        kind: Kind::Float,
        names,
    }
}

const fn ints(names: &'static [&'static str]) -> LineSpec {
    LineSpec {
        kind: Kind::Int,
        names,
    }
}

const NBODY6_ETA: LineSpec = floats(&[
    "ETAI", "ETAR", "RS0", "DTADJ", "DELTAT", "TCRIT", "QE", "RBAR", "ZMBAR",
]);

const NBODY6_IMF: LineSpec = floats(&[
    "ALPHA", "BODY1", "BODYN", "NBIN0", "NHI0", "ZMET", "EPOCH0", "DTPLOT",
]);

static NBODY6: InputLayout = InputLayout {
    version: IntegratorVersion::Nbody6,
    header: &[
        floats(&["KSTART", "TCOMP"]),
        ints(&["N", "NFIX", "NCRIT", "NRAND", "NNBMAX", "NRUN"]),
        NBODY6_ETA,
    ],
    kz_lines: 5,
    trailer: &[
        floats(&["DTMIN", "RMIN", "ETAU", "ECLOSE", "GMIN", "GMAX"]),
        NBODY6_IMF,
        floats(&["Q", "VXROT", "VZROT", "RTIDE", "SMAX"]),
    ],
};

static NBODY6PP: InputLayout = InputLayout {
    version: IntegratorVersion::Nbody6ppGpu,
    header: &[
        floats(&["KSTART", "TCOMP", "TCRTP0", "isernb", "iserreg", "iserks"]),
        ints(&["N", "NFIX", "NCRIT", "NRAND", "NNBOPT", "NRUN", "NCOMM"]),
        NBODY6_ETA,
    ],
    kz_lines: 5,
    trailer: &[
        floats(&["DTMIN", "RMIN", "ETAU", "ECLOSE", "GMIN", "GMAX", "SMAX"]),
        NBODY6_IMF,
        floats(&["Q", "VXROT", "VZROT", "RTIDE"]),
    ],
};

static NBODY4: InputLayout = InputLayout {
    version: IntegratorVersion::Nbody4,
    header: &[
        floats(&["KSTART", "TCOMP", "GPID"]),
        ints(&["N", "NFIX", "NCRIT", "NRAND", "NRUN"]),
        floats(&["ETA", "DTADJ", "DELTAT", "TCRIT", "QE", "RBAR", "ZMBAR"]),
    ],
    kz_lines: 4,
    trailer: &[
        floats(&["DTMIN", "RMIN", "ETAU", "ECLOSE", "GMIN", "GMAX"]),
        floats(&["ALPHA", "BODY1", "BODYN", "NBIN0", "ZMET", "EPOCH0", "DTPLOT"]),
        floats(&["Q", "VXROT", "VZROT", "RTIDE"]),
        // point-mass galaxy only
        floats(&["GMG", "RG0"]),
    ],
};

fn parse_line(record: &mut InputRecord, spec: &LineSpec, line: &str, lineno: usize) -> Result<()> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != spec.names.len() {
        return Err(Error::Validation(format!(
            "line {lineno} should hold {} values ({}), got {}",
            spec.names.len(),
            spec.names.join(" "),
            tokens.len()
        )));
    }

    for (name, tok) in spec.names.iter().zip(tokens) {
        let value = match spec.kind {
            Kind::Int => tok.parse::<i64>().map(ParamValue::Int).map_err(|_| {
                let msg = format!("line {lineno}: {name} should be an integer, got '{tok}'");
                Error::Validation(msg)
            })?,
            Kind::Float => tok.parse::<f64>().map(ParamValue::Float).map_err(|_| {
                Error::Validation(format!("line {lineno}: {name} should be a number, got '{tok}'"))
            })?,
        };
        record.set(name, value);
    }
    Ok(())
}

fn parse_layout(layout: &InputLayout, lines: &[String]) -> Result<InputRecord> {
    let expected = layout.header.len() + layout.kz_lines + layout.trailer.len();
    if lines.len() < expected {
        return Err(Error::Validation(format!(
            "{} input needs {expected} non-blank lines, got {}",
            layout.version,
            lines.len()
        )));
    }

    let mut record = InputRecord::new(layout.version);
    let mut at = 0;

    for spec in layout.header {
        parse_line(&mut record, spec, &lines[at], at + 1)?;
        at += 1;
    }

    let kz_text = lines[at..at + layout.kz_lines].join(" ");
    record.kz = parse_kz_tokens(kz_text.split_whitespace(), layout.version)?;
    at += layout.kz_lines;

    for spec in layout.trailer {
        parse_line(&mut record, spec, &lines[at], at + 1)?;
        at += 1;
    }

    if lines.len() > at {
        debug!("ignoring {} extra input lines", lines.len() - at);
    }
    Ok(record)
}

pub fn parse_nbody6(lines: &[String]) -> Result<InputRecord> {
    parse_layout(&NBODY6, lines)
}

pub fn parse_nbody6pp(lines: &[String]) -> Result<InputRecord> {
    parse_layout(&NBODY6PP, lines)
}

pub fn parse_nbody4(lines: &[String]) -> Result<InputRecord> {
    parse_layout(&NBODY4, lines)
}

/// Nbody6++GPU-beijing accepts both the positional format and a namelist
pub fn parse_beijing(lines: &[String]) -> Result<InputRecord> {
    match parse_layout(&NBODY6PP, lines) {
        Ok(mut record) => {
            record.version = IntegratorVersion::Nbody6ppGpuBeijing;
            Ok(record)
        }
        Err(positional) => {
            debug!("positional parse failed ({positional}), trying namelist");
            parse_namelist(&lines.join("\n"), IntegratorVersion::Nbody6ppGpuBeijing).map_err(
                |namelist| {
                    Error::Validation(format!(
                        "not a positional input ({positional}) nor a namelist ({namelist})"
                    ))
                },
            )
        }
    }
}

/// Non-blank, trimmed lines with Fortran `D` exponents turned into `E`
///
/// Only tokens that are numbers after the replacement are touched, so
/// namelist keys such as `DTADJ` survive.
pub fn prepare_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split_whitespace()
                .map(fortran_exponent)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn fortran_exponent(token: &str) -> String {
    let converted = token.replace(['D', 'd'], "E");
    if converted != token && converted.parse::<f64>().is_ok() {
        converted
    } else {
        token.to_string()
    }
}

/// Read and parse an input file for `version`
pub fn read_input_file(path: &Path, version: IntegratorVersion) -> Result<InputRecord> {
    require_exists(path)?;
    let text = std::fs::read_to_string(path)?;
    (version.parser())(&prepare_lines(&text))
}
