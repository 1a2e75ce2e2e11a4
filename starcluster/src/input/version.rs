//! Supported NbodyX integrators and their input parsers

use std::fmt;

use clap::ValueEnum;

use crate::error::Result;
use crate::input::layout::{parse_beijing, parse_nbody4, parse_nbody6, parse_nbody6pp};
use crate::input::record::InputRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum IntegratorVersion {
    #[value(name = "nbody4")]
    Nbody4,
    #[value(name = "nbody6")]
    Nbody6,
    #[value(name = "nbody6++gpu")]
    Nbody6ppGpu,
    #[value(name = "nbody6++gpu-beijing")]
    Nbody6ppGpuBeijing,
}

/// Parser for the non-blank, `D`-exponent-normalised lines of an input file
pub type InputParser = fn(&[String]) -> Result<InputRecord>;

impl IntegratorVersion {
    /// Number of KZ option flags the integrator reads
    pub fn kz_len(&self) -> usize {
        match self {
            IntegratorVersion::Nbody4 => 40,
            _ => 50,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            IntegratorVersion::Nbody4 => "nbody4",
            IntegratorVersion::Nbody6 => "nbody6",
            IntegratorVersion::Nbody6ppGpu => "nbody6++gpu",
            IntegratorVersion::Nbody6ppGpuBeijing => "nbody6++gpu-beijing",
        }
    }

    pub fn parser(&self) -> InputParser {
        match self {
            IntegratorVersion::Nbody4 => parse_nbody4,
            IntegratorVersion::Nbody6 => parse_nbody6,
            IntegratorVersion::Nbody6ppGpu => parse_nbody6pp,
            IntegratorVersion::Nbody6ppGpuBeijing => parse_beijing,
        }
    }
}

impl fmt::Display for IntegratorVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
