//! Configuration types for the analysis tools, loaded from YAML.
//!
//! This module defines a thin, `serde`-deserializable description of how the
//! scripts reach the external tools and of the defaults they use:
//!
//! - [`NemoConfig`]     – where the NEMO binaries live and how frames are cut
//! - [`DensityConfig`]  – parameters forwarded to `dens_centre`
//! - [`BinaryConfig`]   – guard rails for the O(N^2) binary scan
//! - [`ToolsConfig`]    – top-level wrapper used to load everything from YAML
//!
//! # YAML format
//! Every key is optional; missing keys keep their defaults.
//!
//! ```yaml
//! nemo:
//!   bin_dir: /opt/nemo/bin   # omit to use $PATH
//!   time_fuzz: 1.0e-6        # `timefuzz` passed to snaptrim
//!   keep_artifacts: false    # keep intermediate text files for debugging
//!
//! density:
//!   neighbours: 500          # SPH-like neighbour count for dens_centre
//!
//! binaries:
//!   warn_above: 2000         # warn when the pairwise scan gets this large
//! ```

use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{require_exists, Result};

/// How external NEMO programs are invoked
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct NemoConfig {
    pub bin_dir: Option<PathBuf>, // directory prefix for NEMO binaries, `None` = search $PATH
    pub time_fuzz: f64,           // tolerance when selecting a frame by time
    pub keep_artifacts: bool,     // keep intermediate files instead of removing them
}

impl Default for NemoConfig {
    fn default() -> Self {
        Self {
            bin_dir: None,
            time_fuzz: 1.0e-6,
            keep_artifacts: false,
        }
    }
}

impl NemoConfig {
    /// Resolve a program name against `bin_dir`
    pub fn program(&self, name: &str) -> String {
        match &self.bin_dir {
            Some(dir) => dir.join(name).to_string_lossy().into_owned(),
            None => name.to_string(),
        }
    }
}

/// Density-centre estimation
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DensityConfig {
    pub neighbours: u32, // number of neighbours in the SPH-like estimate
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self { neighbours: 500 }
    }
}

/// Binary detection settings
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BinaryConfig {
    pub warn_above: usize, // particle count above which the pairwise scan logs a warning
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self { warn_above: 2000 }
    }
}

/// Top-level configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ToolsConfig {
    pub nemo: NemoConfig,         // external tool invocation
    pub density: DensityConfig,   // density centre parameters
    pub binaries: BinaryConfig,   // binary scan limits
}

impl ToolsConfig {
    /// Load a configuration file; the file must exist
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        require_exists(path)?;
        let reader = BufReader::new(File::open(path)?);
        let cfg: ToolsConfig = serde_yaml::from_reader(reader)?;
        Ok(cfg)
    }

    /// Use the file if one was given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_yaml_file(path),
            None => Ok(Self::default()),
        }
    }
}
