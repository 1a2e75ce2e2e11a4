//! Crate-wide error type
//!
//! One variant per failure class a script can hit:
//! - missing inputs and invalid parameters are reported before any work
//! - external NEMO tools exiting non-zero carry the failing command line
//! - estimator non-convergence (e.g. `dens_centre`) is its own variant so
//!   callers can choose to skip the timestamp instead of aborting
//! - absent HDF5 datasets that the decoder cannot do without

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input file does not exist: {0}")]
    MissingInput(PathBuf),

    #[error("invalid parameter: {0}")]
    Validation(String),

    #[error("command `{command}` failed: {status}")]
    ProcessFailed { command: String, status: String },

    #[error("'{what}' did not converge for t={t}")]
    NotConverged { what: String, t: f64 },

    #[error("missing dataset '{dataset}' in step '{step}'")]
    MissingDataset { step: String, dataset: String },

    #[error("failed to parse {source_name}: {message}")]
    Parse { source_name: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to render plot: {0}")]
    Plot(String),

    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

impl Error {
    /// Parse error tagged with where the text came from (file name, tool output, ...)
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether the error only signals that a numeric estimator gave up
    pub fn is_not_converged(&self) -> bool {
        matches!(self, Error::NotConverged { .. })
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Fail with [`Error::MissingInput`] unless `path` exists
pub fn require_exists(path: impl AsRef<std::path::Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        Ok(())
    } else {
        Err(Error::MissingInput(path.to_path_buf()))
    }
}
