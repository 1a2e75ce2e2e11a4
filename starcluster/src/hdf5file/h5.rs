//! `StepSource` backed by an `.h5part` file

use std::path::Path;

use tracing::debug;

use crate::error::{require_exists, Result};
use crate::hdf5file::source::StepSource;

pub struct H5Source {
    file: hdf5::File,
}

impl H5Source {
    pub fn open(path: &Path) -> Result<Self> {
        require_exists(path)?;
        debug!("opening {}", path.display());
        Ok(Self {
            file: hdf5::File::open(path)?,
        })
    }
}

impl StepSource for H5Source {
    fn step_keys(&self) -> Result<Vec<String>> {
        Ok(self.file.member_names()?)
    }

    fn read(&self, step: &str, dataset: &str) -> Result<Option<Vec<f64>>> {
        let group = self.file.group(step)?;
        if !group.link_exists(dataset) {
            return Ok(None);
        }
        let values = group.dataset(dataset)?.read_raw::<f64>()?;
        Ok(Some(values))
    }
}
