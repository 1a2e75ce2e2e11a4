pub mod mapping;
pub mod source;
pub mod snapshot;

#[cfg(feature = "hdf5")]
pub mod h5;
