pub mod version;
pub mod record;
pub mod layout;
pub mod namelist;
pub mod kz;
pub mod descriptions;
pub mod summary;
