pub mod states;
pub mod params;
pub mod energy;
pub mod lagrange;
pub mod binaries;
pub mod mass;
