pub mod error;
pub mod configuration;
pub mod analysis;
pub mod nemo;
pub mod hdf5file;
pub mod nbody6;
pub mod input;
pub mod visualization;

pub use error::{Error, Result};

pub use configuration::config::{ToolsConfig, NemoConfig, DensityConfig, BinaryConfig};

pub use analysis::states::{Particle, Frame, FrameLayout, ScaleFactors, NVec3};
pub use analysis::energy::{energies, nbody_scaling, Energies, NbodyScaling};
pub use analysis::lagrange::{lagrange_radius_about, lagrange_mask, tidal_mask, LagrangeMembership};
pub use analysis::binaries::{BinaryScan, BinaryPair};
pub use analysis::mass::MassModel;
pub use analysis::params::GyrfalconParameters;

pub use nemo::runner::{Stage, Pipeline, ToolRunner, ProcessRunner};
pub use nemo::guard::ArtifactGuard;
pub use nemo::snap::NemoSnapshot;
pub use nemo::manip::{CenterKind, Center, LagrangeRadius};
pub use nemo::manip::{VirialRecord, MomentumRecord, DensityProfile};

pub use hdf5file::source::{StepSource, MemorySource};
pub use hdf5file::snapshot::{Hdf5Snapshot, StepFrame};

pub use nbody6::table::{TimeTable, TableFormat};
pub use nbody6::log::{parse_adjust, parse_output, parse_scaling, OutputQuantity, PhysicalScaling};
pub use nbody6::events::{parse_events, summarize_events, EventSummary};
pub use nbody6::global::parse_global;
pub use nbody6::lagr::parse_fort14;
pub use nbody6::mergers::{merger_count, parse_collisions, CollisionTable, MergerCount};

pub use input::version::IntegratorVersion;
pub use input::record::{InputRecord, ParamValue};
pub use input::summary::InputSummary;

pub use visualization::plots::{render, render_grid, LinePlot, Series};
