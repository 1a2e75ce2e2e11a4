pub mod table;
pub mod log;
pub mod events;
pub mod global;
pub mod lagr;
pub mod mergers;
