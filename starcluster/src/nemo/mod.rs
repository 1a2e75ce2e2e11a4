pub mod runner;
pub mod guard;
pub mod snap;
pub mod manip;
pub mod transform;
