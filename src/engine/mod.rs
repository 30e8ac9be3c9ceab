pub mod batch;
pub mod simulation;

pub use batch::BatchRunner;
pub use simulation::{RunSettings, SimulationRun};
