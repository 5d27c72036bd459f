//! Vehicle simulation modules

pub mod action;
pub mod fleet;
pub mod physics;
pub mod snapshot;
pub mod vehicle;

pub use fleet::{FleetConfig, FleetError, FleetHandle, FleetSimulation};
pub use physics::VehicleParams;
pub use vehicle::VehicleState;
