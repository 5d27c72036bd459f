//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::sim::{FleetHandle, FleetSimulation};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fleet: FleetHandle,
}

impl AppState {
    /// Build the state together with the simulation the caller must spawn
    pub fn new(config: Config) -> (Self, FleetSimulation) {
        let config = Arc::new(config);

        // Initialize the fleet with the configured starting vehicles
        let (simulation, fleet) =
            FleetSimulation::new(config.fleet(), config.vehicles.iter().cloned());

        (Self { config, fleet }, simulation)
    }
}
