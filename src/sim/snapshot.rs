//! Published fleet snapshots

use std::sync::Arc;

use parking_lot::RwLock;

use super::vehicle::VehicleState;

/// Immutable view of the whole fleet after a completed tick
#[derive(Debug, Clone, Default)]
pub struct FleetSnapshot {
    /// Simulation tick that produced this snapshot (0 = nothing simulated yet)
    pub tick: u64,
    pub vehicles: Vec<VehicleState>,
}

impl FleetSnapshot {
    pub fn vehicle(&self, name: &str) -> Option<&VehicleState> {
        self.vehicles.iter().find(|v| v.name == name)
    }
}

/// Single-writer, many-reader slot holding the latest snapshot.
///
/// The fleet task swaps in a whole new `Arc` after every tick; readers clone the `Arc`
/// and keep a consistent view no matter how many ticks run meanwhile.
#[derive(Debug, Default)]
pub struct SnapshotPublisher {
    latest: RwLock<Arc<FleetSnapshot>>,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: FleetSnapshot) {
        *self.latest.write() = Arc::new(snapshot);
    }

    pub fn latest(&self) -> Arc<FleetSnapshot> {
        self.latest.read().clone()
    }
}
