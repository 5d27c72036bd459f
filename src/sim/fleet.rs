//! Fleet ownership and the fixed-interval simulation loop

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::util::time::Timer;

use super::action::{self, Action, ActionError};
use super::physics::{PhysicsSystem, VehicleParams};
use super::snapshot::{FleetSnapshot, SnapshotPublisher};
use super::vehicle::VehicleState;

/// Simulation loop settings
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Wall-clock time between ticks
    pub tick_interval: Duration,
    /// Simulated seconds per wall-clock second
    pub time_scale: f64,
    /// Pending command capacity before submissions are refused
    pub command_capacity: usize,
    /// Throttle forced onto every vehicle each tick, if set
    pub autopilot_throttle: Option<i64>,
    pub params: VehicleParams,
}

impl FleetConfig {
    /// Physics step length, derived from the tick interval
    pub fn dt(&self) -> f64 {
        self.tick_interval.as_secs_f64() * self.time_scale
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            time_scale: 1.0,
            command_capacity: 256,
            autopilot_throttle: None,
            params: VehicleParams::default(),
        }
    }
}

/// Work queued for the next tick
#[derive(Debug, Clone)]
pub enum FleetCommand {
    Action {
        vehicle: String,
        action: String,
        payload: i64,
    },
    AddVehicle {
        name: String,
    },
    RemoveVehicle {
        name: String,
    },
}

/// Fleet errors
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("unknown vehicle: {0}")]
    UnknownVehicle(String),

    #[error("vehicle already exists: {0}")]
    DuplicateVehicle(String),

    #[error("vehicle name must not be empty")]
    InvalidName,

    #[error("command queue is full")]
    Busy,

    #[error("simulation is not running")]
    Stopped,

    #[error(transparent)]
    Action(#[from] ActionError),
}

impl<T> From<mpsc::error::TrySendError<T>> for FleetError {
    fn from(err: mpsc::error::TrySendError<T>) -> Self {
        match err {
            mpsc::error::TrySendError::Full(_) => FleetError::Busy,
            mpsc::error::TrySendError::Closed(_) => FleetError::Stopped,
        }
    }
}

/// Cloneable handle used by request handlers to reach the fleet
#[derive(Clone)]
pub struct FleetHandle {
    command_tx: mpsc::Sender<FleetCommand>,
    roster: Arc<DashSet<String>>,
    snapshots: Arc<SnapshotPublisher>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl FleetHandle {
    /// Queue an action for the next tick
    pub fn submit_action(
        &self,
        vehicle: &str,
        action: &str,
        payload: i64,
    ) -> Result<Action, FleetError> {
        let action: Action = action.parse()?;
        if !self.roster.contains(vehicle) {
            return Err(FleetError::UnknownVehicle(vehicle.to_string()));
        }

        self.command_tx.try_send(FleetCommand::Action {
            vehicle: vehicle.to_string(),
            action: action.as_str().to_string(),
            payload,
        })?;
        Ok(action)
    }

    /// Register a vehicle; it is initialized on the next tick
    pub fn add_vehicle(&self, name: &str) -> Result<(), FleetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FleetError::InvalidName);
        }
        if !self.roster.insert(name.to_string()) {
            return Err(FleetError::DuplicateVehicle(name.to_string()));
        }

        if let Err(e) = self.command_tx.try_send(FleetCommand::AddVehicle {
            name: name.to_string(),
        }) {
            self.roster.remove(name);
            return Err(e.into());
        }
        Ok(())
    }

    /// Drop a vehicle; it disappears from snapshots after the next tick
    pub fn remove_vehicle(&self, name: &str) -> Result<(), FleetError> {
        if self.roster.remove(name).is_none() {
            return Err(FleetError::UnknownVehicle(name.to_string()));
        }

        if let Err(e) = self.command_tx.try_send(FleetCommand::RemoveVehicle {
            name: name.to_string(),
        }) {
            self.roster.insert(name.to_string());
            return Err(e.into());
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<FleetSnapshot> {
        self.snapshots.latest()
    }

    pub fn vehicle(&self, name: &str) -> Option<VehicleState> {
        self.snapshots.latest().vehicle(name).cloned()
    }

    /// Registered vehicles, including ones not yet simulated
    pub fn vehicle_count(&self) -> usize {
        self.roster.len()
    }

    /// Stop scheduling ticks. A tick already running completes first.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// The authoritative fleet simulation (owned by the tick task)
pub struct FleetSimulation {
    config: FleetConfig,
    vehicles: Vec<VehicleState>,
    tick: u64,
    command_rx: mpsc::Receiver<FleetCommand>,
    snapshots: Arc<SnapshotPublisher>,
    shutdown_rx: watch::Receiver<bool>,
}

impl FleetSimulation {
    /// Create a fleet with the given starting vehicles
    pub fn new<I, S>(config: FleetConfig, names: I) -> (Self, FleetHandle)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let roster = Arc::new(DashSet::new());
        let snapshots = Arc::new(SnapshotPublisher::new());

        let mut vehicles = Vec::new();
        for name in names {
            let name: String = name.into();
            if roster.insert(name.clone()) {
                vehicles.push(VehicleState::new(name));
            } else {
                warn!(vehicle = %name, "Duplicate vehicle name ignored");
            }
        }

        snapshots.publish(FleetSnapshot {
            tick: 0,
            vehicles: vehicles.clone(),
        });

        let handle = FleetHandle {
            command_tx,
            roster,
            snapshots: snapshots.clone(),
            shutdown_tx: Arc::new(shutdown_tx),
        };

        let simulation = Self {
            config,
            vehicles,
            tick: 0,
            command_rx,
            snapshots,
            shutdown_rx,
        };

        (simulation, handle)
    }

    /// Run the fixed-interval tick loop until shutdown
    pub async fn run(mut self) {
        let tick_interval = self.config.tick_interval;
        info!(
            vehicles = self.vehicles.len(),
            interval_ms = tick_interval.as_millis() as u64,
            dt = self.config.dt(),
            "Fleet simulation started"
        );

        let mut ticker = interval(tick_interval);
        // Late ticks are dropped rather than queued
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown_rx.changed() => break,
            }

            let timer = Timer::new();
            self.tick();

            let elapsed = timer.elapsed_micros();
            if elapsed > tick_interval.as_micros() as u64 {
                warn!(
                    tick = self.tick,
                    elapsed_us = elapsed,
                    "Tick overran its interval, skipping missed ticks"
                );
            }
        }

        info!(tick = self.tick, "Fleet simulation stopped");
    }

    /// Advance every vehicle by one step and publish the result
    pub fn tick(&mut self) {
        self.tick += 1;

        for vehicle in self.vehicles.iter_mut() {
            vehicle.initialize();
        }

        // Commands apply in the order they were queued
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                FleetCommand::AddVehicle { name } => self.handle_add(name),
                FleetCommand::RemoveVehicle { name } => self.handle_remove(&name),
                FleetCommand::Action {
                    vehicle,
                    action,
                    payload,
                } => self.handle_action(&vehicle, &action, payload),
            }
        }

        let dt = self.config.dt();
        for vehicle in self.vehicles.iter_mut() {
            if let Some(throttle) = self.config.autopilot_throttle {
                vehicle.set_throttle(throttle);
            }
            PhysicsSystem::step(vehicle, &self.config.params, dt);
            vehicle.stats.total_packets += 1;
        }

        self.snapshots.publish(FleetSnapshot {
            tick: self.tick,
            vehicles: self.vehicles.clone(),
        });
    }

    fn handle_add(&mut self, name: String) {
        if self.vehicles.iter().any(|v| v.name == name) {
            warn!(vehicle = %name, "Vehicle already in fleet");
            return;
        }
        info!(vehicle = %name, "Vehicle joined fleet");
        let mut vehicle = VehicleState::new(name);
        vehicle.initialize();
        self.vehicles.push(vehicle);
    }

    fn handle_action(&mut self, name: &str, command: &str, payload: i64) {
        match self.vehicles.iter_mut().find(|v| v.name == name) {
            Some(vehicle) => {
                // Unknown names are logged by the processor and skipped
                let _ = action::process(vehicle, command, payload);
            }
            None => debug!(
                vehicle = %name,
                action = %command,
                "Action for removed vehicle dropped"
            ),
        }
    }

    fn handle_remove(&mut self, name: &str) {
        let before = self.vehicles.len();
        self.vehicles.retain(|v| v.name != name);
        if self.vehicles.len() < before {
            info!(vehicle = %name, "Vehicle left fleet");
        }
    }
}
