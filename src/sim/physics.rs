//! Electromechanical model of the car: motor curve, resistances and integration

use std::f64::consts::PI;

use tracing::debug;

use super::vehicle::VehicleState;

/// Vehicle and motor constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleParams {
    /// Vehicle mass including driver (kg)
    pub mass: f64,
    /// Wheel radius (m)
    pub wheel_radius: f64,
    /// Aerodynamic drag coefficient times area
    pub drag_coefficient: f64,
    /// Air density (kg/m^3)
    pub air_density: f64,
    /// Frontal area (m^2)
    pub frontal_area: f64,
    /// Rolling resistance coefficient
    pub rolling_resistance: f64,
    /// Gravitational acceleration (m/s^2)
    pub gravity: f64,

    /// Torque constant (Nm/A)
    pub kt: f64,
    /// Back-EMF constant (V/(rad/s))
    pub ke: f64,
    /// Controller current limit (A)
    pub max_current: f64,
    /// Rated motor RPM, reference for the efficiency map
    pub max_rpm: f64,
    /// Torque ceiling (Nm)
    pub max_torque: f64,
    /// RPM at which back-EMF cancels the supply and no current can flow
    pub no_load_rpm: f64,
    /// Lumped winding resistance used for the terminal voltage estimate (ohm)
    pub winding_resistance: f64,

    /// Capacity of one cell (Ah)
    pub cell_capacity_ah: f64,
    /// Cells in parallel per series group
    pub parallel_cells: u32,

    /// Track length of one lap (m)
    pub lap_length: f64,
}

impl Default for VehicleParams {
    /// Single-seater with a Mitsuba M2096-III hub motor on a 14S7P pack
    fn default() -> Self {
        Self {
            mass: 170.0,
            wheel_radius: 0.20,
            drag_coefficient: 0.35,
            air_density: 1.225,
            frontal_area: 1.0,
            rolling_resistance: 0.015,
            gravity: 9.81,
            kt: 0.48,
            ke: 0.48,
            max_current: 40.0,
            max_rpm: 518.0,
            max_torque: 30.0,
            no_load_rpm: 600.0,
            winding_resistance: 0.1,
            cell_capacity_ah: 2.8,
            parallel_cells: 7,
            lap_length: 500.0,
        }
    }
}

impl VehicleParams {
    pub fn wheel_circumference(&self) -> f64 {
        2.0 * PI * self.wheel_radius
    }

    /// Rated pack capacity (Ah)
    pub fn pack_capacity_ah(&self) -> f64 {
        self.cell_capacity_ah * self.parallel_cells as f64
    }

    /// Wheel RPM for a ground speed in m/s
    pub fn rpm_from_speed(&self, speed_ms: f64) -> f64 {
        speed_ms / self.wheel_circumference() * 60.0
    }

    /// Rolling plus aerodynamic resistance at a ground speed (N)
    pub fn resistance(&self, speed_ms: f64) -> f64 {
        let rolling = self.rolling_resistance * self.mass * self.gravity;
        let area = self.drag_coefficient * self.frontal_area;
        let drag = 0.5 * self.air_density * area * speed_ms * speed_ms;
        rolling + drag
    }

    /// Current the controller can push at a given RPM.
    /// Linear from `max_current` at stall down to zero at `no_load_rpm`.
    pub fn available_current(&self, rpm: f64) -> f64 {
        let speed_ratio = (rpm / self.no_load_rpm).clamp(0.0, 1.0);
        self.max_current * (1.0 - speed_ratio)
    }

    /// Motor efficiency as a fraction.
    /// Peaks around 60% load and 65% of rated RPM, bounded to 0.70..=0.96.
    pub fn efficiency(&self, current: f64, rpm: f64) -> f64 {
        let load_factor = current / self.max_current;
        let speed_factor = rpm / self.max_rpm;

        let load_penalty = (load_factor - 0.6).abs() * 0.15;
        let speed_penalty = (speed_factor - 0.65).abs() * 0.10;

        (0.95 - load_penalty - speed_penalty).clamp(0.70, 0.96)
    }
}

/// Intermediate quantities of one physics step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepTelemetry {
    /// RPM derived from the speed at the start of the step
    pub start_rpm: f64,
    /// Wheel angular velocity at the start of the step (rad/s)
    pub angular_velocity: f64,
    /// Total resistive force (N)
    pub resistance: f64,
    /// Current ceiling at the start RPM (A)
    pub available_current: f64,
    /// Current needed to hold speed (A)
    pub hold_current: f64,
    pub back_emf: f64,
    /// Net longitudinal force (N)
    pub net_force: f64,
    /// Acceleration (m/s^2)
    pub acceleration: f64,
}

/// Physics system advancing vehicles by one tick
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance one vehicle by `dt` seconds using its current throttle intent
    pub fn step(vehicle: &mut VehicleState, params: &VehicleParams, dt: f64) -> StepTelemetry {
        let throttle = vehicle.throttle;

        // Rpm always comes from speed here; raw rpm set by actions is discarded
        let mut speed_ms = vehicle.motor.speed / 3.6;
        let start_rpm = params.rpm_from_speed(speed_ms);
        let angular_velocity = start_rpm * 2.0 * PI / 60.0;

        let resistance = params.resistance(speed_ms);
        let torque_to_maintain = resistance * params.wheel_radius;
        let hold_current = (torque_to_maintain / params.kt).max(0.0);

        let available_current = params.available_current(start_rpm);

        let current = if throttle <= 0.0 {
            // Coasting, no regenerative braking
            0.0
        } else {
            let requested = available_current * (throttle / 100.0);
            requested.max(hold_current).clamp(0.0, available_current)
        };

        let back_emf = params.ke * angular_velocity;
        let torque = (params.kt * current).min(params.max_torque);

        let efficiency = params.efficiency(current, start_rpm);
        let mechanical_power = torque * angular_velocity;
        let electrical_power = mechanical_power / efficiency;

        vehicle.motor.torque = torque;
        vehicle.motor.current = current;
        vehicle.motor.efficiency = efficiency * 100.0;
        vehicle.motor.power_w = electrical_power;
        vehicle.motor.voltage = back_emf + current * params.winding_resistance;

        // Single explicit Euler step
        let force = torque / params.wheel_radius;
        let net_force = force - resistance;
        let acceleration = net_force / params.mass;

        let max_speed_ms = vehicle.motor.max_speed / 3.6;
        speed_ms = (speed_ms + acceleration * dt).max(0.0).min(max_speed_ms);

        vehicle.motor.speed = speed_ms * 3.6;
        vehicle.motor.rpm = params.rpm_from_speed(speed_ms) as u32;

        vehicle.battery.current = current;
        vehicle.battery.discharge_rate = current / params.pack_capacity_ah();

        Self::advance_race(vehicle, params, speed_ms * dt);

        debug!(
            vehicle = %vehicle.name,
            speed_kmh = vehicle.motor.speed,
            rpm = vehicle.motor.rpm,
            torque_nm = vehicle.motor.torque,
            current_a = vehicle.motor.current,
            available_a = available_current,
            efficiency_pct = vehicle.motor.efficiency,
            power_w = vehicle.motor.power_w,
            "Physics step"
        );

        StepTelemetry {
            start_rpm,
            angular_velocity,
            resistance,
            available_current,
            hold_current,
            back_emf,
            net_force,
            acceleration,
        }
    }

    /// Move the vehicle along the lap, rolling the lap counter over at the finish line
    fn advance_race(vehicle: &mut VehicleState, params: &VehicleParams, distance: f64) {
        if params.lap_length <= 0.0 {
            return;
        }

        let travelled = vehicle.race.position + distance;
        let laps = (travelled / params.lap_length).floor();
        vehicle.race.lap += laps as u32;
        vehicle.race.position = travelled - laps * params.lap_length;
    }
}
