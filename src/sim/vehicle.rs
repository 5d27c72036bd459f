//! Per-vehicle simulation record

use serde::Serialize;
use tracing::info;

/// Pack energy of the 14S7P battery at full charge (Wh)
pub const PACK_ENERGY_WH: f64 = 1317.12;
/// Pack voltage at full charge (V)
pub const PACK_VOLTAGE: f64 = 58.78;
/// Initial state of charge (%)
pub const PACK_INITIAL_SOC: f64 = 99.7;
/// Ambient temperature both battery and motor start at (°C)
pub const AMBIENT_TEMP_C: f64 = 22.0;
/// Vehicle top speed (km/h)
pub const MOTOR_MAX_SPEED_KMH: f64 = 37.7;
/// Motor efficiency before the first step (%)
pub const MOTOR_BASE_EFFICIENCY: f64 = 95.0;

/// Cell voltages of the 14 series cells at full charge
pub const CELL_BALANCE: [f64; 14] = [
    4.20, 4.19, 4.20, 4.18, 4.20, 4.19, 4.20, 4.20, 4.19, 4.18, 4.20, 4.20, 4.19, 4.20,
];

/// Battery pack state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatteryInfo {
    /// State of charge (%)
    pub soc: f64,
    /// Remaining energy (Wh)
    #[serde(rename = "wh")]
    pub energy_wh: f64,
    /// Pack voltage (V)
    pub voltage: f64,
    /// Pack current (A)
    pub current: f64,
    /// Pack temperature (°C)
    pub temp: f64,
    /// Health (%)
    #[serde(rename = "battery-health")]
    pub health: u8,
    /// Per-cell voltages, one per series cell
    #[serde(rename = "balance")]
    pub cell_balance: Vec<f64>,
    /// Discharge rate (C)
    #[serde(rename = "discharge-rate")]
    pub discharge_rate: f64,
}

/// Motor and drivetrain state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MotorInfo {
    /// Top speed (km/h)
    #[serde(skip)]
    pub max_speed: f64,
    /// Vehicle speed (km/h)
    pub speed: f64,
    pub rpm: u32,
    /// Torque (Nm)
    pub torque: f64,
    /// Motor current (A)
    pub current: f64,
    /// Terminal voltage (V)
    pub voltage: f64,
    /// Electrical power draw (W)
    #[serde(rename = "power")]
    pub power_w: f64,
    /// Efficiency (%)
    pub efficiency: f64,
    /// Temperature (°C)
    pub temp: f64,
    /// Health (%)
    #[serde(rename = "motor-health")]
    pub health: u8,
}

/// Race progress
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RaceInfo {
    /// Completed laps
    pub lap: u32,
    /// Distance into the current lap (m)
    #[serde(rename = "pos")]
    pub position: f64,
}

/// Track conditions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvInfo {
    pub rain: bool,
    pub parasite: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleStats {
    /// Snapshots published with this vehicle in them, one per simulated tick
    #[serde(rename = "packets")]
    pub total_packets: u64,
    /// Driver actions applied successfully; autopilot throttle is not counted
    #[serde(rename = "actions")]
    pub action_count: u64,
}

/// Full state of one vehicle (authoritative, owned by the fleet task)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleState {
    pub name: String,
    pub battery: BatteryInfo,
    pub motor: MotorInfo,
    pub race: RaceInfo,
    #[serde(rename = "env")]
    pub environment: EnvInfo,
    pub stats: VehicleStats,

    /// Throttle intent (%), always within 0..=100
    #[serde(skip)]
    pub throttle: f64,
    #[serde(skip)]
    pub initialized: bool,
}

impl VehicleState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Seed the pack and motor constants. Does nothing once the vehicle is initialized.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }

        self.stats = VehicleStats::default();
        self.initialized = true;

        self.battery = BatteryInfo {
            soc: PACK_INITIAL_SOC,
            energy_wh: PACK_ENERGY_WH,
            voltage: PACK_VOLTAGE,
            current: 0.0,
            temp: AMBIENT_TEMP_C,
            health: 100,
            cell_balance: CELL_BALANCE.to_vec(),
            discharge_rate: 0.0,
        };

        self.motor = MotorInfo {
            max_speed: MOTOR_MAX_SPEED_KMH,
            speed: 0.0,
            rpm: 0,
            torque: 0.0,
            current: 0.0,
            voltage: 0.0,
            power_w: 0.0,
            efficiency: MOTOR_BASE_EFFICIENCY,
            temp: AMBIENT_TEMP_C,
            health: 100,
        };

        info!(
            vehicle = %self.name,
            motor_health = self.motor.health,
            battery_health = self.battery.health,
            action_count = self.stats.action_count,
            total_packets = self.stats.total_packets,
            "Vehicle initialized"
        );
    }

    /// Set the throttle intent, clamped to 0..=100 percent
    pub fn set_throttle(&mut self, percent: i64) {
        self.throttle = percent.clamp(0, 100) as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_vehicle_is_blank() {
        let vehicle = VehicleState::new("Test1");
        assert_eq!(vehicle.name, "Test1");
        assert!(!vehicle.initialized);
        assert_eq!(vehicle.motor.max_speed, 0.0);
        assert!(vehicle.battery.cell_balance.is_empty());
    }

    #[test]
    fn test_initialize_seeds_constants() {
        let mut vehicle = VehicleState::new("Test1");
        vehicle.initialize();

        assert!(vehicle.initialized);
        assert_eq!(vehicle.battery.energy_wh, 1317.12);
        assert_eq!(vehicle.battery.voltage, 58.78);
        assert_eq!(vehicle.battery.health, 100);
        assert_eq!(vehicle.battery.cell_balance.len(), 14);
        assert_eq!(vehicle.motor.max_speed, 37.7);
        assert_eq!(vehicle.motor.efficiency, 95.0);
        assert_eq!(vehicle.motor.health, 100);
        assert_eq!(vehicle.stats, VehicleStats::default());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut once = VehicleState::new("Test1");
        once.initialize();

        let mut twice = VehicleState::new("Test1");
        twice.initialize();
        twice.initialize();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_initialize_keeps_live_state() {
        let mut vehicle = VehicleState::new("Test1");
        vehicle.initialize();
        vehicle.motor.speed = 12.5;
        vehicle.stats.action_count = 3;

        vehicle.initialize();

        assert_eq!(vehicle.motor.speed, 12.5);
        assert_eq!(vehicle.stats.action_count, 3);
    }

    #[test]
    fn test_set_throttle_clamps() {
        let mut vehicle = VehicleState::new("Test1");

        vehicle.set_throttle(150);
        assert_eq!(vehicle.throttle, 100.0);

        vehicle.set_throttle(-20);
        assert_eq!(vehicle.throttle, 0.0);

        vehicle.set_throttle(42);
        assert_eq!(vehicle.throttle, 42.0);
    }

    #[test]
    fn test_serialized_field_names() {
        let mut vehicle = VehicleState::new("Test1");
        vehicle.initialize();

        let json = serde_json::to_value(&vehicle).unwrap();

        assert_eq!(json["name"], "Test1");
        assert_eq!(json["battery"]["wh"], 1317.12);
        assert_eq!(json["battery"]["battery-health"], 100);
        assert_eq!(json["battery"]["balance"].as_array().unwrap().len(), 14);
        assert!(json["battery"].get("discharge-rate").is_some());
        assert_eq!(json["motor"]["motor-health"], 100);
        assert!(json["motor"].get("power").is_some());
        assert!(json["motor"].get("max_speed").is_none());
        assert!(json["race"].get("pos").is_some());
        assert_eq!(json["env"]["rain"], false);
        assert_eq!(json["stats"]["packets"], 0);
        assert_eq!(json["stats"]["actions"], 0);
        assert!(json.get("throttle").is_none());
        assert!(json.get("initialized").is_none());
    }
}
