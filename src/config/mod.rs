//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::sim::{FleetConfig, VehicleParams};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Wall-clock time between simulation ticks
    pub tick_interval: Duration,
    /// Simulated seconds per wall-clock second
    pub time_scale: f64,
    /// Vehicles present at startup
    pub vehicles: Vec<String>,
    /// Pending command capacity
    pub command_queue: usize,
    /// Throttle applied to every vehicle each tick (demo driver)
    pub autopilot_throttle: Option<i64>,

    /// Directory served for non-API paths
    pub static_dir: PathBuf,
    /// Allowed client origins for CORS, any origin when unset
    pub client_origin: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8081".to_string()),
        };

        let tick_interval_ms: u64 = parse_or(&lookup, "TICK_INTERVAL_MS", 50)?;
        if tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("TICK_INTERVAL_MS"));
        }

        let time_scale: f64 = parse_or(&lookup, "TIME_SCALE", 1.0)?;
        if !time_scale.is_finite() || time_scale <= 0.0 {
            return Err(ConfigError::Invalid("TIME_SCALE"));
        }

        let vehicles: Vec<String> = lookup("VEHICLES")
            .unwrap_or_else(|| "Test1".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let autopilot_throttle = match lookup("AUTOPILOT_THROTTLE") {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("AUTOPILOT_THROTTLE"))?,
            ),
            None => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            tick_interval: Duration::from_millis(tick_interval_ms),
            time_scale,
            vehicles,
            command_queue: parse_or(&lookup, "COMMAND_QUEUE", 256)?,
            autopilot_throttle,

            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            client_origin: lookup("CLIENT_ORIGIN").filter(|s| !s.trim().is_empty()),
        })
    }

    /// Settings for the fleet simulation loop
    pub fn fleet(&self) -> FleetConfig {
        FleetConfig {
            tick_interval: self.tick_interval,
            time_scale: self.time_scale,
            command_capacity: self.command_queue,
            autopilot_throttle: self.autopilot_throttle,
            params: VehicleParams::default(),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
