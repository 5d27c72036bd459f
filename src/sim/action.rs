//! Driver commands and how they change actuation intent

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use super::vehicle::VehicleState;

/// Command vocabulary accepted from drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Raise motor RPM by the payload
    Accelerate,
    /// Lower motor RPM by the payload, stopping at zero
    Decelerate,
    /// Replace the throttle intent with the payload (percent)
    SetThrottle,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Accelerate => "accelerate",
            Action::Decelerate => "decelerate",
            Action::SetThrottle => "set_throttle",
        }
    }

    /// Apply this action to a vehicle
    pub fn apply(self, vehicle: &mut VehicleState, payload: i64) {
        match self {
            Action::Accelerate => {
                vehicle.motor.rpm = offset_rpm(vehicle.motor.rpm, payload);
            }
            Action::Decelerate => {
                vehicle.motor.rpm = offset_rpm(vehicle.motor.rpm, payload.saturating_neg());
            }
            Action::SetThrottle => vehicle.set_throttle(payload),
        }
        vehicle.stats.action_count += 1;
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accelerate" => Ok(Action::Accelerate),
            "decelerate" => Ok(Action::Decelerate),
            "set_throttle" => Ok(Action::SetThrottle),
            other => Err(ActionError::Unknown(other.to_string())),
        }
    }
}

/// Action errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("unknown action: {0}")]
    Unknown(String),
}

/// Parse and apply a named action. Unknown names leave the vehicle untouched.
pub fn process(
    vehicle: &mut VehicleState,
    action: &str,
    payload: i64,
) -> Result<Action, ActionError> {
    let parsed = action.parse::<Action>().inspect_err(|e| {
        warn!(vehicle = %vehicle.name, error = %e, "Rejected action");
    })?;
    parsed.apply(vehicle, payload);
    Ok(parsed)
}

fn offset_rpm(rpm: u32, delta: i64) -> u32 {
    (rpm as i64)
        .saturating_add(delta)
        .clamp(0, u32::MAX as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle() -> VehicleState {
        let mut vehicle = VehicleState::new("Test1");
        vehicle.initialize();
        vehicle
    }

    #[test]
    fn test_parse_vocabulary() {
        assert_eq!("accelerate".parse::<Action>(), Ok(Action::Accelerate));
        assert_eq!("decelerate".parse::<Action>(), Ok(Action::Decelerate));
        assert_eq!("set_throttle".parse::<Action>(), Ok(Action::SetThrottle));
        assert_eq!(
            "SET_THROTTLE".parse::<Action>(),
            Err(ActionError::Unknown("SET_THROTTLE".to_string()))
        );
    }

    #[test]
    fn test_accelerate_adds_rpm() {
        let mut v = vehicle();
        assert_eq!(process(&mut v, "accelerate", 250), Ok(Action::Accelerate));
        assert_eq!(v.motor.rpm, 250);

        // No ceiling here; the next physics step reconciles rpm with speed
        process(&mut v, "accelerate", 10_000).unwrap();
        assert_eq!(v.motor.rpm, 10_250);
    }

    #[test]
    fn test_accelerate_negative_payload_floors_at_zero() {
        let mut v = vehicle();
        v.motor.rpm = 5;
        process(&mut v, "accelerate", -50).unwrap();
        assert_eq!(v.motor.rpm, 0);
    }

    #[test]
    fn test_decelerate_floors_at_zero() {
        let mut v = vehicle();
        v.motor.rpm = 100;

        process(&mut v, "decelerate", 30).unwrap();
        assert_eq!(v.motor.rpm, 70);

        process(&mut v, "decelerate", 500).unwrap();
        assert_eq!(v.motor.rpm, 0);
    }

    #[test]
    fn test_set_throttle_clamps_payload() {
        let mut v = vehicle();
        for (payload, expected) in [(250, 100.0), (-1, 0.0), (0, 0.0), (100, 100.0), (37, 37.0)] {
            process(&mut v, "set_throttle", payload).unwrap();
            assert_eq!(v.throttle, expected, "payload {}", payload);
        }
    }

    #[test]
    fn test_actions_are_counted() {
        let mut v = vehicle();
        process(&mut v, "set_throttle", 50).unwrap();
        process(&mut v, "accelerate", 1).unwrap();
        let _ = process(&mut v, "nitro", 1);
        assert_eq!(v.stats.action_count, 2);
    }

    #[test]
    fn test_unknown_action_leaves_state_unchanged() {
        let mut v = vehicle();
        process(&mut v, "set_throttle", 60).unwrap();
        v.motor.rpm = 321;
        let before = v.clone();

        let result = process(&mut v, "turbo_boost", 99);

        assert_eq!(result, Err(ActionError::Unknown("turbo_boost".to_string())));
        assert_eq!(v, before);
        assert_eq!(v.throttle, 60.0);
    }
}
