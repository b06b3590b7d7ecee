//! Outbound motion command definitions.

use serde::Serialize;

/// Direction of horizontal travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Movement {
    #[default]
    #[serde(rename = "fwd")]
    Forward,
    #[serde(rename = "rev")]
    Reverse,
}

impl Movement {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Movement::Forward => Movement::Reverse,
            Movement::Reverse => Movement::Forward,
        }
    }
}

impl std::fmt::Display for Movement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Movement::Forward => write!(f, "fwd"),
            Movement::Reverse => write!(f, "rev"),
        }
    }
}

/// One command sent to the simulator per control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotionCommand {
    pub speed: i32,
    pub altitude: i32,
    pub movement: Movement,
}

impl MotionCommand {
    /// Encode the command as the JSON document the simulator expects.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_wire_names() {
        let command = MotionCommand {
            speed: 5,
            altitude: 170,
            movement: Movement::Forward,
        };
        let payload = command.to_payload().unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(value, serde_json::json!({"speed": 5, "altitude": 170, "movement": "fwd"}));
    }

    #[test]
    fn reverse_serializes_as_rev() {
        let command = MotionCommand {
            speed: 0,
            altitude: -3,
            movement: Movement::Reverse,
        };
        let value: serde_json::Value = serde_json::from_str(&command.to_payload().unwrap()).unwrap();
        assert_eq!(value["movement"], "rev");
        assert_eq!(value["altitude"], -3);
    }

    #[test]
    fn reversed_flips_direction() {
        assert_eq!(Movement::Forward.reversed(), Movement::Reverse);
        assert_eq!(Movement::Reverse.reversed(), Movement::Forward);
        assert_eq!(Movement::Forward.to_string(), "fwd");
    }
}
