//! Telemetry snapshot types.

use serde_json::{Map, Value};

/// Vehicle status reported in the structured part of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightStatus {
    Flying,
    Crashed,
    /// Missing, unparseable or not one of the known words.
    #[default]
    Unknown,
}

impl FlightStatus {
    pub fn from_word(word: &str) -> Self {
        if word.eq_ignore_ascii_case("crashed") {
            FlightStatus::Crashed
        } else if word.eq_ignore_ascii_case("flying") {
            FlightStatus::Flying
        } else {
            FlightStatus::Unknown
        }
    }
}

/// Coarse hazard flag reported by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorStatus {
    #[default]
    Green,
    Yellow,
    Red,
    /// A word the simulator sent that is none of the above.
    Unrecognized,
}

impl SensorStatus {
    pub fn from_word(word: &str) -> Self {
        if word.eq_ignore_ascii_case("green") {
            SensorStatus::Green
        } else if word.eq_ignore_ascii_case("yellow") {
            SensorStatus::Yellow
        } else if word.eq_ignore_ascii_case("red") {
            SensorStatus::Red
        } else {
            SensorStatus::Unrecognized
        }
    }
}

/// Fields carried by the fixed-grammar token sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    pub x_position: i64,
    /// Negative values are below the safety plane.
    pub y_position: i64,
    /// Percentage, 0-100.
    pub battery: u32,
    /// Axis readings; index 1 and 2 are pitch and roll.
    pub gyroscope: [f64; 3],
    pub wind_speed: u32,
    pub dust_level: u32,
    pub sensor_status: SensorStatus,
}

/// Everything decoded from one inbound message.
///
/// Accessors fall back to the documented defaults for anything the message did not carry.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub status: FlightStatus,
    /// `metrics` sub-document of the structured payload, empty when absent.
    pub metrics: Map<String, Value>,
    /// `None` when the message had no valid token sequence.
    pub frame: Option<TelemetryFrame>,
}

impl TelemetrySnapshot {
    pub const DEFAULT_BATTERY: u32 = 100;

    pub fn x_position(&self) -> Option<i64> {
        self.frame.as_ref().map(|f| f.x_position)
    }

    pub fn y_position(&self) -> i64 {
        self.frame.as_ref().map_or(0, |f| f.y_position)
    }

    pub fn battery(&self) -> u32 {
        self.frame.as_ref().map_or(Self::DEFAULT_BATTERY, |f| f.battery)
    }

    pub fn gyroscope(&self) -> [f64; 3] {
        self.frame.as_ref().map_or([0.0; 3], |f| f.gyroscope)
    }

    pub fn wind_speed(&self) -> u32 {
        self.frame.as_ref().map_or(0, |f| f.wind_speed)
    }

    pub fn dust_level(&self) -> u32 {
        self.frame.as_ref().map_or(0, |f| f.dust_level)
    }

    pub fn sensor_status(&self) -> SensorStatus {
        self.frame.as_ref().map_or(SensorStatus::Green, |f| f.sensor_status)
    }

    /// Iteration counter reported by the simulator, 0 if absent or not an integer.
    pub fn iteration_count(&self) -> i64 {
        self.metrics.get("iterations").and_then(Value::as_i64).unwrap_or(0)
    }
}
