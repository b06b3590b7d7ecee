//! Telemetry decoding.

pub mod parser;
pub mod types;

pub use parser::parse_message;
pub use types::{FlightStatus, SensorStatus, TelemetryFrame, TelemetrySnapshot};
