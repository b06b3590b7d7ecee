//! Decode inbound simulator messages into `TelemetrySnapshot`s.
//!
//! A message may carry two independent encodings, and either, both or neither may
//! be present:
//! - A structured JSON document starting at the first `{` and running to the end of
//!   the message, with the keys `status` and `metrics`.
//! - A fixed-grammar token sequence anywhere in the text.
//!
//! Decoding never fails. Anything missing or malformed falls back to defaults.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::types::{FlightStatus, SensorStatus, TelemetryFrame, TelemetrySnapshot};

/// Keys of the structured payload the controller cares about. Others are ignored.
#[derive(Deserialize)]
struct StatusDocument {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    metrics: Option<Value>,
}

/// Parse one inbound message.
///
/// # Parameters
///
/// * `message` - Raw text received from the simulator
///
/// # Message Format
///
/// ```text
/// X-120-Y--5-BAT-80-GYR-[1.0,-2.5,0.0]-WIND-10-DUST-5-SENS-GREEN {"status": "flying", "metrics": {"iterations": 42}}
/// ```
pub fn parse_message(message: &str) -> TelemetrySnapshot {
    let (status, metrics) = parse_status_document(message);
    let frame = find_frame(message);
    if frame.is_none() {
        log::debug!("No telemetry sequence in message");
    }

    TelemetrySnapshot { status, metrics, frame }
}

/// Decode the structured document, if the message has one.
fn parse_status_document(message: &str) -> (FlightStatus, Map<String, Value>) {
    let Some(start) = message.find('{') else {
        return (FlightStatus::Unknown, Map::new());
    };

    match serde_json::from_str::<StatusDocument>(&message[start..]) {
        Ok(document) => {
            let status = document
                .status
                .as_ref()
                .and_then(Value::as_str)
                .map_or(FlightStatus::Unknown, FlightStatus::from_word);
            let metrics = match document.metrics {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            };
            (status, metrics)
        }
        Err(e) => {
            log::warn!("Error decoding status document: {}", e);
            (FlightStatus::Unknown, Map::new())
        }
    }
}

/// Find the first position where a complete, valid token sequence starts.
fn find_frame(message: &str) -> Option<TelemetryFrame> {
    message
        .match_indices("X-")
        .find_map(|(pos, _)| parse_frame(&mut Cursor::new(&message[pos..])))
}

/// Parse `X-<uint>-Y-<int>-BAT-<uint>-GYR-[<f>,<f>,<f>]-WIND-<uint>-DUST-<uint>-SENS-<word>`.
fn parse_frame(cursor: &mut Cursor<'_>) -> Option<TelemetryFrame> {
    cursor.literal("X-")?;
    let x_position = cursor.unsigned()?.parse().ok()?;
    cursor.literal("-Y-")?;
    let y_position = cursor.signed()?.parse().ok()?;
    cursor.literal("-BAT-")?;
    let battery = cursor.unsigned()?.parse().ok()?;
    cursor.literal("-GYR-[")?;
    let pitch_axis = cursor.float()?;
    cursor.literal(",")?;
    let roll_axis = cursor.float()?;
    cursor.literal(",")?;
    let yaw_axis = cursor.float()?;
    cursor.literal("]-WIND-")?;
    let wind_speed = cursor.unsigned()?.parse().ok()?;
    cursor.literal("-DUST-")?;
    let dust_level = cursor.unsigned()?.parse().ok()?;
    cursor.literal("-SENS-")?;
    let sensor_status = SensorStatus::from_word(cursor.word()?);

    Some(TelemetryFrame {
        x_position,
        y_position,
        battery,
        gyroscope: [pitch_axis, roll_axis, yaw_axis],
        wind_speed,
        dust_level,
        sensor_status,
    })
}

/// Forward-only scanner over the token sequence.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    fn literal(&mut self, token: &str) -> Option<()> {
        self.rest = self.rest.strip_prefix(token)?;
        Some(())
    }

    /// Consume the longest non-empty prefix whose characters satisfy `accept`.
    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> Option<&'a str> {
        let end = self.rest.find(|c: char| !accept(c)).unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(token)
    }

    fn unsigned(&mut self) -> Option<&'a str> {
        self.take_while(|c| c.is_ascii_digit())
    }

    /// Optional `+`/`-` followed by digits. The sign stays in the token.
    fn signed(&mut self) -> Option<&'a str> {
        let start = self.rest;
        let sign_len = usize::from(start.starts_with(['+', '-']));
        self.rest = &start[sign_len..];
        match self.unsigned() {
            Some(digits) => Some(&start[..sign_len + digits.len()]),
            None => {
                self.rest = start;
                None
            }
        }
    }

    /// Digits, dots and minus signs, which must then form a valid float.
    fn float(&mut self) -> Option<f64> {
        self.take_while(|c| c.is_ascii_digit() || c == '.' || c == '-')?.parse().ok()
    }

    fn word(&mut self) -> Option<&'a str> {
        self.take_while(|c| c.is_alphanumeric() || c == '_')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEQUENCE: &str = "X-120-Y--5-BAT-80-GYR-[1.0,-2.5,0.0]-WIND-10-DUST-5-SENS-GREEN";

    #[test]
    fn test_parse_token_sequence() {
        let snapshot = parse_message(SEQUENCE);
        let frame = snapshot.frame.expect("Expected a telemetry frame");

        assert_eq!(frame.x_position, 120);
        assert_eq!(frame.y_position, -5);
        assert_eq!(frame.battery, 80);
        assert_eq!(frame.gyroscope, [1.0, -2.5, 0.0]);
        assert_eq!(frame.wind_speed, 10);
        assert_eq!(frame.dust_level, 5);
        assert_eq!(frame.sensor_status, SensorStatus::Green);
        assert_eq!(snapshot.status, FlightStatus::Unknown);
        assert!(snapshot.metrics.is_empty());
    }

    #[test]
    fn test_parse_both_encodings() {
        let message = format!(
            "{} {{\"status\": \"flying\", \"metrics\": {{\"iterations\": 42, \"score\": 1.5}}}}",
            "X-77-Y-+30-BAT-55-GYR-[0.1,3.5,-4.25]-WIND-60-DUST-0-SENS-YELLOW"
        );
        let snapshot = parse_message(&message);

        assert_eq!(snapshot.status, FlightStatus::Flying);
        assert_eq!(snapshot.iteration_count(), 42);
        assert_eq!(snapshot.metrics.len(), 2);

        let frame = snapshot.frame.expect("Expected a telemetry frame");
        assert_eq!(frame.x_position, 77);
        assert_eq!(frame.y_position, 30);
        assert_eq!(frame.gyroscope, [0.1, 3.5, -4.25]);
        assert_eq!(frame.wind_speed, 60);
        assert_eq!(frame.sensor_status, SensorStatus::Yellow);
    }

    #[test]
    fn test_sequence_embedded_in_text() {
        let message = format!("telemetry update: {} (tick)", SEQUENCE.replace("GREEN", "RED"));
        let frame = parse_message(&message).frame.expect("Expected a telemetry frame");
        assert_eq!(frame.x_position, 120);
        assert_eq!(frame.sensor_status, SensorStatus::Red);
    }

    #[test]
    fn test_message_without_sequence() {
        let snapshot = parse_message("hello from the simulator");
        assert!(snapshot.frame.is_none());
        assert_eq!(snapshot.status, FlightStatus::Unknown);
        assert_eq!(snapshot.battery(), 100);
        assert_eq!(snapshot.gyroscope(), [0.0, 0.0, 0.0]);
        assert_eq!(snapshot.sensor_status(), SensorStatus::Green);
        assert_eq!(snapshot.iteration_count(), 0);
        assert_eq!(snapshot.x_position(), None);
    }

    #[test]
    fn test_broken_document_does_not_block_sequence() {
        let message = format!("{} {{\"status\": \"crashed\", \"metrics\": ", SEQUENCE);
        let snapshot = parse_message(&message);

        assert_eq!(snapshot.status, FlightStatus::Unknown);
        assert!(snapshot.metrics.is_empty());
        assert_eq!(snapshot.x_position(), Some(120));
    }

    #[test]
    fn test_status_document_only() {
        let snapshot = parse_message(r#"{"status": "crashed", "metrics": {"iterations": 7}}"#);
        assert_eq!(snapshot.status, FlightStatus::Crashed);
        assert_eq!(snapshot.iteration_count(), 7);
        assert!(snapshot.frame.is_none());
    }

    #[test]
    fn test_unexpected_document_shapes() {
        let snapshot = parse_message(r#"{"status": 3, "metrics": [1, 2]}"#);
        assert_eq!(snapshot.status, FlightStatus::Unknown);
        assert!(snapshot.metrics.is_empty());

        let snapshot = parse_message(r#"{"status": "hovering", "metrics": {"iterations": "many"}}"#);
        assert_eq!(snapshot.status, FlightStatus::Unknown);
        assert_eq!(snapshot.iteration_count(), 0);
    }

    #[test]
    fn test_invalid_candidate_is_skipped() {
        let message = format!("X-1-Y-2-BAT-3-GYR-[1-2,0,0]-WIND-1-DUST-1-SENS-RED then {}", SEQUENCE);
        let frame = parse_message(&message).frame.expect("Expected the second sequence");
        assert_eq!(frame.x_position, 120);
        assert_eq!(frame.sensor_status, SensorStatus::Green);
    }

    #[test]
    fn test_truncated_sequence() {
        let snapshot = parse_message("X-120-Y--5-BAT-80-GYR-[1.0,-2.5,0.0]-WIND-10-DUST-");
        assert!(snapshot.frame.is_none());

        let snapshot = parse_message("X--120-Y-5-BAT-80-GYR-[1.0,2.5,0.0]-WIND-10-DUST-5-SENS-GREEN");
        assert!(snapshot.frame.is_none(), "horizontal position is unsigned on the wire");
    }

    #[test]
    fn test_unrecognized_sensor_word() {
        let frame = parse_message(&SEQUENCE.replace("GREEN", "PURPLE_2")).frame.unwrap();
        assert_eq!(frame.sensor_status, SensorStatus::Unrecognized);
    }
}
