//! How a flight ended.

use chrono::{DateTime, Utc};

use crate::autopilot::ControlState;

/// Why the control loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    Crashed,
    BatteryDepleted,
    ChannelClosedClean,
    ChannelClosedError(String),
    ConnectionRefused(String),
    UnexpectedError(String),
}

impl TerminationReason {
    /// Whether the process should report failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, TerminationReason::ConnectionRefused(_) | TerminationReason::UnexpectedError(_))
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::Crashed => write!(f, "Drone crashed"),
            TerminationReason::BatteryDepleted => write!(f, "Battery depleted"),
            TerminationReason::ChannelClosedClean => write!(f, "Connection closed by the server"),
            TerminationReason::ChannelClosedError(detail) => write!(f, "Connection closed unexpectedly: {}", detail),
            TerminationReason::ConnectionRefused(detail) => {
                write!(f, "Server connection refused ({}). Make sure the server is running", detail)
            }
            TerminationReason::UnexpectedError(detail) => write!(f, "An error occurred: {}", detail),
        }
    }
}

/// Summary of one flight, produced on every exit path.
#[derive(Debug, Clone)]
pub struct FlightReport {
    pub reason: TerminationReason,
    pub total_distance: u64,
    /// Commands sent.
    pub cycles: u64,
    pub receive_timeouts: u64,
    /// `None` if the loop never started.
    pub final_state: Option<ControlState>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl FlightReport {
    /// Report for a flight that ended before the first cycle.
    pub fn aborted(reason: TerminationReason, started_at: DateTime<Utc>) -> Self {
        Self {
            reason,
            total_distance: 0,
            cycles: 0,
            receive_timeouts: 0,
            final_state: None,
            started_at,
            ended_at: Utc::now(),
        }
    }

    pub fn flight_time(&self) -> chrono::Duration {
        self.ended_at - self.started_at
    }
}

impl std::fmt::Display for FlightReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}. Total distance: {:.2} ({} cycles, {} timeouts, {:.1}s)",
            self.reason,
            self.total_distance as f64,
            self.cycles,
            self.receive_timeouts,
            self.flight_time().num_milliseconds() as f64 / 1000.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reports_distance_with_two_decimals() {
        let started_at = Utc::now();
        let report = FlightReport {
            reason: TerminationReason::Crashed,
            total_distance: 1234,
            cycles: 40,
            receive_timeouts: 2,
            final_state: None,
            started_at,
            ended_at: started_at + chrono::Duration::milliseconds(6500),
        };
        assert_eq!(report.to_string(), "Drone crashed. Total distance: 1234.00 (40 cycles, 2 timeouts, 6.5s)");
    }

    #[test]
    fn only_setup_and_unexpected_failures_are_failures() {
        assert!(!TerminationReason::Crashed.is_failure());
        assert!(!TerminationReason::ChannelClosedError("reset".into()).is_failure());
        assert!(TerminationReason::ConnectionRefused("refused".into()).is_failure());
        assert!(TerminationReason::UnexpectedError("boom".into()).is_failure());
    }

    #[test]
    fn aborted_report_is_empty() {
        let report = FlightReport::aborted(TerminationReason::UnexpectedError("bad uri".into()), Utc::now());
        assert_eq!(report.total_distance, 0);
        assert!(report.final_state.is_none());
        assert!(report.ended_at >= report.started_at);
    }
}
