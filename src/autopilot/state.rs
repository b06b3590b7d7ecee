//! Control state carried from one cycle to the next.

use crate::control::{MotionCommand, Movement, PolicyConfig};

/// Everything the decision engine remembers between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub speed: i32,
    pub altitude: i32,
    pub movement: Movement,
    /// Simulator iteration at which the direction last changed.
    pub last_movement_change: i64,
    /// Consecutive cycles without horizontal progress.
    pub stuck_count: u32,
    /// Horizontal position observed in the previous cycle.
    pub previous_x: i64,
    /// Sum of absolute horizontal displacements. Never decreases.
    pub total_distance: u64,
}

impl ControlState {
    /// State at the start of a flight.
    pub fn initial(policy: &PolicyConfig) -> Self {
        Self {
            speed: policy.nominal_speed,
            altitude: policy.initial_altitude,
            movement: Movement::Forward,
            last_movement_change: 0,
            stuck_count: 0,
            previous_x: 0,
            total_distance: 0,
        }
    }

    /// Command announcing this state to the simulator.
    pub fn command(&self) -> MotionCommand {
        MotionCommand {
            speed: self.speed,
            altitude: self.altitude,
            movement: self.movement,
        }
    }

    /// Add the displacement from `previous_x` to `x_position` to the distance travelled.
    pub fn record_position(&mut self, x_position: i64) {
        self.total_distance += x_position.abs_diff(self.previous_x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_uses_policy() {
        let policy = PolicyConfig::default();
        let state = ControlState::initial(&policy);
        assert_eq!(state.speed, 5);
        assert_eq!(state.altitude, 170);
        assert_eq!(state.movement, Movement::Forward);
        assert_eq!(state.command(), MotionCommand { speed: 5, altitude: 170, movement: Movement::Forward });
    }

    #[test]
    fn distance_accumulates_absolute_deltas() {
        let mut state = ControlState::initial(&PolicyConfig::default());
        for x in [120, 100, -50, -50, 30] {
            state.record_position(x);
            state.previous_x = x;
        }
        assert_eq!(state.total_distance, 120 + 20 + 150 + 0 + 80);
    }
}
