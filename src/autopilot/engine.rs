//! Per-cycle decision engine.
//!
//! `DecisionEngine::decide` maps the current `ControlState` and the latest telemetry
//! to the state for the next cycle. After the altitude rule table it always runs,
//! in order, on the same running state:
//! - environmental drag (wind/dust slow the vehicle, otherwise speed recovers)
//! - orientation limit (large pitch or roll slows the vehicle)
//! - boundary turnaround
//! - stuck detection and randomized recovery

use super::random::RandomSource;
use super::rules::{RuleInput, apply_altitude_rules};
use super::state::ControlState;
use crate::control::{Movement, PolicyConfig};
use crate::telemetry::TelemetrySnapshot;

const DRAG_SPEED_DROP: i32 = 1;
const DRAG_SPEED_FLOOR: i32 = 1;
const UNSTABLE_SPEED_DROP: i32 = 2;

pub struct DecisionEngine {
    policy: PolicyConfig,
}

impl DecisionEngine {
    pub fn new(policy: PolicyConfig) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Compute the next control state.
    ///
    /// When the snapshot carries no position, the vehicle is taken to be at the origin.
    /// The returned state remembers this cycle's position as `previous_x`.
    pub fn decide<R: RandomSource>(&self, state: ControlState, snapshot: &TelemetrySnapshot, rng: &mut R) -> ControlState {
        let mut next = state;
        let x_position = snapshot.x_position().unwrap_or(0);
        let iterations = snapshot.iteration_count();
        let input = RuleInput {
            policy: &self.policy,
            battery: snapshot.battery(),
            y_position: snapshot.y_position(),
            sensor_status: snapshot.sensor_status(),
        };

        if let Some(rule) = apply_altitude_rules(&input, &mut next) {
            log::debug!("Altitude rule {} -> altitude {}", rule, next.altitude);
        }

        self.apply_environmental_drag(snapshot, &mut next);
        self.apply_orientation_limit(snapshot.gyroscope(), &mut next);
        self.apply_boundary_turnaround(x_position, iterations, &mut next);
        self.apply_stuck_detection(x_position, iterations, rng, &mut next);

        next.previous_x = x_position;
        next
    }

    fn apply_environmental_drag(&self, snapshot: &TelemetrySnapshot, state: &mut ControlState) {
        let policy = &self.policy;
        if snapshot.wind_speed() > policy.wind_impact_threshold || snapshot.dust_level() > policy.dust_impact_threshold {
            state.speed = (state.speed - DRAG_SPEED_DROP).max(DRAG_SPEED_FLOOR);
        } else if state.speed < policy.nominal_speed && snapshot.battery() > policy.critical_battery {
            state.speed = (state.speed + 1).min(policy.nominal_speed);
        }
    }

    fn apply_orientation_limit(&self, gyroscope: [f64; 3], state: &mut ControlState) {
        let threshold = self.policy.stabilization_threshold;
        if gyroscope[1].abs() > threshold || gyroscope[2].abs() > threshold {
            state.speed = (state.speed - UNSTABLE_SPEED_DROP).max(0);
        }
    }

    fn apply_boundary_turnaround(&self, x_position: i64, iterations: i64, state: &mut ControlState) {
        if (x_position.unsigned_abs() as f64) <= self.policy.turnaround_distance() {
            return;
        }

        let heading_outward = match state.movement {
            Movement::Forward => x_position > 0,
            Movement::Reverse => x_position < 0,
        };
        if heading_outward {
            state.movement = state.movement.reversed();
            state.speed = self.policy.nominal_speed;
            state.last_movement_change = iterations;
            state.stuck_count = 0;
            log::info!("Boundary turnaround at x={}, now moving {}", x_position, state.movement);
        }
    }

    fn apply_stuck_detection<R: RandomSource>(&self, x_position: i64, iterations: i64, rng: &mut R, state: &mut ControlState) {
        let policy = &self.policy;
        if x_position != state.previous_x || state.speed <= 0 {
            state.stuck_count = 0;
            return;
        }

        state.stuck_count += 1;
        if state.stuck_count > policy.stuck_cycle_limit
            && iterations.saturating_sub(state.last_movement_change) > policy.stuck_cooldown_iterations
        {
            let offset = rng.altitude_offset(policy.recovery_altitude_min, policy.recovery_altitude_max);
            state.movement = rng.movement();
            state.speed = policy.nominal_speed;
            state.altitude += offset;
            state.last_movement_change = iterations;
            state.stuck_count = 0;
            log::info!(
                "Stuck at x={}, recovering: moving {}, altitude offset {}",
                x_position,
                state.movement,
                offset
            );
        }
    }
}
