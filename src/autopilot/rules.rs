//! Altitude policy as an ordered rule table.
//!
//! Rules are evaluated top to bottom and only the first rule whose guard holds is
//! applied. The order is part of the policy:
//!
//! 1. `critical-battery`: battery at or below the critical level sheds speed and altitude.
//! 2. `below-safety-plane`: a negative reported height forces a climb.
//! 3. `red-sensor`: drop hard.
//! 4. `green-sensor`: settle toward the green optimum.
//! 5. `yellow-sensor`: settle toward the yellow optimum, climbing when flying low.

use super::state::ControlState;
use crate::control::PolicyConfig;
use crate::telemetry::SensorStatus;

const CRITICAL_SPEED_DROP: i32 = 2;
const CRITICAL_SPEED_FLOOR: i32 = 1;
const CRITICAL_ALTITUDE_DROP: i32 = 15;
const CRITICAL_ALTITUDE_FLOOR: i32 = 10;

const SAFETY_PLANE_CLIMB: i32 = 25;
const SAFETY_PLANE_FLOOR: i32 = 10;

const RED_ALTITUDE_DROP: i32 = 40;
const RED_ALTITUDE_FLOOR: i32 = 5;

const GREEN_CLIMB: i32 = 8;
const GREEN_DESCENT: i32 = 7;

const YELLOW_CLIMB: i32 = 5;
const YELLOW_DESCENT: i32 = 10;
const YELLOW_LOW_FLIGHT_CLIMB: i32 = 10;

/// Telemetry values the altitude rules look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub policy: &'a PolicyConfig,
    pub battery: u32,
    pub y_position: i64,
    pub sensor_status: SensorStatus,
}

/// One guarded entry of the altitude policy.
pub struct AltitudeRule {
    pub name: &'static str,
    pub applies: fn(&RuleInput<'_>) -> bool,
    pub adjust: fn(&RuleInput<'_>, &mut ControlState),
}

pub const ALTITUDE_RULES: [AltitudeRule; 5] = [
    AltitudeRule {
        name: "critical-battery",
        applies: |input| input.battery <= input.policy.critical_battery,
        adjust: |_, state| {
            state.speed = (state.speed - CRITICAL_SPEED_DROP).max(CRITICAL_SPEED_FLOOR);
            state.altitude = (state.altitude - CRITICAL_ALTITUDE_DROP).max(CRITICAL_ALTITUDE_FLOOR);
        },
    },
    AltitudeRule {
        name: "below-safety-plane",
        applies: |input| input.y_position < 0,
        adjust: |_, state| {
            state.altitude = (state.altitude + SAFETY_PLANE_CLIMB).max(SAFETY_PLANE_FLOOR);
        },
    },
    AltitudeRule {
        name: "red-sensor",
        applies: |input| input.sensor_status == SensorStatus::Red,
        adjust: |_, state| {
            state.altitude = (state.altitude - RED_ALTITUDE_DROP).max(RED_ALTITUDE_FLOOR);
        },
    },
    AltitudeRule {
        name: "green-sensor",
        applies: |input| input.sensor_status == SensorStatus::Green,
        adjust: |input, state| {
            let policy = input.policy;
            if state.altitude < policy.optimal_green_altitude && input.battery > policy.min_ascend_battery {
                state.altitude += GREEN_CLIMB;
            } else if state.altitude > policy.optimal_green_altitude + policy.green_altitude_tolerance {
                state.altitude -= GREEN_DESCENT;
            }
        },
    },
    AltitudeRule {
        name: "yellow-sensor",
        applies: |input| input.sensor_status == SensorStatus::Yellow,
        adjust: |input, state| {
            let policy = input.policy;
            if state.altitude < policy.optimal_yellow_altitude && input.battery > policy.min_ascend_battery {
                state.altitude += YELLOW_CLIMB;
            } else if state.altitude > policy.optimal_yellow_altitude + policy.yellow_altitude_tolerance {
                state.altitude -= YELLOW_DESCENT;
            } else if (input.y_position as f64) < policy.safe_yellow_altitude as f64 * 0.5 {
                state.altitude += YELLOW_LOW_FLIGHT_CLIMB;
            }
        },
    },
];

/// Apply the first matching rule and return its name.
pub fn apply_altitude_rules(input: &RuleInput<'_>, state: &mut ControlState) -> Option<&'static str> {
    let rule = ALTITUDE_RULES.iter().find(|rule| (rule.applies)(input))?;
    (rule.adjust)(input, state);
    Some(rule.name)
}
