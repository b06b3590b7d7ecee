//! Decision engine: turns the latest telemetry into the next control state.
//!
//! ## Module Organization
//!
//! - `state`: `ControlState`, the only data kept between cycles
//! - `rules`: ordered first-match-wins altitude rules
//! - `engine`: `DecisionEngine`, which runs the rules and the always-on adjustments
//! - `random`: injectable randomness for the stuck-recovery maneuver

pub mod engine;
pub mod random;
pub mod rules;
pub mod state;

pub use engine::DecisionEngine;
pub use random::{RandomSource, RngSource};
pub use state::ControlState;
