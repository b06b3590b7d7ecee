//! Control link to the drone simulator.
//!
//! Holds the controller configuration, the outbound command format and the
//! message channel the control loop talks through.

pub mod client;
pub mod command;
pub mod config;

pub use client::{ChannelClosed, ConnectError, Inbound, MessageChannel, SimulatorClient};
pub use command::{MotionCommand, Movement};
pub use config::{ControllerConfig, LinkConfig, PolicyConfig};
