//! Flight control loop and its outcome.

pub mod report;
pub mod task;

pub use report::{FlightReport, TerminationReason};
pub use task::fly;
