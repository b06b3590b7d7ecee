//! The control loop.
//!
//! One cycle sends the current command, waits a bounded time for telemetry, and
//! feeds it to the decision engine. Cycles start no closer together than the
//! configured interval. A cycle that overruns it (for example after a receive
//! timeout) is followed immediately by the next one, without catch-up bursts.

use anyhow::Context;
use chrono::Utc;
use embassy_time::{Instant, Timer};

use crate::autopilot::{ControlState, DecisionEngine, RandomSource};
use crate::control::{ChannelClosed, ConnectError, ControllerConfig, Inbound, LinkConfig, MessageChannel};
use crate::telemetry::{FlightStatus, parse_message};

use super::report::{FlightReport, TerminationReason};

/// Result of a single cycle.
enum CycleOutcome {
    Continue,
    Terminate(TerminationReason),
}

/// Connect, fly until a terminal condition, and release the connection.
///
/// # Parameters
///
/// * `config` - Controller configuration
/// * `connect` - Opens the channel to the simulator at the given URI
/// * `rng` - Randomness for the stuck-recovery maneuver
///
/// # Returns
///
/// A `FlightReport` for every outcome, including connection failures. The channel,
/// once opened, is closed exactly once before returning.
pub async fn fly<C, F, R>(config: &ControllerConfig, connect: F, rng: &mut R) -> FlightReport
where
    C: MessageChannel,
    F: FnOnce(&str) -> Result<C, ConnectError>,
    R: RandomSource,
{
    let started_at = Utc::now();
    log::info!("Connecting to the drone simulator at {}", config.link.server_uri);

    let mut channel = match connect(&config.link.server_uri) {
        Ok(channel) => channel,
        Err(e) => {
            log::error!("{}", e);
            let reason = match e {
                ConnectError::Refused(detail) => TerminationReason::ConnectionRefused(detail),
                ConnectError::Other(error) => TerminationReason::UnexpectedError(format!("{:#}", error)),
            };
            return FlightReport::aborted(reason, started_at);
        }
    };

    let mut control_loop = ControlLoop::new(config);
    let reason = control_loop.run(&mut channel, rng).await;
    channel.close();

    control_loop.into_report(reason, started_at)
}

/// Loop state owned for the duration of one flight.
struct ControlLoop<'a> {
    link: &'a LinkConfig,
    engine: DecisionEngine,
    state: ControlState,
    cycles: u64,
    receive_timeouts: u64,
}

impl<'a> ControlLoop<'a> {
    fn new(config: &'a ControllerConfig) -> Self {
        Self {
            link: &config.link,
            engine: DecisionEngine::new(config.policy.clone()),
            state: ControlState::initial(&config.policy),
            cycles: 0,
            receive_timeouts: 0,
        }
    }

    async fn run<C: MessageChannel, R: RandomSource>(&mut self, channel: &mut C, rng: &mut R) -> TerminationReason {
        let interval = self.link.control_interval();

        loop {
            let cycle_started = Instant::now();

            match self.cycle(channel, rng).await {
                Ok(CycleOutcome::Continue) => {}
                Ok(CycleOutcome::Terminate(reason)) => {
                    log::info!("{}. Total distance: {:.2}", reason, self.state.total_distance as f64);
                    return reason;
                }
                Err(e) => {
                    log::error!("Control cycle failed: {:#}", e);
                    return TerminationReason::UnexpectedError(format!("{:#}", e));
                }
            }

            Timer::at(cycle_started + interval).await;
        }
    }

    async fn cycle<C: MessageChannel, R: RandomSource>(&mut self, channel: &mut C, rng: &mut R) -> anyhow::Result<CycleOutcome> {
        let command = self.state.command();
        let payload = command.to_payload().context("Failed to encode command")?;
        if let Err(closed) = channel.send(&payload).await {
            return Ok(CycleOutcome::Terminate(closed_reason(closed)));
        }
        self.cycles += 1;
        log::debug!("Sent command: {}", payload);

        let message = match channel.receive(self.link.receive_timeout()).await {
            Inbound::Message(message) => message,
            Inbound::TimedOut => {
                self.receive_timeouts += 1;
                log::warn!("No response from server within {} ms", self.link.receive_timeout_ms);
                return Ok(CycleOutcome::Continue);
            }
            Inbound::Closed(closed) => return Ok(CycleOutcome::Terminate(closed_reason(closed))),
        };
        log::debug!("Received response: {}", message);

        let snapshot = parse_message(&message);
        if snapshot.status == FlightStatus::Crashed {
            return Ok(CycleOutcome::Terminate(TerminationReason::Crashed));
        }

        self.state.record_position(snapshot.x_position().unwrap_or(0));
        self.state = self.engine.decide(self.state, &snapshot, rng);

        if snapshot.battery() <= self.engine.policy().depleted_battery {
            return Ok(CycleOutcome::Terminate(TerminationReason::BatteryDepleted));
        }
        Ok(CycleOutcome::Continue)
    }

    fn into_report(self, reason: TerminationReason, started_at: chrono::DateTime<Utc>) -> FlightReport {
        FlightReport {
            reason,
            total_distance: self.state.total_distance,
            cycles: self.cycles,
            receive_timeouts: self.receive_timeouts,
            final_state: Some(self.state),
            started_at,
            ended_at: Utc::now(),
        }
    }
}

fn closed_reason(closed: ChannelClosed) -> TerminationReason {
    log::info!("Connection to the simulator {}", closed);
    match closed {
        ChannelClosed::Clean => TerminationReason::ChannelClosedClean,
        ChannelClosed::Error(detail) => TerminationReason::ChannelClosedError(detail),
    }
}
