use env_logger::Builder;
use log::{LevelFilter, debug, error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::autopilot::RngSource;
use crate::control::{ControllerConfig, SimulatorClient};

mod autopilot;
mod control;
mod flight;
mod telemetry;

/// Usage: `drone-pilot [config.toml] [server-uri]`
fn main() -> ExitCode {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("drone_pilot"), LevelFilter::Debug)
        .parse_default_env()
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let server_override = args.next();

    let mut config = match ControllerConfig::resolve(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(uri) = server_override {
        config.link.server_uri = uri;
        if let Err(e) = config.validate() {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    }

    info!("Starting flight controller");

    let mut rng = RngSource::thread_local();
    let report = futures::executor::block_on(flight::fly(&config, SimulatorClient::connect, &mut rng));

    info!("{}", report);
    if let Some(state) = &report.final_state {
        debug!("Final control state: {:?}", state);
    }
    if report.reason.is_failure() { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
