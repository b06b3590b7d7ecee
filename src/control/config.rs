//! Configuration loading for the flight controller.

use anyhow::{Context, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "drone-pilot.toml";

/// Complete controller configuration, fixed for the lifetime of a flight.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ControllerConfig {
    /// Connection and pacing parameters.
    pub link: LinkConfig,
    /// Thresholds and nominal values used by the decision engine.
    pub policy: PolicyConfig,
}

/// Parameters of the simulator link and the control cycle timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LinkConfig {
    /// WebSocket endpoint of the simulator.
    pub server_uri: String,
    /// Minimum time between the starts of two consecutive cycles.
    pub control_interval_ms: u64,
    /// Upper bound on the wait for one telemetry message.
    pub receive_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            server_uri: "ws://localhost:8765".to_string(),
            control_interval_ms: 150,
            receive_timeout_ms: 400,
        }
    }
}

/// Policy thresholds. Step sizes of the individual rules live with the rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PolicyConfig {
    /// Initial speed and the target of every speed reset.
    pub nominal_speed: i32,
    pub initial_altitude: i32,
    /// Horizontal range of the flight area.
    pub max_x_range: i64,
    /// Fraction of `max_x_range` past which the vehicle turns around.
    pub turnaround_fraction: f64,
    /// Battery percentage at or below which the vehicle sheds speed and altitude.
    pub critical_battery: u32,
    /// Battery percentage at or below which the flight ends.
    pub depleted_battery: u32,
    /// Climbing toward an optimum requires more battery than this.
    pub min_ascend_battery: u32,
    /// Absolute pitch/roll reading above which the vehicle slows down.
    pub stabilization_threshold: f64,
    pub wind_impact_threshold: u32,
    pub dust_impact_threshold: u32,
    pub optimal_green_altitude: i32,
    pub green_altitude_tolerance: i32,
    pub optimal_yellow_altitude: i32,
    pub yellow_altitude_tolerance: i32,
    /// Half of this value is the reported height below which a yellow sensor forces a climb.
    pub safe_yellow_altitude: i32,
    /// Consecutive motionless cycles tolerated before a recovery maneuver.
    pub stuck_cycle_limit: u32,
    /// Iterations that must pass after a direction change before recovering again.
    pub stuck_cooldown_iterations: i64,
    pub recovery_altitude_min: i32,
    pub recovery_altitude_max: i32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            nominal_speed: 5,
            initial_altitude: 170,
            max_x_range: 100_000,
            turnaround_fraction: 0.8,
            critical_battery: 15,
            depleted_battery: 1,
            min_ascend_battery: 40,
            stabilization_threshold: 3.0,
            wind_impact_threshold: 50,
            dust_impact_threshold: 50,
            optimal_green_altitude: 120,
            green_altitude_tolerance: 20,
            optimal_yellow_altitude: 200,
            yellow_altitude_tolerance: 30,
            safe_yellow_altitude: 250,
            stuck_cycle_limit: 15,
            stuck_cooldown_iterations: 25,
            recovery_altitude_min: -10,
            recovery_altitude_max: 15,
        }
    }
}

impl LinkConfig {
    pub fn control_interval(&self) -> embassy_time::Duration {
        embassy_time::Duration::from_millis(self.control_interval_ms)
    }

    pub fn receive_timeout(&self) -> embassy_time::Duration {
        embassy_time::Duration::from_millis(self.receive_timeout_ms)
    }
}

impl PolicyConfig {
    /// Distance from the origin beyond which outward travel is reversed.
    pub fn turnaround_distance(&self) -> f64 {
        self.max_x_range as f64 * self.turnaround_fraction
    }
}

impl ControllerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the TOML file
    ///
    /// # Returns
    /// * `Ok(ControllerConfig)` if the file was read, parsed and validated
    /// * `Err` describing the first problem otherwise
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", config_path.display()))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: ControllerConfig = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration for a process invocation.
    ///
    /// An explicit path must exist. Without one, `DEFAULT_CONFIG_FILE` is used when
    /// present and the built-in defaults otherwise.
    pub fn resolve(explicit_path: Option<PathBuf>) -> anyhow::Result<Self> {
        match explicit_path {
            Some(path) => Self::load(&path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load(fallback)
                } else {
                    log::info!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reject configurations the control loop cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let link = &self.link;
        if !link.server_uri.starts_with("ws://") {
            bail!("server-uri must use ws:// (TLS is not supported), got '{}'", link.server_uri);
        }
        if link.control_interval_ms == 0 {
            bail!("control-interval-ms must be positive");
        }
        if link.receive_timeout_ms == 0 {
            bail!("receive-timeout-ms must be positive");
        }

        let policy = &self.policy;
        if policy.nominal_speed <= 0 {
            bail!("nominal-speed must be positive, got {}", policy.nominal_speed);
        }
        if !(policy.turnaround_fraction > 0.0 && policy.turnaround_fraction <= 1.0) {
            bail!("turnaround-fraction must be in (0, 1], got {}", policy.turnaround_fraction);
        }
        if policy.recovery_altitude_min > policy.recovery_altitude_max {
            bail!(
                "recovery-altitude-min ({}) exceeds recovery-altitude-max ({})",
                policy.recovery_altitude_min,
                policy.recovery_altitude_max
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_controller() {
        let config = ControllerConfig::default();
        assert_eq!(config.link.server_uri, "ws://localhost:8765");
        assert_eq!(config.link.control_interval_ms, 150);
        assert_eq!(config.link.receive_timeout_ms, 400);
        assert_eq!(config.policy.nominal_speed, 5);
        assert_eq!(config.policy.initial_altitude, 170);
        assert_eq!(config.policy.turnaround_distance(), 80_000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config = ControllerConfig::from_toml(
            r#"
            [link]
            server-uri = "ws://10.0.0.2:9000"

            [policy]
            nominal-speed = 7
            critical-battery = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.link.server_uri, "ws://10.0.0.2:9000");
        assert_eq!(config.link.receive_timeout_ms, 400);
        assert_eq!(config.policy.nominal_speed, 7);
        assert_eq!(config.policy.critical_battery, 20);
        assert_eq!(config.policy.optimal_yellow_altitude, 200);
    }

    #[test]
    fn empty_document_is_the_default_config() {
        let config = ControllerConfig::from_toml("").unwrap();
        assert_eq!(config.policy.max_x_range, 100_000);
        assert_eq!(config.link.control_interval_ms, 150);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(ControllerConfig::from_toml("[link]\nserver-uri = \"http://localhost\"").is_err());
        assert!(ControllerConfig::from_toml("[link]\nserver-uri = \"wss://localhost:8765\"").is_err());
        assert!(ControllerConfig::from_toml("[link]\ncontrol-interval-ms = 0").is_err());
        assert!(ControllerConfig::from_toml("[policy]\nturnaround-fraction = 1.5").is_err());
        assert!(
            ControllerConfig::from_toml("[policy]\nrecovery-altitude-min = 20\nrecovery-altitude-max = 10").is_err()
        );
        assert!(ControllerConfig::from_toml("[policy]\nnominal-speed = \"fast\"").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = ControllerConfig::resolve(Some(PathBuf::from("/nonexistent/drone-pilot.toml")));
        assert!(result.is_err());
    }
}
