//! Configuration file handling
//!
//! The configuration lives in `~/.config/mousecar/config.toml`. A file with
//! default values is written on first start so the pin assignment can be
//! edited in place. Every section falls back to its defaults when missing.

use crate::drive::{MotorChannel, TurnFactor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const CONFIG_DIR: &str = ".config/mousecar";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine home directory")]
    NoHomeDir,
}

/// BCM pin numbers and PWM frequency of the motor driver board
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MotorConfig {
    pub right_forward_pin: u8,
    pub right_reverse_pin: u8,
    pub left_forward_pin: u8,
    pub left_reverse_pin: u8,
    pub pwm_frequency_hz: f64,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            right_forward_pin: 17,
            right_reverse_pin: 27,
            left_forward_pin: 23,
            left_reverse_pin: 24,
            pwm_frequency_hz: 100.0,
        }
    }
}

impl MotorConfig {
    pub fn pin(&self, channel: MotorChannel) -> u8 {
        match channel {
            MotorChannel::RightForward => self.right_forward_pin,
            MotorChannel::RightReverse => self.right_reverse_pin,
            MotorChannel::LeftForward => self.left_forward_pin,
            MotorChannel::LeftReverse => self.left_reverse_pin,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DriveConfig {
    /// How much the inner wheel slows down in a forward turn (0-1 exclusive)
    pub turn_sensitivity: f64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            turn_sensitivity: 0.6,
        }
    }
}

impl DriveConfig {
    pub fn turn_factor(&self) -> Result<TurnFactor, ConfigError> {
        TurnFactor::from_sensitivity(self.turn_sensitivity).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "turn_sensitivity must be strictly between 0 and 1, got {}",
                self.turn_sensitivity
            ))
        })
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WatchdogMode {
    /// Sleeps until the spin deadline, woken on every re-arm
    #[default]
    Deadline,
    /// Checks the spin state at a fixed interval
    Poll,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct WatchdogConfig {
    pub mode: WatchdogMode,
    pub spin_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            mode: WatchdogMode::Deadline,
            spin_timeout_ms: 200,
            poll_interval_ms: 100,
        }
    }
}

impl WatchdogConfig {
    pub fn spin_timeout(&self) -> Duration {
        Duration::from_millis(self.spin_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// evdev node of the mouse
    pub device: PathBuf,
    /// Take the mouse exclusively so the desktop ignores it while driving
    pub grab: bool,
    pub channel_capacity: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/input/event0"),
            grab: true,
            channel_capacity: 100,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub motor: MotorConfig,
    pub drive: DriveConfig,
    pub watchdog: WatchdogConfig,
    pub input: InputConfig,
}

impl Config {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let mut path = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    /// Writes the default configuration to `path` unless a file exists
    pub async fn ensure_default_config(path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if tokio::fs::try_exists(path).await.map_err(io_err)? {
            debug!("Config file {} already exists", path.display());
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let content = toml::to_string_pretty(&Config::default())?;
        tokio::fs::write(path, content).await.map_err(io_err)?;
        info!("Wrote default config to {}", path.display());
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config = Self::from_toml(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.drive.turn_factor()?;

        let pins: HashSet<u8> = MotorChannel::ALL
            .iter()
            .map(|&channel| self.motor.pin(channel))
            .collect();
        if pins.len() != MotorChannel::ALL.len() {
            return Err(ConfigError::Invalid(
                "motor pins must be four distinct GPIOs".to_string(),
            ));
        }

        if !(self.motor.pwm_frequency_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "pwm_frequency_hz must be positive, got {}",
                self.motor.pwm_frequency_hz
            )));
        }

        let watchdog = &self.watchdog;
        if watchdog.spin_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "spin_timeout_ms must be positive".to_string(),
            ));
        }
        if watchdog.poll_interval_ms == 0 || watchdog.poll_interval_ms > watchdog.spin_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "poll_interval_ms must be between 1 and spin_timeout_ms ({}), got {}",
                watchdog.spin_timeout_ms, watchdog.poll_interval_ms
            )));
        }

        if self.input.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "input channel_capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
