use crate::config::MotorConfig;
use crate::drive::command::{MotorChannel, FULL_DUTY};
use rppal::gpio::{Gpio, OutputPin};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Errors raised by a motor driver
#[derive(Debug, thiserror::Error)]
pub enum MotorError {
    #[error("GPIO unavailable: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("Channel {0:?} is not configured")]
    UnknownChannel(MotorChannel),

    #[error("Duty cycle {0} out of range 0-100")]
    InvalidDutyCycle(f64),

    #[error("Motor driver is not initialized")]
    NotInitialized,
}

/// Capability to set the duty cycle of the four motor channels
///
/// Implementations are driven from both the input router and the spin
/// watchdog, always behind the controller's lock.
pub trait MotorDriver: Send + 'static {
    /// Prepares the outputs, every channel starts at 0 %
    fn initialize(&mut self) -> Result<(), MotorError>;

    /// Sets one channel to `percent` (0-100)
    fn set_duty_cycle(&mut self, channel: MotorChannel, percent: f64) -> Result<(), MotorError>;

    /// Drives every channel to 0 and releases the outputs
    fn shutdown(&mut self) -> Result<(), MotorError>;

    fn name(&self) -> &str;
}

fn check_duty(percent: f64) -> Result<f64, MotorError> {
    if (0.0..=FULL_DUTY).contains(&percent) {
        Ok(percent)
    } else {
        Err(MotorError::InvalidDutyCycle(percent))
    }
}

/// Software PWM on four Raspberry Pi GPIO lines
pub struct PwmMotorDriver {
    config: MotorConfig,
    pins: HashMap<MotorChannel, OutputPin>,
}

impl PwmMotorDriver {
    pub fn new(config: MotorConfig) -> Self {
        Self {
            config,
            pins: HashMap::new(),
        }
    }
}

impl MotorDriver for PwmMotorDriver {
    fn initialize(&mut self) -> Result<(), MotorError> {
        let gpio = Gpio::new()?;

        for channel in MotorChannel::ALL {
            let pin_number = self.config.pin(channel);
            let mut pin = gpio.get(pin_number)?.into_output();
            pin.set_pwm_frequency(self.config.pwm_frequency_hz, 0.0)?;
            debug!("GPIO {} initialized for {:?}", pin_number, channel);
            self.pins.insert(channel, pin);
        }

        info!(
            "PWM motor driver ready at {} Hz on pins {:?}",
            self.config.pwm_frequency_hz,
            MotorChannel::ALL.map(|c| self.config.pin(c))
        );
        Ok(())
    }

    fn set_duty_cycle(&mut self, channel: MotorChannel, percent: f64) -> Result<(), MotorError> {
        let percent = check_duty(percent)?;
        if self.pins.is_empty() {
            return Err(MotorError::NotInitialized);
        }

        let pin = self
            .pins
            .get_mut(&channel)
            .ok_or(MotorError::UnknownChannel(channel))?;
        pin.set_pwm_frequency(self.config.pwm_frequency_hz, percent / FULL_DUTY)?;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), MotorError> {
        for (channel, pin) in self.pins.iter_mut() {
            if let Err(e) = pin.clear_pwm() {
                warn!("Failed to clear PWM on {:?}: {}", channel, e);
            }
            pin.set_low();
        }
        // Dropping the pins resets them to their previous mode
        self.pins.clear();
        info!("PWM motor driver released");
        Ok(())
    }

    fn name(&self) -> &str {
        "pwm"
    }
}

/// Driver that only logs duty cycles, for running without motor hardware
#[derive(Debug, Default)]
pub struct DryRunMotorDriver {
    duties: HashMap<MotorChannel, f64>,
    initialized: bool,
}

impl DryRunMotorDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duty(&self, channel: MotorChannel) -> f64 {
        self.duties.get(&channel).copied().unwrap_or(0.0)
    }
}

impl MotorDriver for DryRunMotorDriver {
    fn initialize(&mut self) -> Result<(), MotorError> {
        for channel in MotorChannel::ALL {
            self.duties.insert(channel, 0.0);
        }
        self.initialized = true;
        info!("Dry-run motor driver ready, no GPIO will be touched");
        Ok(())
    }

    fn set_duty_cycle(&mut self, channel: MotorChannel, percent: f64) -> Result<(), MotorError> {
        let percent = check_duty(percent)?;
        if !self.initialized {
            return Err(MotorError::NotInitialized);
        }
        debug!("[dry-run] {:?} -> {:.0}%", channel, percent);
        self.duties.insert(channel, percent);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), MotorError> {
        self.duties.values_mut().for_each(|duty| *duty = 0.0);
        self.initialized = false;
        info!("Dry-run motor driver released");
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}
