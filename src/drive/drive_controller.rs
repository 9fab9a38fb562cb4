//! Motor drive controller - turns drive commands into channel writes
//!
//! Shared between the input router and the spin watchdog through an `Arc`.
//! Every write of the four channels goes through [`MotorDriveController::drive`]
//! and happens under one lock, so the two tasks never interleave
//! half-applied commands.

use crate::drive::command::{apply, DriveCommand, MotorOutputs, TurnFactor};
use crate::drive::motor::{MotorDriver, MotorError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

struct MotorState {
    driver: Box<dyn MotorDriver>,
    command: DriveCommand,
}

pub struct MotorDriveController {
    state: Mutex<MotorState>,
    factor: TurnFactor,
    // Middle button held, stop requests keep driving forward
    cruise: AtomicBool,
}

impl MotorDriveController {
    pub fn new(driver: Box<dyn MotorDriver>, factor: TurnFactor) -> Self {
        Self {
            state: Mutex::new(MotorState {
                driver,
                command: DriveCommand::Idle,
            }),
            factor,
            cruise: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MotorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn initialize(&self) -> Result<(), MotorError> {
        {
            let mut state = self.lock();
            info!("Initializing motor driver: {}", state.driver.name());
            state.driver.initialize()?;
            state.command = DriveCommand::Idle;
        }
        self.drive(MotorOutputs::IDLE)
    }

    /// Pushes raw duty cycles to the four channels.
    ///
    /// Channels going to 0 are written first, so a side never has forward
    /// and reverse high at the same time while switching direction.
    pub fn drive(&self, outputs: MotorOutputs) -> Result<(), MotorError> {
        let mut state = self.lock();
        let channels = outputs.channels();
        let zeroed = channels.iter().filter(|(_, duty)| *duty == 0.0);
        let driven = channels.iter().filter(|(_, duty)| *duty > 0.0);

        for &(channel, duty) in zeroed.chain(driven) {
            state.driver.set_duty_cycle(channel, duty)?;
        }
        Ok(())
    }

    /// Resolves and drives a command
    pub fn execute(&self, command: DriveCommand) -> Result<MotorOutputs, MotorError> {
        let outputs = apply(command, self.factor.value());
        self.drive(outputs)?;

        let previous = std::mem::replace(&mut self.lock().command, command);
        if previous != command {
            info!("{} [{}]", command, outputs);
        } else {
            debug!("Re-issued {} [{}]", command, outputs);
        }
        Ok(outputs)
    }

    /// Stop request. While the cruise latch is held the vehicle keeps
    /// driving forward instead of halting.
    pub fn stop(&self) -> Result<DriveCommand, MotorError> {
        let command = if self.cruise_latched() {
            debug!("Stop requested while cruise latched, keeping forward");
            DriveCommand::Forward
        } else {
            DriveCommand::Idle
        };
        self.execute(command)?;
        Ok(command)
    }

    /// Drives every channel to 0, ignoring the cruise latch, and releases
    /// the motor driver. The driver is released even if the zero write fails.
    pub fn shutdown(&self) -> Result<(), MotorError> {
        self.cruise.store(false, Ordering::SeqCst);
        let halted = self.drive(MotorOutputs::IDLE);

        let mut state = self.lock();
        state.command = DriveCommand::Idle;
        let released = state.driver.shutdown();
        info!("Motor driver {} shut down", state.driver.name());
        halted.and(released)
    }

    pub fn set_cruise(&self, held: bool) {
        self.cruise.store(held, Ordering::SeqCst);
    }

    pub fn cruise_latched(&self) -> bool {
        self.cruise.load(Ordering::SeqCst)
    }
}
