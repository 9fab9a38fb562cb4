//! Drive context shared by the input router and the spin watchdog
//!
//! Owns the motor controller and the spin state. Everything that touches
//! the spin state also writes the motors while still holding the spin lock,
//! so a re-arm from the router and an expiry from the watchdog are strictly
//! ordered: whichever takes the lock second sees the other's result.
//!
//! Lock order is always spin state, then motor state.

use crate::drive::{DriveCommand, MotorDriveController, MotorError};
use crate::spin::{SpinDirection, SpinState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info};

pub struct DriveContext {
    controller: Arc<MotorDriveController>,
    spin: Mutex<SpinState>,
    rearmed: Notify,
    spin_timeout: Duration,
}

impl DriveContext {
    pub fn new(controller: Arc<MotorDriveController>, spin_timeout: Duration) -> Self {
        Self {
            controller,
            spin: Mutex::new(SpinState::new()),
            rearmed: Notify::new(),
            spin_timeout,
        }
    }

    fn lock_spin(&self) -> MutexGuard<'_, SpinState> {
        self.spin.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn controller(&self) -> &Arc<MotorDriveController> {
        &self.controller
    }

    pub fn spin_timeout(&self) -> Duration {
        self.spin_timeout
    }

    pub fn spin_state(&self) -> SpinState {
        *self.lock_spin()
    }

    pub fn spin_deadline(&self) -> Option<Instant> {
        self.lock_spin().deadline(self.spin_timeout)
    }

    /// Starts or keeps alive a spin in `direction`.
    ///
    /// The motor command is only written when the spin was inactive or
    /// changes direction; the timestamp is refreshed every time. Returns
    /// whether a command was written.
    pub fn rearm_spin(&self, direction: SpinDirection) -> Result<bool, MotorError> {
        let mut spin = self.lock_spin();

        let issued = if spin.is_spinning(direction) {
            debug!("Spin {:?} already active, refreshing timer", direction);
            false
        } else {
            self.controller.execute(direction.command())?;
            spin.active = true;
            spin.direction = direction;
            true
        };

        spin.last_event = Instant::now();
        drop(spin);

        self.rearmed.notify_one();
        Ok(issued)
    }

    /// Drives a button command. Any active spin is superseded.
    pub fn issue(&self, command: DriveCommand) -> Result<(), MotorError> {
        let mut spin = self.lock_spin();
        if spin.active {
            debug!("{} supersedes active spin", command);
            spin.active = false;
        }
        self.controller.execute(command)?;
        Ok(())
    }

    /// Stop request on button release, see [`MotorDriveController::stop`]
    pub fn request_stop(&self) -> Result<DriveCommand, MotorError> {
        let mut spin = self.lock_spin();
        spin.active = false;
        self.controller.stop()
    }

    /// Cancels the spin if it went stale at `now`. Returns whether it fired.
    ///
    /// Expiry is a plain stop request: the car halts, or keeps driving
    /// forward while the middle button is latched. A turn button still held
    /// from before the spin is not resumed, the driver has to press it again.
    pub fn expire_stale_spin(&self, now: Instant) -> Result<bool, MotorError> {
        let mut spin = self.lock_spin();
        if !spin.is_stale(now, self.spin_timeout) {
            return Ok(false);
        }

        info!(
            "No scroll event for {:?}, stopping spin",
            now.saturating_duration_since(spin.last_event)
        );
        spin.active = false;
        self.controller.stop()?;
        Ok(true)
    }

    /// Resolves once the router re-armed the spin since the last call
    pub async fn rearmed(&self) {
        self.rearmed.notified().await
    }

    /// Clears the spin and releases the motors
    pub fn shutdown(&self) -> Result<(), MotorError> {
        let mut spin = self.lock_spin();
        spin.active = false;
        self.controller.shutdown()
    }
}
