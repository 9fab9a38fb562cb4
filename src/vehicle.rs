//! Vehicle lifecycle with statum state machine
//!
//! ```text
//! Initializing ──► Running ──► Stopped
//!  (motors at 0)   (router +    (motors at 0,
//!                   watchdog)    driver released)
//! ```
//!
//! `shutdown` consumes the running vehicle, so the orderly stop can only
//! happen once.

use crate::config::{Config, WatchdogConfig};
use crate::context::DriveContext;
use crate::drive::{MotorDriveController, MotorDriver, MotorError};
use crate::error::DriveError;
use crate::input::{InputEvent, InputEventRouter};
use crate::spin::SpinWatchdog;
use statum::{machine, state};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type WatchdogTask = JoinHandle<Result<(), MotorError>>;

#[state]
#[derive(Debug, Clone)]
pub enum VehicleState {
    Initializing,
    Running,
    Stopped,
}

#[machine]
pub struct Vehicle<S: VehicleState> {
    context: Arc<DriveContext>,
    watchdog_config: WatchdogConfig,
    watchdog_cancel: CancellationToken,
    watchdog: Option<WatchdogTask>,
}

impl<S: VehicleState> Vehicle<S> {
    pub fn context(&self) -> &Arc<DriveContext> {
        &self.context
    }
}

impl Vehicle<Initializing> {
    /// Initializes the motor driver with every channel at 0
    pub fn create(driver: Box<dyn MotorDriver>, config: &Config) -> Result<Self, DriveError> {
        let factor = config.drive.turn_factor()?;
        let controller = Arc::new(MotorDriveController::new(driver, factor));
        controller.initialize()?;

        let context = Arc::new(DriveContext::new(
            controller,
            config.watchdog.spin_timeout(),
        ));
        info!(
            "Vehicle initialized, turn factor {:.2}",
            factor.value()
        );

        Ok(Self::new(
            context,
            config.watchdog.clone(),
            CancellationToken::new(),
            None, // watchdog
        ))
    }

    /// Spawns the spin watchdog
    pub fn start(mut self) -> Vehicle<Running> {
        let watchdog = SpinWatchdog::new(
            self.context.clone(),
            &self.watchdog_config,
            self.watchdog_cancel.clone(),
        );
        self.watchdog = Some(watchdog.spawn());
        info!("Vehicle running");
        self.transition()
    }
}

enum Exit {
    Router(Result<(), DriveError>),
    Watchdog(Result<Result<(), MotorError>, JoinError>),
}

async fn wait_watchdog(task: &mut Option<WatchdogTask>) -> Result<Result<(), MotorError>, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

impl Vehicle<Running> {
    /// Routes `events` until `shutdown` fires, the source closes or a motor
    /// write fails, then shuts down. The session error wins over a shutdown
    /// error, which is only logged in that case.
    pub async fn run_until_shutdown(
        mut self,
        mut events: mpsc::Receiver<InputEvent>,
        shutdown: CancellationToken,
    ) -> Result<Vehicle<Stopped>, DriveError> {
        let mut router = InputEventRouter::new(self.context.clone());

        let exit = tokio::select! {
            outcome = router.run(&mut events, &shutdown) => Exit::Router(outcome),
            joined = wait_watchdog(&mut self.watchdog) => Exit::Watchdog(joined),
        };

        let outcome = match exit {
            Exit::Router(outcome) => outcome,
            Exit::Watchdog(joined) => {
                self.watchdog = None;
                Err(match joined {
                    Ok(Ok(())) => DriveError::TaskError("spin watchdog exited".to_string()),
                    Ok(Err(e)) => DriveError::HardwareUnavailable(e),
                    Err(e) => DriveError::TaskError(format!("spin watchdog panicked: {}", e)),
                })
            }
        };

        if let Err(e) = &outcome {
            error!("Drive session failed: {}", e);
        }

        let stopped = self.shutdown().await;
        match (outcome, stopped) {
            (Ok(()), stopped) => stopped,
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(shutdown_error)) => {
                error!("Shutdown after failure also failed: {}", shutdown_error);
                Err(e)
            }
        }
    }

    /// Stops the watchdog, halts the motors and releases the driver
    pub async fn shutdown(mut self) -> Result<Vehicle<Stopped>, DriveError> {
        info!("Shutting down vehicle");
        self.watchdog_cancel.cancel();

        if let Some(handle) = self.watchdog.take() {
            match handle.await {
                Ok(Ok(())) => debug!("Spin watchdog joined"),
                Ok(Err(e)) => warn!("Spin watchdog had failed: {}", e),
                Err(e) => warn!("Spin watchdog task failed: {}", e),
            }
        }

        self.context.shutdown()?;
        info!("Vehicle stopped, motors released");
        Ok(self.transition())
    }
}

impl Vehicle<Stopped> {}
