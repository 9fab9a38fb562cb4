use crate::config::{WatchdogConfig, WatchdogMode};
use crate::context::DriveContext;
use crate::drive::MotorError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Cancels a spin once scroll events stopped arriving
///
/// In [`WatchdogMode::Deadline`] the task sleeps until the spin deadline and
/// is woken on every re-arm, so it fires exactly at the timeout. In
/// [`WatchdogMode::Poll`] it checks at a fixed interval and fires at most one
/// interval late. Both do nothing while no spin is active.
///
/// An expired spin ends in [`DriveContext::expire_stale_spin`], which stops
/// the car (`Forward` while cruising) without looking at held turn buttons.
pub struct SpinWatchdog {
    context: Arc<DriveContext>,
    mode: WatchdogMode,
    poll_interval: Duration,
    cancel: CancellationToken,
    expirations: u64,
}

impl SpinWatchdog {
    pub fn new(
        context: Arc<DriveContext>,
        config: &WatchdogConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            context,
            mode: config.mode,
            poll_interval: config.poll_interval(),
            cancel,
            expirations: 0,
        }
    }

    /// Spawns the watchdog loop as a tokio task
    pub fn spawn(self) -> JoinHandle<Result<(), MotorError>> {
        tokio::spawn(async move {
            let mode = self.mode;
            let result = self.run().await;
            if let Err(e) = &result {
                error!("Spin watchdog ({:?}) terminated with error: {}", mode, e);
            }
            result
        })
    }

    /// Runs until cancelled or a motor write fails
    pub async fn run(mut self) -> Result<(), MotorError> {
        info!(
            "Spin watchdog started in {:?} mode, timeout {:?}",
            self.mode,
            self.context.spin_timeout()
        );

        match self.mode {
            WatchdogMode::Deadline => self.run_deadline().await?,
            WatchdogMode::Poll => self.run_polling().await?,
        }

        info!(
            "Spin watchdog stopped after {} expired spins",
            self.expirations
        );
        Ok(())
    }

    async fn run_deadline(&mut self) -> Result<(), MotorError> {
        loop {
            let expired = match self.context.spin_deadline() {
                None => tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = self.context.rearmed() => {
                        debug!("Spin armed");
                        false
                    }
                },
                Some(deadline) => tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = self.context.rearmed() => {
                        debug!("Spin re-armed, moving deadline");
                        false
                    }
                    _ = tokio::time::sleep_until(deadline) => true,
                },
            };

            if expired {
                self.check(Instant::now())?;
            }
        }
        Ok(())
    }

    async fn run_polling(&mut self) -> Result<(), MotorError> {
        let mut timer = tokio::time::interval(self.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = timer.tick() => {}
            }
            self.check(Instant::now())?;
        }
        Ok(())
    }

    fn check(&mut self, now: Instant) -> Result<(), MotorError> {
        if self.context.expire_stale_spin(now)? {
            self.expirations += 1;
        }
        Ok(())
    }
}
