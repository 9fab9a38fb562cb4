//! Input event router - resolves mouse input into drive commands
//!
//! Button state is re-evaluated from scratch on every event, the router
//! never diffs against the previously issued command:
//!
//! | held after event | event   | command                         |
//! |------------------|---------|---------------------------------|
//! | left + right     | any     | `Reverse`                       |
//! | -                | press   | Left/Right/Middle → `ForwardLeft`/`ForwardRight`/`Forward` |
//! | left             | release | `ForwardLeft`                   |
//! | right            | release | `ForwardRight`                  |
//! | middle / nothing | release | stop (`Forward` while cruising, else `Idle`) |
//!
//! Scroll events start or refresh a spin through the drive context.

use crate::context::DriveContext;
use crate::drive::{DriveCommand, MotorError};
use crate::error::DriveError;
use crate::input::event::{InputEvent, MouseButton};
use crate::spin::SpinDirection;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Which mouse buttons are currently held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

impl ButtonState {
    fn set(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.left = pressed,
            MouseButton::Right => self.right = pressed,
            MouseButton::Middle => self.middle = pressed,
        }
    }
}

/// Outcome of resolving a button event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Drive(DriveCommand),
    Stop,
}

pub struct InputEventRouter {
    context: Arc<DriveContext>,
    buttons: ButtonState,
    handled: u64,
}

impl InputEventRouter {
    pub fn new(context: Arc<DriveContext>) -> Self {
        Self {
            context,
            buttons: ButtonState::default(),
            handled: 0,
        }
    }

    pub fn buttons(&self) -> ButtonState {
        self.buttons
    }

    fn resolve(&self, button: MouseButton, pressed: bool) -> Resolution {
        let held = self.buttons;

        if held.left && held.right {
            return Resolution::Drive(DriveCommand::Reverse);
        }

        if pressed {
            return Resolution::Drive(match button {
                MouseButton::Left => DriveCommand::ForwardLeft,
                MouseButton::Right => DriveCommand::ForwardRight,
                MouseButton::Middle => DriveCommand::Forward,
            });
        }

        if held.left {
            Resolution::Drive(DriveCommand::ForwardLeft)
        } else if held.right {
            Resolution::Drive(DriveCommand::ForwardRight)
        } else {
            Resolution::Stop
        }
    }

    /// Updates the button state and drives the resolved command
    pub fn on_button_event(
        &mut self,
        button: MouseButton,
        pressed: bool,
    ) -> Result<DriveCommand, MotorError> {
        self.buttons.set(button, pressed);
        self.context.controller().set_cruise(self.buttons.middle);

        match self.resolve(button, pressed) {
            Resolution::Drive(command) => {
                debug!("{:?} {} resolved to {}", button, pressed, command);
                self.context.issue(command)?;
                Ok(command)
            }
            Resolution::Stop => {
                let command = self.context.request_stop()?;
                debug!("{:?} released, stop resolved to {}", button, command);
                Ok(command)
            }
        }
    }

    /// Starts or refreshes a spin. Returns the command if one was written.
    pub fn on_scroll_event(&mut self, delta_y: f64) -> Result<Option<DriveCommand>, MotorError> {
        let Some(direction) = SpinDirection::from_scroll(delta_y) else {
            debug!("Ignoring scroll without vertical movement");
            return Ok(None);
        };

        let issued = self.context.rearm_spin(direction)?;
        Ok(issued.then(|| direction.command()))
    }

    pub fn handle(&mut self, event: &InputEvent) -> Result<(), MotorError> {
        self.handled += 1;
        match *event {
            InputEvent::Button {
                button, pressed, ..
            } => {
                self.on_button_event(button, pressed)?;
            }
            InputEvent::Scroll { delta_y, .. } => {
                self.on_scroll_event(delta_y)?;
            }
        }
        Ok(())
    }

    /// Consumes events until `shutdown` fires or the source closes.
    ///
    /// A closed source is reported as [`DriveError::EventSourceLost`]; motor
    /// failures end the loop immediately.
    pub async fn run(
        &mut self,
        events: &mut mpsc::Receiver<InputEvent>,
        shutdown: &CancellationToken,
    ) -> Result<(), DriveError> {
        info!("Input event router running");

        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, router handled {} events", self.handled);
                    return Ok(());
                }
                event = events.recv() => event,
            };

            match event {
                Some(event) => self.handle(&event)?,
                None => {
                    warn!("Input event source closed after {} events", self.handled);
                    return Err(DriveError::EventSourceLost(
                        "input event channel closed".to_string(),
                    ));
                }
            }
        }
    }
}
