//! Drive subsystem - from drive intent to PWM duty cycles
//!
//! ```text
//! DriveCommand ──► apply() ──► MotorOutputs ──► MotorDriver
//!                  (pure)      (4 duty cycles)   (PWM / dry-run)
//! ```
//!
//! [`drive_controller::MotorDriveController`] owns the driver and is the only
//! place that writes channels.

pub mod command;
pub mod drive_controller;
pub mod motor;

pub use command::{apply, DriveCommand, MotorChannel, MotorOutputs, TurnFactor};
pub use drive_controller::MotorDriveController;
pub use motor::{DryRunMotorDriver, MotorDriver, MotorError, PwmMotorDriver};
