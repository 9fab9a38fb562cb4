//! Drives a two-motor differential-drive car from mouse input
//!
//! Buttons steer, the wheel spins the car in place for as long as it keeps
//! turning. A watchdog task stops a spin once the wheel went quiet.

pub mod config;
pub mod context;
pub mod drive;
pub mod error;
pub mod input;
pub mod spin;
pub mod vehicle;

pub use config::Config;
pub use context::DriveContext;
pub use error::DriveError;
pub use vehicle::Vehicle;
