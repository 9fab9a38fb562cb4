//! Input subsystem - mouse events to drive commands
//!
//! ```text
//! evdev node ──► event_collector ──► mpsc ──► event_router ──► DriveContext
//!                (evdev stream)               (button state,
//!                                              spin re-arm)
//! ```

pub mod event;
pub mod event_collector;
pub mod event_router;

pub use event::{InputEvent, MouseButton};
pub use event_collector::{
    collect_events, open_device, translate, CollectorError, CollectorHandle, EventSource,
};
pub use event_router::{ButtonState, InputEventRouter};
