//! Reads mouse events from a Linux evdev node
//!
//! The device is opened through the `evdev` crate and read as a tokio event
//! stream. Only the three mouse buttons and the vertical wheel are
//! forwarded, everything else the mouse reports is dropped here.

use crate::error::DriveError;
use crate::input::event::{InputEvent, MouseButton};
use evdev::{Device, EventStream, EventSummary, KeyCode, RelativeAxisCode};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const KEY_RELEASED: i32 = 0;
const KEY_PRESSED: i32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to open input device {path}: {source}")]
    OpenDevice { path: PathBuf, source: io::Error },

    #[error("Failed to grab input device {path}: {source}")]
    Grab { path: PathBuf, source: io::Error },

    #[error("Failed to read input event: {0}")]
    Read(#[from] io::Error),

    #[error("Collector task failed: {0}")]
    Task(String),
}

/// Something that yields raw evdev events, one at a time
pub trait EventSource: Send + 'static {
    fn next_event(&mut self) -> impl Future<Output = io::Result<evdev::InputEvent>> + Send;
}

impl EventSource for EventStream {
    fn next_event(&mut self) -> impl Future<Output = io::Result<evdev::InputEvent>> + Send {
        EventStream::next_event(self)
    }
}

/// Maps a raw evdev event to a mouse event, `None` for anything not driving
/// the car (motion, sync reports, other keys, key auto-repeat).
pub fn translate(event: evdev::InputEvent) -> Option<InputEvent> {
    match event.destructure() {
        EventSummary::Key(_, code, value) => {
            let button = map_button(code)?;
            let pressed = match value {
                KEY_PRESSED => true,
                KEY_RELEASED => false,
                // auto-repeat
                _ => return None,
            };
            Some(InputEvent::button(button, pressed))
        }
        EventSummary::RelativeAxis(_, RelativeAxisCode::REL_WHEEL, value) if value != 0 => {
            Some(InputEvent::scroll(f64::from(value)))
        }
        _ => None,
    }
}

fn map_button(code: KeyCode) -> Option<MouseButton> {
    match code {
        KeyCode::BTN_LEFT => Some(MouseButton::Left),
        KeyCode::BTN_RIGHT => Some(MouseButton::Right),
        KeyCode::BTN_MIDDLE => Some(MouseButton::Middle),
        _ => None,
    }
}

/// Opens `path` as an event stream. With `grab` set the mouse is taken
/// exclusively, so the desktop does not act on clicks while driving.
pub fn open_device(path: &Path, grab: bool) -> Result<EventStream, CollectorError> {
    let open_err = |source| CollectorError::OpenDevice {
        path: path.to_path_buf(),
        source,
    };

    let mut device = Device::open(path).map_err(open_err)?;
    info!(
        "Opened input device {} ({})",
        path.display(),
        device.name().unwrap_or("unnamed")
    );

    if grab {
        device.grab().map_err(|source| CollectorError::Grab {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Grabbed {} exclusively", path.display());
    }

    device.into_event_stream().map_err(open_err)
}

/// Forwards translated events from `source` until it fails or the receiver
/// is dropped. Returns the number of forwarded events.
pub async fn collect_events<S: EventSource>(
    mut source: S,
    sender: mpsc::Sender<InputEvent>,
) -> Result<u64, CollectorError> {
    let mut forwarded = 0;

    loop {
        let raw = source.next_event().await.map_err(|e| {
            warn!("Input source failed after {} events: {}", forwarded, e);
            CollectorError::Read(e)
        })?;

        let Some(event) = translate(raw) else {
            continue;
        };

        match &event {
            InputEvent::Button {
                button,
                pressed,
                timestamp,
            } => debug!(
                "Button event: {:?} {} at {}",
                button,
                if *pressed { "pressed" } else { "released" },
                timestamp.format("%H:%M:%S.%3f")
            ),
            InputEvent::Scroll { delta_y, timestamp } => debug!(
                "Scroll event: {:+} at {}",
                delta_y,
                timestamp.format("%H:%M:%S.%3f")
            ),
        }

        if sender.send(event).await.is_err() {
            info!("Event receiver dropped, stopping collector");
            return Ok(forwarded);
        }
        forwarded += 1;
    }
}

/// Collector task feeding the router's channel
pub struct CollectorHandle {
    name: String,
    task: JoinHandle<Result<u64, CollectorError>>,
}

impl CollectorHandle {
    /// Opens the evdev node at `device` and starts collecting from it
    pub fn open(
        device: &Path,
        grab: bool,
        sender: mpsc::Sender<InputEvent>,
    ) -> Result<Self, CollectorError> {
        let stream = open_device(device, grab)?;
        Ok(Self::spawn(device.display().to_string(), stream, sender))
    }

    pub fn spawn<S: EventSource>(
        name: impl Into<String>,
        source: S,
        sender: mpsc::Sender<InputEvent>,
    ) -> Self {
        let name = name.into();
        let task_name = name.clone();
        let task = tokio::spawn(async move {
            let result = collect_events(source, sender).await;
            if let Err(e) = &result {
                error!("Collector for {} failed: {}", task_name, e);
            }
            result
        });

        Self { name, task }
    }

    pub fn stop(self) {
        debug!("Stopping collector for {}", self.name);
        self.task.abort();
    }

    /// Waits for the collector task to end on its own
    pub async fn join(self) -> Result<u64, CollectorError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(CollectorError::Task(e.to_string())),
        }
    }

    /// Ends the collector after a drive session.
    ///
    /// A session that lost its event source gets the collector's own failure
    /// as the error, so the cause of the loss is not swallowed. Any other
    /// outcome stops the collector and is passed through.
    pub async fn finish<T>(self, session: Result<T, DriveError>) -> Result<T, DriveError> {
        match session {
            Err(DriveError::EventSourceLost(reason)) => {
                let name = self.name.clone();
                match self.join().await {
                    Err(e) => Err(DriveError::Collector(e)),
                    Ok(forwarded) => Err(DriveError::EventSourceLost(format!(
                        "{} ({} ended after {} events)",
                        reason, name, forwarded
                    ))),
                }
            }
            other => {
                self.stop();
                other
            }
        }
    }
}
