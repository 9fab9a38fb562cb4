#![allow(dead_code)]

use mousecar::drive::{
    MotorChannel, MotorDriveController, MotorDriver, MotorError, MotorOutputs, TurnFactor,
};
use mousecar::input::EventSource;
use mousecar::DriveContext;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SPIN_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
struct Recording {
    duties: HashMap<MotorChannel, f64>,
    channel_writes: usize,
    initialized: bool,
    shutdowns: usize,
    // forward and reverse of one side high after a single channel write
    violations: usize,
    fail_init: bool,
    fail_writes_after: Option<usize>,
}

/// Motor driver mock that records every channel write
#[derive(Debug, Clone, Default)]
pub struct RecordingMotor {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingMotor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_init() -> Self {
        let motor = Self::new();
        motor.inner.lock().unwrap().fail_init = true;
        motor
    }

    /// Channel writes after the first `writes` fail
    pub fn failing_after(writes: usize) -> Self {
        let motor = Self::new();
        motor.inner.lock().unwrap().fail_writes_after = Some(writes);
        motor
    }

    pub fn outputs(&self) -> MotorOutputs {
        let recording = self.inner.lock().unwrap();
        let duty = |channel| recording.duties.get(&channel).copied().unwrap_or(0.0);
        MotorOutputs {
            right_forward: duty(MotorChannel::RightForward),
            right_reverse: duty(MotorChannel::RightReverse),
            left_forward: duty(MotorChannel::LeftForward),
            left_reverse: duty(MotorChannel::LeftReverse),
        }
    }

    pub fn channel_writes(&self) -> usize {
        self.inner.lock().unwrap().channel_writes
    }

    pub fn shutdowns(&self) -> usize {
        self.inner.lock().unwrap().shutdowns
    }

    pub fn violations(&self) -> usize {
        self.inner.lock().unwrap().violations
    }
}

impl MotorDriver for RecordingMotor {
    fn initialize(&mut self) -> Result<(), MotorError> {
        let mut recording = self.inner.lock().unwrap();
        if recording.fail_init {
            return Err(MotorError::NotInitialized);
        }
        recording.initialized = true;
        Ok(())
    }

    fn set_duty_cycle(&mut self, channel: MotorChannel, percent: f64) -> Result<(), MotorError> {
        let mut recording = self.inner.lock().unwrap();
        if !recording.initialized {
            return Err(MotorError::NotInitialized);
        }
        if let Some(limit) = recording.fail_writes_after {
            if recording.channel_writes >= limit {
                return Err(MotorError::UnknownChannel(channel));
            }
        }

        recording.duties.insert(channel, percent);
        recording.channel_writes += 1;

        let duty = |channel| recording.duties.get(&channel).copied().unwrap_or(0.0);
        let right_clash =
            duty(MotorChannel::RightForward) > 0.0 && duty(MotorChannel::RightReverse) > 0.0;
        let left_clash =
            duty(MotorChannel::LeftForward) > 0.0 && duty(MotorChannel::LeftReverse) > 0.0;
        if right_clash || left_clash {
            recording.violations += 1;
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), MotorError> {
        let mut recording = self.inner.lock().unwrap();
        recording.duties.clear();
        recording.initialized = false;
        recording.shutdowns += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn turn_factor() -> TurnFactor {
    TurnFactor::from_sensitivity(0.6).unwrap()
}

/// Initialized drive context over `motor` with a 200 ms spin timeout
pub fn context(motor: &RecordingMotor) -> Arc<DriveContext> {
    let controller = Arc::new(MotorDriveController::new(
        Box::new(motor.clone()),
        turn_factor(),
    ));
    controller.initialize().unwrap();
    Arc::new(DriveContext::new(controller, SPIN_TIMEOUT))
}

/// Event source replaying raw evdev events, then failing the way an
/// unplugged device does (ENODEV)
pub struct UnpluggedMouse {
    events: VecDeque<evdev::InputEvent>,
}

impl UnpluggedMouse {
    pub fn immediately() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    pub fn after(events: impl IntoIterator<Item = evdev::InputEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

impl EventSource for UnpluggedMouse {
    fn next_event(&mut self) -> impl Future<Output = io::Result<evdev::InputEvent>> + Send {
        let next = self
            .events
            .pop_front()
            .ok_or_else(|| io::Error::from_raw_os_error(19));
        std::future::ready(next)
    }
}
