use std::fmt;

/// Full duty cycle in percent
pub const FULL_DUTY: f64 = 100.0;

/// Intended motion of the vehicle
///
/// Exactly one command is active at a time. The command describes what the
/// vehicle should do, [`apply`] turns it into raw duty cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveCommand {
    Idle,
    Forward,
    Reverse,
    ForwardLeft,
    ForwardRight,
    SpinClockwise,
    SpinCounterClockwise,
}

impl fmt::Display for DriveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveCommand::Idle => write!(f, "Idle"),
            DriveCommand::Forward => write!(f, "Forward"),
            DriveCommand::Reverse => write!(f, "Reverse"),
            DriveCommand::ForwardLeft => write!(f, "Forward left"),
            DriveCommand::ForwardRight => write!(f, "Forward right"),
            DriveCommand::SpinClockwise => write!(f, "Spin clockwise"),
            DriveCommand::SpinCounterClockwise => write!(f, "Spin counterclockwise"),
        }
    }
}

/// One of the four PWM output lines of the motor driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorChannel {
    RightForward,
    RightReverse,
    LeftForward,
    LeftReverse,
}

impl MotorChannel {
    pub const ALL: [MotorChannel; 4] = [
        MotorChannel::RightForward,
        MotorChannel::RightReverse,
        MotorChannel::LeftForward,
        MotorChannel::LeftReverse,
    ];
}

/// Duty cycles (0-100 %) for the four motor channels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorOutputs {
    pub right_forward: f64,
    pub right_reverse: f64,
    pub left_forward: f64,
    pub left_reverse: f64,
}

impl MotorOutputs {
    pub const IDLE: MotorOutputs = MotorOutputs {
        right_forward: 0.0,
        right_reverse: 0.0,
        left_forward: 0.0,
        left_reverse: 0.0,
    };

    pub fn duty(&self, channel: MotorChannel) -> f64 {
        match channel {
            MotorChannel::RightForward => self.right_forward,
            MotorChannel::RightReverse => self.right_reverse,
            MotorChannel::LeftForward => self.left_forward,
            MotorChannel::LeftReverse => self.left_reverse,
        }
    }

    pub fn channels(&self) -> [(MotorChannel, f64); 4] {
        MotorChannel::ALL.map(|channel| (channel, self.duty(channel)))
    }

    /// No side is driven forward and in reverse at the same time
    pub fn is_consistent(&self) -> bool {
        !(self.right_forward > 0.0 && self.right_reverse > 0.0)
            && !(self.left_forward > 0.0 && self.left_reverse > 0.0)
    }

    pub fn is_idle(&self) -> bool {
        *self == MotorOutputs::IDLE
    }
}

impl fmt::Display for MotorOutputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R(+{:.0} -{:.0}) L(+{:.0} -{:.0})",
            self.right_forward, self.right_reverse, self.left_forward, self.left_reverse
        )
    }
}

/// Speed multiplier for the inner wheel of a forward turn
///
/// Derived from the configured sensitivity as `1 - sensitivity`. Always
/// strictly between 0 and 1, a factor of 0 would pivot and 1 would not turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnFactor(f64);

impl TurnFactor {
    pub fn from_sensitivity(sensitivity: f64) -> Option<Self> {
        let factor = 1.0 - sensitivity;
        (factor > 0.0 && factor < 1.0).then_some(Self(factor))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Maps a drive command to the duty cycles of the four channels.
///
/// `ForwardLeft`/`ForwardRight` scale the inner wheel by `factor`. A factor
/// of 1.0 degenerates into straight forward driving.
pub fn apply(command: DriveCommand, factor: f64) -> MotorOutputs {
    let reduced = FULL_DUTY * factor.clamp(0.0, 1.0);

    match command {
        DriveCommand::Idle => MotorOutputs::IDLE,
        DriveCommand::Forward => MotorOutputs {
            right_forward: FULL_DUTY,
            left_forward: FULL_DUTY,
            ..MotorOutputs::IDLE
        },
        DriveCommand::Reverse => MotorOutputs {
            right_reverse: FULL_DUTY,
            left_reverse: FULL_DUTY,
            ..MotorOutputs::IDLE
        },
        DriveCommand::ForwardLeft => MotorOutputs {
            right_forward: FULL_DUTY,
            left_forward: reduced,
            ..MotorOutputs::IDLE
        },
        DriveCommand::ForwardRight => MotorOutputs {
            right_forward: reduced,
            left_forward: FULL_DUTY,
            ..MotorOutputs::IDLE
        },
        DriveCommand::SpinClockwise => MotorOutputs {
            right_reverse: FULL_DUTY,
            left_forward: FULL_DUTY,
            ..MotorOutputs::IDLE
        },
        DriveCommand::SpinCounterClockwise => MotorOutputs {
            right_forward: FULL_DUTY,
            left_reverse: FULL_DUTY,
            ..MotorOutputs::IDLE
        },
    }
}
