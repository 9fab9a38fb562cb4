use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Pointer event with the wall-clock time it was collected
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Button {
        button: MouseButton,
        pressed: bool,
        timestamp: DateTime<Local>,
    },
    Scroll {
        delta_y: f64,
        timestamp: DateTime<Local>,
    },
}

impl InputEvent {
    pub fn button(button: MouseButton, pressed: bool) -> Self {
        InputEvent::Button {
            button,
            pressed,
            timestamp: Local::now(),
        }
    }

    pub fn scroll(delta_y: f64) -> Self {
        InputEvent::Scroll {
            delta_y,
            timestamp: Local::now(),
        }
    }
}
