//! Normalized state shared by every on-screen control

use std::fmt;

/// Integer identifier reported when no pointer owns a control
pub const NO_IDENTIFIER: i64 = -1;

/// Integer identifier reported for mouse input
///
/// Platforms hand out non-negative touch ids, so a negative placeholder
/// can never be mistaken for a finger.
pub const MOUSE_IDENTIFIER: i64 = -2;

/// Pointer that can own a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerId {
    /// The (single) mouse cursor
    Mouse,
    /// A touch contact, keyed by its platform-assigned identifier
    Touch(i64),
}

impl PointerId {
    /// Integer form used by hosts that only understand numeric ids
    pub fn raw(self) -> i64 {
        match self {
            Self::Mouse => MOUSE_IDENTIFIER,
            Self::Touch(id) => id,
        }
    }
}

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mouse => write!(f, "mouse"),
            Self::Touch(id) => write!(f, "touch:{}", id),
        }
    }
}

/// Output record of a joystick or button
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControllerState {
    /// Control is engaged (may stay set for sticky joysticks after release)
    pub is_active: bool,
    /// A pointer is currently down on the control
    pub is_pressed: bool,
    /// Magnitude in [0, 1]
    pub value: f32,
    /// Direction of displacement in radians; meaningless when `value == 0`
    pub angle: f32,
    /// Normalized horizontal displacement in [-1, 1]
    pub x: f32,
    /// Normalized vertical displacement in [-1, 1]
    pub y: f32,
    /// Owning pointer, `None` when nothing owns the control
    pub identifier: Option<PointerId>,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owner as an integer: `-1` for none, [`MOUSE_IDENTIFIER`] for the mouse
    pub fn raw_identifier(&self) -> i64 {
        self.identifier.map_or(NO_IDENTIFIER, PointerId::raw)
    }

    /// Zero the directional part and mark the control idle
    pub(crate) fn reset(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.angle = 0.0;
        self.value = 0.0;
        self.is_active = false;
        self.is_pressed = false;
    }
}
