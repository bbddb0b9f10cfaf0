//! Standard-layout button mapping for gilrs controllers
//!
//! The standard gamepad layout numbers buttons by physical position:
//!
//! ```text
//!   0  bottom face    4  left bumper     8  select      12 d-pad up
//!   1  right face     5  right bumper    9  start       13 d-pad down
//!   2  left face      6  left trigger    10 left stick  14 d-pad left
//!   3  top face       7  right trigger   11 right stick 15 d-pad right
//!                                                       16 home
//! ```
//!
//! gilrs reports the same physical positions (South, East, West, North), so
//! the mapping is a fixed table.

use gilrs::Button;
use tracing::warn;

use super::snapshot::BUTTON_COUNT;

/// gilrs buttons in standard index order
pub const STANDARD_BUTTONS: [Button; BUTTON_COUNT] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
    Button::Mode,
];

/// Short names, indexed like [`STANDARD_BUTTONS`]
const BUTTON_NAMES: [&str; BUTTON_COUNT] = [
    "a", "b", "x", "y", "lb", "rb", "lt", "rt", "select", "start", "l3", "r3", "up", "down",
    "left", "right", "home",
];

/// Map a gilrs button to its standard index
///
/// Returns `None` for buttons outside the standard layout (C, Z, unknown).
pub fn gilrs_button_to_standard_index(button: Button) -> Option<usize> {
    let index = STANDARD_BUTTONS.iter().position(|b| *b == button);
    if index.is_none() {
        warn!("Button {:?} has no standard index", button);
    }
    index
}

/// Short name of a standard button index ("a", "lb", "up", ...)
pub fn standard_button_name(index: usize) -> Option<&'static str> {
    BUTTON_NAMES.get(index).copied()
}

/// Reverse of [`standard_button_name`]
pub fn standard_button_index(name: &str) -> Option<usize> {
    let name = name.to_ascii_lowercase();
    BUTTON_NAMES.iter().position(|n| *n == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_buttons_follow_position() {
        assert_eq!(gilrs_button_to_standard_index(Button::South), Some(0));
        assert_eq!(gilrs_button_to_standard_index(Button::East), Some(1));
        assert_eq!(gilrs_button_to_standard_index(Button::West), Some(2));
        assert_eq!(gilrs_button_to_standard_index(Button::North), Some(3));
    }

    #[test]
    fn test_dpad_and_home() {
        assert_eq!(gilrs_button_to_standard_index(Button::DPadUp), Some(12));
        assert_eq!(gilrs_button_to_standard_index(Button::DPadRight), Some(15));
        assert_eq!(gilrs_button_to_standard_index(Button::Mode), Some(16));
    }

    #[test]
    fn test_non_standard_buttons() {
        assert_eq!(gilrs_button_to_standard_index(Button::C), None);
        assert_eq!(gilrs_button_to_standard_index(Button::Z), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(standard_button_name(0), Some("a"));
        assert_eq!(standard_button_name(16), Some("home"));
        assert_eq!(standard_button_name(17), None);
        assert_eq!(standard_button_index("LB"), Some(4));
        assert_eq!(standard_button_index("menu"), None);
    }
}
