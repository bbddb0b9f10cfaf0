//! Host-side gamepad records
//!
//! Shaped after the standard controller-polling interface: a device has an
//! id string, a slot index, a mapping name and flat button/axis arrays.

use serde::Serialize;

/// Number of slots returned by every poll
pub const MAX_GAMEPADS: usize = 4;

/// Buttons on the synthetic device (standard layout)
pub const BUTTON_COUNT: usize = 17;

/// Axes on the synthetic device (LX, LY, RX, RY)
pub const AXIS_COUNT: usize = 4;

/// Id reported by the synthetic device
pub const VIRTUAL_DEVICE_ID: &str = "EmulatedGamepad virtual controller";

pub const STANDARD_MAPPING: &str = "standard";

/// One enumeration result: `MAX_GAMEPADS` slots, `None` for empty ones
pub type PollResult = Vec<Option<GamepadSnapshot>>;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ButtonRecord {
    pub pressed: bool,
    pub touched: bool,
    pub value: f32,
}

impl ButtonRecord {
    pub fn digital(pressed: bool) -> Self {
        Self {
            pressed,
            touched: pressed,
            value: if pressed { 1.0 } else { 0.0 },
        }
    }
}

/// A single device as the host reports it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamepadSnapshot {
    pub id: String,
    pub index: usize,
    pub connected: bool,
    pub mapping: String,
    pub buttons: Vec<ButtonRecord>,
    pub axes: Vec<f32>,
    /// Milliseconds, host-defined epoch
    pub timestamp: f64,
}

impl GamepadSnapshot {
    /// Connected standard-layout device with everything at rest
    pub fn new(id: impl Into<String>, index: usize, buttons: usize, axes: usize) -> Self {
        Self {
            id: id.into(),
            index,
            connected: true,
            mapping: STANDARD_MAPPING.to_string(),
            buttons: vec![ButtonRecord::default(); buttons],
            axes: vec![0.0; axes],
            timestamp: 0.0,
        }
    }

    /// Fresh synthetic device
    pub fn virtual_device() -> Self {
        Self::new(VIRTUAL_DEVICE_ID, 0, BUTTON_COUNT, AXIS_COUNT)
    }

    pub fn is_virtual(&self) -> bool {
        self.id == VIRTUAL_DEVICE_ID
    }

    pub fn pressed_buttons(&self) -> impl Iterator<Item = usize> + '_ {
        self.buttons
            .iter()
            .enumerate()
            .filter(|(_, b)| b.pressed)
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_device_shape() {
        let device = GamepadSnapshot::virtual_device();
        assert_eq!(device.id, VIRTUAL_DEVICE_ID);
        assert_eq!(device.index, 0);
        assert!(device.connected);
        assert_eq!(device.mapping, "standard");
        assert_eq!(device.buttons.len(), 17);
        assert_eq!(device.axes, vec![0.0; 4]);
        assert!(device.is_virtual());
    }

    #[test]
    fn test_pressed_buttons() {
        let mut device = GamepadSnapshot::new("Pad", 1, 4, 2);
        device.buttons[2] = ButtonRecord::digital(true);
        assert_eq!(device.pressed_buttons().collect::<Vec<_>>(), vec![2]);
    }
}
