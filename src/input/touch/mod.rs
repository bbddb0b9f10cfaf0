//! On-screen touch controls
//!
//! Each widget is a small state machine fed with pointer events and emitting
//! a [`ControllerState`] through lifecycle callbacks. Coordinates only need
//! to be consistent per pointer; every displacement is relative to where
//! the owning pointer went down.

pub mod button;
pub mod joystick;
pub mod state;
pub mod timer;

pub use button::{Button, ButtonConfig};
pub use joystick::{Joystick, JoystickConfig, MoveOutcome};
pub use state::{ControllerState, PointerId, MOUSE_IDENTIFIER, NO_IDENTIFIER};
pub use timer::ReleaseTimer;

/// Synchronous widget notification
///
/// Callbacks must not re-enter the widget that invoked them.
pub type StateCallback = Box<dyn FnMut(&ControllerState)>;
