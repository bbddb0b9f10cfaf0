//! On-screen touch controls exposed as a synthetic standard gamepad
//!
//! - [`input::touch`]: joystick and button state machines
//! - [`input::gamepad`]: enumeration hook, synthetic device, remap engine
//! - [`ui`]: headless stock layout wiring widgets to the device
//! - [`config`]: YAML configuration with hot reload

pub mod cli;
pub mod config;
pub mod input;
pub mod replay;
pub mod ui;
