//! Input handling: on-screen controls and the virtual gamepad

pub mod gamepad;
pub mod normalize;
pub mod touch;
