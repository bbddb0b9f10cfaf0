//! Virtual gamepad device and real-device remapping
//!
//! Game code polls a [`Navigator`]; an [`EmulatedGamepad`] hooks it to
//! report one synthetic standard-layout controller, fed by on-screen widgets
//! and, through a [`RemapConfig`], by real controllers.

pub mod axis;
pub mod buttons;
pub mod diagnostics;
pub mod emulated;
pub mod gilrs_source;
pub mod navigator;
pub mod remap;
pub mod snapshot;

pub use diagnostics::print_gamepad_diagnostics;
pub use emulated::{ButtonInput, EmulatedGamepad};
pub use gilrs_source::GilrsSource;
pub use navigator::{EngineId, GamepadSource, MemorySource, Navigator};
pub use remap::{RemapConfig, RemapSlot, SourceKind, VirtualSlot};
pub use snapshot::{ButtonRecord, GamepadSnapshot, PollResult, AXIS_COUNT, BUTTON_COUNT};
