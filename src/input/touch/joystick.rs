//! Pointer-tracking joystick state machine
//!
//! A joystick is owned by at most one pointer at a time. Displacement is
//! measured from the point where that pointer went down (not from the
//! widget's geometric centre), so grabbing the stick off-centre never makes
//! it jump.
//!
//! ```text
//!            engage(p)                 release(p) / cancel(p)
//!   Idle ─────────────────► Engaged(p) ─────────────────────► Idle
//!                            │    ▲
//!                            └────┘ move_to(p)
//! ```
//!
//! Events from any pointer other than the owner are ignored.

use tracing::{debug, trace};

use super::state::{ControllerState, PointerId};
use super::StateCallback;
use crate::input::normalize::{is_in_dead_zone, limit_displacement};

/// Default widget radius in widget units
pub const DEFAULT_RADIUS: f32 = 50.0;

/// Share of the widget radius the stick may travel
pub const TRAVEL_RATIO: f32 = 0.7;

/// Joystick behaviour, fixed at construction
#[derive(Debug, Clone, PartialEq)]
pub struct JoystickConfig {
    /// Maximum stick travel; displacement beyond it reports `value == 1`
    pub max_travel_radius: f32,
    /// Fraction of `max_travel_radius` treated as the dead-zone band
    pub dead_zone_ratio: f32,
    /// Drop updates inside the dead-zone band (false = sticky, keep tracking)
    pub auto_return_on_dead_zone: bool,
    /// Zero the stick and deactivate on release
    pub stick_returns_to_center_on_release: bool,
    /// Ask the presentation layer to move the whole widget back on release
    pub base_returns_to_origin_on_release: bool,
}

impl JoystickConfig {
    /// Config for a widget of the given radius, travel derived from it
    pub fn for_radius(radius: f32) -> Self {
        Self {
            max_travel_radius: radius * TRAVEL_RATIO,
            ..Self::default()
        }
    }

    /// Dead-zone band radius in widget units
    pub fn dead_zone_radius(&self) -> f32 {
        self.max_travel_radius * self.dead_zone_ratio
    }
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            max_travel_radius: DEFAULT_RADIUS * TRAVEL_RATIO,
            dead_zone_ratio: 0.1,
            auto_return_on_dead_zone: true,
            stick_returns_to_center_on_release: true,
            base_returns_to_origin_on_release: true,
        }
    }
}

/// Result of a move event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Not the owning pointer (or joystick idle)
    Ignored,
    /// Inside the dead-zone band, state left untouched
    Suppressed,
    /// State updated and `on_move` fired
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Engaged { owner: PointerId, origin: (f32, f32) },
}

/// On-screen joystick
pub struct Joystick {
    config: JoystickConfig,
    state: ControllerState,
    phase: Phase,
    stick_offset: (f32, f32),
    base_return_pending: bool,
    on_start: Option<StateCallback>,
    on_move: Option<StateCallback>,
    on_end: Option<StateCallback>,
}

impl Joystick {
    pub fn new(config: JoystickConfig) -> Self {
        Self {
            config,
            state: ControllerState::new(),
            phase: Phase::Idle,
            stick_offset: (0.0, 0.0),
            base_return_pending: false,
            on_start: None,
            on_move: None,
            on_end: None,
        }
    }

    /// Callback fired when a pointer takes ownership
    pub fn on_start(mut self, callback: impl FnMut(&ControllerState) + 'static) -> Self {
        self.on_start = Some(Box::new(callback));
        self
    }

    /// Callback fired for every accepted displacement update
    pub fn on_move(mut self, callback: impl FnMut(&ControllerState) + 'static) -> Self {
        self.on_move = Some(Box::new(callback));
        self
    }

    /// Callback fired when the owner releases or cancels
    pub fn on_end(mut self, callback: impl FnMut(&ControllerState) + 'static) -> Self {
        self.on_end = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &JoystickConfig {
        &self.config
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Pointer currently owning the joystick
    pub fn owner(&self) -> Option<PointerId> {
        match self.phase {
            Phase::Engaged { owner, .. } => Some(owner),
            Phase::Idle => None,
        }
    }

    pub fn is_engaged(&self) -> bool {
        matches!(self.phase, Phase::Engaged { .. })
    }

    /// Visual stick displacement from the widget centre, in widget units
    pub fn stick_offset(&self) -> (f32, f32) {
        self.stick_offset
    }

    /// Consume the "move the base back to its original placement" signal
    pub fn take_base_return(&mut self) -> bool {
        std::mem::take(&mut self.base_return_pending)
    }

    /// Pointer down on the widget. Ignored while another pointer owns it.
    pub fn engage(&mut self, pointer: PointerId, x: f32, y: f32) -> bool {
        if let Phase::Engaged { owner, .. } = self.phase {
            trace!("Joystick already owned by {}, ignoring {}", owner, pointer);
            return false;
        }

        self.phase = Phase::Engaged {
            owner: pointer,
            origin: (x, y),
        };
        self.state.is_active = true;
        self.state.is_pressed = true;
        self.state.identifier = Some(pointer);
        debug!("Joystick engaged by {} at ({:.1}, {:.1})", pointer, x, y);

        if let Some(callback) = self.on_start.as_mut() {
            callback(&self.state);
        }
        true
    }

    /// Pointer moved. Only the owner's moves are considered.
    pub fn move_to(&mut self, pointer: PointerId, x: f32, y: f32) -> MoveOutcome {
        let origin = match self.phase {
            Phase::Engaged { owner, origin } if owner == pointer => origin,
            _ => return MoveOutcome::Ignored,
        };

        let dx = x - origin.0;
        let dy = y - origin.1;
        let distance = dx.hypot(dy);

        if self.config.auto_return_on_dead_zone
            && is_in_dead_zone(distance, self.config.max_travel_radius, self.config.dead_zone_ratio)
        {
            trace!("Joystick move {:.2} inside dead zone, suppressed", distance);
            return MoveOutcome::Suppressed;
        }

        let vector = limit_displacement(dx, dy, self.config.max_travel_radius);
        self.state.x = vector.x;
        self.state.y = vector.y;
        self.state.angle = vector.angle;
        self.state.value = vector.value;
        self.stick_offset = (
            vector.limited_distance * vector.angle.cos(),
            vector.limited_distance * vector.angle.sin(),
        );

        if let Some(callback) = self.on_move.as_mut() {
            callback(&self.state);
        }
        MoveOutcome::Updated
    }

    /// Owner lifted. Other pointers are ignored.
    pub fn release(&mut self, pointer: PointerId) -> bool {
        match self.phase {
            Phase::Engaged { owner, .. } if owner == pointer => {}
            _ => return false,
        }

        self.phase = Phase::Idle;
        self.state.identifier = None;
        self.state.is_pressed = false;

        if self.config.stick_returns_to_center_on_release {
            self.state.reset();
            self.stick_offset = (0.0, 0.0);
        }
        if self.config.base_returns_to_origin_on_release {
            self.base_return_pending = true;
        }
        debug!("Joystick released by {}", pointer);

        if let Some(callback) = self.on_end.as_mut() {
            callback(&self.state);
        }
        true
    }

    /// Platform cancelled the pointer; same as a release
    pub fn cancel(&mut self, pointer: PointerId) -> bool {
        self.release(pointer)
    }
}

impl std::fmt::Debug for Joystick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Joystick")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
