//! Headless on-screen controller layout
//!
//! Owns the widgets of the stock layout (two sticks, A/B/X/Y and a menu
//! button) and forwards their state into an [`EmulatedGamepad`]. Drawing
//! and placement belong to the host; this layer only routes pointer events
//! and wires callbacks.
//!
//! Pointer-down events are targeted (the host knows which widget was hit).
//! Move/up/cancel events are broadcast and every widget filters them by
//! owner, the same way document-level listeners would.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{AppConfig, ButtonBinding, ControlsConfig, JoystickBinding, ShowControls, WidgetDefaults};
use crate::input::gamepad::{EmulatedGamepad, RemapConfig};
use crate::input::touch::{Button, ButtonConfig, ControllerState, Joystick, JoystickConfig, MoveOutcome, PointerId};


/// Widgets of the stock layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetId {
    LeftStick,
    RightStick,
    A,
    B,
    X,
    Y,
    Menu,
}

impl WidgetId {
    pub const ALL: [WidgetId; 7] = [
        WidgetId::LeftStick,
        WidgetId::RightStick,
        WidgetId::A,
        WidgetId::B,
        WidgetId::X,
        WidgetId::Y,
        WidgetId::Menu,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::LeftStick => "ls",
            Self::RightStick => "rs",
            Self::A => "a",
            Self::B => "b",
            Self::X => "x",
            Self::Y => "y",
            Self::Menu => "menu",
        }
    }

    pub fn is_joystick(self) -> bool {
        matches!(self, Self::LeftStick | Self::RightStick)
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown widget '{0}' (expected ls, rs, a, b, x, y or menu)")]
pub struct ParseWidgetError(pub String);

impl FromStr for WidgetId {
    type Err = ParseWidgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.name() == lower)
            .ok_or_else(|| ParseWidgetError(s.to_string()))
    }
}

#[derive(Debug)]
enum Widget {
    Stick(Joystick),
    Button(Button),
}

impl Widget {
    fn state(&self) -> &ControllerState {
        match self {
            Widget::Stick(stick) => stick.state(),
            Widget::Button(button) => button.state(),
        }
    }

    fn release(&mut self, pointer: PointerId) -> bool {
        match self {
            Widget::Stick(stick) => stick.release(pointer),
            Widget::Button(button) => button.release(pointer),
        }
    }

    fn cancel(&mut self, pointer: PointerId) -> bool {
        match self {
            Widget::Stick(stick) => stick.cancel(pointer),
            Widget::Button(button) => button.cancel(pointer),
        }
    }

    fn owner(&self) -> Option<PointerId> {
        match self {
            Widget::Stick(stick) => stick.owner(),
            Widget::Button(button) => button.owner(),
        }
    }
}

/// On-screen controls wired to a virtual gamepad
#[derive(Debug)]
pub struct VirtualGamepadUi {
    engine: EmulatedGamepad,
    defaults: WidgetDefaults,
    controls: ControlsConfig,
    widgets: Vec<(WidgetId, Widget)>,
}

impl VirtualGamepadUi {
    /// Build the widgets of `controls`. The engine is left as is.
    pub fn new(engine: EmulatedGamepad, controls: &ControlsConfig, defaults: &WidgetDefaults) -> Self {
        let mut ui = Self {
            engine,
            defaults: defaults.clone(),
            controls: controls.clone(),
            widgets: Vec::new(),
        };
        ui.build();
        ui
    }

    /// Build from a full application config and start the engine
    pub fn from_config(engine: EmulatedGamepad, config: &AppConfig) -> Self {
        let mut ui = Self::new(engine, &ControlsConfig::none(), &config.widgets);
        ui.apply_config(config);
        ui
    }

    pub fn engine(&self) -> &EmulatedGamepad {
        &self.engine
    }

    pub fn controls(&self) -> &ControlsConfig {
        &self.controls
    }

    /// Replace the whole configuration (hot reload)
    ///
    /// With on-screen controls shown and no remap table, the engine gets an
    /// empty table so the synthetic device is reported.
    pub fn apply_config(&mut self, config: &AppConfig) {
        self.defaults = config.widgets.clone();

        if !config.show_on_screen_controls {
            self.engine.configure(config.remap.clone());
            self.clear_widgets();
            self.controls = ControlsConfig::none();
            info!("On-screen controls hidden");
            return;
        }

        let remap = config.remap.clone().unwrap_or_else(RemapConfig::empty);
        self.engine.configure(Some(remap));
        self.configure(&config.controls);
    }

    /// Rebuild the widgets, releasing held ones first
    pub fn configure(&mut self, controls: &ControlsConfig) {
        self.clear_widgets();
        self.controls = controls.clone();
        self.build();
    }

    /// Stock layout with a subset of controls and an empty remap table.
    /// `None` hides every control and disables the engine.
    pub fn simple_setup(&mut self, show: Option<ShowControls>) {
        match show {
            None => self.destroy(),
            Some(show) => {
                self.engine.configure(Some(RemapConfig::empty()));
                self.configure(&ControlsConfig::simple(&show));
            }
        }
    }

    /// Release everything and disable the engine
    pub fn destroy(&mut self) {
        self.clear_widgets();
        self.controls = ControlsConfig::none();
        self.engine.disable();
    }

    /// Widgets currently built, in layout order
    pub fn widgets(&self) -> impl Iterator<Item = WidgetId> + '_ {
        self.widgets.iter().map(|(id, _)| *id)
    }

    pub fn state(&self, widget: WidgetId) -> Option<&ControllerState> {
        self.widget(widget).map(Widget::state)
    }

    /// Visual stick displacement of a joystick, in widget units
    pub fn stick_offset(&self, widget: WidgetId) -> Option<(f32, f32)> {
        match self.widget(widget)? {
            Widget::Stick(stick) => Some(stick.stick_offset()),
            Widget::Button(_) => None,
        }
    }

    /// Joysticks whose base should move back to its original place
    pub fn take_base_returns(&mut self) -> Vec<WidgetId> {
        self.widgets
            .iter_mut()
            .filter_map(|(id, widget)| match widget {
                Widget::Stick(stick) => stick.take_base_return().then_some(*id),
                Widget::Button(_) => None,
            })
            .collect()
    }

    /// Pointer went down on `widget`
    pub fn pointer_down(&mut self, widget: WidgetId, pointer: PointerId, x: f32, y: f32, now: Instant) -> bool {
        match self.widget_mut(widget) {
            Some(Widget::Stick(stick)) => stick.engage(pointer, x, y),
            Some(Widget::Button(button)) => button.press(pointer, now),
            None => {
                debug!("Pointer down on absent widget {}", widget);
                false
            }
        }
    }

    /// Pointer moved; returns whether any joystick accepted it
    pub fn pointer_move(&mut self, pointer: PointerId, x: f32, y: f32) -> bool {
        let mut updated = false;
        for (_, widget) in &mut self.widgets {
            if let Widget::Stick(stick) = widget {
                updated |= stick.move_to(pointer, x, y) == MoveOutcome::Updated;
            }
        }
        updated
    }

    /// Pointer lifted; returns the widgets it released
    pub fn pointer_up(&mut self, pointer: PointerId) -> Vec<WidgetId> {
        self.widgets
            .iter_mut()
            .filter_map(|(id, widget)| widget.release(pointer).then_some(*id))
            .collect()
    }

    /// Platform cancelled the pointer
    pub fn pointer_cancel(&mut self, pointer: PointerId) -> Vec<WidgetId> {
        self.widgets
            .iter_mut()
            .filter_map(|(id, widget)| widget.cancel(pointer).then_some(*id))
            .collect()
    }

    /// Fire due auto-releases; returns the buttons released
    pub fn tick(&mut self, now: Instant) -> Vec<WidgetId> {
        self.widgets
            .iter_mut()
            .filter_map(|(id, widget)| match widget {
                Widget::Button(button) => button.tick(now).then_some(*id),
                Widget::Stick(_) => None,
            })
            .collect()
    }

    /// Earliest pending auto-release
    pub fn next_deadline(&self) -> Option<Instant> {
        self.widgets
            .iter()
            .filter_map(|(_, widget)| match widget {
                Widget::Button(button) => button.next_deadline(),
                Widget::Stick(_) => None,
            })
            .min()
    }

    fn widget(&self, id: WidgetId) -> Option<&Widget> {
        self.widgets.iter().find(|(w, _)| *w == id).map(|(_, widget)| widget)
    }

    fn widget_mut(&mut self, id: WidgetId) -> Option<&mut Widget> {
        self.widgets
            .iter_mut()
            .find(|(w, _)| *w == id)
            .map(|(_, widget)| widget)
    }

    /// Release held widgets (so the device returns to rest) and drop them
    fn clear_widgets(&mut self) {
        for (_, widget) in &mut self.widgets {
            if let Some(owner) = widget.owner() {
                widget.release(owner);
            }
        }
        self.widgets.clear();
    }

    fn build(&mut self) {
        let joysticks = &self.controls.joysticks;
        let sticks = [
            (WidgetId::LeftStick, joysticks.left.as_ref()),
            (WidgetId::RightStick, joysticks.right.as_ref()),
        ];
        for (id, binding) in sticks.into_iter().filter_map(|(id, b)| Some((id, b?))) {
            let stick = self.build_joystick(id, binding);
            self.widgets.push((id, Widget::Stick(stick)));
        }

        let buttons = &self.controls.buttons;
        let faces = [
            (WidgetId::A, buttons.a.as_ref()),
            (WidgetId::B, buttons.b.as_ref()),
            (WidgetId::X, buttons.x.as_ref()),
            (WidgetId::Y, buttons.y.as_ref()),
            (WidgetId::Menu, buttons.menu.as_ref()),
        ];
        for (id, binding) in faces.into_iter().filter_map(|(id, b)| Some((id, b?))) {
            let button = self.build_button(id, binding);
            self.widgets.push((id, Widget::Button(button)));
        }

        debug!(
            "Built widgets: {}",
            self.widgets
                .iter()
                .map(|(id, _)| id.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    fn build_joystick(&self, id: WidgetId, binding: &JoystickBinding) -> Joystick {
        // The right stick sits among the face buttons: sticky dead zone.
        // Stock bases are anchored, so none returns unless asked to.
        let is_right = id == WidgetId::RightStick;
        let config = JoystickConfig {
            dead_zone_ratio: self.defaults.dead_zone_ratio,
            auto_return_on_dead_zone: binding.auto_return.unwrap_or(!is_right),
            base_returns_to_origin_on_release: binding.return_to_base.unwrap_or(false),
            ..JoystickConfig::for_radius(self.defaults.joystick_radius)
        };

        let (h, v) = (binding.horizontal_axis, binding.vertical_axis);
        let on_move = self.engine.clone();
        let on_end = self.engine.clone();
        Joystick::new(config)
            .on_move(move |state| {
                on_move.update_axis(h, state.x);
                on_move.update_axis(v, state.y);
            })
            .on_end(move |_| {
                on_end.update_axis(h, 0.0);
                on_end.update_axis(v, 0.0);
            })
    }

    fn build_button(&self, id: WidgetId, binding: &ButtonBinding) -> Button {
        let default_release = (id != WidgetId::Menu).then_some(self.defaults.button_release_ms);
        let config = ButtonConfig {
            auto_release_timeout_ms: binding.auto_release_ms.or(default_release),
        };

        let index = binding.index;
        let on_press = self.engine.clone();
        let on_release = self.engine.clone();
        Button::new(config)
            .on_press(move |state| on_press.update_button(index, state))
            .on_release(move |state| on_release.update_button(index, state))
    }
}
