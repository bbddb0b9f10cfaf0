//! Configuration management for the virtual gamepad
//!
//! Handles loading, parsing, validation and hot-reloading of YAML
//! configuration files. Every section is optional; missing values take the
//! defaults of the stock on-screen layout.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::input::gamepad::{RemapConfig, RemapSlot, AXIS_COUNT, BUTTON_COUNT};

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Build the on-screen widgets at all
    #[serde(default = "default_true")]
    pub show_on_screen_controls: bool,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub widgets: WidgetDefaults,
    /// Real-device remap table; absent = pass real devices through
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remap: Option<RemapConfig>,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            show_on_screen_controls: true,
            controls: ControlsConfig::default(),
            widgets: WidgetDefaults::default(),
            remap: None,
            bridge: BridgeConfig::default(),
        }
    }
}

/// Which on-screen controls exist and where they write
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ControlsConfig {
    #[serde(default)]
    pub buttons: ButtonsConfig,
    #[serde(default)]
    pub joysticks: JoysticksConfig,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self::simple(&ShowControls::default())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ButtonsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<ButtonBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<ButtonBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<ButtonBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<ButtonBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu: Option<ButtonBinding>,
}

/// Virtual button written by an on-screen button
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ButtonBinding {
    pub index: usize,
    /// Overrides `widgets.button_release_ms`; 0 disables auto-release
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_release_ms: Option<u64>,
}

impl ButtonBinding {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            auto_release_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct JoysticksConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<JoystickBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<JoystickBinding>,
}

/// Virtual axes written by an on-screen joystick
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JoystickBinding {
    pub horizontal_axis: usize,
    pub vertical_axis: usize,
    /// Drop moves inside the dead zone (false = keep tracking)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_return: Option<bool>,
    /// Move the widget back to its original place on release
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_to_base: Option<bool>,
}

impl JoystickBinding {
    pub fn new(horizontal_axis: usize, vertical_axis: usize) -> Self {
        Self {
            horizontal_axis,
            vertical_axis,
            auto_return: None,
            return_to_base: None,
        }
    }
}

/// Toggles for the stock layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowControls {
    pub ls: bool,
    pub rs: bool,
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub menu: bool,
}

impl Default for ShowControls {
    fn default() -> Self {
        Self {
            ls: true,
            rs: true,
            a: true,
            b: true,
            x: true,
            y: true,
            menu: true,
        }
    }
}

impl ControlsConfig {
    /// Stock layout: A/B/X/Y on buttons 0-3, menu on 16, sticks on axes 0/1 and 2/3
    pub fn simple(show: &ShowControls) -> Self {
        let button = |enabled: bool, index: usize| enabled.then(|| ButtonBinding::new(index));
        Self {
            buttons: ButtonsConfig {
                a: button(show.a, 0),
                b: button(show.b, 1),
                x: button(show.x, 2),
                y: button(show.y, 3),
                menu: button(show.menu, 16),
            },
            joysticks: JoysticksConfig {
                left: show.ls.then(|| JoystickBinding::new(0, 1)),
                right: show.rs.then(|| JoystickBinding::new(2, 3)),
            },
        }
    }

    /// No controls at all
    pub fn none() -> Self {
        Self {
            buttons: ButtonsConfig::default(),
            joysticks: JoysticksConfig::default(),
        }
    }

    /// Enabled buttons with their names
    pub fn button_bindings(&self) -> impl Iterator<Item = (&'static str, &ButtonBinding)> {
        let b = &self.buttons;
        [("a", &b.a), ("b", &b.b), ("x", &b.x), ("y", &b.y), ("menu", &b.menu)]
            .into_iter()
            .filter_map(|(name, binding)| binding.as_ref().map(|binding| (name, binding)))
    }

    /// Enabled joysticks with their names
    pub fn joystick_bindings(&self) -> impl Iterator<Item = (&'static str, &JoystickBinding)> {
        let j = &self.joysticks;
        [("ls", &j.left), ("rs", &j.right)]
            .into_iter()
            .filter_map(|(name, binding)| binding.as_ref().map(|binding| (name, binding)))
    }
}

/// Widget sizing and timing shared by all controls
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WidgetDefaults {
    #[serde(default = "default_joystick_radius")]
    pub joystick_radius: f32,
    #[serde(default = "default_dead_zone_ratio")]
    pub dead_zone_ratio: f32,
    #[serde(default = "default_button_release_ms")]
    pub button_release_ms: u64,
}

impl Default for WidgetDefaults {
    fn default() -> Self {
        Self {
            joystick_radius: default_joystick_radius(),
            dead_zone_ratio: default_dead_zone_ratio(),
            button_release_ms: default_button_release_ms(),
        }
    }
}

/// Real-hardware bridge loop
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BridgeConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// Validation failures
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("control '{control}' writes button {index}, device has {max} buttons")]
    ButtonOutOfRange {
        control: String,
        index: usize,
        max: usize,
    },

    #[error("control '{control}' writes axis {index}, device has {max} axes")]
    AxisOutOfRange {
        control: String,
        index: usize,
        max: usize,
    },

    #[error("{slot} is written by both '{first}' and '{second}'")]
    DuplicateSlot {
        slot: String,
        first: String,
        second: String,
    },

    #[error("remap table has {len} {kind} entries, device has {max}")]
    RemapTooLong {
        kind: &'static str,
        len: usize,
        max: usize,
    },

    #[error("remap {slot} has a non-finite scale or offset")]
    NonFiniteTransform { slot: String },

    #[error("widgets.{field} is invalid: {reason}")]
    InvalidWidget {
        field: &'static str,
        reason: &'static str,
    },

    #[error("bridge.poll_interval_ms must be greater than 0")]
    InvalidPollInterval,
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.widgets.validate()?;

        if self.bridge.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }

        self.validate_controls()?;

        if let Some(remap) = &self.remap {
            validate_remap(remap)?;
        }
        Ok(())
    }

    fn validate_controls(&self) -> Result<(), ConfigError> {
        let mut buttons: Vec<Option<&str>> = vec![None; BUTTON_COUNT];
        for (name, binding) in self.controls.button_bindings() {
            claim(&mut buttons, binding.index, name, |index| {
                ConfigError::ButtonOutOfRange {
                    control: name.to_string(),
                    index,
                    max: BUTTON_COUNT,
                }
            }, |index| format!("button {}", index))?;
        }

        let mut axes: Vec<Option<&str>> = vec![None; AXIS_COUNT];
        for (name, binding) in self.controls.joystick_bindings() {
            for index in [binding.horizontal_axis, binding.vertical_axis] {
                claim(&mut axes, index, name, |index| ConfigError::AxisOutOfRange {
                    control: name.to_string(),
                    index,
                    max: AXIS_COUNT,
                }, |index| format!("axis {}", index))?;
            }
        }
        Ok(())
    }
}

/// Mark slot `index` as written by `name`
fn claim<'a>(
    slots: &mut [Option<&'a str>],
    index: usize,
    name: &'a str,
    out_of_range: impl FnOnce(usize) -> ConfigError,
    label: impl FnOnce(usize) -> String,
) -> Result<(), ConfigError> {
    let Some(slot) = slots.get_mut(index) else {
        return Err(out_of_range(index));
    };
    if let Some(first) = slot {
        return Err(ConfigError::DuplicateSlot {
            slot: label(index),
            first: first.to_string(),
            second: name.to_string(),
        });
    }
    *slot = Some(name);
    Ok(())
}

impl WidgetDefaults {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.joystick_radius.is_finite() || self.joystick_radius <= 0.0 {
            return Err(ConfigError::InvalidWidget {
                field: "joystick_radius",
                reason: "must be a positive number",
            });
        }
        if !(0.0..1.0).contains(&self.dead_zone_ratio) {
            return Err(ConfigError::InvalidWidget {
                field: "dead_zone_ratio",
                reason: "must be in [0, 1)",
            });
        }
        Ok(())
    }
}

fn validate_remap(remap: &RemapConfig) -> Result<(), ConfigError> {
    if remap.buttons.len() > BUTTON_COUNT {
        return Err(ConfigError::RemapTooLong {
            kind: "button",
            len: remap.buttons.len(),
            max: BUTTON_COUNT,
        });
    }
    if remap.axes.len() > AXIS_COUNT {
        return Err(ConfigError::RemapTooLong {
            kind: "axis",
            len: remap.axes.len(),
            max: AXIS_COUNT,
        });
    }

    let finite = |slot: &RemapSlot| {
        slot.scale.map_or(true, f32::is_finite) && slot.offset.map_or(true, f32::is_finite)
    };
    let labelled = remap
        .buttons
        .iter()
        .enumerate()
        .map(|(i, s)| (format!("button[{}]", i), s))
        .chain(remap.axes.iter().enumerate().map(|(i, s)| (format!("axis[{}]", i), s)));

    for (label, slot) in labelled {
        if let Some(slot) = slot {
            if !finite(slot) {
                return Err(ConfigError::NonFiniteTransform { slot: label });
            }
        }
    }
    Ok(())
}

fn default_true() -> bool { true }
fn default_joystick_radius() -> f32 { 50.0 }
fn default_dead_zone_ratio() -> f32 { 0.1 }
fn default_button_release_ms() -> u64 { 300 }
fn default_poll_interval() -> u64 { 16 }
