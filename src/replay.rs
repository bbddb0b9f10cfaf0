//! Scripted pointer replay
//!
//! Runs a YAML script of pointer events and device changes against the
//! on-screen layout and an in-memory host, emitting one JSON line per
//! `poll` step. Time is virtual: `at_ms` moves the clock forward and due
//! auto-releases fire before the step runs.
//!
//! ```yaml
//! steps:
//!   - device: { id: "Pad-B", index: 1, axes: [0.5, 0, 0, 0] }
//!   - down: { widget: ls, pointer: 1, x: 0, y: 0 }
//!   - move: { pointer: 1, x: 20, y: 0 }
//!     poll: true
//!   - at_ms: 400
//!     up: { pointer: 1 }
//!     poll: true
//! ```

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::input::gamepad::{
    ButtonRecord, EmulatedGamepad, GamepadSnapshot, MemorySource, Navigator, PollResult,
    AXIS_COUNT, BUTTON_COUNT,
};
use crate::input::touch::PointerId;
use crate::ui::{VirtualGamepadUi, WidgetId};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One script step; every present action runs, in field order
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Step {
    /// Virtual time of the step; never moves the clock backwards
    #[serde(default)]
    pub at_ms: Option<u64>,
    #[serde(default)]
    pub device: Option<DeviceStep>,
    #[serde(default)]
    pub unplug: Option<usize>,
    #[serde(default)]
    pub down: Option<DownStep>,
    #[serde(default, rename = "move")]
    pub move_to: Option<MoveStep>,
    #[serde(default)]
    pub up: Option<PointerStep>,
    #[serde(default)]
    pub cancel: Option<PointerStep>,
    #[serde(default)]
    pub poll: bool,
}

/// Pointer as written in scripts: a touch id or `mouse`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PointerSpec {
    Touch(i64),
    Named(String),
}

impl TryFrom<&PointerSpec> for PointerId {
    type Error = anyhow::Error;

    fn try_from(spec: &PointerSpec) -> Result<Self> {
        match spec {
            PointerSpec::Touch(id) => Ok(PointerId::Touch(*id)),
            PointerSpec::Named(name) if name.eq_ignore_ascii_case("mouse") => Ok(PointerId::Mouse),
            PointerSpec::Named(name) => bail!("unknown pointer '{}' (use a touch id or 'mouse')", name),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownStep {
    pub widget: String,
    pub pointer: PointerSpec,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveStep {
    pub pointer: PointerSpec,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointerStep {
    pub pointer: PointerSpec,
}

/// Plug in (or update) a host device
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStep {
    pub id: String,
    pub index: usize,
    #[serde(default)]
    pub axes: Vec<f32>,
    /// Button values; anything above 0 counts as pressed
    #[serde(default)]
    pub buttons: Vec<f32>,
}

impl DeviceStep {
    fn snapshot(&self, at_ms: u64) -> GamepadSnapshot {
        let mut device = GamepadSnapshot::new(
            self.id.clone(),
            self.index,
            BUTTON_COUNT.max(self.buttons.len()),
            AXIS_COUNT.max(self.axes.len()),
        );
        device.axes[..self.axes.len()].copy_from_slice(&self.axes);
        for (record, value) in device.buttons.iter_mut().zip(&self.buttons) {
            *record = ButtonRecord {
                pressed: *value > 0.0,
                touched: *value > 0.0,
                value: *value,
            };
        }
        device.timestamp = at_ms as f64;
        device
    }
}

/// One emitted poll
#[derive(Debug, Clone, Serialize)]
pub struct PollLine {
    pub step: usize,
    pub at_ms: u64,
    pub gamepads: PollResult,
}

impl ReplayScript {
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read replay script: {}", path))?;
        Self::from_yaml(&contents).with_context(|| format!("Invalid replay script: {}", path))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).context("Failed to parse replay script")
    }
}

/// Run `script` against a fresh in-memory host configured from `config`
pub fn run(script: &ReplayScript, config: &AppConfig) -> Result<Vec<PollLine>> {
    let source = MemorySource::new();
    let navigator = Navigator::new(source.clone());
    let engine = EmulatedGamepad::new(navigator.clone());
    let mut ui = VirtualGamepadUi::from_config(engine, config);

    let start = Instant::now();
    let mut clock_ms = 0u64;
    let mut lines = Vec::new();

    for (index, step) in script.steps.iter().enumerate() {
        clock_ms = clock_ms.max(step.at_ms.unwrap_or(clock_ms));
        let now = start + Duration::from_millis(clock_ms);

        let released = ui.tick(now);
        if !released.is_empty() {
            debug!("t={}ms auto-released {:?}", clock_ms, released);
        }

        run_step(&mut ui, &source, step, clock_ms, now)
            .with_context(|| format!("Replay step {} failed", index))?;

        if step.poll {
            lines.push(PollLine {
                step: index,
                at_ms: clock_ms,
                gamepads: navigator.get_gamepads(),
            });
        }
    }

    info!("Replay finished: {} steps, {} polls", script.steps.len(), lines.len());
    Ok(lines)
}

fn run_step(
    ui: &mut VirtualGamepadUi,
    source: &MemorySource,
    step: &Step,
    clock_ms: u64,
    now: Instant,
) -> Result<()> {
    if let Some(device) = &step.device {
        source.connect(device.snapshot(clock_ms));
    }
    if let Some(index) = step.unplug {
        source.unplug(index);
    }
    if let Some(down) = &step.down {
        let widget: WidgetId = down.widget.parse()?;
        let pointer = PointerId::try_from(&down.pointer)?;
        ui.pointer_down(widget, pointer, down.x, down.y, now);
    }
    if let Some(motion) = &step.move_to {
        ui.pointer_move(PointerId::try_from(&motion.pointer)?, motion.x, motion.y);
    }
    if let Some(up) = &step.up {
        ui.pointer_up(PointerId::try_from(&up.pointer)?);
    }
    if let Some(cancel) = &step.cancel {
        ui.pointer_cancel(PointerId::try_from(&cancel.pointer)?);
    }
    Ok(())
}
