//! Synthetic gamepad injected into controller enumeration
//!
//! While enabled, the engine hooks its [`Navigator`] so every poll returns
//! the synthetic device alone in slot 0. On-screen widgets write into it
//! through [`EmulatedGamepad::update_button`] / [`EmulatedGamepad::update_axis`];
//! a remap table can additionally pull values from real devices at poll time.
//!
//! Without a remap table the hook passes the real devices through untouched.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use super::navigator::{EngineId, Interceptor, Navigator};
use super::remap::{RemapConfig, RemapSlot, Resolution, SourceKind, VirtualSlot};
use super::snapshot::{GamepadSnapshot, PollResult, AXIS_COUNT, BUTTON_COUNT, MAX_GAMEPADS};
use crate::input::normalize::{clamp_axis, clamp_unit, scale_offset};
use crate::input::touch::ControllerState;

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

/// Value written into a virtual button
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonInput {
    pub is_pressed: bool,
    /// Analog value; `None` (or NaN) falls back to the pressed flag
    pub value: Option<f32>,
}

impl ButtonInput {
    pub fn digital(is_pressed: bool) -> Self {
        Self {
            is_pressed,
            value: None,
        }
    }
}

impl From<&ControllerState> for ButtonInput {
    fn from(state: &ControllerState) -> Self {
        Self {
            is_pressed: state.is_pressed,
            value: Some(state.value),
        }
    }
}

impl From<bool> for ButtonInput {
    fn from(is_pressed: bool) -> Self {
        Self::digital(is_pressed)
    }
}

struct EngineCore {
    id: EngineId,
    remap: Option<RemapConfig>,
    device: Option<GamepadSnapshot>,
    resolution: Resolution,
    enabled: bool,
    epoch: Instant,
}

impl EngineCore {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    fn drop_synthetic_state(&mut self) {
        self.device = None;
        self.resolution = Resolution::new();
        self.enabled = false;
    }

    fn merge(&mut self, real: PollResult) -> PollResult {
        let Self {
            remap,
            device,
            resolution,
            ..
        } = self;

        let (Some(remap), Some(device)) = (remap.as_ref(), device.as_mut()) else {
            return real;
        };

        let any_connected = real.iter().flatten().any(|d| d.connected);
        if any_connected && resolution.has_pending(remap) {
            resolution.resolve(remap, &real);
        }

        for (i, entry) in remap.buttons.iter().take(BUTTON_COUNT).enumerate() {
            let Some(entry) = entry else { continue };
            if let Some(source) = source_device(resolution, VirtualSlot::Button(i), &real) {
                if apply_button(device, i, entry, source) {
                    advance_timestamp(device, source.timestamp);
                }
            }
        }

        for (i, entry) in remap.axes.iter().take(AXIS_COUNT).enumerate() {
            let Some(entry) = entry else { continue };
            if let Some(source) = source_device(resolution, VirtualSlot::Axis(i), &real) {
                if apply_axis(device, i, entry, source) {
                    advance_timestamp(device, source.timestamp);
                }
            }
        }

        trace!("Synthetic poll: axes {:?}", device.axes);

        let mut result = vec![None; MAX_GAMEPADS];
        result[0] = Some(device.clone());
        result
    }
}

/// Host and engine clocks differ; the reported timestamp only moves forward
fn advance_timestamp(device: &mut GamepadSnapshot, at: f64) {
    if at > device.timestamp {
        device.timestamp = at;
    }
}

/// Connected real device bound to `slot`, if any
fn source_device<'a>(
    resolution: &Resolution,
    slot: VirtualSlot,
    real: &'a PollResult,
) -> Option<&'a GamepadSnapshot> {
    let index = resolution.get(slot)?;
    match real.get(index) {
        Some(Some(device)) if device.connected => Some(device),
        _ => {
            trace!("Remap {}: device {} not connected, keeping last value", slot, index);
            None
        }
    }
}

fn apply_button(
    device: &mut GamepadSnapshot,
    i: usize,
    entry: &RemapSlot,
    source: &GamepadSnapshot,
) -> bool {
    let Some(src) = entry.source_index else {
        debug!("Remap button[{}] has no source index, skipped", i);
        return false;
    };

    match entry.source_kind {
        SourceKind::Axis => {
            let (Some(raw), Some((scale, offset))) = (source.axes.get(src), entry.transform())
            else {
                debug!("Remap button[{}] incomplete (axis {} / transform), skipped", i, src);
                return false;
            };
            let button = &mut device.buttons[i];
            button.pressed = raw + offset != 0.0;
            button.touched = button.pressed;
            button.value = scale_offset(*raw, scale, offset);
        }
        SourceKind::Button => {
            let Some(record) = source.buttons.get(src) else {
                debug!("Remap button[{}]: source button {} out of range, skipped", i, src);
                return false;
            };
            device.buttons[i] = *record;
        }
    }
    true
}

fn apply_axis(
    device: &mut GamepadSnapshot,
    i: usize,
    entry: &RemapSlot,
    source: &GamepadSnapshot,
) -> bool {
    let (Some(src), Some((scale, offset))) = (entry.source_index, entry.transform()) else {
        debug!("Remap axis[{}] incomplete, skipped", i);
        return false;
    };

    let raw = match entry.source_kind {
        SourceKind::Axis => source.axes.get(src).copied(),
        SourceKind::Button => source.buttons.get(src).map(|b| b.value),
    };
    let Some(raw) = raw else {
        debug!("Remap axis[{}]: source {} out of range, skipped", i, src);
        return false;
    };

    device.axes[i] = scale_offset(raw, scale, offset);
    true
}

impl Interceptor for RefCell<EngineCore> {
    fn intercept(&self, real: PollResult) -> PollResult {
        match self.try_borrow_mut() {
            Ok(mut core) => core.merge(real),
            Err(_) => {
                warn!("Poll re-entered the emulation engine, returning real devices");
                real
            }
        }
    }

    fn evict(&self) {
        if let Ok(mut core) = self.try_borrow_mut() {
            warn!("{} evicted, emulated gamepad disabled", core.id);
            core.drop_synthetic_state();
        }
    }
}

/// Handle to a virtual gamepad engine
///
/// Clones share one engine. The engine is bound to a single [`Navigator`]
/// and is `!Send`: it lives on the thread that polls controllers.
#[derive(Clone)]
pub struct EmulatedGamepad {
    core: Rc<RefCell<EngineCore>>,
    navigator: Navigator,
}

impl EmulatedGamepad {
    pub fn new(navigator: Navigator) -> Self {
        let id = EngineId(NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            core: Rc::new(RefCell::new(EngineCore {
                id,
                remap: None,
                device: None,
                resolution: Resolution::new(),
                enabled: false,
                epoch: Instant::now(),
            })),
            navigator,
        }
    }

    pub fn id(&self) -> EngineId {
        self.core.borrow().id
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Replace the remap table and restart the engine
    pub fn configure(&self, remap: Option<RemapConfig>) {
        self.core.borrow_mut().remap = remap;
        if self.is_enabled() {
            self.disable();
        }
        self.enable();
    }

    /// Install the synthetic device. No-op while enabled.
    pub fn enable(&self) {
        let hook: Weak<dyn Interceptor> = {
            let mut core = self.core.borrow_mut();
            if core.enabled {
                return;
            }
            core.device = Some(GamepadSnapshot::virtual_device());
            core.resolution = Resolution::seeded(core.remap.as_ref());
            core.enabled = true;
            info!(
                "🎮 Emulated gamepad enabled ({})",
                if core.remap.is_some() { "remapping" } else { "pass-through" }
            );
            Rc::downgrade(&self.core) as Weak<dyn Interceptor>
        };
        let id = self.id();
        self.navigator.install(id, hook);
    }

    /// Restore the original enumeration and drop the synthetic device
    pub fn disable(&self) {
        let id = {
            let mut core = self.core.borrow_mut();
            if !core.enabled {
                return;
            }
            core.drop_synthetic_state();
            core.id
        };
        self.navigator.restore(id);
        info!("Emulated gamepad disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.core.borrow().enabled
    }

    pub fn remap(&self) -> Option<RemapConfig> {
        self.core.borrow().remap.clone()
    }

    /// Current synthetic device (None while disabled)
    pub fn device(&self) -> Option<GamepadSnapshot> {
        self.core.borrow().device.clone()
    }

    /// Has the remap slot been bound to a real device this cycle?
    pub fn is_resolved(&self, slot: VirtualSlot) -> bool {
        self.core.borrow().resolution.get(slot).is_some()
    }

    pub fn resolved_index(&self, slot: VirtualSlot) -> Option<usize> {
        self.core.borrow().resolution.get(slot)
    }

    /// Write a virtual button. Ignored while disabled or out of range.
    pub fn update_button(&self, index: usize, input: impl Into<ButtonInput>) {
        let input = input.into();
        let mut core = self.core.borrow_mut();
        let now = core.now_ms();
        let Some(device) = core.device.as_mut() else { return };
        let Some(button) = device.buttons.get_mut(index) else {
            trace!("update_button: index {} out of range", index);
            return;
        };

        let value = input.value.filter(|v| !v.is_nan());
        button.pressed = input.is_pressed || value.is_some_and(|v| v > 0.0);
        button.touched = button.pressed;
        button.value = match value {
            Some(v) => clamp_unit(v),
            None if input.is_pressed => 1.0,
            None => 0.0,
        };
        advance_timestamp(device, now);
    }

    /// Write a virtual axis, clamped to [-1, 1]. Ignored while disabled or out of range.
    pub fn update_axis(&self, index: usize, value: f32) {
        let mut core = self.core.borrow_mut();
        let now = core.now_ms();
        let Some(device) = core.device.as_mut() else { return };
        let Some(axis) = device.axes.get_mut(index) else {
            trace!("update_axis: index {} out of range", index);
            return;
        };
        *axis = clamp_axis(value);
        advance_timestamp(device, now);
    }
}

impl std::fmt::Debug for EmulatedGamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("EmulatedGamepad")
            .field("id", &core.id)
            .field("enabled", &core.enabled)
            .field("remap", &core.remap.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::gamepad::navigator::MemorySource;
    use crate::input::gamepad::snapshot::ButtonRecord;

    fn setup() -> (MemorySource, Navigator, EmulatedGamepad) {
        let source = MemorySource::new();
        let navigator = Navigator::new(source.clone());
        let engine = EmulatedGamepad::new(navigator.clone());
        (source, navigator, engine)
    }

    fn synthetic(navigator: &Navigator) -> GamepadSnapshot {
        let result = navigator.get_gamepads();
        assert_eq!(result.len(), 4);
        assert!(result[1..].iter().all(Option::is_none));
        result[0].clone().expect("synthetic device in slot 0")
    }

    fn pad(name: &str, index: usize) -> GamepadSnapshot {
        GamepadSnapshot::new(name, index, 17, 4)
    }

    #[test]
    fn test_disabled_engine_ignores_updates() {
        let (_, navigator, engine) = setup();
        engine.update_axis(0, 0.5);
        engine.update_button(0, true);
        assert!(engine.device().is_none());
        assert!(!navigator.is_intercepted());
    }

    #[test]
    fn test_pass_through_without_remap() {
        let (source, navigator, engine) = setup();
        source.connect(pad("Real Pad", 2));
        engine.enable();
        assert!(navigator.is_intercepted());

        let result = navigator.get_gamepads();
        assert!(result[0].is_none());
        assert_eq!(result[2].as_ref().map(|g| g.id.as_str()), Some("Real Pad"));
    }

    #[test]
    fn test_synthetic_device_with_empty_table() {
        let (_, navigator, engine) = setup();
        engine.configure(Some(RemapConfig::empty()));
        engine.update_axis(1, -0.25);
        engine.update_button(16, true);

        let device = synthetic(&navigator);
        assert!(device.is_virtual());
        assert_eq!(device.axes[1], -0.25);
        assert_eq!(device.buttons[16], ButtonRecord::digital(true));
        assert!(device.timestamp >= 0.0);
    }

    #[test]
    fn test_update_axis_clamps_and_ignores_out_of_range() {
        let (_, _, engine) = setup();
        engine.configure(Some(RemapConfig::empty()));

        engine.update_axis(0, 1.5);
        assert_eq!(engine.device().unwrap().axes[0], 1.0);
        engine.update_axis(0, -2.0);
        assert_eq!(engine.device().unwrap().axes[0], -1.0);

        engine.update_axis(4, 0.5);
        assert_eq!(engine.device().unwrap().axes.len(), 4);
    }

    #[test]
    fn test_update_button_from_state() {
        let (_, _, engine) = setup();
        engine.enable();

        let mut state = ControllerState::new();
        state.value = 0.4;
        engine.update_button(2, &state);
        let button = engine.device().unwrap().buttons[2];
        assert!(button.pressed && button.touched);
        assert!((button.value - 0.4).abs() < 1e-6);

        state.value = 0.0;
        engine.update_button(2, &state);
        assert_eq!(engine.device().unwrap().buttons[2], ButtonRecord::default());

        engine.update_button(
            3,
            ButtonInput {
                is_pressed: true,
                value: Some(f32::NAN),
            },
        );
        assert_eq!(engine.device().unwrap().buttons[3].value, 1.0);

        engine.update_button(17, true); // out of range
    }

    #[test]
    fn test_axis_to_button_remap() {
        let (source, navigator, engine) = setup();
        source.connect(pad("Pad-A", 0));
        source.update(0, |g| g.axes[0] = 0.6);

        let mut remap = RemapConfig::empty();
        remap.set_button(5, RemapSlot::axis("Pad-A", 0, 1.0, 0.0));
        engine.configure(Some(remap.clone()));

        let button = synthetic(&navigator).buttons[5];
        assert!(button.pressed && button.touched);
        assert!((button.value - 0.6).abs() < 1e-6);

        remap.set_button(5, RemapSlot::axis("Pad-A", 0, 1.0, -0.6));
        engine.configure(Some(remap));
        let button = synthetic(&navigator).buttons[5];
        assert!(!button.pressed && !button.touched);
        assert_eq!(button.value, 0.0);
    }

    #[test]
    fn test_button_remap_copies_record() {
        let (source, navigator, engine) = setup();
        source.connect(pad("Pad-A", 1));
        let record = ButtonRecord {
            pressed: true,
            touched: true,
            value: 0.75,
        };
        source.update(1, |g| {
            g.buttons[7] = record;
            g.timestamp = 1234.0;
        });

        let mut remap = RemapConfig::empty();
        remap.set_button(0, RemapSlot::button("Pad-A", 7));
        engine.configure(Some(remap));

        let device = synthetic(&navigator);
        assert_eq!(device.buttons[0], record);
        assert_eq!(device.timestamp, 1234.0);
    }

    #[test]
    fn test_timestamp_never_moves_back_across_write_paths() {
        let (source, navigator, engine) = setup();
        source.connect(pad("Pad-A", 0));
        source.update(0, |g| {
            g.buttons[3] = ButtonRecord::digital(true);
            g.timestamp = 50_000.0;
        });

        let mut remap = RemapConfig::empty();
        remap.set_button(5, RemapSlot::button("Pad-A", 3));
        engine.configure(Some(remap));
        let after_remap = synthetic(&navigator).timestamp;
        assert_eq!(after_remap, 50_000.0);

        // widget writes stamp with the engine clock, far behind the host's
        engine.update_button(0, true);
        engine.update_axis(0, 0.5);
        let after_widget = engine.device().map(|d| d.timestamp).unwrap_or_default();
        assert!(after_widget >= after_remap);

        // an older host sample does not rewind it either
        source.update(0, |g| g.timestamp = 10.0);
        assert!(synthetic(&navigator).timestamp >= after_remap);
    }

    #[test]
    fn test_axis_remap_scale_offset() {
        let (source, navigator, engine) = setup();
        source.connect(pad("Pad-A", 0));
        source.update(0, |g| g.axes[3] = 0.5);

        let mut remap = RemapConfig::empty();
        remap.set_axis(1, RemapSlot::axis("Pad-A", 3, -2.0, 0.25));
        engine.configure(Some(remap));

        assert_eq!(synthetic(&navigator).axes[1], -0.75);
    }

    #[test]
    fn test_late_device_resolves_on_later_poll() {
        let (source, navigator, engine) = setup();
        source.connect(pad("Pad-A", 0));

        let mut remap = RemapConfig::empty();
        remap.set_axis(0, RemapSlot::axis("Pad-B", 0, 1.0, 0.0));
        engine.configure(Some(remap));

        // Pad-B absent: slot stays at its default
        assert_eq!(synthetic(&navigator).axes[0], 0.0);
        assert!(!engine.is_resolved(VirtualSlot::Axis(0)));

        let mut pad_b = pad("Pad-B", 2);
        pad_b.axes[0] = -0.4;
        source.connect(pad_b);
        assert!((synthetic(&navigator).axes[0] + 0.4).abs() < 1e-6);
        assert_eq!(engine.resolved_index(VirtualSlot::Axis(0)), Some(2));

        source.update(2, |g| g.axes[0] = 0.9);
        assert!((synthetic(&navigator).axes[0] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_resolved_index_is_permanent_within_cycle() {
        let (source, navigator, engine) = setup();
        source.connect(pad("Pad-B", 1));

        let mut remap = RemapConfig::empty();
        remap.set_axis(0, RemapSlot::axis("Pad-B", 0, 1.0, 0.0));
        engine.configure(Some(remap));
        synthetic(&navigator);
        assert_eq!(engine.resolved_index(VirtualSlot::Axis(0)), Some(1));

        // Device moves to another slot: the binding does not follow
        source.update(1, |g| g.axes[0] = 0.3);
        synthetic(&navigator);
        source.unplug(1);
        let mut moved = pad("Pad-B", 3);
        moved.axes[0] = -1.0;
        source.connect(moved);

        let device = synthetic(&navigator);
        assert_eq!(engine.resolved_index(VirtualSlot::Axis(0)), Some(1));
        assert!((device.axes[0] - 0.3).abs() < 1e-6); // last value kept
    }

    #[test]
    fn test_disable_then_enable_resets_resolution() {
        let (source, navigator, engine) = setup();
        source.connect(pad("Pad-B", 1));

        let mut remap = RemapConfig::empty();
        remap.set_axis(2, RemapSlot::axis("Pad-B", 0, 1.0, 0.0));
        engine.configure(Some(remap));
        synthetic(&navigator);
        assert!(engine.is_resolved(VirtualSlot::Axis(2)));

        engine.disable();
        assert!(!engine.is_resolved(VirtualSlot::Axis(2)));
        assert!(!navigator.is_intercepted());
        assert!(engine.device().is_none());

        source.unplug(1);
        source.connect(pad("Pad-B", 0));
        engine.enable();
        synthetic(&navigator);
        assert_eq!(engine.resolved_index(VirtualSlot::Axis(2)), Some(0));
    }

    #[test]
    fn test_malformed_slots_are_skipped() {
        let (source, navigator, engine) = setup();
        source.connect(pad("Pad-A", 0));
        source.update(0, |g| g.axes[0] = 0.5);

        let mut remap = RemapConfig::empty();
        remap.set_axis(
            0,
            RemapSlot {
                scale: None,
                ..RemapSlot::axis("Pad-A", 0, 1.0, 0.0)
            },
        );
        remap.set_axis(1, RemapSlot::axis("Pad-A", 99, 1.0, 0.0));
        remap.set_axis(2, RemapSlot::axis("Pad-A", 0, 1.0, 0.0).with_device_index(3));
        remap.set_button(
            0,
            RemapSlot {
                source_index: None,
                ..RemapSlot::button("Pad-A", 0)
            },
        );
        remap.set_axis(3, RemapSlot::axis("Pad-A", 0, 1.0, 0.0));
        engine.configure(Some(remap));

        let device = synthetic(&navigator);
        assert_eq!(&device.axes[..3], &[0.0, 0.0, 0.0]);
        assert_eq!(device.axes[3], 0.5);
        assert_eq!(device.buttons[0], ButtonRecord::default());
    }

    #[test]
    fn test_widget_and_remap_writes_last_write_wins() {
        let (source, navigator, engine) = setup();
        source.connect(pad("Pad-A", 0));
        source.update(0, |g| g.axes[0] = 0.2);

        let mut remap = RemapConfig::empty();
        remap.set_axis(0, RemapSlot::axis("Pad-A", 0, 1.0, 0.0));
        engine.configure(Some(remap));

        engine.update_axis(0, -0.8);
        assert_eq!(engine.device().unwrap().axes[0], -0.8);
        assert!((synthetic(&navigator).axes[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_second_engine_evicts_first() {
        let (_, navigator, first) = setup();
        let second = EmulatedGamepad::new(navigator.clone());
        first.configure(Some(RemapConfig::empty()));
        first.update_axis(0, 0.5);

        second.configure(Some(RemapConfig::empty()));
        assert!(!first.is_enabled());
        assert!(first.device().is_none());
        assert_eq!(navigator.owner(), Some(second.id()));
        assert_eq!(synthetic(&navigator).axes[0], 0.0);

        // Evicted engine's disable must not unhook the new owner
        first.disable();
        assert!(navigator.is_intercepted());
    }

    #[test]
    fn test_configure_restarts_enabled_engine() {
        let (_, navigator, engine) = setup();
        engine.configure(Some(RemapConfig::empty()));
        engine.update_axis(0, 0.5);

        engine.configure(Some(RemapConfig::empty()));
        assert!(engine.is_enabled());
        assert_eq!(synthetic(&navigator).axes[0], 0.0);

        engine.configure(None);
        assert!(navigator.get_gamepads().iter().all(Option::is_none));
    }
}
