//! Press/release state machine with optional auto-release
//!
//! Face buttons on a touch screen are easy to "lose": a finger slides off the
//! glass and the platform never reports the lift. An auto-release timeout
//! caps how long a press can last without an explicit release.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::state::{ControllerState, PointerId};
use super::timer::ReleaseTimer;
use super::StateCallback;
use crate::input::normalize::clamp_unit;

/// Auto-release timeout used for face buttons
pub const DEFAULT_RELEASE_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ButtonConfig {
    /// Release automatically this long after a press; `None` or 0 disables
    pub auto_release_timeout_ms: Option<u64>,
}

impl ButtonConfig {
    pub fn auto_release(ms: u64) -> Self {
        Self {
            auto_release_timeout_ms: Some(ms),
        }
    }

    /// Button held until an explicit release
    pub fn latching() -> Self {
        Self::default()
    }

    fn timeout(&self) -> Option<Duration> {
        self.auto_release_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// On-screen button
pub struct Button {
    config: ButtonConfig,
    state: ControllerState,
    timer: ReleaseTimer,
    on_press: Option<StateCallback>,
    on_release: Option<StateCallback>,
}

impl Button {
    pub fn new(config: ButtonConfig) -> Self {
        Self {
            config,
            state: ControllerState::new(),
            timer: ReleaseTimer::new(),
            on_press: None,
            on_release: None,
        }
    }

    pub fn on_press(mut self, callback: impl FnMut(&ControllerState) + 'static) -> Self {
        self.on_press = Some(Box::new(callback));
        self
    }

    pub fn on_release(mut self, callback: impl FnMut(&ControllerState) + 'static) -> Self {
        self.on_release = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &ButtonConfig {
        &self.config
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn owner(&self) -> Option<PointerId> {
        self.state.identifier
    }

    pub fn is_pressed(&self) -> bool {
        self.state.is_pressed
    }

    /// Pending auto-release instant, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Digital press
    pub fn press(&mut self, pointer: PointerId, now: Instant) -> bool {
        self.press_analog(pointer, 1.0, now)
    }

    /// Press with a proportional value (clamped to [0, 1])
    pub fn press_analog(&mut self, pointer: PointerId, value: f32, now: Instant) -> bool {
        if self.state.is_pressed {
            trace!("Button already held by {:?}, ignoring {}", self.state.identifier, pointer);
            return false;
        }

        self.state.identifier = Some(pointer);
        self.state.value = clamp_unit(value);
        self.state.is_pressed = true;
        self.state.is_active = true;
        debug!("Button pressed by {} (value {:.2})", pointer, self.state.value);

        if let Some(callback) = self.on_press.as_mut() {
            callback(&self.state);
        }

        if let Some(timeout) = self.config.timeout() {
            self.timer.schedule(now, timeout);
        }
        true
    }

    /// Owner lifted. Other pointers are ignored.
    pub fn release(&mut self, pointer: PointerId) -> bool {
        if self.state.identifier != Some(pointer) {
            return false;
        }
        self.timer.cancel();
        self.finish_release();
        true
    }

    pub fn cancel(&mut self, pointer: PointerId) -> bool {
        self.release(pointer)
    }

    /// Fire the auto-release if its deadline has passed
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.timer.fire_if_due(now) {
            return false;
        }
        debug!("Button auto-released");
        self.finish_release();
        true
    }

    fn finish_release(&mut self) {
        self.state.identifier = None;
        self.state.value = 0.0;
        self.state.is_pressed = false;
        self.state.is_active = false;

        if let Some(callback) = self.on_release.as_mut() {
            callback(&self.state);
        }
    }
}

impl std::fmt::Debug for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Button")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    const FINGER: PointerId = PointerId::Touch(4);

    fn counted(config: ButtonConfig) -> (Button, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let presses = Rc::new(Cell::new(0));
        let releases = Rc::new(Cell::new(0));
        let p = presses.clone();
        let r = releases.clone();
        let button = Button::new(config)
            .on_press(move |_| p.set(p.get() + 1))
            .on_release(move |_| r.set(r.get() + 1));
        (button, presses, releases)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_press_and_release() {
        let (mut button, presses, releases) = counted(ButtonConfig::latching());
        let now = Instant::now();

        assert!(button.press(FINGER, now));
        assert_eq!(button.state().value, 1.0);
        assert!(button.state().is_pressed && button.state().is_active);
        assert_eq!(button.owner(), Some(FINGER));
        assert_eq!(presses.get(), 1);

        assert!(button.release(FINGER));
        assert_eq!(button.state().value, 0.0);
        assert!(!button.is_pressed());
        assert_eq!(button.owner(), None);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_second_press_ignored_while_held() {
        let (mut button, presses, _) = counted(ButtonConfig::latching());
        let now = Instant::now();
        button.press(FINGER, now);
        assert!(!button.press(PointerId::Mouse, now));
        assert_eq!(presses.get(), 1);
        assert!(!button.release(PointerId::Mouse));
        assert!(button.is_pressed());
    }

    #[test]
    fn test_auto_release_fires_after_timeout() {
        let (mut button, _, releases) = counted(ButtonConfig::auto_release(DEFAULT_RELEASE_MS));
        let start = Instant::now();
        button.press(FINGER, start);
        assert_eq!(button.next_deadline(), Some(start + ms(300)));

        assert!(!button.tick(start + ms(299)));
        assert!(button.is_pressed());

        assert!(button.tick(start + ms(300)));
        assert!(!button.is_pressed());
        assert_eq!(button.owner(), None);
        assert_eq!(releases.get(), 1);

        // Late lift from the original finger is a no-op
        assert!(!button.release(FINGER));
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_explicit_release_cancels_timer() {
        let (mut button, _, releases) = counted(ButtonConfig::auto_release(300));
        let start = Instant::now();
        button.press(FINGER, start);
        button.release(FINGER);
        assert_eq!(button.next_deadline(), None);

        assert!(!button.tick(start + ms(1000)));
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_repress_reschedules() {
        let (mut button, _, releases) = counted(ButtonConfig::auto_release(300));
        let start = Instant::now();
        button.press(FINGER, start);
        button.release(FINGER);
        button.press(FINGER, start + ms(200));

        assert!(!button.tick(start + ms(300)));
        assert!(button.tick(start + ms(500)));
        assert_eq!(releases.get(), 2);
    }

    #[test]
    fn test_zero_timeout_disables_auto_release() {
        let (mut button, _, _) = counted(ButtonConfig::auto_release(0));
        let start = Instant::now();
        button.press(FINGER, start);
        assert_eq!(button.next_deadline(), None);
        assert!(!button.tick(start + Duration::from_secs(60)));
        assert!(button.is_pressed());
    }

    #[test]
    fn test_analog_press_is_clamped() {
        let mut button = Button::new(ButtonConfig::latching());
        let now = Instant::now();
        button.press_analog(FINGER, 0.4, now);
        assert!((button.state().value - 0.4).abs() < 1e-6);
        button.cancel(FINGER);

        button.press_analog(FINGER, 3.0, now);
        assert_eq!(button.state().value, 1.0);
    }
}
