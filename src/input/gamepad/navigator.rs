//! Controller enumeration entry point and its interception slot
//!
//! The [`Navigator`] plays the role of the host's global `getGamepads()`
//! function: game code polls it, and at most one emulation engine may hook
//! it at a time. Hooking is ownership-checked, so an engine can only
//! restore the entry point it installed itself.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use super::snapshot::{GamepadSnapshot, PollResult, MAX_GAMEPADS};

/// The original, un-hooked enumeration function
pub trait GamepadSource {
    /// Enumerate devices; `None` marks an empty slot
    fn get_gamepads(&mut self) -> PollResult;
}

/// Identity of an installed engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineId(pub(crate) u64);

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "engine#{}", self.0)
    }
}

/// Hook invoked on every poll while installed
pub(crate) trait Interceptor {
    /// Rewrite the real enumeration result
    fn intercept(&self, real: PollResult) -> PollResult;

    /// Another engine took the slot; drop all synthetic state
    fn evict(&self);
}

struct Installed {
    owner: EngineId,
    hook: Weak<dyn Interceptor>,
}

struct Inner {
    source: Box<dyn GamepadSource>,
    installed: Option<Installed>,
}

/// Shared enumeration slot (cheap to clone, single-threaded)
#[derive(Clone)]
pub struct Navigator {
    inner: Rc<RefCell<Inner>>,
}

impl Navigator {
    pub fn new(source: impl GamepadSource + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                source: Box::new(source),
                installed: None,
            })),
        }
    }

    /// Poll controllers, through the installed hook if any
    pub fn get_gamepads(&self) -> PollResult {
        let real = self.real_gamepads();

        let hook = self
            .inner
            .borrow()
            .installed
            .as_ref()
            .map(|installed| (installed.owner, installed.hook.upgrade()));

        match hook {
            Some((_, Some(hook))) => hook.intercept(real),
            Some((owner, None)) => {
                // Engine dropped without disabling
                debug!("Dropping stale hook of {}", owner);
                self.inner.borrow_mut().installed = None;
                real
            }
            None => real,
        }
    }

    /// Poll the original source, bypassing any hook
    pub fn real_gamepads(&self) -> PollResult {
        let mut result = self.inner.borrow_mut().source.get_gamepads();
        result.resize(MAX_GAMEPADS.max(result.len()), None);
        result
    }

    pub fn is_intercepted(&self) -> bool {
        self.inner.borrow().installed.is_some()
    }

    pub fn owner(&self) -> Option<EngineId> {
        self.inner.borrow().installed.as_ref().map(|i| i.owner)
    }

    /// Install `hook`, evicting any other engine first
    pub(crate) fn install(&self, owner: EngineId, hook: Weak<dyn Interceptor>) {
        let previous = self.inner.borrow_mut().installed.take();

        if let Some(previous) = previous {
            if previous.owner != owner {
                warn!("{} replaces {} on the enumeration slot", owner, previous.owner);
                // Borrow released: the evicted engine may inspect the navigator
                if let Some(evicted) = previous.hook.upgrade() {
                    evicted.evict();
                }
            }
        }

        self.inner.borrow_mut().installed = Some(Installed { owner, hook });
        info!("🎮 {} installed on the enumeration slot", owner);
    }

    /// Restore the original entry point if `owner` holds the slot
    pub(crate) fn restore(&self, owner: EngineId) -> bool {
        let mut inner = self.inner.borrow_mut();
        match &inner.installed {
            Some(installed) if installed.owner == owner => {
                inner.installed = None;
                info!("{} restored the original enumeration", owner);
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("owner", &self.owner())
            .finish_non_exhaustive()
    }
}

/// In-memory device list, for tests, replays and the REPL
///
/// Clones share the same list, so a test can keep one handle to plug
/// devices in while the navigator owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    devices: Rc<RefCell<PollResult>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            devices: Rc::new(RefCell::new(vec![None; MAX_GAMEPADS])),
        }
    }

    /// Put `device` in its own `index` slot
    pub fn connect(&self, device: GamepadSnapshot) {
        let mut devices = self.devices.borrow_mut();
        let index = device.index;
        if index >= devices.len() {
            devices.resize(index + 1, None);
        }
        devices[index] = Some(device);
    }

    /// Empty the slot
    pub fn unplug(&self, index: usize) {
        if let Some(slot) = self.devices.borrow_mut().get_mut(index) {
            *slot = None;
        }
    }

    /// Mutate a present device in place
    pub fn update(&self, index: usize, f: impl FnOnce(&mut GamepadSnapshot)) -> bool {
        match self.devices.borrow_mut().get_mut(index) {
            Some(Some(device)) => {
                f(device);
                true
            }
            _ => false,
        }
    }
}

impl GamepadSource for MemorySource {
    fn get_gamepads(&mut self) -> PollResult {
        self.devices.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Recorder {
        marker: &'static str,
        evicted: Cell<bool>,
    }

    impl Interceptor for Recorder {
        fn intercept(&self, _real: PollResult) -> PollResult {
            vec![Some(GamepadSnapshot::new(self.marker, 0, 0, 0))]
        }

        fn evict(&self) {
            self.evicted.set(true);
        }
    }

    fn recorder(marker: &'static str) -> Rc<Recorder> {
        Rc::new(Recorder {
            marker,
            evicted: Cell::new(false),
        })
    }

    #[test]
    fn test_pass_through_without_hook() {
        let source = MemorySource::new();
        source.connect(GamepadSnapshot::new("Pad-A", 1, 17, 4));
        let navigator = Navigator::new(source.clone());

        let result = navigator.get_gamepads();
        assert_eq!(result.len(), MAX_GAMEPADS);
        assert!(result[0].is_none());
        assert_eq!(result[1].as_ref().map(|g| g.id.as_str()), Some("Pad-A"));
        assert!(!navigator.is_intercepted());
    }

    #[test]
    fn test_install_and_restore() {
        let navigator = Navigator::new(MemorySource::new());
        let hook = recorder("hooked");
        let weak: Weak<dyn Interceptor> = Rc::downgrade(&hook) as Weak<dyn Interceptor>;
        navigator.install(EngineId(1), weak);

        assert_eq!(navigator.get_gamepads()[0].as_ref().map(|g| g.id.as_str()), Some("hooked"));
        assert!(!navigator.restore(EngineId(2)));
        assert!(navigator.restore(EngineId(1)));
        assert!(navigator.get_gamepads()[0].is_none());
    }

    #[test]
    fn test_second_install_evicts_first() {
        let navigator = Navigator::new(MemorySource::new());
        let first = recorder("first");
        let second = recorder("second");
        navigator.install(EngineId(1), Rc::downgrade(&first) as Weak<dyn Interceptor>);
        navigator.install(EngineId(2), Rc::downgrade(&second) as Weak<dyn Interceptor>);

        assert!(first.evicted.get());
        assert!(!second.evicted.get());
        assert_eq!(navigator.owner(), Some(EngineId(2)));
        // The evicted engine can no longer restore
        assert!(!navigator.restore(EngineId(1)));
    }

    #[test]
    fn test_dropped_hook_falls_back_to_source() {
        let navigator = Navigator::new(MemorySource::new());
        {
            let hook = recorder("gone");
            navigator.install(EngineId(7), Rc::downgrade(&hook) as Weak<dyn Interceptor>);
        }
        assert!(navigator.get_gamepads()[0].is_none());
        assert!(!navigator.is_intercepted());
    }

    #[test]
    fn test_memory_source_update_and_unplug() {
        let source = MemorySource::new();
        source.connect(GamepadSnapshot::new("Pad", 0, 2, 2));
        assert!(source.update(0, |g| g.axes[1] = 0.5));
        assert!(!source.update(3, |g| g.axes[0] = 1.0));

        let navigator = Navigator::new(source.clone());
        assert_eq!(navigator.get_gamepads()[0].as_ref().map(|g| g.axes[1]), Some(0.5));

        source.unplug(0);
        assert!(navigator.get_gamepads()[0].is_none());
    }
}
