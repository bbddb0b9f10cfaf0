//! Real controllers through gilrs, reported in the standard layout

use std::time::Instant;

use anyhow::{anyhow, Result};
use gilrs::{Event, EventType, Gamepad, GamepadId, Gilrs};
use tracing::{debug, info, trace, warn};

use super::axis::{to_standard_value, STANDARD_AXES};
use super::buttons::STANDARD_BUTTONS;
use super::navigator::GamepadSource;
use super::snapshot::{ButtonRecord, GamepadSnapshot, PollResult, STANDARD_MAPPING, MAX_GAMEPADS};

/// Stable device-to-slot assignment
///
/// A device keeps its slot for as long as it stays connected; a new device
/// takes the lowest free slot. Devices beyond `MAX_GAMEPADS` are not reported.
#[derive(Debug, Clone)]
pub struct SlotTable<K> {
    slots: [Option<K>; MAX_GAMEPADS],
}

impl<K: Copy + PartialEq + std::fmt::Debug> SlotTable<K> {
    pub fn new() -> Self {
        Self {
            slots: [None; MAX_GAMEPADS],
        }
    }

    /// Free slots of devices no longer connected, then seat new ones
    pub fn sync(&mut self, connected: &[K]) {
        for slot in self.slots.iter_mut() {
            if let Some(key) = *slot {
                if !connected.contains(&key) {
                    debug!("{:?} left its slot", key);
                    *slot = None;
                }
            }
        }

        for key in connected {
            if self.slot_of(*key).is_some() {
                continue;
            }
            match self.slots.iter().position(Option::is_none) {
                Some(free) => {
                    debug!("{:?} seated in slot {}", key, free);
                    self.slots[free] = Some(*key);
                }
                None => warn!("No free slot for {:?}, ignored", key),
            }
        }
    }

    pub fn slot_of(&self, key: K) -> Option<usize> {
        self.slots.iter().position(|slot| *slot == Some(key))
    }

    /// Occupied slots as `(slot, key)`
    pub fn occupied(&self) -> impl Iterator<Item = (usize, K)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.map(|key| (index, key)))
    }
}

impl<K: Copy + PartialEq + std::fmt::Debug> Default for SlotTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// gilrs-backed enumeration
///
/// gilrs is not `Send` on every platform, so the source must be created and
/// polled on the same thread.
pub struct GilrsSource {
    gilrs: Gilrs,
    slots: SlotTable<GamepadId>,
    epoch: Instant,
}

impl GilrsSource {
    pub fn new() -> Result<Self> {
        // gilrs::Error is not Sync on every backend, format it instead of boxing
        let gilrs = Gilrs::new().map_err(|e| anyhow!("Failed to initialize gilrs: {:?}", e))?;
        info!("gilrs initialized");
        Ok(Self {
            gilrs,
            slots: SlotTable::new(),
            epoch: Instant::now(),
        })
    }

    /// Drain pending events so gamepad state is current
    pub fn pump(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => info!("📶 Gamepad connected: {:?}", id),
                EventType::Disconnected => info!("📵 Gamepad disconnected: {:?}", id),
                _ => {}
            }
        }
    }

    fn snapshot(gamepad: &Gamepad<'_>, index: usize, timestamp: f64) -> GamepadSnapshot {
        let buttons = STANDARD_BUTTONS
            .iter()
            .map(|button| {
                let pressed = gamepad.is_pressed(*button);
                let value = gamepad
                    .button_data(*button)
                    .map(|data| data.value())
                    .unwrap_or(if pressed { 1.0 } else { 0.0 });
                ButtonRecord {
                    pressed,
                    touched: pressed || value > 0.0,
                    value,
                }
            })
            .collect();

        let axes = STANDARD_AXES
            .iter()
            .map(|(axis, _)| to_standard_value(*axis, gamepad.value(*axis)))
            .collect();

        GamepadSnapshot {
            id: gamepad.name().to_string(),
            index,
            connected: gamepad.is_connected(),
            mapping: STANDARD_MAPPING.to_string(),
            buttons,
            axes,
            timestamp,
        }
    }
}

impl GamepadSource for GilrsSource {
    fn get_gamepads(&mut self) -> PollResult {
        self.pump();
        let timestamp = self.epoch.elapsed().as_secs_f64() * 1000.0;

        let connected: Vec<GamepadId> = self
            .gilrs
            .gamepads()
            .filter(|(_, gp)| gp.is_connected())
            .map(|(id, _)| id)
            .collect();
        self.slots.sync(&connected);

        let mut result = vec![None; MAX_GAMEPADS];
        for (index, id) in self.slots.occupied() {
            trace!("Polling {:?} as slot {}", id, index);
            let gamepad = self.gilrs.gamepad(id);
            result[index] = Some(Self::snapshot(&gamepad, index, timestamp));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devices_keep_their_slot_when_others_leave() {
        let mut slots = SlotTable::new();
        slots.sync(&[10u32, 11]);
        assert_eq!(slots.slot_of(10), Some(0));
        assert_eq!(slots.slot_of(11), Some(1));

        // first pad unplugged: second one stays in slot 1
        slots.sync(&[11]);
        assert_eq!(slots.slot_of(10), None);
        assert_eq!(slots.slot_of(11), Some(1));

        // a newcomer takes the freed slot, not slot 1
        slots.sync(&[11, 12]);
        assert_eq!(slots.slot_of(12), Some(0));
        assert_eq!(slots.slot_of(11), Some(1));
        assert_eq!(slots.occupied().collect::<Vec<_>>(), vec![(0, 12), (1, 11)]);
    }

    #[test]
    fn test_extra_devices_are_not_seated() {
        let mut slots = SlotTable::new();
        slots.sync(&[1u32, 2, 3, 4, 5]);
        assert_eq!(slots.occupied().count(), MAX_GAMEPADS);
        assert_eq!(slots.slot_of(5), None);

        slots.sync(&[2, 3, 4, 5]);
        assert_eq!(slots.slot_of(5), Some(0));
    }
}
