//! Remap table: real device axes/buttons onto virtual slots
//!
//! Each virtual button or axis may be fed from a real device, named by its
//! id string. Names are turned into device indices lazily: a device is
//! often not connected (or not yet reported) when the table is loaded.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::snapshot::{PollResult, AXIS_COUNT, BUTTON_COUNT};

/// Which kind of real input feeds a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Axis,
    #[default]
    Button,
}

/// One remap table entry
///
/// Every field is optional; an entry missing what its transform needs is
/// skipped at poll time instead of rejected at load time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemapSlot {
    /// Id (or id fragment) of the real device
    #[serde(rename = "dst_id", default, skip_serializing_if = "Option::is_none")]
    pub source_device_id: Option<String>,

    /// Button/axis index on the real device
    #[serde(rename = "dst_index", default, skip_serializing_if = "Option::is_none")]
    pub source_index: Option<usize>,

    #[serde(rename = "dst_type", default)]
    pub source_kind: SourceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f32>,

    /// Real device slot, when known up front
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_index: Option<usize>,
}

impl RemapSlot {
    /// Slot fed from an axis of the named device
    pub fn axis(device: impl Into<String>, index: usize, scale: f32, offset: f32) -> Self {
        Self {
            source_device_id: Some(device.into()),
            source_index: Some(index),
            source_kind: SourceKind::Axis,
            scale: Some(scale),
            offset: Some(offset),
            device_index: None,
        }
    }

    /// Slot fed from a button of the named device
    pub fn button(device: impl Into<String>, index: usize) -> Self {
        Self {
            source_device_id: Some(device.into()),
            source_index: Some(index),
            source_kind: SourceKind::Button,
            scale: Some(1.0),
            offset: Some(0.0),
            device_index: None,
        }
    }

    pub fn with_device_index(mut self, index: usize) -> Self {
        self.device_index = Some(index);
        self
    }

    /// `scale`/`offset` pair, if both are set
    pub fn transform(&self) -> Option<(f32, f32)> {
        Some((self.scale?, self.offset?))
    }

    /// Does a device called `name` satisfy this slot's device id?
    pub fn matches(&self, name: &str) -> bool {
        self.source_device_id
            .as_deref()
            .is_some_and(|wanted| name.to_lowercase().contains(&wanted.to_lowercase()))
    }
}

/// Remap table for the synthetic device
///
/// `buttons[i]` feeds virtual button `i`, `axes[i]` feeds virtual axis `i`.
/// Entries beyond the device shape are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemapConfig {
    #[serde(default)]
    pub buttons: Vec<Option<RemapSlot>>,
    #[serde(default)]
    pub axes: Vec<Option<RemapSlot>>,
}

impl RemapConfig {
    /// Table with every slot unset
    pub fn empty() -> Self {
        Self {
            buttons: vec![None; BUTTON_COUNT],
            axes: vec![None; AXIS_COUNT],
        }
    }

    pub fn set_button(&mut self, index: usize, slot: RemapSlot) -> &mut Self {
        set_slot(&mut self.buttons, index, slot);
        self
    }

    pub fn set_axis(&mut self, index: usize, slot: RemapSlot) -> &mut Self {
        set_slot(&mut self.axes, index, slot);
        self
    }

    pub fn button(&self, index: usize) -> Option<&RemapSlot> {
        self.buttons.get(index).and_then(Option::as_ref)
    }

    pub fn axis(&self, index: usize) -> Option<&RemapSlot> {
        self.axes.get(index).and_then(Option::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.iter().chain(&self.axes).all(Option::is_none)
    }
}

fn set_slot(slots: &mut Vec<Option<RemapSlot>>, index: usize, slot: RemapSlot) {
    if index >= slots.len() {
        slots.resize(index + 1, None);
    }
    slots[index] = Some(slot);
}

/// Virtual slot addressed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualSlot {
    Button(usize),
    Axis(usize),
}

impl std::fmt::Display for VirtualSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Button(i) => write!(f, "button[{}]", i),
            Self::Axis(i) => write!(f, "axis[{}]", i),
        }
    }
}

/// Real device index per virtual slot, valid for one enable cycle
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Resolution {
    buttons: Vec<Option<usize>>,
    axes: Vec<Option<usize>>,
}

impl Resolution {
    pub(crate) fn new() -> Self {
        Self {
            buttons: vec![None; BUTTON_COUNT],
            axes: vec![None; AXIS_COUNT],
        }
    }

    /// Start of a cycle: only explicit `device_index` entries are known
    pub(crate) fn seeded(remap: Option<&RemapConfig>) -> Self {
        let mut resolution = Self::new();
        if let Some(remap) = remap {
            for (slot, entry) in resolution.buttons.iter_mut().zip(&remap.buttons) {
                *slot = entry.as_ref().and_then(|e| e.device_index);
            }
            for (slot, entry) in resolution.axes.iter_mut().zip(&remap.axes) {
                *slot = entry.as_ref().and_then(|e| e.device_index);
            }
        }
        resolution
    }

    pub(crate) fn get(&self, slot: VirtualSlot) -> Option<usize> {
        match slot {
            VirtualSlot::Button(i) => self.buttons.get(i).copied().flatten(),
            VirtualSlot::Axis(i) => self.axes.get(i).copied().flatten(),
        }
    }

    /// Named slots still waiting for their device
    pub(crate) fn has_pending(&self, remap: &RemapConfig) -> bool {
        let pending = |resolved: &[Option<usize>], entries: &[Option<RemapSlot>]| {
            resolved.iter().zip(entries).any(|(index, entry)| {
                index.is_none()
                    && entry
                        .as_ref()
                        .is_some_and(|e| e.source_device_id.is_some())
            })
        };
        pending(&self.buttons, &remap.buttons) || pending(&self.axes, &remap.axes)
    }

    /// Resolve every pending named slot against the current device list.
    ///
    /// Exact id matches win over case-insensitive substring matches, and
    /// within each rule the lowest device index wins. Resolved slots are
    /// never revisited.
    pub(crate) fn resolve(&mut self, remap: &RemapConfig, devices: &PollResult) -> usize {
        let mut resolved = 0;
        let slots = self
            .buttons
            .iter_mut()
            .zip(&remap.buttons)
            .enumerate()
            .map(|(i, (index, entry))| (VirtualSlot::Button(i), index, entry))
            .chain(
                self.axes
                    .iter_mut()
                    .zip(&remap.axes)
                    .enumerate()
                    .map(|(i, (index, entry))| (VirtualSlot::Axis(i), index, entry)),
            );

        for (slot, index, entry) in slots {
            let Some(entry) = entry else { continue };
            if index.is_some() || entry.source_device_id.is_none() {
                continue;
            }
            if let Some(found) = find_device(entry, devices) {
                info!(
                    "Remap {} bound to device {} (\"{}\")",
                    slot,
                    found,
                    entry.source_device_id.as_deref().unwrap_or_default()
                );
                *index = Some(found);
                resolved += 1;
            } else {
                debug!("Remap {} still waiting for {:?}", slot, entry.source_device_id);
            }
        }
        resolved
    }
}

fn find_device(entry: &RemapSlot, devices: &PollResult) -> Option<usize> {
    let wanted = entry.source_device_id.as_deref()?;
    let connected = || {
        devices
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.as_ref().filter(|d| d.connected).map(|d| (i, d)))
    };

    connected()
        .find(|(_, d)| d.id == wanted)
        .or_else(|| connected().find(|(_, d)| entry.matches(&d.id)))
        .map(|(i, _)| i)
}
