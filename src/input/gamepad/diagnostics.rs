//! Device listing for writing remap tables

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::info;

use super::axis::standard_axis_name;
use super::buttons::standard_button_name;
use super::gilrs_source::GilrsSource;
use super::navigator::GamepadSource;
use super::snapshot::GamepadSnapshot;

/// Print every detected controller with its remap id and current readings
///
/// Bluetooth controllers can take a moment to wake up, so events are pumped
/// for `wait` before enumerating.
pub fn print_gamepad_diagnostics(wait: Duration) -> Result<()> {
    info!("=== Gamepad Diagnostics ===");
    info!("Platform: {}", std::env::consts::OS);

    let mut source = GilrsSource::new()?;

    info!("⏳ Waiting for gamepads to connect ({:.0?})...", wait);
    let start = Instant::now();
    while start.elapsed() < wait {
        source.pump();
        thread::sleep(Duration::from_millis(100));
    }

    let devices: Vec<GamepadSnapshot> = source.get_gamepads().into_iter().flatten().collect();
    if devices.is_empty() {
        info!("⚠️  No gamepads detected");
        info!("   Check the cable or Bluetooth pairing, then retry");
        return Ok(());
    }

    info!("✅ Found {} gamepad(s):", devices.len());
    info!("");
    for device in &devices {
        describe(device);
    }

    info!("💡 Tips:");
    info!("   - Use the quoted name as dst_id in the remap table");
    info!("   - Exact names win; otherwise matching is case-insensitive substring");
    info!("   - dst_index uses the standard numbering shown above");
    Ok(())
}

fn describe(device: &GamepadSnapshot) {
    info!("📋 Slot {}: \"{}\"", device.index, device.id);
    info!("   Mapping: {}", device.mapping);
    info!("   📌 Remap hint: dst_id: \"{}\"", device.id);

    let pressed: Vec<String> = device
        .pressed_buttons()
        .map(|i| format!("{} ({})", i, standard_button_name(i).unwrap_or("?")))
        .collect();
    if pressed.is_empty() {
        info!("   🎮 (no buttons currently pressed)");
    } else {
        info!("   🎮 Pressed: {}", pressed.join(", "));
    }

    for (i, value) in device.axes.iter().enumerate() {
        if value.abs() > 0.01 {
            info!("   🕹️  axis {} ({}): {:.3}", i, standard_axis_name(i).unwrap_or("?"), value);
        }
    }
    info!("   ─────────────────────────────────");
}
