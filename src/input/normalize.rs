//! Shared normalization functions for stick displacement and axis values.
//!
//! Every value that reaches the virtual device passes through one of these
//! helpers, so touch joysticks, on-screen buttons and remapped hardware all
//! obey the same ranges.
//!
//! # Stick Normalization
//!
//! Uses a radial (circular) travel limit rather than a per-axis (square) one.
//! Diagonal drags reach full magnitude (1.0) and the reported `(x, y)` pair
//! always lies inside a circle of radius `value`.
//!
//! # Key Functions
//!
//! - [`limit_displacement`]: pointer displacement -> normalized stick vector
//! - [`is_in_dead_zone`]: radial dead-zone band test
//! - [`clamp_axis`] / [`clamp_unit`]: output range clamps (NaN-safe)
//! - [`scale_offset`]: remap transform `clamp(raw * scale + offset, -1, 1)`

/// Normalized stick vector derived from a pointer displacement
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StickVector {
    /// Horizontal component in [-1, 1]
    pub x: f32,
    /// Vertical component in [-1, 1]
    pub y: f32,
    /// Magnitude in [0, 1]
    pub value: f32,
    /// Direction in radians (`atan2(dy, dx)`)
    pub angle: f32,
    /// Travel-limited distance in widget units (for drawing the stick)
    pub limited_distance: f32,
}

/// Normalize a displacement against the maximum stick travel.
///
/// The distance is clamped to `max_travel` before the components are derived,
/// so anything at or beyond the rim reports `value == 1.0` with `(x, y)` on
/// the unit circle.
///
/// # Arguments
/// * `dx`, `dy` - Displacement from the engagement point, in widget units
/// * `max_travel` - Maximum stick travel radius (must be > 0)
///
/// # Example
/// ```
/// use virtual_gamepad::input::normalize::limit_displacement;
///
/// let v = limit_displacement(100.0, 0.0, 35.0);
/// assert_eq!(v.value, 1.0);
/// assert!((v.x - 1.0).abs() < 1e-6);
///
/// let v = limit_displacement(0.0, 0.0, 35.0);
/// assert_eq!(v.value, 0.0);
/// ```
pub fn limit_displacement(dx: f32, dy: f32, max_travel: f32) -> StickVector {
    if max_travel.is_nan() || max_travel <= 0.0 {
        return StickVector::default();
    }

    let distance = dx.hypot(dy);
    let angle = dy.atan2(dx);
    let limited = distance.min(max_travel);

    StickVector {
        x: limited * angle.cos() / max_travel,
        y: limited * angle.sin() / max_travel,
        value: limited / max_travel,
        angle,
        limited_distance: limited,
    }
}

/// Check whether a displacement falls strictly inside the dead-zone band.
///
/// The band radius is `max_travel * dead_zone_ratio`; a ratio of zero means
/// no band at all.
pub fn is_in_dead_zone(distance: f32, max_travel: f32, dead_zone_ratio: f32) -> bool {
    distance < max_travel * dead_zone_ratio
}

/// Clamp to the axis range [-1, 1]. NaN maps to rest.
pub fn clamp_axis(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Clamp to the button range [0, 1]. NaN maps to released.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Remap transform: `clamp(raw * scale + offset, -1, 1)`
pub fn scale_offset(raw: f32, scale: f32, offset: f32) -> f32 {
    clamp_axis(raw * scale + offset)
}
