//! Standard-layout axis mapping for gilrs controllers
//!
//! Standard axes are LX, LY, RX, RY with Y pointing down. gilrs reports
//! Y pointing up, so vertical axes are inverted on the way in.

use gilrs::Axis;
use tracing::warn;

use super::snapshot::AXIS_COUNT;
use crate::input::normalize::clamp_axis;

/// gilrs axes in standard index order, with their inversion flag
pub const STANDARD_AXES: [(Axis, bool); AXIS_COUNT] = [
    (Axis::LeftStickX, false),
    (Axis::LeftStickY, true),
    (Axis::RightStickX, false),
    (Axis::RightStickY, true),
];

const AXIS_NAMES: [&str; AXIS_COUNT] = ["lx", "ly", "rx", "ry"];

/// Map a gilrs axis to its standard index
pub fn gilrs_axis_to_standard_index(axis: Axis) -> Option<usize> {
    let index = STANDARD_AXES.iter().position(|(a, _)| *a == axis);
    if index.is_none() {
        warn!("Axis {:?} has no standard index", axis);
    }
    index
}

/// Convert a raw gilrs reading into the standard orientation and range
pub fn to_standard_value(axis: Axis, raw: f32) -> f32 {
    let inverted = STANDARD_AXES
        .iter()
        .any(|(a, invert)| *a == axis && *invert);
    clamp_axis(if inverted { -raw } else { raw })
}

pub fn standard_axis_name(index: usize) -> Option<&'static str> {
    AXIS_NAMES.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices() {
        assert_eq!(gilrs_axis_to_standard_index(Axis::LeftStickX), Some(0));
        assert_eq!(gilrs_axis_to_standard_index(Axis::RightStickY), Some(3));
        assert_eq!(gilrs_axis_to_standard_index(Axis::LeftZ), None);
    }

    #[test]
    fn test_y_axes_point_down() {
        assert_eq!(to_standard_value(Axis::LeftStickY, 0.5), -0.5);
        assert_eq!(to_standard_value(Axis::RightStickY, -1.0), 1.0);
        assert_eq!(to_standard_value(Axis::LeftStickX, 0.5), 0.5);
        assert_eq!(to_standard_value(Axis::RightStickX, 1.7), 1.0);
    }

    #[test]
    fn test_names() {
        assert_eq!(standard_axis_name(1), Some("ly"));
        assert_eq!(standard_axis_name(4), None);
    }
}
