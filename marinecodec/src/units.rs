//! Unit conversions shared by the two codecs.

pub const FEET_PER_METER: f32 = 3.28084;
pub const FATHOMS_PER_METER: f32 = 0.546807;
pub const METERS_PER_NM: f32 = 1852.0;

pub fn meter_to_feet(meter: f32) -> f32 {
    meter * FEET_PER_METER
}

pub fn feet_to_meter(feet: f32) -> f32 {
    feet / FEET_PER_METER
}

pub fn meter_to_fathom(meter: f32) -> f32 {
    meter * FATHOMS_PER_METER
}

pub fn knots_to_kmh(knots: f32) -> f32 {
    knots * METERS_PER_NM / 1000.0
}

pub fn kmh_to_knots(kmh: f32) -> f32 {
    kmh * 1000.0 / METERS_PER_NM
}

pub fn ms_to_knots(ms: f32) -> f32 {
    ms * 3600.0 / METERS_PER_NM
}

/// Normalizes an angle to [0, 360).
pub fn normalize0_360(angle: f32) -> f32 {
    (angle % 360.0 + 360.0) % 360.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_feet_round_trip() {
        assert_abs_diff_eq!(feet_to_meter(meter_to_feet(12.7)), 12.7, epsilon = 1e-5);
        // 10 ft is the depth in the classic DBT example
        assert_abs_diff_eq!(feet_to_meter(10.0), 3.048, epsilon = 1e-3);
    }

    #[test]
    fn test_knots_kmh() {
        assert_abs_diff_eq!(knots_to_kmh(1.0), 1.852, epsilon = 1e-6);
        assert_abs_diff_eq!(kmh_to_knots(1.852), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize0_360() {
        assert!((normalize0_360(370.0) - 10.0).abs() < 1e-6);
        assert!((normalize0_360(-10.0) - 350.0).abs() < 1e-6);
        assert!((normalize0_360(720.0) - 0.0).abs() < 1e-6);
    }
}
