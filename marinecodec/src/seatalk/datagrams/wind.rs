use crate::error::DecodeError;
use crate::message::WindSpeedUnit;

use super::check_len;

/// `10 01 XX YY`: apparent wind angle, XXYY/2 degrees right of bow.
#[derive(Debug, Clone, PartialEq)]
pub struct WindAngle {
    pub degrees: f32,
}

impl WindAngle {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("WindAngle", attr, 1)?;
        let half_degrees = u16::from(data[0]) << 8 | u16::from(data[1]);
        Ok(Self { degrees: half_degrees as f32 / 2.0 })
    }

    pub fn encode(&self) -> Vec<u8> {
        let half_degrees = (self.degrees * 2.0).round() as u16;
        vec![0x10, 0x01, (half_degrees >> 8) as u8, (half_degrees & 0xFF) as u8]
    }
}

/// `11 01 XX 0Y`: apparent wind speed, (XX & 0x7F) + Y/10.
///
/// Bit 7 of XX selects the display unit; the numeric value is carried
/// unconverted together with that unit.
#[derive(Debug, Clone, PartialEq)]
pub struct WindSpeed {
    pub value: f32,
    pub unit: WindSpeedUnit,
}

impl WindSpeed {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("WindSpeed", attr, 1)?;
        if data[1] & 0xF0 != 0 {
            return Err(DecodeError::Validation(format!(
                "WindSpeed: tenths byte 0x{:02X} has high nibble set",
                data[1]
            )));
        }
        let unit = if data[0] & 0x80 != 0 {
            WindSpeedUnit::MetersPerSecond
        } else {
            WindSpeedUnit::Knots
        };
        Ok(Self {
            value: f32::from(data[0] & 0x7F) + f32::from(data[1]) / 10.0,
            unit,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let whole = self.value.trunc() as u8 & 0x7F;
        let tenths = ((self.value - self.value.trunc()) * 10.0).round() as u8;
        let unit_flag = match self.unit {
            WindSpeedUnit::MetersPerSecond => 0x80,
            WindSpeedUnit::Knots => 0x00,
        };
        vec![0x11, 0x01, whole | unit_flag, tenths.min(9)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wind_angle_half_degree_resolution() {
        let angle = WindAngle::decode(0x01, &[0x00, 0x5B]).unwrap();
        assert!((angle.degrees - 45.5).abs() < 1e-4);
        assert_eq!(angle.encode(), vec![0x10, 0x01, 0x00, 0x5B]);
    }

    #[test]
    fn test_wind_speed_knots() {
        let speed = WindSpeed::decode(0x01, &[0x12, 0x04]).unwrap();
        assert!((speed.value - 18.4).abs() < 1e-4);
        assert_eq!(speed.unit, WindSpeedUnit::Knots);
        assert_eq!(speed.encode(), vec![0x11, 0x01, 0x12, 0x04]);
    }

    #[test]
    fn test_wind_speed_metric_flag() {
        let speed = WindSpeed::decode(0x01, &[0x85, 0x02]).unwrap();
        assert_eq!(speed.unit, WindSpeedUnit::MetersPerSecond);
        assert!((speed.value - 5.2).abs() < 1e-4);
        assert_eq!(speed.encode(), vec![0x11, 0x01, 0x85, 0x02]);
    }

    #[test]
    fn test_wind_speed_reserved_nibble_rejected() {
        assert!(WindSpeed::decode(0x01, &[0x12, 0x14]).is_err());
    }
}
