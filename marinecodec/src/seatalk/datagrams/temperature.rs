use crate::error::DecodeError;

use super::{check_len, word, word_bytes};

/// `23 Z1 XX 00`: water temperature (ST50 family), XX a signed whole-degree
/// offset from 10 °C. Z&4 flags a defective or disconnected sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterTemperature1 {
    pub celsius: i16,
    pub sensor_defective: bool,
}

impl WaterTemperature1 {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        let flags = check_len("WaterTemperature1", attr, 1)?;
        Ok(Self {
            sensor_defective: flags & 0x04 != 0,
            celsius: 10 + i16::from(data[0] as i8),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let offset = (self.celsius - 10).clamp(-128, 127) as i8;
        let attr = if self.sensor_defective { 0x41 } else { 0x01 };
        vec![0x23, attr, offset as u8, 0x00]
    }

    /// Truncates a canonical temperature onto the whole-degree wire grid.
    pub fn from_celsius(celsius: f32) -> Self {
        Self {
            celsius: 10 + (celsius - 10.0).trunc() as i16,
            sensor_defective: false,
        }
    }
}

/// `27 01 XX XX`: water temperature, (XXXX - 100) / 10 °C.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterTemperature2 {
    pub celsius: f32,
}

impl WaterTemperature2 {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("WaterTemperature2", attr, 1)?;
        Ok(Self {
            celsius: (i32::from(word(data[0], data[1])) - 100) as f32 / 10.0,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let raw = ((self.celsius * 10.0).round() as i32 + 100).clamp(0, 0xFFFF) as u16;
        let bytes = word_bytes(raw);
        vec![0x27, 0x01, bytes[0], bytes[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature1_offset_encoding() {
        // 21.5 C sits 11 whole degrees above the 10 C base.
        let bytes = WaterTemperature1::from_celsius(21.5).encode();
        assert_eq!(bytes, vec![0x23, 0x01, 0x0B, 0x00]);
        let decoded = WaterTemperature1::decode(0x01, &[0x0B, 0x00]).unwrap();
        assert_eq!(decoded.celsius, 21);
    }

    #[test]
    fn test_temperature1_negative() {
        let decoded = WaterTemperature1::decode(0x01, &[0xF9, 0x00]).unwrap();
        assert_eq!(decoded.celsius, 3);
        assert_eq!(decoded.encode(), vec![0x23, 0x01, 0xF9, 0x00]);
    }

    #[test]
    fn test_temperature1_defective_flag() {
        let decoded = WaterTemperature1::decode(0x41, &[0x00, 0x00]).unwrap();
        assert!(decoded.sensor_defective);
    }

    #[test]
    fn test_temperature2_tenths() {
        let decoded = WaterTemperature2::decode(0x01, &[0xA8, 0x04]).unwrap();
        assert!((decoded.celsius - 109.2).abs() < 1e-4);
        assert_eq!(decoded.encode(), vec![0x27, 0x01, 0xA8, 0x04]);

        // Sub-zero temperatures use raw values below 100.
        let cold = WaterTemperature2::decode(0x01, &[0x24, 0x00]).unwrap();
        assert!((cold.celsius + 6.4).abs() < 1e-4);
        assert_eq!(cold.encode(), vec![0x27, 0x01, 0x24, 0x00]);
    }
}
