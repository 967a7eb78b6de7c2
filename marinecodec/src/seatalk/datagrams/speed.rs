use crate::error::DecodeError;

use super::{check_len, word, word_bytes};

/// `20 01 XX XX`: speed through water, XXXX/10 knots.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedThroughWater {
    pub knots: f32,
}

impl SpeedThroughWater {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("SpeedThroughWater", attr, 1)?;
        Ok(Self { knots: word(data[0], data[1]) as f32 / 10.0 })
    }

    pub fn encode(&self) -> Vec<u8> {
        let raw = word_bytes((self.knots * 10.0).round() as u16);
        vec![0x20, 0x01, raw[0], raw[1]]
    }
}

/// `26 04 XX XX YY YY DE`: speed through water from the paddle sensor,
/// XXXX/100 knots. The average-speed word and its flags are zeroed when
/// emitted, as the corresponding instruments do at power-on.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedThroughWater2 {
    pub knots: f32,
}

impl SpeedThroughWater2 {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("SpeedThroughWater2", attr, 4)?;
        Ok(Self { knots: word(data[0], data[1]) as f32 / 100.0 })
    }

    pub fn encode(&self) -> Vec<u8> {
        let raw = word_bytes((self.knots * 100.0).round() as u16);
        vec![0x26, 0x04, raw[0], raw[1], 0x00, 0x00, 0x00]
    }
}

/// `52 01 XX XX`: speed over ground, XXXX/10 knots.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedOverGround {
    pub knots: f32,
}

impl SpeedOverGround {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("SpeedOverGround", attr, 1)?;
        Ok(Self { knots: word(data[0], data[1]) as f32 / 10.0 })
    }

    pub fn encode(&self) -> Vec<u8> {
        let raw = word_bytes((self.knots * 10.0).round() as u16);
        vec![0x52, 0x01, raw[0], raw[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_tenths() {
        let speed = SpeedThroughWater::decode(0x01, &[0x53, 0x00]).unwrap();
        assert!((speed.knots - 8.3).abs() < 1e-4);
        assert_eq!(speed.encode(), vec![0x20, 0x01, 0x53, 0x00]);
    }

    #[test]
    fn test_speed2_hundredths() {
        let speed = SpeedThroughWater2::decode(0x04, &[0x07, 0x02, 0x10, 0x00, 0x00]).unwrap();
        assert!((speed.knots - 5.19).abs() < 1e-4);
        // Average-speed bytes are not preserved.
        assert_eq!(speed.encode(), vec![0x26, 0x04, 0x07, 0x02, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_sog() {
        let sog = SpeedOverGround::decode(0x01, &[0x7B, 0x00]).unwrap();
        assert!((sog.knots - 12.3).abs() < 1e-4);
        assert_eq!(sog.encode(), vec![0x52, 0x01, 0x7B, 0x00]);
    }
}
