use crate::error::DecodeError;
use crate::units;

use super::{check_len, word, word_bytes};

/// `00 02 YZ XX XX`: depth below transducer, XXXX in 1/10 feet.
///
/// The Y and Z nibbles carry the alarm and display flags; they are kept so
/// a re-emitted datagram is bit-identical.
#[derive(Debug, Clone, PartialEq)]
pub struct Depth {
    pub feet: f32,
    pub anchor_alarm: bool,
    pub metric_display: bool,
    pub transducer_defective: bool,
    pub deep_alarm: bool,
    pub shallow_alarm: bool,
}

impl Depth {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("Depth", attr, 2)?;
        Ok(Self {
            anchor_alarm: data[0] & 0x80 != 0,
            metric_display: data[0] & 0x40 != 0,
            transducer_defective: data[0] & 0x04 != 0,
            deep_alarm: data[0] & 0x02 != 0,
            shallow_alarm: data[0] & 0x01 != 0,
            feet: word(data[1], data[2]) as f32 / 10.0,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut flags = 0u8;
        flags |= if self.anchor_alarm { 0x80 } else { 0 };
        flags |= if self.metric_display { 0x40 } else { 0 };
        flags |= if self.transducer_defective { 0x04 } else { 0 };
        flags |= if self.deep_alarm { 0x02 } else { 0 };
        flags |= if self.shallow_alarm { 0x01 } else { 0 };
        let raw = word_bytes((self.feet * 10.0).round() as u16);
        vec![0x00, 0x02, flags, raw[0], raw[1]]
    }

    /// Builds a flag-free datagram from a canonical depth in meters.
    pub fn from_meters(meters: f32) -> Self {
        Self {
            feet: units::meter_to_feet(meters),
            anchor_alarm: false,
            metric_display: false,
            transducer_defective: false,
            deep_alarm: false,
            shallow_alarm: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_decode() {
        // 731 tenths of a foot, anchor alarm set.
        let depth = Depth::decode(0x02, &[0x80, 0xDB, 0x02]).unwrap();
        assert!((depth.feet - 73.1).abs() < 1e-4);
        assert!(depth.anchor_alarm);
        assert!(!depth.shallow_alarm);
    }

    #[test]
    fn test_depth_encode_from_meters() {
        // 22.3 m is 73.16 ft, truncated to tenths on the wire.
        let bytes = Depth::from_meters(22.3).encode();
        assert_eq!(bytes, vec![0x00, 0x02, 0x00, 0xDC, 0x02]);
    }

    #[test]
    fn test_depth_wrong_length_rejected() {
        assert!(Depth::decode(0x03, &[0x00, 0x00, 0x00, 0x00]).is_err());
    }
}
