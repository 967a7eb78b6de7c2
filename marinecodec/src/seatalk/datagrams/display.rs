use crate::error::DecodeError;
use crate::message::MileageUnit;

use super::check_len;

/// `24 02 00 00 XX`: display units for mileage and speed.
/// XX: 00 = nm/knots, 06 = sm/mph, 86 = km/kmh.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayUnits {
    pub unit: MileageUnit,
}

impl DisplayUnits {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("DisplayUnits", attr, 2)?;
        let unit = match data[2] {
            0x00 => MileageUnit::NauticalMiles,
            0x06 => MileageUnit::StatuteMiles,
            0x86 => MileageUnit::Kilometers,
            other => {
                return Err(DecodeError::Validation(format!(
                    "DisplayUnits: unknown unit byte 0x{other:02X}"
                )))
            }
        };
        Ok(Self { unit })
    }

    pub fn encode(&self) -> Vec<u8> {
        let unit = match self.unit {
            MileageUnit::NauticalMiles => 0x00,
            MileageUnit::StatuteMiles => 0x06,
            MileageUnit::Kilometers => 0x86,
        };
        vec![0x24, 0x02, 0x00, 0x00, unit]
    }
}

/// `30 00 0X` / `80 00 0X`: lamp intensity. X: 0 = off, 4 = L1, 8 = L2,
/// 12 = L3. The same payload travels under two command ids, so the id is
/// supplied at encode time.
#[derive(Debug, Clone, PartialEq)]
pub struct SetLampIntensity {
    pub level: u8,
}

impl SetLampIntensity {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("SetLampIntensity", attr, 0)?;
        let level = match data[0] {
            0x00 => 0,
            0x04 => 1,
            0x08 => 2,
            0x0C => 3,
            other => {
                return Err(DecodeError::Validation(format!(
                    "SetLampIntensity: unknown intensity byte 0x{other:02X}"
                )))
            }
        };
        Ok(Self { level })
    }

    pub fn encode(&self, id: u8) -> Vec<u8> {
        vec![id, 0x00, self.level.min(3) * 4]
    }
}

/// `65 00 02`: select fathoms as the depth display unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectFathom;

impl SelectFathom {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("SelectFathom", attr, 0)?;
        if data[0] != 0x02 {
            return Err(DecodeError::Validation(format!(
                "SelectFathom: expected 0x02, got 0x{:02X}",
                data[0]
            )));
        }
        Ok(Self)
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![0x65, 0x00, 0x02]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_units_mapping() {
        let units = DisplayUnits::decode(0x02, &[0x00, 0x00, 0x86]).unwrap();
        assert_eq!(units.unit, MileageUnit::Kilometers);
        assert_eq!(units.encode(), vec![0x24, 0x02, 0x00, 0x00, 0x86]);
        assert!(DisplayUnits::decode(0x02, &[0x00, 0x00, 0x07]).is_err());
    }

    #[test]
    fn test_lamp_intensity_levels() {
        for (byte, level) in [(0x00u8, 0u8), (0x04, 1), (0x08, 2), (0x0C, 3)] {
            let lamp = SetLampIntensity::decode(0x00, &[byte]).unwrap();
            assert_eq!(lamp.level, level);
            assert_eq!(lamp.encode(0x30), vec![0x30, 0x00, byte]);
            assert_eq!(lamp.encode(0x80), vec![0x80, 0x00, byte]);
        }
        assert!(SetLampIntensity::decode(0x00, &[0x05]).is_err());
    }
}
