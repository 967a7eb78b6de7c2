use crate::error::DecodeError;

use super::check_len;

/// `87 00 0X`: set autopilot response level.
/// X = 1: automatic deadband, X = 2: minimum deadband.
#[derive(Debug, Clone, PartialEq)]
pub struct SetResponseLevel {
    pub level: u8,
}

impl SetResponseLevel {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("SetResponseLevel", attr, 0)?;
        if !matches!(data[0], 1 | 2) {
            return Err(DecodeError::Validation(format!(
                "SetResponseLevel: level 0x{:02X} is not 1 or 2",
                data[0]
            )));
        }
        Ok(Self { level: data[0] })
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![0x87, 0x00, self.level]
    }
}

/// `91 00 0X`: set rudder gain.
#[derive(Debug, Clone, PartialEq)]
pub struct SetRudderGain {
    pub gain: u8,
}

impl SetRudderGain {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("SetRudderGain", attr, 0)?;
        Ok(Self { gain: data[0] })
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![0x91, 0x00, self.gain]
    }
}

/// `81 01 00 00` / `81 00 00`: course computer setup marker. The long form
/// is sent while passing USER CAL, the short form immediately after.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseComputerSetup {
    pub in_setup: bool,
}

impl CourseComputerSetup {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        if attr >> 4 != 0 || data.iter().any(|&b| b != 0) {
            return Err(DecodeError::Validation(format!(
                "CourseComputerSetup: unexpected payload {data:02X?}"
            )));
        }
        match attr & 0x0F {
            1 => Ok(Self { in_setup: true }),
            0 => Ok(Self { in_setup: false }),
            len => Err(DecodeError::Validation(format!(
                "CourseComputerSetup: length nibble {len} is not 0 or 1"
            ))),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        if self.in_setup {
            vec![0x81, 0x01, 0x00, 0x00]
        } else {
            vec![0x81, 0x00, 0x00]
        }
    }
}

/// `93 00 00`: enter autopilot setup, repeated once per second by the
/// course computer.
#[derive(Debug, Clone, PartialEq)]
pub struct ApSetup;

impl ApSetup {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        let hi = check_len("ApSetup", attr, 0)?;
        if hi != 0 || data[0] != 0 {
            return Err(DecodeError::Validation(format!(
                "ApSetup: unexpected payload {data:02X?}"
            )));
        }
        Ok(Self)
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![0x93, 0x00, 0x00]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_level_domain() {
        assert_eq!(SetResponseLevel::decode(0x00, &[0x02]).unwrap().level, 2);
        assert!(SetResponseLevel::decode(0x00, &[0x03]).is_err());
    }

    #[test]
    fn test_course_computer_both_forms() {
        let long = CourseComputerSetup::decode(0x01, &[0x00, 0x00]).unwrap();
        assert!(long.in_setup);
        assert_eq!(long.encode(), vec![0x81, 0x01, 0x00, 0x00]);
        let short = CourseComputerSetup::decode(0x00, &[0x00]).unwrap();
        assert!(!short.in_setup);
        assert_eq!(short.encode(), vec![0x81, 0x00, 0x00]);
    }

    #[test]
    fn test_ap_setup_zero_content() {
        assert!(ApSetup::decode(0x00, &[0x00]).is_ok());
        assert!(ApSetup::decode(0x00, &[0x01]).is_err());
    }
}
