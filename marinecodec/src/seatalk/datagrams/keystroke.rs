use crate::error::DecodeError;

use super::check_len;

/// `55 X1 YY yy` / `86 X1 YY yy`: keystroke. X identifies the sending
/// device, YY the key code, yy must be its ones' complement. 0x55 is the
/// GPS TRACK pad, 0x86 the general keystroke; the command id is supplied
/// at encode time.
#[derive(Debug, Clone, PartialEq)]
pub struct Keystroke {
    pub device: u8,
    pub code: u8,
}

impl Keystroke {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        let device = check_len("Keystroke", attr, 1)?;
        if data[1] != !data[0] {
            return Err(DecodeError::Validation(format!(
                "Keystroke: check byte 0x{:02X} does not complement code 0x{:02X}",
                data[1], data[0]
            )));
        }
        Ok(Self { device, code: data[0] })
    }

    pub fn encode(&self, id: u8) -> Vec<u8> {
        vec![id, (self.device & 0x0F) << 4 | 0x01, self.code, !self.code]
    }
}
