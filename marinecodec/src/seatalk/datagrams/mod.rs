//! One module per datagram topic, layouts per the Knauf reference.

pub mod alarms;
pub mod autopilot;
pub mod course;
pub mod depth;
pub mod display;
pub mod equipment;
pub mod keystroke;
pub mod mileage;
pub mod mob;
pub mod position;
pub mod speed;
pub mod temperature;
pub mod time_date;
pub mod wind;

use crate::error::DecodeError;

/// Verifies the length nibble of the attribute byte and hands back its high
/// nibble, which several datagrams use as a fourth data nibble.
pub(crate) fn check_len(name: &str, attr: u8, expected: u8) -> Result<u8, DecodeError> {
    let len = attr & 0x0F;
    if len != expected {
        return Err(DecodeError::Validation(format!(
            "{name}: expected length nibble {expected}, got {len}"
        )));
    }
    Ok(attr >> 4)
}

/// Two data bytes as a little-endian word, the common Seatalk encoding.
pub(crate) fn word(lo: u8, hi: u8) -> u16 {
    u16::from(hi) << 8 | u16::from(lo)
}

/// Splits a value back into the little-endian byte pair.
pub(crate) fn word_bytes(value: u16) -> [u8; 2] {
    [(value & 0xFF) as u8, (value >> 8) as u8]
}
