use crate::error::DecodeError;
use crate::message::Equipment;

use super::check_len;

const ID1_TABLE: &[([u8; 6], Equipment)] = &[
    ([0x00, 0x00, 0x00, 0x60, 0x01, 0x00], Equipment::CourseComputer400G),
    ([0x04, 0xBA, 0x20, 0x28, 0x01, 0x00], Equipment::St60Tridata),
    ([0x87, 0x72, 0x25, 0x28, 0x01, 0x00], Equipment::St60TridataPlus),
    ([0x70, 0x99, 0x10, 0x28, 0x01, 0x00], Equipment::St60Log),
    ([0xF3, 0x18, 0x00, 0x26, 0x0F, 0x06], Equipment::St80Masterview),
    ([0xFA, 0x03, 0x00, 0x30, 0x07, 0x03], Equipment::St80MaxiDisplay),
    ([0xFF, 0xFF, 0xFF, 0xD0, 0x00, 0x00], Equipment::SmartControllerRemote),
];

const ID2_TABLE: &[([u8; 6], Equipment)] = &[
    ([0x04, 0xBA, 0x20, 0x28, 0x2D, 0x2D], Equipment::St60Tridata),
    ([0x87, 0x72, 0x25, 0x28, 0x2D, 0x2D], Equipment::St60TridataPlus),
    ([0x05, 0x70, 0x99, 0x10, 0x28, 0x2D], Equipment::St60Log),
    ([0xF3, 0x18, 0x00, 0x26, 0x2D, 0x2D], Equipment::St80Masterview),
];

fn lookup(table: &[([u8; 6], Equipment)], name: &str, data: &[u8]) -> Result<Equipment, DecodeError> {
    table
        .iter()
        .find(|(bytes, _)| &bytes[..] == data)
        .map(|(_, equipment)| *equipment)
        .ok_or_else(|| DecodeError::Validation(format!("{name}: unknown equipment bytes {data:02X?}")))
}

fn reverse_lookup(table: &[([u8; 6], Equipment)], equipment: Equipment) -> [u8; 6] {
    table
        .iter()
        .find(|(_, e)| *e == equipment)
        .map(|(bytes, _)| *bytes)
        // Every equipment the bus can name has a power-on id.
        .unwrap_or(table[0].0)
}

/// `01 05 XX XX XX XX XX XX`: equipment id, sent at power on.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentId1 {
    pub equipment: Equipment,
}

impl EquipmentId1 {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("EquipmentId1", attr, 5)?;
        Ok(Self { equipment: lookup(ID1_TABLE, "EquipmentId1", data)? })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0x01, 0x05];
        out.extend_from_slice(&reverse_lookup(ID1_TABLE, self.equipment));
        out
    }
}

/// `6C 05 XX XX XX XX XX XX`: second equipment id datagram, follows 0x01.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentId2 {
    pub equipment: Equipment,
}

impl EquipmentId2 {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("EquipmentId2", attr, 5)?;
        Ok(Self { equipment: lookup(ID2_TABLE, "EquipmentId2", data)? })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0x6C, 0x05];
        out.extend_from_slice(&reverse_lookup(ID2_TABLE, self.equipment));
        out
    }
}

/// `90 00 XX`: periodic device identification broadcast.
/// Known senders: 0x02 (ST600R), 0x05 (course computers), 0xA3 (bridge).
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceId {
    pub id: u8,
}

impl DeviceId {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("DeviceId", attr, 0)?;
        if !matches!(data[0], 0x02 | 0x05 | 0xA3) {
            return Err(DecodeError::Validation(format!(
                "DeviceId: unknown device byte 0x{:02X}",
                data[0]
            )));
        }
        Ok(Self { id: data[0] })
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![0x90, 0x00, self.id]
    }
}

/// `61 03 03 00 00 00`: issued by an E-80 display at initialisation.
#[derive(Debug, Clone, PartialEq)]
pub struct E80Init;

impl E80Init {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        let hi = check_len("E80Init", attr, 3)?;
        if hi != 0 || data != [0x03, 0x00, 0x00, 0x00] {
            return Err(DecodeError::Validation(format!(
                "E80Init: unexpected payload {data:02X?}"
            )));
        }
        Ok(Self)
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![0x61, 0x03, 0x03, 0x00, 0x00, 0x00]
    }
}

/// `38 X1 YY yy`: CodeLock data; meaning undocumented, nibbles kept raw.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeLock {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl CodeLock {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        let x = check_len("CodeLock", attr, 1)?;
        Ok(Self { x, y: data[0], z: data[1] })
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![0x38, (self.x & 0x0F) << 4 | 0x01, self.y, self.z]
    }
}

/// `A4`: device identification queries: a broadcast (`A4 02`), a reply
/// (`A4 12`) and a termination (`A4 06`), distinguished by length and the
/// attribute nibble.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceQuery {
    Broadcast,
    Answer { unit: u8, main_sw: u8, minor_sw: u8 },
    Termination,
}

impl DeviceQuery {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        match (attr >> 4, attr & 0x0F) {
            (0, 2) => {
                if data.iter().any(|&b| b != 0) {
                    return Err(DecodeError::Validation(format!(
                        "DeviceQuery broadcast carries non-zero bytes {data:02X?}"
                    )));
                }
                Ok(DeviceQuery::Broadcast)
            }
            (1, 2) => Ok(DeviceQuery::Answer {
                unit: data[0],
                main_sw: data[1],
                minor_sw: data[2],
            }),
            (0, 6) => {
                if data.iter().any(|&b| b != 0) {
                    return Err(DecodeError::Validation(format!(
                        "DeviceQuery termination carries non-zero bytes {data:02X?}"
                    )));
                }
                Ok(DeviceQuery::Termination)
            }
            (hi, len) => Err(DecodeError::Validation(format!(
                "DeviceQuery: unsupported attribute {hi:X}{len:X}"
            ))),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            DeviceQuery::Broadcast => vec![0xA4, 0x02, 0x00, 0x00, 0x00],
            DeviceQuery::Answer { unit, main_sw, minor_sw } => {
                vec![0xA4, 0x12, *unit, *main_sw, *minor_sw]
            }
            DeviceQuery::Termination => {
                vec![0xA4, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equipment_id_tables() {
        let id = EquipmentId1::decode(0x05, &[0xFF, 0xFF, 0xFF, 0xD0, 0x00, 0x00]).unwrap();
        assert_eq!(id.equipment, Equipment::SmartControllerRemote);
        assert_eq!(
            EquipmentId1 { equipment: Equipment::St60Tridata }.encode(),
            vec![0x01, 0x05, 0x04, 0xBA, 0x20, 0x28, 0x01, 0x00]
        );
        assert!(EquipmentId1::decode(0x05, &[9, 9, 9, 9, 9, 9]).is_err());
    }

    #[test]
    fn test_device_id_known_set() {
        assert!(DeviceId::decode(0x00, &[0xA3]).is_ok());
        assert!(DeviceId::decode(0x00, &[0x42]).is_err());
    }

    #[test]
    fn test_device_query_variants() {
        assert_eq!(
            DeviceQuery::decode(0x02, &[0, 0, 0]).unwrap(),
            DeviceQuery::Broadcast
        );
        let answer = DeviceQuery::decode(0x12, &[0x04, 0x03, 0x01]).unwrap();
        assert_eq!(answer.encode(), vec![0xA4, 0x12, 0x04, 0x03, 0x01]);
        assert_eq!(
            DeviceQuery::decode(0x06, &[0; 7]).unwrap(),
            DeviceQuery::Termination
        );
        assert!(DeviceQuery::decode(0x02, &[0, 1, 0]).is_err());
    }

    #[test]
    fn test_e80_init_fixed_payload() {
        assert!(E80Init::decode(0x03, &[0x03, 0x00, 0x00, 0x00]).is_ok());
        assert!(E80Init::decode(0x03, &[0x03, 0x00, 0x01, 0x00]).is_err());
    }
}
