//! The closed set of Seatalk-1 datagrams and their canonical-message
//! mappings.

use crate::error::DecodeError;
use crate::message::Message;
use crate::units;

#[cfg(feature = "unproven-datagrams")]
use super::datagrams::alarms::{AlarmAck, CountdownTimer, WindAlarm};
#[cfg(feature = "unproven-datagrams")]
use super::datagrams::autopilot::{ApSetup, CourseComputerSetup};
use super::datagrams::autopilot::{SetResponseLevel, SetRudderGain};
use super::datagrams::course::{CompassVariation, CourseOverGround};
use super::datagrams::depth::Depth;
#[cfg(feature = "unproven-datagrams")]
use super::datagrams::display::SelectFathom;
use super::datagrams::display::{DisplayUnits, SetLampIntensity};
#[cfg(feature = "unproven-datagrams")]
use super::datagrams::equipment::{CodeLock, DeviceQuery, E80Init};
use super::datagrams::equipment::{DeviceId, EquipmentId1, EquipmentId2};
use super::datagrams::keystroke::Keystroke;
use super::datagrams::mileage::{TotalMileage, TotalTripLog, TripMileage};
use super::datagrams::mob::{CancelMob, ManOverBoard};
use super::datagrams::position::{LatitudePosition, LongitudePosition, PositionDatagram};
use super::datagrams::speed::{SpeedOverGround, SpeedThroughWater, SpeedThroughWater2};
use super::datagrams::temperature::{WaterTemperature1, WaterTemperature2};
use super::datagrams::time_date::{DateDatagram, GmtTimeDatagram, SatInfo};
use super::datagrams::wind::{WindAngle, WindSpeed};

/// One decoded Seatalk-1 datagram. Closed enum: a new command id means a
/// new variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Datagram {
    Depth(Depth),                                 // 0x00
    EquipmentId1(EquipmentId1),                   // 0x01
    ApparentWindAngle(WindAngle),                 // 0x10
    ApparentWindSpeed(WindSpeed),                 // 0x11
    SpeedThroughWater(SpeedThroughWater),         // 0x20
    TripMileage(TripMileage),                     // 0x21
    TotalMileage(TotalMileage),                   // 0x22
    WaterTemperature1(WaterTemperature1),         // 0x23
    DisplayUnits(DisplayUnits),                   // 0x24
    TotalTripLog(TotalTripLog),                   // 0x25
    SpeedThroughWater2(SpeedThroughWater2),       // 0x26
    WaterTemperature2(WaterTemperature2),         // 0x27
    SetLampIntensity1(SetLampIntensity),          // 0x30
    CancelMob(CancelMob),                         // 0x36
    #[cfg(feature = "unproven-datagrams")]
    CodeLock(CodeLock),                           // 0x38
    Latitude(LatitudePosition),                   // 0x50
    Longitude(LongitudePosition),                 // 0x51
    SpeedOverGround(SpeedOverGround),             // 0x52
    CourseOverGround(CourseOverGround),           // 0x53
    GmtTime(GmtTimeDatagram),                     // 0x54
    Keystroke1(Keystroke),                        // 0x55
    Date(DateDatagram),                           // 0x56
    SatInfo(SatInfo),                             // 0x57
    Position(PositionDatagram),                   // 0x58
    #[cfg(feature = "unproven-datagrams")]
    CountdownTimer(CountdownTimer),               // 0x59
    #[cfg(feature = "unproven-datagrams")]
    E80Init(E80Init),                             // 0x61
    #[cfg(feature = "unproven-datagrams")]
    SelectFathom(SelectFathom),                   // 0x65
    #[cfg(feature = "unproven-datagrams")]
    WindAlarm(WindAlarm),                         // 0x66
    #[cfg(feature = "unproven-datagrams")]
    AlarmAck(AlarmAck),                           // 0x68
    EquipmentId2(EquipmentId2),                   // 0x6C
    ManOverBoard(ManOverBoard),                   // 0x6E
    SetLampIntensity2(SetLampIntensity),          // 0x80
    #[cfg(feature = "unproven-datagrams")]
    CourseComputerSetup(CourseComputerSetup),     // 0x81
    Keystroke2(Keystroke),                        // 0x86
    SetResponseLevel(SetResponseLevel),           // 0x87
    DeviceId(DeviceId),                           // 0x90
    SetRudderGain(SetRudderGain),                 // 0x91
    #[cfg(feature = "unproven-datagrams")]
    ApSetup(ApSetup),                             // 0x93
    CompassVariation(CompassVariation),           // 0x99
    #[cfg(feature = "unproven-datagrams")]
    DeviceQuery(DeviceQuery),                     // 0xA4
}

impl Datagram {
    /// Decodes one complete datagram (command byte, attribute byte, data).
    pub fn decode(bytes: &[u8]) -> Result<Datagram, DecodeError> {
        if bytes.len() < 3 {
            return Err(DecodeError::Framing(format!(
                "datagram of {} bytes is shorter than the 3-byte minimum",
                bytes.len()
            )));
        }
        let (cmd, attr, data) = (bytes[0], bytes[1], &bytes[2..]);
        let declared = 1 + (attr & 0x0F) as usize;
        if data.len() != declared {
            return Err(DecodeError::Framing(format!(
                "datagram 0x{cmd:02X} declares {declared} data bytes but carries {}",
                data.len()
            )));
        }

        match cmd {
            0x00 => Depth::decode(attr, data).map(Datagram::Depth),
            0x01 => EquipmentId1::decode(attr, data).map(Datagram::EquipmentId1),
            0x10 => WindAngle::decode(attr, data).map(Datagram::ApparentWindAngle),
            0x11 => WindSpeed::decode(attr, data).map(Datagram::ApparentWindSpeed),
            0x20 => SpeedThroughWater::decode(attr, data).map(Datagram::SpeedThroughWater),
            0x21 => TripMileage::decode(attr, data).map(Datagram::TripMileage),
            0x22 => TotalMileage::decode(attr, data).map(Datagram::TotalMileage),
            0x23 => WaterTemperature1::decode(attr, data).map(Datagram::WaterTemperature1),
            0x24 => DisplayUnits::decode(attr, data).map(Datagram::DisplayUnits),
            0x25 => TotalTripLog::decode(attr, data).map(Datagram::TotalTripLog),
            0x26 => SpeedThroughWater2::decode(attr, data).map(Datagram::SpeedThroughWater2),
            0x27 => WaterTemperature2::decode(attr, data).map(Datagram::WaterTemperature2),
            0x30 => SetLampIntensity::decode(attr, data).map(Datagram::SetLampIntensity1),
            0x36 => CancelMob::decode(attr, data).map(Datagram::CancelMob),
            #[cfg(feature = "unproven-datagrams")]
            0x38 => CodeLock::decode(attr, data).map(Datagram::CodeLock),
            0x50 => LatitudePosition::decode(attr, data).map(Datagram::Latitude),
            0x51 => LongitudePosition::decode(attr, data).map(Datagram::Longitude),
            0x52 => SpeedOverGround::decode(attr, data).map(Datagram::SpeedOverGround),
            0x53 => CourseOverGround::decode(attr, data).map(Datagram::CourseOverGround),
            0x54 => GmtTimeDatagram::decode(attr, data).map(Datagram::GmtTime),
            0x55 => Keystroke::decode(attr, data).map(Datagram::Keystroke1),
            0x56 => DateDatagram::decode(attr, data).map(Datagram::Date),
            0x57 => SatInfo::decode(attr, data).map(Datagram::SatInfo),
            0x58 => PositionDatagram::decode(attr, data).map(Datagram::Position),
            #[cfg(feature = "unproven-datagrams")]
            0x59 => CountdownTimer::decode(attr, data).map(Datagram::CountdownTimer),
            #[cfg(feature = "unproven-datagrams")]
            0x61 => E80Init::decode(attr, data).map(Datagram::E80Init),
            #[cfg(feature = "unproven-datagrams")]
            0x65 => SelectFathom::decode(attr, data).map(Datagram::SelectFathom),
            #[cfg(feature = "unproven-datagrams")]
            0x66 => WindAlarm::decode(attr, data).map(Datagram::WindAlarm),
            #[cfg(feature = "unproven-datagrams")]
            0x68 => AlarmAck::decode(attr, data).map(Datagram::AlarmAck),
            0x6C => EquipmentId2::decode(attr, data).map(Datagram::EquipmentId2),
            0x6E => ManOverBoard::decode(attr, data).map(Datagram::ManOverBoard),
            0x80 => SetLampIntensity::decode(attr, data).map(Datagram::SetLampIntensity2),
            #[cfg(feature = "unproven-datagrams")]
            0x81 => CourseComputerSetup::decode(attr, data).map(Datagram::CourseComputerSetup),
            0x86 => Keystroke::decode(attr, data).map(Datagram::Keystroke2),
            0x87 => SetResponseLevel::decode(attr, data).map(Datagram::SetResponseLevel),
            0x90 => DeviceId::decode(attr, data).map(Datagram::DeviceId),
            0x91 => SetRudderGain::decode(attr, data).map(Datagram::SetRudderGain),
            #[cfg(feature = "unproven-datagrams")]
            0x93 => ApSetup::decode(attr, data).map(Datagram::ApSetup),
            0x99 => CompassVariation::decode(attr, data).map(Datagram::CompassVariation),
            #[cfg(feature = "unproven-datagrams")]
            0xA4 => DeviceQuery::decode(attr, data).map(Datagram::DeviceQuery),
            other => Err(DecodeError::UnknownDatagramId(other)),
        }
    }

    /// Serialises the datagram back to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Datagram::Depth(d) => d.encode(),
            Datagram::EquipmentId1(d) => d.encode(),
            Datagram::ApparentWindAngle(d) => d.encode(),
            Datagram::ApparentWindSpeed(d) => d.encode(),
            Datagram::SpeedThroughWater(d) => d.encode(),
            Datagram::TripMileage(d) => d.encode(),
            Datagram::TotalMileage(d) => d.encode(),
            Datagram::WaterTemperature1(d) => d.encode(),
            Datagram::DisplayUnits(d) => d.encode(),
            Datagram::TotalTripLog(d) => d.encode(),
            Datagram::SpeedThroughWater2(d) => d.encode(),
            Datagram::WaterTemperature2(d) => d.encode(),
            Datagram::SetLampIntensity1(d) => d.encode(0x30),
            Datagram::CancelMob(d) => d.encode(),
            #[cfg(feature = "unproven-datagrams")]
            Datagram::CodeLock(d) => d.encode(),
            Datagram::Latitude(d) => d.encode(),
            Datagram::Longitude(d) => d.encode(),
            Datagram::SpeedOverGround(d) => d.encode(),
            Datagram::CourseOverGround(d) => d.encode(),
            Datagram::GmtTime(d) => d.encode(),
            Datagram::Keystroke1(d) => d.encode(0x55),
            Datagram::Date(d) => d.encode(),
            Datagram::SatInfo(d) => d.encode(),
            Datagram::Position(d) => d.encode(),
            #[cfg(feature = "unproven-datagrams")]
            Datagram::CountdownTimer(d) => d.encode(),
            #[cfg(feature = "unproven-datagrams")]
            Datagram::E80Init(d) => d.encode(),
            #[cfg(feature = "unproven-datagrams")]
            Datagram::SelectFathom(d) => d.encode(),
            #[cfg(feature = "unproven-datagrams")]
            Datagram::WindAlarm(d) => d.encode(),
            #[cfg(feature = "unproven-datagrams")]
            Datagram::AlarmAck(d) => d.encode(),
            Datagram::EquipmentId2(d) => d.encode(),
            Datagram::ManOverBoard(d) => d.encode(),
            Datagram::SetLampIntensity2(d) => d.encode(0x80),
            #[cfg(feature = "unproven-datagrams")]
            Datagram::CourseComputerSetup(d) => d.encode(),
            Datagram::Keystroke2(d) => d.encode(0x86),
            Datagram::SetResponseLevel(d) => d.encode(),
            Datagram::DeviceId(d) => d.encode(),
            Datagram::SetRudderGain(d) => d.encode(),
            #[cfg(feature = "unproven-datagrams")]
            Datagram::ApSetup(d) => d.encode(),
            Datagram::CompassVariation(d) => d.encode(),
            #[cfg(feature = "unproven-datagrams")]
            Datagram::DeviceQuery(d) => d.encode(),
        }
    }

    /// Maps the datagram onto the canonical message it carries, `None` for
    /// pure bus-management datagrams that are not routed.
    pub fn to_message(&self) -> Option<Message> {
        Some(match self {
            Datagram::Depth(d) => Message::DepthBelowTransducer {
                meters: units::feet_to_meter(d.feet),
            },
            Datagram::EquipmentId1(d) => Message::EquipmentId(d.equipment),
            Datagram::ApparentWindAngle(d) => Message::ApparentWindAngle { degrees: d.degrees },
            Datagram::ApparentWindSpeed(d) => Message::ApparentWindSpeed {
                value: d.value,
                unit: d.unit,
            },
            Datagram::SpeedThroughWater(d) => Message::SpeedThroughWater { knots: d.knots },
            Datagram::TripMileage(d) => Message::TripMileage { nautical_miles: d.nautical_miles },
            Datagram::TotalMileage(d) => Message::TotalMileage { nautical_miles: d.nautical_miles },
            Datagram::WaterTemperature1(d) => Message::WaterTemperature { celsius: d.celsius as f32 },
            Datagram::DisplayUnits(d) => Message::DisplayUnit(d.unit),
            Datagram::TotalTripLog(d) => Message::TotalTripLog {
                total_nm: d.total_nm,
                trip_nm: d.trip_nm,
            },
            Datagram::SpeedThroughWater2(d) => Message::SpeedThroughWater { knots: d.knots },
            Datagram::WaterTemperature2(d) => Message::WaterTemperature { celsius: d.celsius },
            Datagram::SetLampIntensity1(d) | Datagram::SetLampIntensity2(d) => {
                Message::LampIntensity { level: d.level }
            }
            Datagram::CancelMob(_) => Message::CancelMob,
            #[cfg(feature = "unproven-datagrams")]
            Datagram::CodeLock(d) => Message::CodeLock { x: d.x, y: d.y, z: d.z },
            Datagram::Latitude(d) => Message::Latitude { degrees: d.signed_degrees() },
            Datagram::Longitude(d) => Message::Longitude { degrees: d.signed_degrees() },
            Datagram::SpeedOverGround(d) => Message::SpeedOverGround { knots: d.knots },
            Datagram::CourseOverGround(d) => Message::CourseOverGround { degrees_true: d.degrees },
            Datagram::GmtTime(d) => Message::GmtTime {
                hour: d.hour,
                minute: d.minute,
                second: d.second,
            },
            Datagram::Keystroke1(d) => Message::Keystroke {
                device: d.device,
                code: d.code,
                track_pad: true,
            },
            Datagram::Date(d) => Message::Date(d.ymd),
            Datagram::SatInfo(d) => Message::SatelliteInfo { count: d.count, hdop: d.hdop },
            Datagram::Position(d) => Message::Position {
                lat_deg: d.lat_signed(),
                lon_deg: d.lon_signed(),
            },
            #[cfg(feature = "unproven-datagrams")]
            Datagram::CountdownTimer(d) => Message::CountdownTimer {
                hours: d.hours,
                minutes: d.minutes,
                seconds: d.seconds,
                mode: d.mode,
            },
            #[cfg(feature = "unproven-datagrams")]
            Datagram::E80Init(_) => Message::E80Init,
            #[cfg(feature = "unproven-datagrams")]
            Datagram::SelectFathom(_) => Message::SelectFathomDisplay,
            #[cfg(feature = "unproven-datagrams")]
            Datagram::WindAlarm(d) => Message::WindAlarm {
                apparent: d.apparent,
                true_wind: d.true_wind,
            },
            #[cfg(feature = "unproven-datagrams")]
            Datagram::AlarmAck(d) => Message::AlarmAcknowledgement { alarm: d.alarm },
            Datagram::EquipmentId2(d) => Message::EquipmentId(d.equipment),
            Datagram::ManOverBoard(_) => Message::ManOverBoard,
            #[cfg(feature = "unproven-datagrams")]
            Datagram::CourseComputerSetup(d) => Message::CourseComputerSetup { in_setup: d.in_setup },
            Datagram::Keystroke2(d) => Message::Keystroke {
                device: d.device,
                code: d.code,
                track_pad: false,
            },
            Datagram::SetResponseLevel(d) => Message::SetResponseLevel { level: d.level },
            Datagram::DeviceId(d) => Message::DeviceId { id: d.id },
            Datagram::SetRudderGain(d) => Message::RudderGain { gain: d.gain },
            #[cfg(feature = "unproven-datagrams")]
            Datagram::ApSetup(_) => Message::ApSetup,
            Datagram::CompassVariation(d) => Message::MagneticVariation { degrees: d.degrees },
            #[cfg(feature = "unproven-datagrams")]
            Datagram::DeviceQuery(_) => return None,
        })
    }

    /// Renders a canonical message as the datagrams a Seatalk writer should
    /// put on the bus. Most messages map to exactly one datagram; a GPS fix
    /// expands into the position/time set a Seatalk GPS emits, and NMEA-only
    /// content maps to none.
    pub fn from_message(message: &Message) -> Vec<Datagram> {
        match message {
            Message::DepthBelowTransducer { meters } => {
                vec![Datagram::Depth(Depth::from_meters(*meters))]
            }
            Message::SpeedThroughWater { knots } => {
                vec![Datagram::SpeedThroughWater(SpeedThroughWater { knots: *knots })]
            }
            Message::WaterTemperature { celsius } => vec![Datagram::WaterTemperature1(
                WaterTemperature1::from_celsius(*celsius),
            )],
            Message::ApparentWindAngle { degrees } => {
                vec![Datagram::ApparentWindAngle(WindAngle { degrees: *degrees })]
            }
            Message::ApparentWindSpeed { value, unit } => {
                vec![Datagram::ApparentWindSpeed(WindSpeed { value: *value, unit: *unit })]
            }
            Message::ApparentWind(wind) => {
                let mut out = Vec::new();
                if let Some(degrees) = wind.angle_deg {
                    out.push(Datagram::ApparentWindAngle(WindAngle { degrees }));
                }
                if let Some(value) = wind.speed {
                    out.push(Datagram::ApparentWindSpeed(WindSpeed {
                        value,
                        unit: wind.speed_unit,
                    }));
                }
                out
            }
            Message::TripMileage { nautical_miles } => {
                vec![Datagram::TripMileage(TripMileage { nautical_miles: *nautical_miles })]
            }
            Message::TotalMileage { nautical_miles } => {
                vec![Datagram::TotalMileage(TotalMileage { nautical_miles: *nautical_miles })]
            }
            Message::TotalTripLog { total_nm, trip_nm } => vec![Datagram::TotalTripLog(
                TotalTripLog { total_nm: *total_nm, trip_nm: *trip_nm },
            )],
            Message::DisplayUnit(unit) => vec![Datagram::DisplayUnits(DisplayUnits { unit: *unit })],
            Message::LampIntensity { level } => {
                vec![Datagram::SetLampIntensity1(SetLampIntensity { level: *level })]
            }
            Message::Latitude { degrees } => {
                vec![Datagram::Latitude(LatitudePosition::from_degrees(*degrees))]
            }
            Message::Longitude { degrees } => {
                vec![Datagram::Longitude(LongitudePosition::from_degrees(*degrees))]
            }
            Message::Position { lat_deg, lon_deg } => vec![Datagram::Position(
                PositionDatagram::from_degrees(*lat_deg, *lon_deg),
            )],
            Message::SpeedOverGround { knots } => {
                vec![Datagram::SpeedOverGround(SpeedOverGround { knots: *knots })]
            }
            Message::CourseOverGround { degrees_true } => vec![Datagram::CourseOverGround(
                CourseOverGround { degrees: *degrees_true },
            )],
            Message::GmtTime { hour, minute, second } => vec![Datagram::GmtTime(GmtTimeDatagram {
                hour: *hour,
                minute: *minute,
                second: *second,
            })],
            Message::Date(ymd) => vec![Datagram::Date(DateDatagram { ymd: *ymd })],
            Message::SatelliteInfo { count, hdop } => {
                vec![Datagram::SatInfo(SatInfo { count: *count, hdop: *hdop })]
            }
            Message::Keystroke { device, code, track_pad } => {
                let key = Keystroke { device: *device, code: *code };
                if *track_pad {
                    vec![Datagram::Keystroke1(key)]
                } else {
                    vec![Datagram::Keystroke2(key)]
                }
            }
            Message::SetResponseLevel { level } => {
                vec![Datagram::SetResponseLevel(SetResponseLevel { level: *level })]
            }
            Message::CancelMob => vec![Datagram::CancelMob(CancelMob)],
            Message::ManOverBoard => vec![Datagram::ManOverBoard(ManOverBoard)],
            Message::GpsFix(fix) => {
                // A void fix carries no trustworthy data for the bus.
                if !fix.valid {
                    return Vec::new();
                }
                let mut out = Vec::new();
                if let Some(lat) = fix.lat_deg {
                    out.push(Datagram::Latitude(LatitudePosition::from_degrees(lat)));
                }
                if let Some(lon) = fix.lon_deg {
                    out.push(Datagram::Longitude(LongitudePosition::from_degrees(lon)));
                }
                if let Some(knots) = fix.sog_knots {
                    out.push(Datagram::SpeedOverGround(SpeedOverGround { knots }));
                }
                if let Some(degrees) = fix.cog_true {
                    out.push(Datagram::CourseOverGround(CourseOverGround { degrees }));
                }
                if let Some(time) = fix.time {
                    out.push(Datagram::GmtTime(GmtTimeDatagram {
                        hour: time.hour,
                        minute: time.minute,
                        second: time.second as u8,
                    }));
                }
                if let Some(ymd) = fix.date {
                    out.push(Datagram::Date(DateDatagram { ymd }));
                }
                out
            }
            Message::MagneticVariation { degrees } => {
                vec![Datagram::CompassVariation(CompassVariation { degrees: *degrees })]
            }
            #[cfg(feature = "unproven-datagrams")]
            Message::WindAlarm { apparent, true_wind } => vec![Datagram::WindAlarm(WindAlarm {
                apparent: *apparent,
                true_wind: *true_wind,
            })],
            #[cfg(feature = "unproven-datagrams")]
            Message::AlarmAcknowledgement { alarm } => {
                vec![Datagram::AlarmAck(AlarmAck { alarm: *alarm })]
            }
            #[cfg(feature = "unproven-datagrams")]
            Message::CountdownTimer { hours, minutes, seconds, mode } => {
                vec![Datagram::CountdownTimer(CountdownTimer {
                    hours: *hours,
                    minutes: *minutes,
                    seconds: *seconds,
                    mode: *mode,
                })]
            }
            #[cfg(feature = "unproven-datagrams")]
            Message::CodeLock { x, y, z } => {
                vec![Datagram::CodeLock(CodeLock { x: *x, y: *y, z: *z })]
            }
            Message::EquipmentId(equipment) => {
                vec![Datagram::EquipmentId1(EquipmentId1 { equipment: *equipment })]
            }
            Message::DeviceId { id } => vec![Datagram::DeviceId(DeviceId { id: *id })],
            Message::RudderGain { gain } => {
                vec![Datagram::SetRudderGain(SetRudderGain { gain: *gain })]
            }
            #[cfg(feature = "unproven-datagrams")]
            Message::CourseComputerSetup { in_setup } => vec![Datagram::CourseComputerSetup(
                CourseComputerSetup { in_setup: *in_setup },
            )],
            #[cfg(feature = "unproven-datagrams")]
            Message::ApSetup => vec![Datagram::ApSetup(ApSetup)],
            #[cfg(feature = "unproven-datagrams")]
            Message::E80Init => vec![Datagram::E80Init(E80Init)],
            #[cfg(feature = "unproven-datagrams")]
            Message::SelectFathomDisplay => vec![Datagram::SelectFathom(SelectFathom)],
            // NMEA-only content and datagrams compiled out stay off the bus.
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_truncated_input() {
        assert!(matches!(
            Datagram::decode(&[0x00, 0x02]),
            Err(DecodeError::Framing(_))
        ));
        assert!(matches!(
            Datagram::decode(&[0x00, 0x02, 0x00, 0x64]),
            Err(DecodeError::Framing(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_id() {
        assert_eq!(
            Datagram::decode(&[0xF0, 0x00, 0x00]),
            Err(DecodeError::UnknownDatagramId(0xF0))
        );
    }

    #[test]
    fn test_every_id_round_trips_bitwise() {
        // One representative wire image per datagram id; encode(decode(x))
        // must reproduce x exactly, and the length nibble must always be
        // total length minus three.
        let mut vectors: Vec<Vec<u8>> = vec![
            vec![0x00, 0x02, 0x00, 0x64, 0x00],
            vec![0x01, 0x05, 0x04, 0xBA, 0x20, 0x28, 0x01, 0x00],
            vec![0x10, 0x01, 0x00, 0x5A],
            vec![0x11, 0x01, 0x12, 0x04],
            vec![0x20, 0x01, 0x53, 0x00],
            vec![0x21, 0x02, 0x39, 0x30, 0x00],
            vec![0x22, 0x02, 0xE8, 0x03, 0x00],
            vec![0x23, 0x01, 0x0B, 0x00],
            vec![0x24, 0x02, 0x00, 0x00, 0x86],
            vec![0x25, 0x14, 0x3C, 0x05, 0x10, 0x27, 0x01],
            vec![0x26, 0x04, 0x07, 0x02, 0x00, 0x00, 0x00],
            vec![0x27, 0x01, 0xA8, 0x04],
            vec![0x30, 0x00, 0x0C],
            vec![0x36, 0x00, 0x01],
            vec![0x50, 0x02, 0x30, 0xCF, 0x12],
            vec![0x51, 0x02, 0x0B, 0x1C, 0x8C],
            vec![0x52, 0x01, 0x7B, 0x00],
            vec![0x53, 0x30, 0x2A],
            vec![0x54, 0xB1, 0xEF, 0x17],
            vec![0x55, 0x11, 0x07, 0xF8],
            vec![0x56, 0x31, 0x17, 0x1A],
            vec![0x57, 0x70, 0x12],
            vec![0x58, 0x25, 0x30, 0x1B, 0x82, 0x0B, 0x1E, 0xD6],
            vec![0x6C, 0x05, 0x05, 0x70, 0x99, 0x10, 0x28, 0x2D],
            vec![0x6E, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
            vec![0x80, 0x00, 0x04],
            vec![0x86, 0x21, 0x02, 0xFD],
            vec![0x87, 0x00, 0x02],
            vec![0x90, 0x00, 0xA3],
            vec![0x91, 0x00, 0x05],
            vec![0x99, 0x00, 0xFD],
        ];
        #[cfg(feature = "unproven-datagrams")]
        vectors.extend([
            vec![0x38, 0x71, 0x2B, 0xD4],
            vec![0x59, 0x22, 0x3B, 0x3B, 0x49],
            vec![0x61, 0x03, 0x03, 0x00, 0x00, 0x00],
            vec![0x65, 0x00, 0x02],
            vec![0x66, 0x00, 0x81],
            vec![0x68, 0x41, 0x01, 0x00],
            vec![0x81, 0x01, 0x00, 0x00],
            vec![0x81, 0x00, 0x00],
            vec![0x93, 0x00, 0x00],
            vec![0xA4, 0x02, 0x00, 0x00, 0x00],
            vec![0xA4, 0x12, 0x04, 0x03, 0x01],
            vec![0xA4, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        ]);

        for wire in vectors {
            let datagram = Datagram::decode(&wire)
                .unwrap_or_else(|e| panic!("decode of {wire:02X?} failed: {e}"));
            let encoded = datagram.to_bytes();
            assert_eq!(encoded, wire, "round trip of {wire:02X?} changed the bytes");
            assert_eq!(
                encoded[1] & 0x0F,
                (encoded.len() - 3) as u8,
                "length nibble of {wire:02X?} is not total-3"
            );
        }
    }

    #[test]
    fn test_depth_to_nmea_scenario() {
        // 0x0064 = 100 tenths of a foot = 10 ft = 3.048 m.
        let datagram = Datagram::decode(&[0x00, 0x02, 0x00, 0x64, 0x00]).unwrap();
        let Some(Message::DepthBelowTransducer { meters }) = datagram.to_message() else {
            panic!()
        };
        assert!((meters - 3.048).abs() < 1e-3);
        let line = crate::nmea::encode(&Message::DepthBelowTransducer { meters }).unwrap();
        assert_eq!(line, "$IIDBT,10.0,f,3.0,M,1.7,F*25\r\n");
    }

    #[test]
    fn test_mtw_to_seatalk_scenario() {
        // 21.5 C encodes as an offset of 11 whole degrees above 10 C.
        let datagrams = Datagram::from_message(&Message::WaterTemperature { celsius: 21.5 });
        assert_eq!(datagrams.len(), 1);
        assert_eq!(datagrams[0].to_bytes(), vec![0x23, 0x01, 0x0B, 0x00]);
    }

    #[test]
    fn test_gps_fix_expands_to_position_set() {
        let fix = crate::message::GpsFix {
            valid: true,
            lat_deg: Some(48.1173),
            lon_deg: Some(11.5167),
            sog_knots: Some(22.4),
            cog_true: Some(84.4),
            time: Some(crate::message::HmsTime { hour: 12, minute: 35, second: 19.0 }),
            date: Some(crate::message::Ymd { year: 1994, month: 3, day: 23 }),
            variation_deg: Some(-3.1),
        };
        let datagrams = Datagram::from_message(&Message::GpsFix(fix.clone()));
        let ids: Vec<u8> = datagrams.iter().map(|d| d.to_bytes()[0]).collect();
        assert_eq!(ids, vec![0x50, 0x51, 0x52, 0x53, 0x54, 0x56]);

        let void = crate::message::GpsFix { valid: false, ..fix };
        assert!(Datagram::from_message(&Message::GpsFix(void)).is_empty());
    }

    #[test]
    fn test_nmea_only_messages_stay_off_the_bus() {
        assert!(Datagram::from_message(&Message::RawNmea { line: "$GPGLL*00\r\n".into() }).is_empty());
    }
}
