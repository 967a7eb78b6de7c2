use crate::error::DecodeError;
use crate::message::Ymd;

use super::check_len;

/// `54 T1 RS HH`: GMT time. HH hours, minutes in the top six bits of RS,
/// seconds spread over the low bits of RS and the T nibble.
#[derive(Debug, Clone, PartialEq)]
pub struct GmtTimeDatagram {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl GmtTimeDatagram {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        let t = check_len("GmtTime", attr, 1)?;
        let rs = data[0];
        let st = (rs & 0x0F) << 4 | t;
        let time = Self {
            hour: data[1],
            minute: (rs & 0xFC) >> 2,
            second: st & 0x3F,
        };
        if time.hour > 23 || time.minute > 59 || time.second > 59 {
            return Err(DecodeError::Validation(format!(
                "GmtTime: {:02}:{:02}:{:02} out of range",
                time.hour, time.minute, time.second
            )));
        }
        Ok(time)
    }

    pub fn encode(&self) -> Vec<u8> {
        let t = self.second & 0x0F;
        let rs = (self.minute << 2) & 0xFC | (self.second >> 4) & 0x03;
        vec![0x54, t << 4 | 0x01, rs, self.hour]
    }
}

/// `56 M1 DD YY`: date: YY years since 2000, M month nibble, DD day.
#[derive(Debug, Clone, PartialEq)]
pub struct DateDatagram {
    pub ymd: Ymd,
}

impl DateDatagram {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        let month = check_len("Date", attr, 1)?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&data[0]) {
            return Err(DecodeError::Validation(format!(
                "Date: month {month} day {} out of range",
                data[0]
            )));
        }
        Ok(Self {
            ymd: Ymd {
                year: 2000 + u16::from(data[1]),
                month,
                day: data[0],
            },
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![
            0x56,
            self.ymd.month << 4 | 0x01,
            self.ymd.day,
            self.ymd.year.saturating_sub(2000).min(255) as u8,
        ]
    }
}

/// `57 S0 DD`: satellite info: S satellites in view, DD the horizontal
/// dilution of position.
#[derive(Debug, Clone, PartialEq)]
pub struct SatInfo {
    pub count: u8,
    pub hdop: u8,
}

impl SatInfo {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        let count = check_len("SatInfo", attr, 0)?;
        Ok(Self { count, hdop: data[0] })
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![0x57, (self.count & 0x0F) << 4, self.hdop]
    }
}
