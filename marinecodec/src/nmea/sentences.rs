//! Typed parsers and builders for the supported sentence identifiers:
//! RMC, VHW, DBT, MTW, MWV. Anything else round-trips as [`Message::RawNmea`]
//! with the original bytes (checksum included) preserved.

use tracing::debug;

use crate::error::DecodeError;
use crate::message::{ApparentWind, GpsFix, HmsTime, Message, WindSpeedUnit, Ymd};
use crate::units;

/// Parses a checksum-verified line into a canonical message.
///
/// `star` is the index of the checksum delimiter. A sentence whose fields
/// cannot be interpreted falls back to raw pass-through, the way unknown
/// identifiers do; domain violations are caught later by
/// [`Message::validate`].
pub(crate) fn parse(line: &str, star: usize) -> Result<Message, DecodeError> {
    if line.starts_with('!') {
        // Encapsulated sentences (AIS et al) are pass-through only.
        return Ok(raw(line));
    }
    if star < 6 {
        return Err(DecodeError::Framing(format!("sentence {line:?} has a truncated address field")));
    }
    let tag = &line[3..6];
    let fields: Vec<&str> = if star > 6 { line[7..star].split(',').collect() } else { Vec::new() };

    let parsed = match tag {
        "RMC" => parse_rmc(&fields),
        "VHW" => parse_vhw(&fields),
        "DBT" => parse_dbt(&fields),
        "MTW" => parse_mtw(&fields),
        "MWV" => parse_mwv(&fields),
        _ => return Ok(raw(line)),
    };

    match parsed {
        Ok(message) => Ok(message),
        Err(e) => {
            // Same policy as unknown identifiers: a typed sentence we cannot
            // interpret is still forwarded verbatim.
            debug!("falling back to raw pass-through for {tag}: {e}");
            Ok(raw(line))
        }
    }
}

fn raw(line: &str) -> Message {
    Message::RawNmea { line: format!("{line}\r\n") }
}

fn field<'a>(fields: &[&'a str], index: usize) -> Option<&'a str> {
    fields.get(index).copied().filter(|f| !f.is_empty())
}

fn num_field<T: std::str::FromStr>(fields: &[&str], index: usize) -> Result<Option<T>, DecodeError> {
    match field(fields, index) {
        None => Ok(None),
        Some(f) => f
            .parse::<T>()
            .map(Some)
            .map_err(|_| DecodeError::Validation(format!("unparseable numeric field {f:?}"))),
    }
}

fn parse_angle_pair(value: &str, deg_digits: usize) -> Result<f64, DecodeError> {
    if value.len() <= deg_digits {
        return Err(DecodeError::Validation(format!("coordinate field {value:?} too short")));
    }
    let degrees: f64 = value[..deg_digits]
        .parse()
        .map_err(|_| DecodeError::Validation(format!("bad degrees in {value:?}")))?;
    let minutes: f64 = value[deg_digits..]
        .parse()
        .map_err(|_| DecodeError::Validation(format!("bad minutes in {value:?}")))?;
    Ok(degrees + minutes / 60.0)
}

fn parse_rmc(fields: &[&str]) -> Result<Message, DecodeError> {
    let time = match field(fields, 0) {
        Some(t) if t.len() >= 6 => Some(HmsTime {
            hour: t[0..2].parse().map_err(|_| bad_time(t))?,
            minute: t[2..4].parse().map_err(|_| bad_time(t))?,
            second: t[4..].parse().map_err(|_| bad_time(t))?,
        }),
        Some(t) => return Err(bad_time(t)),
        None => None,
    };

    let valid = match field(fields, 1) {
        Some("A") => true,
        Some("V") | None => false,
        Some(other) => return Err(DecodeError::Validation(format!("bad RMC status {other:?}"))),
    };

    let lat_deg = match (field(fields, 2), field(fields, 3)) {
        (Some(value), Some(hemi)) => {
            let deg = parse_angle_pair(value, 2)?;
            Some(if hemi == "S" { -deg } else { deg })
        }
        _ => None,
    };
    let lon_deg = match (field(fields, 4), field(fields, 5)) {
        (Some(value), Some(hemi)) => {
            let deg = parse_angle_pair(value, 3)?;
            Some(if hemi == "W" { -deg } else { deg })
        }
        _ => None,
    };

    let sog_knots = num_field(fields, 6)?;
    let cog_true = num_field(fields, 7)?;

    let date = match field(fields, 8) {
        Some(d) if d.len() == 6 => {
            let day: u8 = d[0..2].parse().map_err(|_| bad_date(d))?;
            let month: u8 = d[2..4].parse().map_err(|_| bad_date(d))?;
            let yy: u16 = d[4..6].parse().map_err(|_| bad_date(d))?;
            let year = if yy >= 70 { 1900 + yy } else { 2000 + yy };
            Some(Ymd { year, month, day })
        }
        Some(d) => return Err(bad_date(d)),
        None => None,
    };

    let variation_deg = match (num_field::<f32>(fields, 9)?, field(fields, 10)) {
        (Some(v), Some("W")) => Some(-v),
        (Some(v), _) => Some(v),
        (None, _) => None,
    };

    Ok(Message::GpsFix(GpsFix {
        valid,
        lat_deg,
        lon_deg,
        sog_knots,
        cog_true,
        time,
        date,
        variation_deg,
    }))
}

fn bad_time(t: &str) -> DecodeError {
    DecodeError::Validation(format!("bad RMC time field {t:?}"))
}

fn bad_date(d: &str) -> DecodeError {
    DecodeError::Validation(format!("bad RMC date field {d:?}"))
}

fn parse_vhw(fields: &[&str]) -> Result<Message, DecodeError> {
    // Heading fields (0..=3) carry no canonical meaning here; speed does.
    if let Some(knots) = num_field::<f32>(fields, 4)? {
        return Ok(Message::SpeedThroughWater { knots });
    }
    if let Some(kmh) = num_field::<f32>(fields, 6)? {
        return Ok(Message::SpeedThroughWater { knots: units::kmh_to_knots(kmh) });
    }
    Err(DecodeError::Validation("VHW carries no speed".into()))
}

fn parse_dbt(fields: &[&str]) -> Result<Message, DecodeError> {
    let meters = if let Some(m) = num_field::<f32>(fields, 2)? {
        m
    } else if let Some(feet) = num_field::<f32>(fields, 0)? {
        units::feet_to_meter(feet)
    } else if let Some(fathoms) = num_field::<f32>(fields, 4)? {
        fathoms / units::FATHOMS_PER_METER
    } else {
        return Err(DecodeError::Validation("DBT carries no depth".into()));
    };
    Ok(Message::DepthBelowTransducer { meters })
}

fn parse_mtw(fields: &[&str]) -> Result<Message, DecodeError> {
    match num_field::<f32>(fields, 0)? {
        Some(celsius) => Ok(Message::WaterTemperature { celsius }),
        None => Err(DecodeError::Validation("MTW carries no temperature".into())),
    }
}

fn parse_mwv(fields: &[&str]) -> Result<Message, DecodeError> {
    match field(fields, 1) {
        Some("R") => {}
        // True-wind and void sentences have no apparent-wind meaning.
        _ => return Err(DecodeError::Validation("MWV is not a valid relative-wind sentence".into())),
    }
    if field(fields, 4) != Some("A") {
        return Err(DecodeError::Validation("MWV status is not A".into()));
    }

    let angle_deg = num_field::<f32>(fields, 0)?;
    let (speed, speed_unit) = match (num_field::<f32>(fields, 2)?, field(fields, 3)) {
        (Some(v), Some("N") | None) => (Some(v), WindSpeedUnit::Knots),
        (Some(v), Some("M")) => (Some(v), WindSpeedUnit::MetersPerSecond),
        (Some(v), Some("K")) => (Some(units::kmh_to_knots(v)), WindSpeedUnit::Knots),
        (Some(_), Some(unit)) => {
            return Err(DecodeError::Validation(format!("unknown MWV speed unit {unit:?}")))
        }
        (None, _) => (None, WindSpeedUnit::Knots),
    };
    if angle_deg.is_none() && speed.is_none() {
        return Err(DecodeError::Validation("MWV carries neither angle nor speed".into()));
    }

    Ok(Message::ApparentWind(ApparentWind { angle_deg, speed, speed_unit }))
}

/// Renders a canonical message as a sentence, `None` if the message has no
/// sentence form. Translated sentences use the generic `II` talker.
pub(crate) fn build(message: &Message) -> Option<String> {
    match message {
        Message::DepthBelowTransducer { meters } => {
            let feet = units::meter_to_feet(*meters);
            let fathoms = units::meter_to_fathom(*meters);
            Some(super::frame(&format!("IIDBT,{feet:.1},f,{meters:.1},M,{fathoms:.1},F")))
        }
        Message::WaterTemperature { celsius } => {
            Some(super::frame(&format!("IIMTW,{celsius:.1},C")))
        }
        Message::SpeedThroughWater { knots } => {
            let kmh = units::knots_to_kmh(*knots);
            Some(super::frame(&format!("IIVHW,,T,,M,{knots:.1},N,{kmh:.1},K")))
        }
        Message::ApparentWindAngle { degrees } => {
            Some(super::frame(&format!("IIMWV,{degrees:.1},R,,,A")))
        }
        Message::ApparentWindSpeed { value, unit } => {
            Some(super::frame(&format!("IIMWV,,R,{value:.1},{},A", unit_letter(*unit))))
        }
        Message::ApparentWind(wind) => {
            let angle = wind.angle_deg.map(|a| format!("{a:.1}")).unwrap_or_default();
            let speed = wind.speed.map(|s| format!("{s:.1}")).unwrap_or_default();
            let unit = if wind.speed.is_some() { unit_letter(wind.speed_unit) } else { "" };
            Some(super::frame(&format!("IIMWV,{angle},R,{speed},{unit},A")))
        }
        Message::GpsFix(fix) => Some(build_rmc(fix)),
        Message::RawNmea { line } => {
            let trimmed = line.trim_end_matches(['\r', '\n']);
            Some(format!("{trimmed}\r\n"))
        }
        _ => None,
    }
}

fn unit_letter(unit: WindSpeedUnit) -> &'static str {
    match unit {
        WindSpeedUnit::Knots => "N",
        WindSpeedUnit::MetersPerSecond => "M",
    }
}

fn build_rmc(fix: &GpsFix) -> String {
    let time = fix
        .time
        .map(|t| {
            if t.second.fract().abs() < 1e-9 {
                format!("{:02}{:02}{:02}", t.hour, t.minute, t.second as u8)
            } else {
                format!("{:02}{:02}{:05.2}", t.hour, t.minute, t.second)
            }
        })
        .unwrap_or_default();
    let status = if fix.valid { "A" } else { "V" };

    let (lat, lat_hemi) = match fix.lat_deg {
        Some(deg) => {
            let abs = deg.abs();
            let whole = abs.trunc();
            (
                format!("{:02}{:06.3}", whole as u32, (abs - whole) * 60.0),
                if deg < 0.0 { "S" } else { "N" },
            )
        }
        None => (String::new(), ""),
    };
    let (lon, lon_hemi) = match fix.lon_deg {
        Some(deg) => {
            let abs = deg.abs();
            let whole = abs.trunc();
            (
                format!("{:03}{:06.3}", whole as u32, (abs - whole) * 60.0),
                if deg < 0.0 { "W" } else { "E" },
            )
        }
        None => (String::new(), ""),
    };

    let sog = fix.sog_knots.map(|v| format!("{v:.1}")).unwrap_or_default();
    let cog = fix.cog_true.map(|v| format!("{v:.1}")).unwrap_or_default();
    let date = fix
        .date
        .map(|d| format!("{:02}{:02}{:02}", d.day, d.month, d.year % 100))
        .unwrap_or_default();
    let (var, var_sense) = match fix.variation_deg {
        Some(v) if v < 0.0 => (format!("{:.1}", -v), "W"),
        Some(v) => (format!("{v:.1}"), "E"),
        None => (String::new(), ""),
    };

    super::frame(&format!(
        "IIRMC,{time},{status},{lat},{lat_hemi},{lon},{lon_hemi},{sog},{cog},{date},{var},{var_sense}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::decode_line;
    use approx::assert_abs_diff_eq;

    fn decode(line: &str) -> Message {
        decode_line(line.as_bytes()).unwrap().message
    }

    #[test]
    fn test_rmc_decodes_full_fix() {
        let msg = decode("$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A");
        let Message::GpsFix(fix) = msg else { panic!("expected GpsFix, got {msg:?}") };
        assert!(fix.valid);
        assert_abs_diff_eq!(fix.lat_deg.unwrap(), 48.1173, epsilon = 1e-4);
        assert_abs_diff_eq!(fix.lon_deg.unwrap(), 11.5166666, epsilon = 1e-4);
        assert_abs_diff_eq!(fix.sog_knots.unwrap(), 22.4, epsilon = 1e-4);
        assert_abs_diff_eq!(fix.cog_true.unwrap(), 84.4, epsilon = 1e-4);
        let time = fix.time.unwrap();
        assert_eq!((time.hour, time.minute), (12, 35));
        assert_abs_diff_eq!(time.second, 19.0);
        assert_eq!(fix.date.unwrap(), Ymd { year: 1994, month: 3, day: 23 });
        assert_abs_diff_eq!(fix.variation_deg.unwrap(), -3.1, epsilon = 1e-4);
    }

    #[test]
    fn test_rmc_void_fix_still_decodes() {
        let line = crate::nmea::frame("GPRMC,081836,V,,,,,0.0,,130998,11.3,E");
        let Message::GpsFix(fix) = decode(line.trim_end()) else { panic!() };
        assert!(!fix.valid);
        assert!(fix.lat_deg.is_none());
        assert_eq!(fix.date.unwrap().year, 1998);
    }

    #[test]
    fn test_rmc_round_trip_within_tolerance() {
        let fix = GpsFix {
            valid: true,
            lat_deg: Some(52.5885),
            lon_deg: Some(-2.1276),
            sog_knots: Some(5.4),
            cog_true: Some(144.8),
            time: Some(HmsTime { hour: 14, minute: 48, second: 58.0 }),
            date: Some(Ymd { year: 2010, month: 6, day: 16 }),
            variation_deg: Some(-3.6),
        };
        let line = build(&Message::GpsFix(fix.clone())).unwrap();
        let Message::GpsFix(parsed) = decode(line.trim_end()) else { panic!() };
        assert_eq!(parsed.valid, fix.valid);
        assert_abs_diff_eq!(parsed.lat_deg.unwrap(), fix.lat_deg.unwrap(), epsilon = 1e-4);
        assert_abs_diff_eq!(parsed.lon_deg.unwrap(), fix.lon_deg.unwrap(), epsilon = 1e-4);
        assert_abs_diff_eq!(parsed.variation_deg.unwrap(), fix.variation_deg.unwrap(), epsilon = 1e-4);
        assert_eq!(parsed.date, fix.date);
    }

    #[test]
    fn test_dbt_prefers_meters() {
        let line = crate::nmea::frame("SDDBT,7.8,f,2.4,M,1.3,F");
        let Message::DepthBelowTransducer { meters } = decode(line.trim_end()) else { panic!() };
        assert_abs_diff_eq!(meters, 2.4, epsilon = 1e-4);
    }

    #[test]
    fn test_dbt_falls_back_to_feet() {
        let line = crate::nmea::frame("SDDBT,7.8,f,,M,,F");
        let Message::DepthBelowTransducer { meters } = decode(line.trim_end()) else { panic!() };
        assert_abs_diff_eq!(meters, 2.377, epsilon = 1e-3);
    }

    #[test]
    fn test_dbt_build_matches_expected_fields() {
        let line = build(&Message::DepthBelowTransducer { meters: 3.048 }).unwrap();
        assert_eq!(line, "$IIDBT,10.0,f,3.0,M,1.7,F*25\r\n");
    }

    #[test]
    fn test_mtw_round_trip() {
        let line = build(&Message::WaterTemperature { celsius: 21.5 }).unwrap();
        assert_eq!(line, "$IIMTW,21.5,C*15\r\n");
        let Message::WaterTemperature { celsius } = decode(line.trim_end()) else { panic!() };
        assert_abs_diff_eq!(celsius, 21.5, epsilon = 1e-4);
    }

    #[test]
    fn test_vhw_round_trip() {
        let line = build(&Message::SpeedThroughWater { knots: 8.3 }).unwrap();
        let Message::SpeedThroughWater { knots } = decode(line.trim_end()) else { panic!() };
        assert_abs_diff_eq!(knots, 8.3, epsilon = 1e-4);
    }

    #[test]
    fn test_vhw_kmh_only() {
        let line = crate::nmea::frame("IIVHW,245.1,T,245.1,M,,N,3.7,K");
        let Message::SpeedThroughWater { knots } = decode(line.trim_end()) else { panic!() };
        assert_abs_diff_eq!(knots, 1.9978, epsilon = 1e-3);
    }

    #[test]
    fn test_mwv_decodes_relative_wind() {
        let line = crate::nmea::frame("WIMWV,214.8,R,10.1,N,A");
        let Message::ApparentWind(wind) = decode(line.trim_end()) else { panic!() };
        assert_abs_diff_eq!(wind.angle_deg.unwrap(), 214.8, epsilon = 1e-4);
        assert_abs_diff_eq!(wind.speed.unwrap(), 10.1, epsilon = 1e-4);
        assert_eq!(wind.speed_unit, WindSpeedUnit::Knots);
    }

    #[test]
    fn test_mwv_true_wind_passes_through_raw() {
        let line = crate::nmea::frame("WIMWV,120.0,T,9.6,N,A");
        let msg = decode(line.trim_end());
        assert!(matches!(msg, Message::RawNmea { .. }), "got {msg:?}");
    }

    #[test]
    fn test_unknown_tag_passes_through_verbatim() {
        let line = "$GPGLL,4916.45,N,12311.12,W,225444,A*31";
        let decoded = decode_line(line.as_bytes()).unwrap();
        let Message::RawNmea { line: kept } = decoded.message else { panic!() };
        assert_eq!(kept, format!("{line}\r\n"));
        assert_eq!(build(&Message::RawNmea { line: kept.clone() }).unwrap(), kept);
    }

    #[test]
    fn test_partial_wind_builds_with_empty_fields() {
        let line = build(&Message::ApparentWindAngle { degrees: 45.0 }).unwrap();
        assert!(line.starts_with("$IIMWV,45.0,R,,,A*"));
        let line = build(&Message::ApparentWindSpeed { value: 7.2, unit: WindSpeedUnit::MetersPerSecond }).unwrap();
        assert!(line.starts_with("$IIMWV,,R,7.2,M,A*"));
    }

    #[test]
    fn test_no_sentence_form_for_seatalk_only_semantics() {
        assert!(build(&Message::LampIntensity { level: 2 }).is_none());
        assert!(build(&Message::CancelMob).is_none());
    }
}
