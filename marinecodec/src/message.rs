use crate::error::DecodeError;

/// Unit reported with an apparent wind speed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindSpeedUnit {
    Knots,
    MetersPerSecond,
}

/// Display unit for mileage and speed instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MileageUnit {
    NauticalMiles,
    StatuteMiles,
    Kilometers,
}

/// Countdown timer mode (Seatalk 0x59).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    CountUpStart,
    CountDown,
    CountDownStart,
}

/// Equipment advertised in identification datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Equipment {
    CourseComputer400G,
    St60Tridata,
    St60TridataPlus,
    St60Log,
    St80Masterview,
    St80MaxiDisplay,
    SmartControllerRemote,
}

/// Time of day with fractional seconds, as carried by an RMC sentence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HmsTime {
    pub hour: u8,
    pub minute: u8,
    pub second: f64,
}

/// Calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ymd {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

/// The full navigation state decoded from one RMC sentence.
///
/// Kept as one message so the date and time reach observers atomically and a
/// Seatalk observer can expand the fix into its 0x50..0x56 datagram set.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsFix {
    /// RMC status field: A = valid, V = void.
    pub valid: bool,
    pub lat_deg: Option<f64>,
    pub lon_deg: Option<f64>,
    pub sog_knots: Option<f32>,
    pub cog_true: Option<f32>,
    pub time: Option<HmsTime>,
    pub date: Option<Ymd>,
    /// Magnetic variation, east positive.
    pub variation_deg: Option<f32>,
}

/// Apparent wind angle and speed decoded from one MWV sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct ApparentWind {
    pub angle_deg: Option<f32>,
    pub speed: Option<f32>,
    pub speed_unit: WindSpeedUnit,
}

/// Canonical in-memory representation exchanged between devices.
///
/// Closed union over everything either codec can decode. Adding a Seatalk
/// datagram id or an NMEA sentence means adding a variant here.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    DepthBelowTransducer { meters: f32 },
    SpeedThroughWater { knots: f32 },
    WaterTemperature { celsius: f32 },
    ApparentWindAngle { degrees: f32 },
    ApparentWindSpeed { value: f32, unit: WindSpeedUnit },
    ApparentWind(ApparentWind),
    TripMileage { nautical_miles: f32 },
    TotalMileage { nautical_miles: f32 },
    TotalTripLog { total_nm: f32, trip_nm: f32 },
    DisplayUnit(MileageUnit),
    LampIntensity { level: u8 },
    Position { lat_deg: f64, lon_deg: f64 },
    Latitude { degrees: f64 },
    Longitude { degrees: f64 },
    SpeedOverGround { knots: f32 },
    CourseOverGround { degrees_true: f32 },
    GmtTime { hour: u8, minute: u8, second: u8 },
    Date(Ymd),
    SatelliteInfo { count: u8, hdop: u8 },
    /// A key press forwarded on the bus. `device` is the sender nibble,
    /// `track_pad` marks the GPS TRACK keystroke variant (0x55).
    Keystroke { device: u8, code: u8, track_pad: bool },
    SetResponseLevel { level: u8 },
    CancelMob,
    ManOverBoard,
    GpsFix(GpsFix),
    /// Compass variation in whole degrees, west negative.
    MagneticVariation { degrees: i8 },
    WindAlarm { apparent: u8, true_wind: u8 },
    AlarmAcknowledgement { alarm: u8 },
    CountdownTimer { hours: u8, minutes: u8, seconds: u8, mode: TimerMode },
    CodeLock { x: u8, y: u8, z: u8 },
    EquipmentId(Equipment),
    DeviceId { id: u8 },
    RudderGain { gain: u8 },
    CourseComputerSetup { in_setup: bool },
    ApSetup,
    E80Init,
    SelectFathomDisplay,
    /// An NMEA line with no typed parser, preserved verbatim.
    RawNmea { line: String },
}

impl Message {
    /// Short identifier used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Message::DepthBelowTransducer { .. } => "DepthBelowTransducer",
            Message::SpeedThroughWater { .. } => "SpeedThroughWater",
            Message::WaterTemperature { .. } => "WaterTemperature",
            Message::ApparentWindAngle { .. } => "ApparentWindAngle",
            Message::ApparentWindSpeed { .. } => "ApparentWindSpeed",
            Message::ApparentWind(_) => "ApparentWind",
            Message::TripMileage { .. } => "TripMileage",
            Message::TotalMileage { .. } => "TotalMileage",
            Message::TotalTripLog { .. } => "TotalTripLog",
            Message::DisplayUnit(_) => "DisplayUnit",
            Message::LampIntensity { .. } => "LampIntensity",
            Message::Position { .. } => "Position",
            Message::Latitude { .. } => "Latitude",
            Message::Longitude { .. } => "Longitude",
            Message::SpeedOverGround { .. } => "SpeedOverGround",
            Message::CourseOverGround { .. } => "CourseOverGround",
            Message::GmtTime { .. } => "GmtTime",
            Message::Date(_) => "Date",
            Message::SatelliteInfo { .. } => "SatelliteInfo",
            Message::Keystroke { .. } => "Keystroke",
            Message::SetResponseLevel { .. } => "SetResponseLevel",
            Message::CancelMob => "CancelMob",
            Message::ManOverBoard => "ManOverBoard",
            Message::GpsFix(_) => "GpsFix",
            Message::MagneticVariation { .. } => "MagneticVariation",
            Message::WindAlarm { .. } => "WindAlarm",
            Message::AlarmAcknowledgement { .. } => "AlarmAcknowledgement",
            Message::CountdownTimer { .. } => "CountdownTimer",
            Message::CodeLock { .. } => "CodeLock",
            Message::EquipmentId(_) => "EquipmentId",
            Message::DeviceId { .. } => "DeviceId",
            Message::RudderGain { .. } => "RudderGain",
            Message::CourseComputerSetup { .. } => "CourseComputerSetup",
            Message::ApSetup => "ApSetup",
            Message::E80Init => "E80Init",
            Message::SelectFathomDisplay => "SelectFathomDisplay",
            Message::RawNmea { .. } => "RawNmea",
        }
    }

    /// Checks the value domains of the message.
    ///
    /// Angles must lie in [0, 360), latitudes in [-90, 90], longitudes in
    /// [-180, 180), speeds and depths must be non-negative. A message that
    /// fails validation is counted and dropped by the caller, never emitted.
    pub fn validate(&self) -> Result<(), DecodeError> {
        fn angle(what: &str, deg: f32) -> Result<(), DecodeError> {
            if (0.0..360.0).contains(&deg) {
                Ok(())
            } else {
                Err(DecodeError::Validation(format!("{what} {deg} outside [0, 360)")))
            }
        }
        fn non_negative(what: &str, v: f32) -> Result<(), DecodeError> {
            if v >= 0.0 {
                Ok(())
            } else {
                Err(DecodeError::Validation(format!("{what} {v} is negative")))
            }
        }
        fn latitude(deg: f64) -> Result<(), DecodeError> {
            if (-90.0..=90.0).contains(&deg) {
                Ok(())
            } else {
                Err(DecodeError::Validation(format!("latitude {deg} outside [-90, 90]")))
            }
        }
        fn longitude(deg: f64) -> Result<(), DecodeError> {
            if (-180.0..180.0).contains(&deg) {
                Ok(())
            } else {
                Err(DecodeError::Validation(format!("longitude {deg} outside [-180, 180)")))
            }
        }

        match self {
            Message::DepthBelowTransducer { meters } => non_negative("depth", *meters),
            Message::SpeedThroughWater { knots } => non_negative("speed through water", *knots),
            Message::ApparentWindAngle { degrees } => angle("wind angle", *degrees),
            Message::ApparentWindSpeed { value, .. } => non_negative("wind speed", *value),
            Message::ApparentWind(wind) => {
                if let Some(deg) = wind.angle_deg {
                    angle("wind angle", deg)?;
                }
                if let Some(speed) = wind.speed {
                    non_negative("wind speed", speed)?;
                }
                Ok(())
            }
            Message::TripMileage { nautical_miles } => non_negative("trip mileage", *nautical_miles),
            Message::TotalMileage { nautical_miles } => non_negative("total mileage", *nautical_miles),
            Message::TotalTripLog { total_nm, trip_nm } => {
                non_negative("total log", *total_nm)?;
                non_negative("trip log", *trip_nm)
            }
            Message::LampIntensity { level } => {
                if *level <= 3 {
                    Ok(())
                } else {
                    Err(DecodeError::Validation(format!("lamp intensity {level} outside 0..=3")))
                }
            }
            Message::Position { lat_deg, lon_deg } => {
                latitude(*lat_deg)?;
                longitude(*lon_deg)
            }
            Message::Latitude { degrees } => latitude(*degrees),
            Message::Longitude { degrees } => longitude(*degrees),
            Message::SpeedOverGround { knots } => non_negative("speed over ground", *knots),
            Message::CourseOverGround { degrees_true } => angle("course over ground", *degrees_true),
            Message::GmtTime { hour, minute, second } => {
                if *hour < 24 && *minute < 60 && *second < 60 {
                    Ok(())
                } else {
                    Err(DecodeError::Validation(format!(
                        "time {hour:02}:{minute:02}:{second:02} out of range"
                    )))
                }
            }
            Message::Date(Ymd { year: _, month, day }) => {
                if (1..=12).contains(month) && (1..=31).contains(day) {
                    Ok(())
                } else {
                    Err(DecodeError::Validation(format!("date month {month} day {day} out of range")))
                }
            }
            Message::GpsFix(fix) => {
                if let Some(lat) = fix.lat_deg {
                    latitude(lat)?;
                }
                if let Some(lon) = fix.lon_deg {
                    longitude(lon)?;
                }
                if let Some(sog) = fix.sog_knots {
                    non_negative("speed over ground", sog)?;
                }
                if let Some(cog) = fix.cog_true {
                    angle("course over ground", cog)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
