use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("device {device}: observer {observer:?} is not a configured device")]
    UnknownObserver { device: String, observer: String },
    #[error("device {device}: {reason}")]
    BadDevice { device: String, reason: String },
}

/// One entry of `devices.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSpec {
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    pub device_io: IoSpec,
    #[serde(default)]
    pub observers: Vec<String>,
    /// Writes between explicit flushes; 0 flushes after every write.
    #[serde(default)]
    pub auto_flush: u32,
    /// Seconds a queued message may age before being dropped on dequeue.
    #[serde(default = "default_max_item_age")]
    pub max_item_age: u32,
}

fn default_max_item_age() -> u32 {
    30
}

impl DeviceSpec {
    pub fn max_item_age(&self) -> Duration {
        Duration::from_secs(u64::from(self.max_item_age))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DeviceKind {
    #[serde(rename = "NMEADevice")]
    Nmea,
    #[serde(rename = "SeatalkDevice")]
    Seatalk,
    #[serde(rename = "SetTimeDevice")]
    SetTime,
}

/// The `device_io` object of a device entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum IoSpec {
    TCPServer {
        port: u16,
    },
    TCPClient {
        host: String,
        port: u16,
    },
    File {
        path: PathBuf,
    },
    FileRewriter {
        path: PathBuf,
    },
    Serial {
        port: String,
        #[serde(default = "default_baudrate")]
        baudrate: u32,
    },
    SeatalkSerial {
        port: String,
    },
    StdOutPrinter {},
    /// The null transport, used by observer-only devices.
    IO {},
}

fn default_baudrate() -> u32 {
    4800
}

/// Loads and validates `devices.json`: a JSON object mapping device name to
/// its spec. Observer references must name configured devices.
pub fn load_devices(path: &Path) -> Result<Vec<(String, DeviceSpec)>, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table: HashMap<String, DeviceSpec> =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    // Deterministic device order keeps log output and ids stable.
    let mut devices: Vec<(String, DeviceSpec)> = table.into_iter().collect();
    devices.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, spec) in &devices {
        for observer in &spec.observers {
            if !devices.iter().any(|(other, _)| other == observer) {
                return Err(ConfigError::UnknownObserver {
                    device: name.clone(),
                    observer: observer.clone(),
                });
            }
        }
        if spec.kind == DeviceKind::SetTime && !matches!(spec.device_io, IoSpec::IO {}) {
            return Err(ConfigError::BadDevice {
                device: name.clone(),
                reason: "SetTimeDevice takes the IO (null) transport".into(),
            });
        }
    }
    Ok(devices)
}

/// `config.json`: logger layout and watchdog state. The watchdog reset
/// counter is the one value the program writes back.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(rename = "Logger", default)]
    pub logger: LoggerConfig,
    #[serde(rename = "Watchdog", default)]
    pub watchdog: WatchdogConfig,
    /// Sections this program does not interpret survive the rewrite.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub dir: PathBuf,
    pub max_bytes: u64,
    pub backup_count: u32,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            max_bytes: 5 * 1024 * 1024,
            backup_count: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    #[serde(rename = "Enable")]
    pub enable: bool,
    /// Timeout in seconds; `null` accepts the driver default.
    #[serde(rename = "Timeout")]
    pub timeout: Option<u64>,
    #[serde(rename = "MaxResets")]
    pub max_resets: u32,
    #[serde(rename = "PreviousResets")]
    pub previous_resets: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enable: false,
            timeout: None,
            max_resets: 5,
            previous_resets: 0,
        }
    }
}

impl WatchdogConfig {
    pub fn timeout_or_default(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(16).max(1))
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the settings back, durably: temp file, fsync, atomic rename.
    /// The reset counter must be on disk before the watchdog is armed, or a
    /// reboot during the arm window loses its bootloop guard.
    pub fn persist(&self, path: &Path) -> std::io::Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(contents.as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("seatalk-mux-test-{name}-{}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_devices_resolves_observers() {
        let path = write_temp(
            "devices-ok",
            r#"{
                "gps": {"type": "NMEADevice", "device_io": {"type": "TCPClient", "host": "10.0.0.1", "port": 4001}, "observers": ["console"]},
                "console": {"type": "NMEADevice", "device_io": {"type": "StdOutPrinter"}, "observers": []}
            }"#,
        );
        let devices = load_devices(&path).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[1].0, "gps");
        assert_eq!(devices[1].1.max_item_age(), Duration::from_secs(30));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_devices_rejects_unknown_observer() {
        let path = write_temp(
            "devices-bad",
            r#"{"gps": {"type": "NMEADevice", "device_io": {"type": "StdOutPrinter"}, "observers": ["nope"]}}"#,
        );
        let err = load_devices(&path).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("gps") && text.contains("nope"), "{text}");
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_serial_defaults() {
        let path = write_temp(
            "devices-serial",
            r#"{"st": {"type": "SeatalkDevice", "device_io": {"type": "Serial", "port": "/dev/ttyUSB0"}, "observers": []}}"#,
        );
        let devices = load_devices(&path).unwrap();
        match &devices[0].1.device_io {
            IoSpec::Serial { baudrate, .. } => assert_eq!(*baudrate, 4800),
            other => panic!("unexpected io spec {other:?}"),
        }
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_settings_round_trip_preserves_unknown_sections() {
        let path = write_temp(
            "settings",
            r#"{
                "Logger": {"dir": "logs", "max_bytes": 1024, "backup_count": 3},
                "Watchdog": {"Enable": true, "Timeout": null, "MaxResets": 5, "PreviousResets": 2},
                "Custom": {"keep": "me"}
            }"#,
        );
        let mut settings = Settings::from_file(&path).unwrap();
        assert!(settings.watchdog.enable);
        assert_eq!(settings.watchdog.previous_resets, 2);
        assert_eq!(settings.watchdog.timeout_or_default(), Duration::from_secs(16));

        settings.watchdog.previous_resets += 1;
        settings.persist(&path).unwrap();
        let reread = Settings::from_file(&path).unwrap();
        assert_eq!(reread.watchdog.previous_resets, 3);
        assert!(reread.extra.contains_key("Custom"));
        fs::remove_file(path).ok();
    }
}
