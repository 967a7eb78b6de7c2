use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

use crate::config::LoggerConfig;

/// Size-rotating log file: when a write would push the file past
/// `max_bytes`, existing files shift to `<name>.1 .. <name>.N` and a fresh
/// file is started. `backup_count` historical files are kept.
#[derive(Clone)]
pub struct RotatingFileWriter {
    inner: Arc<Mutex<RotatingInner>>,
}

struct RotatingInner {
    path: PathBuf,
    file: File,
    size: u64,
    max_bytes: u64,
    backup_count: u32,
}

impl RotatingFileWriter {
    pub fn open(path: PathBuf, max_bytes: u64, backup_count: u32) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            inner: Arc::new(Mutex::new(RotatingInner {
                path,
                file,
                size,
                max_bytes,
                backup_count,
            })),
        })
    }
}

impl RotatingInner {
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        for i in (1..self.backup_count).rev() {
            let from = backup_path(&self.path, i);
            if from.exists() {
                std::fs::rename(&from, backup_path(&self.path, i + 1))?;
            }
        }
        if self.backup_count > 0 {
            std::fs::rename(&self.path, backup_path(&self.path, 1))?;
        } else {
            std::fs::remove_file(&self.path)?;
        }
        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.size = 0;
        Ok(())
    }
}

fn backup_path(path: &Path, index: u32) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        if inner.size > 0 && inner.size + buf.len() as u64 > inner.max_bytes {
            inner.rotate()?;
        }
        let written = inner.file.write(buf)?;
        inner.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().unwrap().file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFileWriter {
    type Writer = RotatingFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Installs the global tracing subscriber: console plus a size-rotated
/// `main_log.log` in the configured directory. File writes go through a
/// non-blocking worker; the returned guard flushes it on drop.
pub fn init_logging(
    config: &LoggerConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    std::fs::create_dir_all(&config.dir)?;
    let main_log = RotatingFileWriter::open(
        config.dir.join("main_log.log"),
        config.max_bytes,
        config.backup_count,
    )?;
    let (file_writer, guard) = tracing_appender::non_blocking(main_log);

    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Per-device raw traffic log: `<logdir>/<DeviceName>_raw.log`, every entry
/// timestamped, rotated on the same size policy as the main log.
pub struct RawLogger {
    writer: Mutex<RotatingFileWriter>,
}

impl RawLogger {
    pub fn open(config: &LoggerConfig, device_name: &str) -> io::Result<Self> {
        let writer = RotatingFileWriter::open(
            config.dir.join(format!("{device_name}_raw.log")),
            config.max_bytes,
            config.backup_count,
        )?;
        Ok(Self { writer: Mutex::new(writer) })
    }

    /// Logs received or transmitted text traffic (NMEA lines).
    pub fn log_text(&self, text: &str) {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let mut writer = self.writer.lock().unwrap();
        let _ = writeln!(writer, "{stamp} {}", text.trim_end_matches(['\r', '\n']));
    }

    /// Logs received or transmitted binary traffic (Seatalk datagrams).
    pub fn log_bytes(&self, bytes: &[u8]) {
        let rendered: Vec<String> = bytes.iter().map(|b| format!("0x{b:02X}")).collect();
        self.log_text(&rendered.join(" "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("seatalk-mux-log-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_rotation_keeps_backups() {
        let path = temp_path("rotate");
        std::fs::remove_file(&path).ok();
        std::fs::remove_file(backup_path(&path, 1)).ok();
        std::fs::remove_file(backup_path(&path, 2)).ok();

        let mut writer = RotatingFileWriter::open(path.clone(), 64, 2).unwrap();
        for _ in 0..10 {
            writer.write_all(&[b'x'; 30]).unwrap();
        }
        writer.flush().unwrap();

        assert!(path.exists());
        assert!(backup_path(&path, 1).exists());
        assert!(std::fs::metadata(&path).unwrap().len() <= 64);
        assert!(!backup_path(&path, 3).exists());

        std::fs::remove_file(&path).ok();
        std::fs::remove_file(backup_path(&path, 1)).ok();
        std::fs::remove_file(backup_path(&path, 2)).ok();
    }

    #[test]
    fn test_raw_logger_writes_hex() {
        let dir = temp_path("rawdir");
        let config = LoggerConfig {
            dir: dir.clone(),
            max_bytes: 4096,
            backup_count: 1,
        };
        let logger = RawLogger::open(&config, "TestDevice").unwrap();
        logger.log_bytes(&[0x00, 0x02, 0x00, 0x64, 0x00]);
        let contents = std::fs::read_to_string(dir.join("TestDevice_raw.log")).unwrap();
        assert!(contents.contains("0x00 0x02 0x00 0x64 0x00"));
        std::fs::remove_dir_all(dir).ok();
    }
}
