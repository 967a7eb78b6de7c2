//! Hardware/software watchdog. On Linux the kernel watchdog device is
//! used: any write pets it, a clean close must write the magic `V` first.
//! Elsewhere a software timer falls back to the platform reboot command.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};

use crate::config::WatchdogConfig;

#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("permission denied opening the watchdog device")]
    PermissionDenied,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub enum Watchdog {
    #[cfg(target_os = "linux")]
    Hardware(HardwareWatchdog),
    Software(SoftwareWatchdog),
}

impl Watchdog {
    /// Arms the platform watchdog and returns it with the effective
    /// timeout. The caller persists the bootloop counter *before* calling
    /// this.
    pub fn arm(config: &WatchdogConfig) -> Result<(Self, Duration), WatchdogError> {
        #[cfg(target_os = "linux")]
        {
            match HardwareWatchdog::arm(config) {
                Ok((watchdog, timeout)) => Ok((Watchdog::Hardware(watchdog), timeout)),
                Err(WatchdogError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    info!("no watchdog device, using the software timer");
                    let timeout = config.timeout_or_default();
                    Ok((Watchdog::Software(SoftwareWatchdog::arm(timeout)), timeout))
                }
                Err(e) => Err(e),
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            let timeout = config.timeout_or_default();
            Ok((Watchdog::Software(SoftwareWatchdog::arm(timeout)), timeout))
        }
    }

    pub fn pet(&mut self) {
        match self {
            #[cfg(target_os = "linux")]
            Watchdog::Hardware(hw) => hw.pet(),
            Watchdog::Software(sw) => sw.pet(),
        }
    }

    /// Disarms gracefully so a clean shutdown does not reboot the system.
    pub fn disarm(self) {
        match self {
            #[cfg(target_os = "linux")]
            Watchdog::Hardware(hw) => hw.disarm(),
            Watchdog::Software(sw) => sw.disarm(),
        }
    }
}

#[cfg(target_os = "linux")]
pub struct HardwareWatchdog {
    device: std::fs::File,
}

#[cfg(target_os = "linux")]
impl HardwareWatchdog {
    const DEVICE: &'static str = "/dev/watchdog";

    fn arm(config: &WatchdogConfig) -> Result<(Self, Duration), WatchdogError> {
        use std::os::fd::AsRawFd;

        let device = std::fs::OpenOptions::new()
            .write(true)
            .open(Self::DEVICE)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => WatchdogError::PermissionDenied,
                _ => WatchdogError::Io(e),
            })?;

        let fd = device.as_raw_fd();
        let effective = match config.timeout {
            Some(seconds) => crate::sys::watchdog_dev::set_timeout(fd, seconds as u32)?,
            None => crate::sys::watchdog_dev::get_timeout(fd)?,
        };
        info!("hardware watchdog armed, timeout {effective} s");
        Ok((Self { device }, Duration::from_secs(u64::from(effective))))
    }

    fn pet(&mut self) {
        if let Err(e) = self.device.write_all(b"\0") {
            error!("watchdog pet failed: {e}");
        }
    }

    fn disarm(mut self) {
        info!("disarming hardware watchdog");
        if let Err(e) = self.device.write_all(b"V") {
            error!("watchdog magic close failed: {e}");
        }
    }
}

/// Timer-thread watchdog for platforms without a watchdog device. If the
/// timer reaches zero, the platform reboot command runs.
pub struct SoftwareWatchdog {
    remaining: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    timeout_secs: u64,
}

impl SoftwareWatchdog {
    pub fn arm(timeout: Duration) -> Self {
        let timeout_secs = timeout.as_secs().max(1);
        let remaining = Arc::new(AtomicU64::new(timeout_secs));
        let shutdown = Arc::new(AtomicBool::new(false));
        {
            let remaining = remaining.clone();
            let shutdown = shutdown.clone();
            std::thread::spawn(move || loop {
                std::thread::sleep(Duration::from_secs(1));
                if shutdown.load(Ordering::Relaxed) {
                    return;
                }
                let left = remaining.fetch_sub(1, Ordering::Relaxed);
                if left <= 1 {
                    error!("software watchdog expired, rebooting");
                    reboot();
                    return;
                }
            });
        }
        info!("software watchdog armed, timeout {timeout_secs} s");
        Self { remaining, shutdown, timeout_secs }
    }

    pub fn pet(&mut self) {
        self.remaining.store(self.timeout_secs, Ordering::Relaxed);
    }

    pub fn disarm(self) {
        info!("disarming software watchdog");
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

fn reboot() {
    #[cfg(windows)]
    let result = std::process::Command::new("shutdown").args(["/r", "/t", "0"]).status();
    #[cfg(not(windows))]
    let result = std::process::Command::new("shutdown").args(["-r", "now"]).status();
    if let Err(e) = result {
        error!("reboot command failed: {e}");
    }
}

/// Bootloop guard decision made at startup.
pub enum ArmDecision {
    /// Watchdog disabled in configuration.
    Disabled,
    /// Too many consecutive watchdog resets; run unguarded.
    SuppressedByResetCount,
    Armed(Watchdog, Duration),
}

/// Applies the bootloop guard and arms the watchdog. The incremented reset
/// counter is persisted (fsync + rename) before arming so a reboot during
/// the arm window cannot lose it.
pub fn arm_with_guard(
    settings: &mut crate::config::Settings,
    settings_path: &std::path::Path,
) -> Result<ArmDecision, WatchdogError> {
    if !settings.watchdog.enable {
        return Ok(ArmDecision::Disabled);
    }
    if settings.watchdog.previous_resets >= settings.watchdog.max_resets {
        error!(
            "watchdog not armed: {} resets recorded, limit is {}",
            settings.watchdog.previous_resets, settings.watchdog.max_resets
        );
        return Ok(ArmDecision::SuppressedByResetCount);
    }

    settings.watchdog.previous_resets += 1;
    settings.persist(settings_path)?;

    let (watchdog, timeout) = Watchdog::arm(&settings.watchdog)?;
    Ok(ArmDecision::Armed(watchdog, timeout))
}
