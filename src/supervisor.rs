//! Task supervision. Device tasks are expected to run forever; any
//! termination is an invariant violation. The supervisor also owns the
//! watchdog pet task: the watchdog is only petted while every device task
//! has shown progress within the timeout window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::app_metrics::{MetricsEntry, MetricsLogger};
use crate::config::DeviceKind;
use crate::device::{run_device, DeviceRuntime};
use crate::settime::run_set_time_device;
use crate::watchdog::Watchdog;

const METRICS_INTERVAL: Duration = Duration::from_secs(60);
/// Shutdown must finish within twice the reconnection backoff cap.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(60);

pub struct Supervisor {
    devices: Vec<Arc<DeviceRuntime>>,
    watchdog: Option<Watchdog>,
    /// The liveness window: pet interval is half of it, and a device task
    /// death within it of startup is treated as a config smoke-test
    /// failure.
    timeout: Duration,
}

impl Supervisor {
    pub fn new(devices: Vec<Arc<DeviceRuntime>>, watchdog: Option<Watchdog>, timeout: Duration) -> Self {
        Self { devices, watchdog, timeout }
    }

    /// Runs every task to completion and returns the process exit code.
    pub async fn run(self) -> i32 {
        let cancel = CancellationToken::new();
        let started_at = Instant::now();
        let poisoned = Arc::new(AtomicBool::new(false));
        let watchdog_armed = self.watchdog.is_some();

        let mut tasks: JoinSet<()> = JoinSet::new();
        for device in &self.devices {
            let device = device.clone();
            let cancel = cancel.clone();
            match device.kind {
                DeviceKind::SetTime => {
                    tasks.spawn(run_set_time_device(device, cancel));
                }
                _ => {
                    tasks.spawn(run_device(device, cancel));
                }
            }
        }
        info!("supervising {} device tasks", self.devices.len());

        let pet_handle = tokio::spawn(pet_task(
            self.devices.clone(),
            self.watchdog,
            self.timeout,
            poisoned.clone(),
            cancel.clone(),
        ));

        let entries = self
            .devices
            .iter()
            .map(|d| MetricsEntry {
                name: d.name.clone(),
                metrics: d.metrics.clone(),
                queue: d.queue.clone(),
            })
            .collect();
        let metrics_handle = tokio::spawn(MetricsLogger::new(METRICS_INTERVAL).run(entries));

        let exit_code = loop {
            tokio::select! {
                _ = shutdown_signal() => {
                    info!("shutdown signal received");
                    break 0;
                }
                finished = tasks.join_next() => {
                    let Some(result) = finished else {
                        if poisoned.load(Ordering::Relaxed) {
                            // Every task is gone and pets are withheld;
                            // hold out for the watchdog reset.
                            shutdown_signal().await;
                            break 0;
                        }
                        // No devices configured at all; nothing to supervise.
                        break 0;
                    };
                    if cancel.is_cancelled() {
                        continue;
                    }
                    match result {
                        Ok(()) => error!("a device task terminated"),
                        Err(e) => error!("a device task panicked: {e}"),
                    }
                    if started_at.elapsed() < self.timeout {
                        error!("device task died during the startup window; configuration smoke test failed");
                        break 2;
                    }
                    // Past the smoke window the watchdog handles it: stop
                    // petting and let the system reset.
                    poisoned.store(true, Ordering::Relaxed);
                    if !watchdog_armed {
                        error!("no watchdog armed to recover; exiting");
                        break 2;
                    }
                    warn!("withholding watchdog pets; system reset expected");
                }
            }
        };

        cancel.cancel();
        metrics_handle.abort();
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while tasks.join_next().await.is_some() {}
            let _ = pet_handle.await;
        })
        .await;
        if drained.is_err() {
            warn!("tasks did not finish within {SHUTDOWN_GRACE:?}");
        }
        exit_code
    }
}

/// Pets the watchdog at half the timeout, but only while every device has
/// made progress within the full timeout and no task has died.
async fn pet_task(
    devices: Vec<Arc<DeviceRuntime>>,
    mut watchdog: Option<Watchdog>,
    timeout: Duration,
    poisoned: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(timeout / 2);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Some(watchdog) = watchdog.take() {
                    watchdog.disarm();
                }
                return;
            }
            _ = ticker.tick() => {
                if poisoned.load(Ordering::Relaxed) {
                    continue;
                }
                let limit = timeout.as_millis() as u64;
                match devices.iter().find(|d| d.staleness_ms() > limit) {
                    None => {
                        if let Some(watchdog) = &mut watchdog {
                            watchdog.pet();
                        }
                    }
                    Some(stalled) => {
                        warn!("[{}] no progress for over {timeout:?}; withholding watchdog pet", stalled.name);
                    }
                }
            }
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("cannot install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
