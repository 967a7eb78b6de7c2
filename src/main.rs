use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info, warn};

mod app_metrics;
mod config;
mod device;
mod dispatch;
mod logging;
mod settime;
mod supervisor;
mod sys;
mod transport;
mod watchdog;

use config::Settings;
use device::DeviceRuntime;
use supervisor::Supervisor;
use watchdog::{ArmDecision, WatchdogError};

/// NMEA-0183 / Seatalk-1 multiplexer for maritime instrumentation buses.
#[derive(Parser)]
#[command(name = "seatalk-mux", version)]
struct Cli {
    /// Path to the JSON file describing devices and their observers.
    #[arg(long, default_value = "devices.json")]
    devices: PathBuf,
}

const SETTINGS_PATH: &str = "config.json";

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();

    let settings_path = Path::new(SETTINGS_PATH);
    let mut settings = match Settings::from_file(settings_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Warning: could not load {SETTINGS_PATH}: {e}");
            eprintln!("Using default configuration");
            Settings::default()
        }
    };

    let _log_guard = match logging::init_logging(&settings.logger) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Fatal: cannot initialise logging: {e}");
            return 2;
        }
    };
    info!("seatalk-mux starting");

    let specs = match config::load_devices(&cli.devices) {
        Ok(specs) => specs,
        Err(e) => {
            error!("configuration error: {e}");
            eprintln!("Fatal configuration error: {e}");
            return 1;
        }
    };
    if specs.is_empty() {
        warn!("no devices configured in {}", cli.devices.display());
    }

    // Build every device first, then wire the observer edges by name.
    let epoch = Instant::now();
    let mut runtimes = Vec::with_capacity(specs.len());
    for (name, spec) in &specs {
        match DeviceRuntime::new(name.clone(), spec, &settings.logger, epoch) {
            Ok(runtime) => runtimes.push(runtime),
            Err(e) => {
                error!("cannot set up device {name}: {e}");
                return 2;
            }
        }
    }
    for (index, (_, spec)) in specs.iter().enumerate() {
        let observer_queues: Vec<_> = spec
            .observers
            .iter()
            .map(|observer| {
                runtimes
                    .iter()
                    .find(|r| &r.name == observer)
                    .map(|r| r.queue.clone())
                    // load_devices validated every observer name.
                    .expect("observer resolved during config validation")
            })
            .collect();
        runtimes[index].observers = observer_queues;
    }
    let runtimes: Vec<Arc<DeviceRuntime>> = runtimes.into_iter().map(Arc::new).collect();
    for runtime in &runtimes {
        info!(
            "device {} ({:?}) with {} observer(s)",
            runtime.name,
            runtime.kind,
            runtime.observers.len()
        );
    }

    let decision = match watchdog::arm_with_guard(&mut settings, settings_path) {
        Ok(decision) => decision,
        Err(WatchdogError::PermissionDenied) => {
            error!("watchdog requested in configuration but the device is not accessible");
            return 3;
        }
        Err(e) => {
            error!("watchdog setup failed: {e}");
            return 2;
        }
    };
    let (armed, timeout) = match decision {
        ArmDecision::Armed(watchdog, timeout) => (Some(watchdog), timeout),
        ArmDecision::Disabled | ArmDecision::SuppressedByResetCount => {
            (None, settings.watchdog.timeout_or_default())
        }
    };

    // Single-threaded cooperative scheduling is all the core needs: the
    // codecs are not CPU-bound and sharing happens through owned queues.
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("cannot build async runtime: {e}");
            return 2;
        }
    };

    let exit_code = runtime.block_on(Supervisor::new(runtimes, armed, timeout).run());
    info!("seatalk-mux stopped with exit code {exit_code}");
    exit_code
}
