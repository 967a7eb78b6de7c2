//! A device binds one transport, one codec family and a set of observers.
//! Its task runs the reader and writer loops as two concurrently polled
//! futures; transport failure on either side tears the connection down and
//! re-opens it with exponential backoff.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use marinecodec::nmea::LineReader;
use marinecodec::seatalk::{Datagram, HeuristicFramer, ParityFramer};
use marinecodec::{nmea, DecodeError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app_metrics::DeviceMetrics;
use crate::config::{DeviceKind, DeviceSpec, IoSpec, LoggerConfig};
use crate::dispatch::{Payload, TimedQueue};
use crate::logging::RawLogger;
use crate::transport::{self, Backoff, TransportError, TransportReader, TransportWriter};

/// Poll granularity for idle reads and queue waits; bounds how stale the
/// liveness heartbeat can get on a silent bus.
const IDLE_TICK: Duration = Duration::from_millis(500);

pub struct DeviceRuntime {
    pub name: String,
    pub kind: DeviceKind,
    pub io: IoSpec,
    pub auto_flush: u32,
    pub queue: Arc<TimedQueue>,
    pub observers: Vec<Arc<TimedQueue>>,
    pub metrics: Arc<DeviceMetrics>,
    pub raw_log: RawLogger,
    last_alive: AtomicU64,
    epoch: Instant,
}

impl DeviceRuntime {
    pub fn new(
        name: String,
        spec: &DeviceSpec,
        log_config: &LoggerConfig,
        epoch: Instant,
    ) -> std::io::Result<Self> {
        Ok(Self {
            raw_log: RawLogger::open(log_config, &name)?,
            name,
            kind: spec.kind,
            io: spec.device_io.clone(),
            auto_flush: spec.auto_flush,
            queue: TimedQueue::new(TimedQueue::DEFAULT_CAPACITY, spec.max_item_age()),
            observers: Vec::new(),
            metrics: DeviceMetrics::new(),
            last_alive: AtomicU64::new(0),
            epoch,
        })
    }

    /// Marks this device as making progress; read by the watchdog pet task.
    pub fn touch(&self) {
        self.last_alive
            .store(self.epoch.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    /// Milliseconds since the device last made progress.
    pub fn staleness_ms(&self) -> u64 {
        (self.epoch.elapsed().as_millis() as u64).saturating_sub(self.last_alive.load(Ordering::Relaxed))
    }
}

enum Codec {
    Nmea(LineReader),
    SeatalkParity(ParityFramer),
    SeatalkHeuristic(HeuristicFramer),
}

impl Codec {
    fn for_device(kind: DeviceKind, io: &IoSpec) -> Self {
        match (kind, io) {
            (DeviceKind::Seatalk, IoSpec::SeatalkSerial { .. }) => {
                Codec::SeatalkParity(ParityFramer::new())
            }
            (DeviceKind::Seatalk, _) => Codec::SeatalkHeuristic(HeuristicFramer::new()),
            _ => Codec::Nmea(LineReader::new()),
        }
    }
}

/// Runs a device until cancellation. Never returns early: every transport
/// error funnels into the reconnection loop.
pub async fn run_device(ctx: Arc<DeviceRuntime>, cancel: CancellationToken) {
    let mut backoff = Backoff::new();
    loop {
        ctx.touch();
        if cancel.is_cancelled() {
            return;
        }
        let opened = tokio::select! {
            _ = cancel.cancelled() => return,
            opened = transport::open(&ctx.io, &cancel) => opened,
        };
        match opened {
            Ok(pair) => {
                backoff.reset();
                info!("[{}] transport open", ctx.name);
                let mut reader = pair.reader;
                let mut writer = pair.writer;
                let mut codec = Codec::for_device(ctx.kind, &ctx.io);
                tokio::select! {
                    _ = cancel.cancelled() => {
                        // Dropping the halves closes the transport.
                        return;
                    }
                    err = read_loop(&ctx, &mut reader, &mut codec) => {
                        warn!("[{}] read side failed: {err}", ctx.name);
                    }
                    err = write_loop(&ctx, &mut writer) => {
                        warn!("[{}] write side failed: {err}", ctx.name);
                    }
                }
            }
            Err(TransportError::PermissionDenied(what)) => {
                warn!("[{}] permission denied opening {what}; retrying", ctx.name);
            }
            Err(e) => {
                warn!("[{}] transport open failed: {e}", ctx.name);
            }
        }
        ctx.metrics.reconnects.fetch_add(1, Ordering::Relaxed);
        let delay = backoff.next_delay();
        info!("[{}] reconnecting in {delay:?}", ctx.name);
        if !heartbeat_sleep(&ctx, &cancel, delay).await {
            return;
        }
    }
}

/// Sleeps in short slices so the liveness heartbeat stays fresh during a
/// long backoff. Returns false when cancelled.
async fn heartbeat_sleep(ctx: &DeviceRuntime, cancel: &CancellationToken, total: Duration) -> bool {
    let mut remaining = total;
    while remaining > Duration::ZERO {
        let slice = remaining.min(Duration::from_secs(1));
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(slice) => {}
        }
        ctx.touch();
        remaining -= slice;
    }
    true
}

async fn read_loop(
    ctx: &DeviceRuntime,
    reader: &mut TransportReader,
    codec: &mut Codec,
) -> TransportError {
    loop {
        ctx.touch();
        let chunk = match tokio::time::timeout(IDLE_TICK, reader.read()).await {
            // Idle bus; the timeout only refreshes the heartbeat.
            Err(_) => continue,
            Ok(Err(e)) => return e,
            Ok(Ok(chunk)) => chunk,
        };
        if chunk.bytes.is_empty() {
            continue;
        }
        match codec {
            Codec::Nmea(line_reader) => {
                for result in line_reader.push_bytes(&chunk.bytes) {
                    match result {
                        Ok(decoded) => {
                            ctx.raw_log.log_text(&decoded.line);
                            let payload = Payload::with_raw(decoded.message, &decoded.line);
                            dispatch(ctx, payload);
                        }
                        Err(e) => note_decode_error(ctx, e),
                    }
                }
            }
            Codec::SeatalkParity(framer) => {
                let fallback_marks = vec![false; chunk.bytes.len()];
                let marks = chunk.marks.as_deref().unwrap_or(&fallback_marks);
                let results = framer.push_bytes(&chunk.bytes, marks);
                handle_datagrams(ctx, results);
            }
            Codec::SeatalkHeuristic(framer) => {
                let results = framer.push_bytes(&chunk.bytes);
                handle_datagrams(ctx, results);
            }
        }
    }
}

fn handle_datagrams(ctx: &DeviceRuntime, results: Vec<Result<Datagram, DecodeError>>) {
    for result in results {
        match result {
            Ok(datagram) => {
                ctx.raw_log.log_bytes(&datagram.to_bytes());
                match datagram.to_message() {
                    Some(message) => dispatch(ctx, Payload::new(message)),
                    None => debug!("[{}] bus-management datagram, not routed", ctx.name),
                }
            }
            Err(e) => note_decode_error(ctx, e),
        }
    }
}

/// Validates a decoded message and clones it into every observer queue.
fn dispatch(ctx: &DeviceRuntime, payload: Payload) {
    if let Err(e) = payload.message.validate() {
        note_decode_error(ctx, e);
        return;
    }
    ctx.metrics.decoded.fetch_add(1, Ordering::Relaxed);
    debug!("[{}] decoded {}", ctx.name, payload.message.name());
    for queue in &ctx.observers {
        queue.push(payload.clone());
    }
}

fn note_decode_error(ctx: &DeviceRuntime, e: DecodeError) {
    ctx.metrics.count_decode_error(e.kind());
    info!("[{}] {e}", ctx.name);
}

async fn write_loop(ctx: &DeviceRuntime, writer: &mut TransportWriter) -> TransportError {
    let mut since_flush = 0u32;
    let mut parity_warned = false;
    loop {
        ctx.touch();
        let payload = match tokio::time::timeout(IDLE_TICK, ctx.queue.pop()).await {
            Err(_) => continue,
            Ok(payload) => payload,
        };

        let units = match render(ctx, &payload) {
            Some(units) => units,
            None => {
                ctx.metrics.untranslatable.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "[{}] no {} rendering for {}",
                    ctx.name,
                    family_name(ctx.kind),
                    payload.message.name()
                );
                continue;
            }
        };

        for (bytes, marks) in units {
            if marks.is_some() && !writer.supports_parity() && !parity_warned {
                warn!(
                    "[{}] transport cannot set per-byte parity; writing datagrams without the mark bit",
                    ctx.name
                );
                parity_warned = true;
            }
            let marks = if writer.supports_parity() { marks.as_deref() } else { None };
            if let Err(e) = writer.write(&bytes, marks).await {
                return e;
            }
            match ctx.kind {
                DeviceKind::Seatalk => ctx.raw_log.log_bytes(&bytes),
                _ => ctx.raw_log.log_text(&String::from_utf8_lossy(&bytes)),
            }
            ctx.metrics.emitted.fetch_add(1, Ordering::Relaxed);
            since_flush += 1;
            if ctx.auto_flush == 0 || since_flush >= ctx.auto_flush {
                if let Err(e) = writer.flush().await {
                    return e;
                }
                since_flush = 0;
            }
        }
    }
}

/// Renders a canonical message in this device's codec family. One message
/// can become several wire units (a GPS fix on the Seatalk side).
fn render(ctx: &DeviceRuntime, payload: &Payload) -> Option<Vec<(Vec<u8>, Option<Vec<bool>>)>> {
    match ctx.kind {
        DeviceKind::Nmea => {
            if let Some(raw) = &payload.raw_nmea {
                // Same-family pass-through keeps the original bytes.
                return Some(vec![(raw.as_bytes().to_vec(), None)]);
            }
            nmea::encode(&payload.message).map(|line| vec![(line.into_bytes(), None)])
        }
        DeviceKind::Seatalk => {
            let datagrams = Datagram::from_message(&payload.message);
            if datagrams.is_empty() {
                return None;
            }
            Some(
                datagrams
                    .iter()
                    .map(|datagram| {
                        let bytes = datagram.to_bytes();
                        let mut marks = vec![false; bytes.len()];
                        marks[0] = true;
                        (bytes, Some(marks))
                    })
                    .collect(),
            )
        }
        // The set-time device never writes to a transport.
        DeviceKind::SetTime => None,
    }
}

fn family_name(kind: DeviceKind) -> &'static str {
    match kind {
        DeviceKind::Nmea => "NMEA",
        DeviceKind::Seatalk => "Seatalk",
        DeviceKind::SetTime => "set-time",
    }
}
