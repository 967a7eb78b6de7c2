//! Observer-only device that sets the system clock from the first valid
//! GPS fix it sees, then ignores all further input.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use marinecodec::message::{GpsFix, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::device::DeviceRuntime;

const IDLE_TICK: Duration = Duration::from_millis(500);

pub async fn run_set_time_device(ctx: Arc<DeviceRuntime>, cancel: CancellationToken) {
    let mut done = false;
    loop {
        ctx.touch();
        let payload = tokio::select! {
            _ = cancel.cancelled() => return,
            popped = tokio::time::timeout(IDLE_TICK, ctx.queue.pop()) => match popped {
                Err(_) => continue,
                Ok(payload) => payload,
            },
        };
        if done {
            // Clock already handled one way or the other; drain silently.
            continue;
        }
        let Message::GpsFix(fix) = &payload.message else {
            debug!("[{}] ignoring {}", ctx.name, payload.message.name());
            continue;
        };
        if !fix.valid {
            continue;
        }
        let Some(utc) = fix_timestamp(fix) else {
            continue;
        };

        match crate::sys::set_system_time(utc) {
            Ok(()) => {
                info!("[{}] system time set to {utc}", ctx.name);
                if let Err(e) = crate::sys::sync_hardware_clock() {
                    warn!("[{}] hardware clock not updated: {e}", ctx.name);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                // Logged once; everything after this is dropped silently.
                error!("[{}] permission denied setting system time", ctx.name);
            }
            Err(e) => {
                error!("[{}] failed to set system time: {e}", ctx.name);
            }
        }
        done = true;
    }
}

/// Combines the fix's date and time fields into a UTC timestamp; a fix
/// without both cannot set the clock.
fn fix_timestamp(fix: &GpsFix) -> Option<chrono::DateTime<Utc>> {
    let date = fix.date?;
    let time = fix.time?;
    let seconds = time.second.trunc() as u32;
    let millis = (time.second.fract() * 1000.0) as u32;
    Utc.with_ymd_and_hms(
        i32::from(date.year),
        u32::from(date.month),
        u32::from(date.day),
        u32::from(time.hour),
        u32::from(time.minute),
        seconds,
    )
    .single()
    .map(|ts| ts + chrono::Duration::milliseconds(i64::from(millis)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use marinecodec::message::{HmsTime, Ymd};

    fn fix(valid: bool, with_date: bool, with_time: bool) -> GpsFix {
        GpsFix {
            valid,
            lat_deg: Some(48.1173),
            lon_deg: Some(11.5167),
            sog_knots: Some(0.0),
            cog_true: None,
            time: with_time.then_some(HmsTime { hour: 12, minute: 35, second: 19.0 }),
            date: with_date.then_some(Ymd { year: 1994, month: 3, day: 23 }),
            variation_deg: None,
        }
    }

    #[test]
    fn test_fix_timestamp_needs_date_and_time() {
        assert!(fix_timestamp(&fix(true, true, true)).is_some());
        assert!(fix_timestamp(&fix(true, false, true)).is_none());
        assert!(fix_timestamp(&fix(true, true, false)).is_none());
    }

    #[test]
    fn test_fix_timestamp_value() {
        let ts = fix_timestamp(&fix(true, true, true)).unwrap();
        assert_eq!(ts.to_rfc3339(), "1994-03-23T12:35:19+00:00");
    }
}
