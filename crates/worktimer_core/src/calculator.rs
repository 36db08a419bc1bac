//! crates/worktimer_core/src/calculator.rs
//!
//! Replays an event log into elapsed and remaining time.
//!
//! The log is the durable source of truth. Wall-clock "now" only fills the
//! still-open tail of a running interval, which is what lets a countdown pick
//! up where it left off after a reload.

use chrono::{DateTime, Utc};

use crate::domain::{Estimate, TimerEvent, TimerEventKind};

/// Total active seconds accumulated across every interval of `log`.
///
/// Never fails. Events that do not fit the open/closed state at that point
/// are skipped: a second `start` overwrites the open marker, a `pause` with
/// nothing open is ignored.
pub fn elapsed_active_seconds(log: &[TimerEvent], now: DateTime<Utc>) -> u64 {
    let mut open_start: Option<DateTime<Utc>> = None;
    let mut total: i64 = 0;

    for event in log {
        match event.kind {
            TimerEventKind::Start | TimerEventKind::Resume => {
                open_start = Some(event.timestamp);
            }
            TimerEventKind::Pause | TimerEventKind::End => {
                if let Some(started) = open_start.take() {
                    total += (event.timestamp - started).num_seconds().max(0);
                }
            }
        }
    }

    if let Some(started) = open_start {
        total += (now - started).num_seconds().max(0);
    }

    u64::try_from(total).unwrap_or(0)
}

/// `max(0, estimate - elapsed)`.
pub fn remaining_seconds(estimate: Estimate, elapsed: u64) -> u64 {
    estimate.total_seconds().saturating_sub(elapsed)
}

/// True when the last interval of the log is still open and nothing ended it.
pub fn is_interval_open(log: &[TimerEvent]) -> bool {
    if log.iter().any(|e| e.kind == TimerEventKind::End) {
        return false;
    }
    log.last().is_some_and(|e| e.kind.opens_interval())
}

/// Renders a second count as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn one_hour() -> Estimate {
        Estimate { hours: 1, minutes: 0 }
    }

    #[test]
    fn empty_log_has_no_elapsed_time() {
        assert_eq!(elapsed_active_seconds(&[], t(500)), 0);
        assert!(!is_interval_open(&[]));
    }

    #[test]
    fn single_open_session_counts_up_to_now() {
        let log = vec![TimerEvent::start(t(0))];
        let elapsed = elapsed_active_seconds(&log, t(1500));

        assert_eq!(elapsed, 1500);
        assert_eq!(remaining_seconds(one_hour(), elapsed), 2100);
        assert!(is_interval_open(&log));
    }

    #[test]
    fn pause_resume_end_sums_active_intervals() {
        let log = vec![
            TimerEvent::start(t(0)),
            TimerEvent::pause(t(600), "Lunch"),
            TimerEvent::resume(t(900)),
            TimerEvent::end(t(1200)),
        ];

        assert_eq!(elapsed_active_seconds(&log, t(1200)), 900);
        assert_eq!(elapsed_active_seconds(&log, t(99_999)), 900);
        assert_eq!(remaining_seconds(one_hour(), 900), 2700);
        assert!(!is_interval_open(&log));
    }

    #[test]
    fn replay_is_idempotent_for_a_fixed_now() {
        let log = vec![
            TimerEvent::start(t(0)),
            TimerEvent::pause(t(100), "Call"),
            TimerEvent::resume(t(400)),
        ];
        let first = elapsed_active_seconds(&log, t(1000));
        let second = elapsed_active_seconds(&log, t(1000));
        assert_eq!(first, second);
        assert_eq!(first, 700);
    }

    #[test]
    fn running_log_is_monotonic_in_now() {
        let log = vec![TimerEvent::start(t(0)), TimerEvent::pause(t(60), "x"), TimerEvent::resume(t(120))];
        let mut previous = 0;
        for now in [120, 121, 500, 3600, 86_400] {
            let elapsed = elapsed_active_seconds(&log, t(now));
            assert!(elapsed >= previous);
            previous = elapsed;
        }
    }

    #[test]
    fn paused_log_does_not_advance() {
        let log = vec![TimerEvent::start(t(0)), TimerEvent::pause(t(300), "Break")];
        assert_eq!(elapsed_active_seconds(&log, t(300)), 300);
        assert_eq!(elapsed_active_seconds(&log, t(5000)), 300);
        assert!(!is_interval_open(&log));
    }

    #[test]
    fn remaining_time_never_goes_negative() {
        let log = vec![TimerEvent::start(t(0))];
        let elapsed = elapsed_active_seconds(&log, t(7200));
        assert_eq!(elapsed, 7200);
        assert_eq!(remaining_seconds(one_hour(), elapsed), 0);
    }

    #[test]
    fn malformed_logs_degrade_without_failing() {
        // Double start: the later start wins.
        let double_start = vec![TimerEvent::start(t(0)), TimerEvent::start(t(100)), TimerEvent::end(t(200))];
        assert_eq!(elapsed_active_seconds(&double_start, t(1000)), 100);

        // Pause with nothing open is ignored.
        let orphan_pause = vec![TimerEvent::pause(t(50), "?"), TimerEvent::start(t(100)), TimerEvent::pause(t(160), "?")];
        assert_eq!(elapsed_active_seconds(&orphan_pause, t(1000)), 60);
    }

    #[test]
    fn backwards_timestamps_are_clamped_to_zero() {
        let log = vec![TimerEvent::start(t(100)), TimerEvent::pause(t(40), "clock skew")];
        assert_eq!(elapsed_active_seconds(&log, t(1000)), 0);

        let future_start = vec![TimerEvent::start(t(500))];
        assert_eq!(elapsed_active_seconds(&future_start, t(100)), 0);
    }

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(2100), "00:35:00");
        assert_eq!(format_hms(3661), "01:01:01");
        assert_eq!(format_hms(100 * 3600), "100:00:00");
    }
}
