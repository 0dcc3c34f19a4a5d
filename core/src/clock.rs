//! Time sources and the local calendar the widget counts days in.
//!
//! RULE: Nothing in the engine reads the platform clock directly.
//! The current time is always asked of an injected Clock, so tests
//! can pin it and walk it forward without real time passing.

use crate::types::EpochMillis;
use chrono::{
    DateTime, Duration, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone,
    Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

/// Source of "now" in epoch milliseconds.
pub trait Clock: Send {
    fn now_millis(&self) -> EpochMillis;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> EpochMillis {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to. Clones share the same instant,
/// so a test can keep a handle after giving one to the engine.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now: EpochMillis) -> Self {
        Self { now: Arc::new(AtomicI64::new(now)) }
    }

    pub fn set(&self, now: EpochMillis) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> EpochMillis {
        self.now.load(Ordering::SeqCst)
    }
}

/// Where local time comes from.
///
/// Serialized as `{"fixed": <secs east of UTC>}`, `{"named": "<IANA zone>"}`
/// or `"system"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarZone {
    /// Constant offset east of UTC, in seconds. Never observes DST.
    Fixed(i32),
    /// An IANA zone such as `Europe/London`; DST is resolved per instant.
    Named(Tz),
    /// Whatever zone the host reports at the moment of each call.
    System,
}

/// The widget's notion of local time: a zone plus the day a week starts
/// on. Day, week and month windows are all cut at local midnight in this
/// calendar, and redemption code stamps are read as local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCalendar {
    pub zone:       CalendarZone,
    pub week_start: Weekday,
}

impl Default for LocalCalendar {
    fn default() -> Self {
        Self {
            zone:       CalendarZone::Named(Tz::Asia__Shanghai),
            week_start: Weekday::Sun,
        }
    }
}

fn instants_in<Z: TimeZone>(zone: &Z, naive: &NaiveDateTime) -> Vec<EpochMillis> {
    match zone.from_local_datetime(naive) {
        LocalResult::Single(dt) => vec![dt.timestamp_millis()],
        LocalResult::Ambiguous(a, b) => vec![a.timestamp_millis(), b.timestamp_millis()],
        LocalResult::None => Vec::new(),
    }
}

impl LocalCalendar {
    pub fn new(zone: CalendarZone, week_start: Weekday) -> Self {
        Self { zone, week_start }
    }

    pub fn fixed(utc_offset_secs: i32, week_start: Weekday) -> Self {
        Self::new(CalendarZone::Fixed(utc_offset_secs), week_start)
    }

    pub fn named(zone: Tz, week_start: Weekday) -> Self {
        Self::new(CalendarZone::Named(zone), week_start)
    }

    /// Out-of-range offsets collapse to UTC; `WidgetConfig::validate`
    /// rejects them before an engine is built.
    fn fixed_offset(secs: i32) -> FixedOffset {
        FixedOffset::east_opt(secs).unwrap_or_else(|| Utc.fix())
    }

    /// Local date and time at instant `at`, with the offset in force then.
    pub fn local(&self, at: EpochMillis) -> Option<DateTime<FixedOffset>> {
        let utc = Utc.timestamp_millis_opt(at).single()?;
        Some(match self.zone {
            CalendarZone::Fixed(secs) => utc.with_timezone(&Self::fixed_offset(secs)),
            CalendarZone::Named(tz) => utc.with_timezone(&tz).fixed_offset(),
            CalendarZone::System => utc.with_timezone(&Local).fixed_offset(),
        })
    }

    pub fn local_date(&self, at: EpochMillis) -> Option<NaiveDate> {
        self.local(at).map(|dt| dt.date_naive())
    }

    /// Every instant that reads as wall-clock `naive`, earliest first.
    /// Empty inside a spring-forward gap; two entries in a fall-back overlap.
    pub fn instants(&self, naive: &NaiveDateTime) -> Vec<EpochMillis> {
        match self.zone {
            CalendarZone::Fixed(secs) => instants_in(&Self::fixed_offset(secs), naive),
            CalendarZone::Named(tz) => instants_in(&tz, naive),
            CalendarZone::System => instants_in(&Local, naive),
        }
    }

    /// Epoch millis of the first instant of local `date`. Where midnight
    /// falls in a DST gap, the day starts when the clocks resume.
    pub fn midnight(&self, date: NaiveDate) -> Option<EpochMillis> {
        let mut at = date.and_hms_opt(0, 0, 0)?;
        for _ in 0..=24 * 4 {
            if let Some(first) = self.instants(&at).first() {
                return Some(*first);
            }
            at += Duration::minutes(15);
        }
        None
    }

    /// Days elapsed since the most recent week-start day (0..=6).
    pub fn days_into_week(&self, weekday: Weekday) -> u64 {
        let today = weekday.num_days_from_sunday();
        let start = self.week_start.num_days_from_sunday();
        u64::from((today + 7 - start) % 7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_handles_share_time() {
        let clock = ManualClock::new(1_000);
        let handle = clock.clone();
        handle.advance(500);
        assert_eq!(clock.now_millis(), 1_500);
        clock.set(42);
        assert_eq!(handle.now_millis(), 42);
    }

    #[test]
    fn midnight_respects_offset() {
        let cal = LocalCalendar::fixed(8 * 3600, Weekday::Sun);
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        // 2026-10-18 00:00 at +08:00 is 2026-10-17 16:00 UTC.
        let expected = Utc
            .with_ymd_and_hms(2026, 10, 17, 16, 0, 0)
            .unwrap()
            .timestamp_millis();
        assert_eq!(cal.midnight(date), Some(expected));
    }

    #[test]
    fn days_into_week_wraps_at_week_start() {
        let sunday_start = LocalCalendar::fixed(0, Weekday::Sun);
        assert_eq!(sunday_start.days_into_week(Weekday::Sun), 0);
        assert_eq!(sunday_start.days_into_week(Weekday::Sat), 6);

        let monday_start = LocalCalendar::fixed(0, Weekday::Mon);
        assert_eq!(monday_start.days_into_week(Weekday::Sun), 6);
        assert_eq!(monday_start.days_into_week(Weekday::Wed), 2);
    }

    fn utc_ms(y: i32, m: u32, d: u32, h: u32, min: u32) -> EpochMillis {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap().timestamp_millis()
    }

    fn wall(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn named_zone_tracks_daylight_saving() {
        let london = LocalCalendar::named(Tz::Europe__London, Weekday::Sun);
        // Winter: GMT, local == UTC.
        assert_eq!(london.local(utc_ms(2026, 1, 15, 12, 0)).unwrap().format("%H:%M").to_string(), "12:00");
        // Summer: BST, local == UTC + 1h.
        assert_eq!(london.local(utc_ms(2026, 7, 1, 11, 0)).unwrap().format("%H:%M").to_string(), "12:00");

        let summer_day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        assert_eq!(london.midnight(summer_day), Some(utc_ms(2026, 6, 30, 23, 0)));
    }

    #[test]
    fn wall_clock_gaps_and_overlaps() {
        let london = LocalCalendar::named(Tz::Europe__London, Weekday::Sun);
        // 2026-03-29 01:30 never happens in London.
        assert!(london.instants(&wall(2026, 3, 29, 1, 30)).is_empty());
        // 2026-10-25 01:30 happens twice: once in BST, once in GMT.
        assert_eq!(
            london.instants(&wall(2026, 10, 25, 1, 30)),
            vec![utc_ms(2026, 10, 25, 0, 30), utc_ms(2026, 10, 25, 1, 30)]
        );
    }

    #[test]
    fn midnight_in_a_gap_starts_the_day_when_clocks_resume() {
        // Chile springs forward at local midnight: 2026-09-06 00:00 is skipped.
        let santiago = LocalCalendar::named(Tz::America__Santiago, Weekday::Sun);
        let date = NaiveDate::from_ymd_opt(2026, 9, 6).unwrap();
        let start = santiago.midnight(date).unwrap();
        assert_eq!(santiago.local_date(start), Some(date));
        assert_eq!(santiago.local(start).unwrap().format("%H:%M").to_string(), "01:00");
    }

    #[test]
    fn zone_serializes_by_kind() {
        let json = serde_json::to_string(&LocalCalendar::named(Tz::Europe__London, Weekday::Mon)).unwrap();
        assert_eq!(json, r#"{"zone":{"named":"Europe/London"},"week_start":"Mon"}"#);
        let fixed: LocalCalendar = serde_json::from_str(r#"{"zone":{"fixed":3600},"week_start":"Sun"}"#).unwrap();
        assert_eq!(fixed, LocalCalendar::fixed(3600, Weekday::Sun));
        let system: LocalCalendar = serde_json::from_str(r#"{"zone":"system","week_start":"Sun"}"#).unwrap();
        assert_eq!(system.zone, CalendarZone::System);
    }
}
