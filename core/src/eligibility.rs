//! Award caps: may a capped prize still be handed out right now?
//!
//! Every window is a half-open span `[start, end)` of local calendar
//! time, cut at local midnight:
//!   - Daily:   today.
//!   - Weekly:  the seven days starting at the most recent occurrence of
//!              the calendar's week-start day (Sunday by default).
//!   - Monthly: the current calendar month, from the 1st.
//!
//! One definition per window, used everywhere. Rolling 7x24h spans are
//! deliberately not supported.

use crate::{
    clock::LocalCalendar,
    history::HistoryLog,
    prize::{LimitWindow, Prize},
    types::{EpochMillis, PrizeId},
};
use chrono::{Datelike, Days, Months, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardWindow {
    pub start: EpochMillis,
    pub end:   EpochMillis,
}

impl AwardWindow {
    pub fn contains(&self, at: EpochMillis) -> bool {
        self.start <= at && at < self.end
    }
}

/// The window of kind `window` that contains `now`.
pub fn window_containing(
    window: LimitWindow,
    now: EpochMillis,
    calendar: &LocalCalendar,
) -> Option<AwardWindow> {
    let today = calendar.local(now)?.date_naive();
    let (first, next): (NaiveDate, NaiveDate) = match window {
        LimitWindow::Daily => (today, today.checked_add_days(Days::new(1))?),
        LimitWindow::Weekly => {
            let back = calendar.days_into_week(today.weekday());
            let start = today.checked_sub_days(Days::new(back))?;
            (start, start.checked_add_days(Days::new(7))?)
        }
        LimitWindow::Monthly => {
            let start = today.with_day(1)?;
            (start, start.checked_add_months(Months::new(1))?)
        }
    };
    Some(AwardWindow {
        start: calendar.midnight(first)?,
        end:   calendar.midnight(next)?,
    })
}

/// How many times `prize_id` was awarded inside `window`.
pub fn awards_in_window(prize_id: PrizeId, history: &HistoryLog, window: &AwardWindow) -> usize {
    history
        .records_for(prize_id)
        .filter(|r| window.contains(r.awarded_at))
        .count()
}

/// Pure function of (prize, history snapshot, now).
pub fn is_eligible(
    prize: &Prize,
    history: &HistoryLog,
    now: EpochMillis,
    calendar: &LocalCalendar,
) -> bool {
    let Some(limit) = prize.limit else {
        return true;
    };

    let Some(window) = window_containing(limit.window, now, calendar) else {
        log::warn!("prize {}: no {:?} window for t={now}; treating as capped", prize.id, limit.window);
        return false;
    };

    let awarded = awards_in_window(prize.id, history, &window);
    let eligible = awarded < limit.count as usize;
    log::debug!(
        "prize {} {:?} window [{}, {}): {awarded}/{} awarded, eligible={eligible}",
        prize.id,
        limit.window,
        window.start,
        window.end,
        limit.count,
    );
    eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc, Weekday};

    fn utc_ms(y: i32, m: u32, d: u32, h: u32) -> EpochMillis {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().timestamp_millis()
    }

    #[test]
    fn daily_window_is_local_midnight_to_midnight() {
        let cal = LocalCalendar::fixed(0, Weekday::Sun);
        let w = window_containing(LimitWindow::Daily, utc_ms(2026, 10, 18, 15), &cal).unwrap();
        assert_eq!(w.start, utc_ms(2026, 10, 18, 0));
        assert_eq!(w.end, utc_ms(2026, 10, 19, 0));
    }

    #[test]
    fn weekly_window_starts_on_configured_day() {
        // 2026-10-21 is a Wednesday.
        let sunday = LocalCalendar::fixed(0, Weekday::Sun);
        let w = window_containing(LimitWindow::Weekly, utc_ms(2026, 10, 21, 9), &sunday).unwrap();
        assert_eq!(w.start, utc_ms(2026, 10, 18, 0));
        assert_eq!(w.end, utc_ms(2026, 10, 25, 0));

        let monday = LocalCalendar::fixed(0, Weekday::Mon);
        let w = window_containing(LimitWindow::Weekly, utc_ms(2026, 10, 21, 9), &monday).unwrap();
        assert_eq!(w.start, utc_ms(2026, 10, 19, 0));
    }

    #[test]
    fn monthly_window_spans_calendar_month() {
        let cal = LocalCalendar::fixed(0, Weekday::Sun);
        let w = window_containing(LimitWindow::Monthly, utc_ms(2026, 12, 31, 23), &cal).unwrap();
        assert_eq!(w.start, utc_ms(2026, 12, 1, 0));
        assert_eq!(w.end, utc_ms(2027, 1, 1, 0));
    }

    #[test]
    fn offset_moves_day_boundary() {
        // 2026-10-18 20:00 UTC is already 2026-10-19 04:00 at +08:00.
        let cal = LocalCalendar::fixed(8 * 3600, Weekday::Sun);
        let w = window_containing(LimitWindow::Daily, utc_ms(2026, 10, 18, 20), &cal).unwrap();
        assert_eq!(w.start, utc_ms(2026, 10, 18, 16));
    }
}
