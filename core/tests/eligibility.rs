//! Award caps over local day, week and month windows.

use chrono::{NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use prizegrid_core::{
    clock::LocalCalendar,
    eligibility::{is_eligible, window_containing},
    history::{HistoryLog, HistoryRecord},
    prize::{LimitWindow, Prize, PrizeLimit},
    types::EpochMillis,
};

fn at(cal: &LocalCalendar, y: i32, m: u32, d: u32, hour: i64, minute: i64) -> EpochMillis {
    let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
    cal.midnight(date).unwrap() + (hour * 60 + minute) * 60_000
}

fn capped(id: u32, window: LimitWindow, count: u32) -> Prize {
    Prize {
        id,
        name: format!("prize-{id}"),
        description: String::new(),
        weight: 10.0,
        limit: Some(PrizeLimit { window, count }),
    }
}

fn history_of(records: &[(u32, EpochMillis)]) -> HistoryLog {
    let mut log = HistoryLog::default();
    for &(prize_id, awarded_at) in records {
        log.append(HistoryRecord {
            prize_id,
            name: String::new(),
            redemption_code: None,
            awarded_at,
        });
    }
    log
}

/// Exactly `limitCount` same-day awards close the prize until midnight.
#[test]
fn daily_cap_closes_until_day_rolls_over() {
    let cal = LocalCalendar::fixed(8 * 3600, Weekday::Sun);
    let prize = capped(2, LimitWindow::Daily, 2);
    let history = history_of(&[
        (2, at(&cal, 2026, 10, 18, 9, 0)),
        (2, at(&cal, 2026, 10, 18, 13, 0)),
    ]);

    assert!(!is_eligible(&prize, &history, at(&cal, 2026, 10, 18, 18, 0), &cal));
    assert!(!is_eligible(&prize, &history, at(&cal, 2026, 10, 18, 23, 59), &cal));
    assert!(is_eligible(&prize, &history, at(&cal, 2026, 10, 19, 0, 0), &cal));
}

#[test]
fn daily_cap_ignores_yesterday_and_other_prizes() {
    let cal = LocalCalendar::default();
    let prize = capped(2, LimitWindow::Daily, 2);
    let history = history_of(&[
        (2, at(&cal, 2026, 10, 17, 23, 59)),
        (1, at(&cal, 2026, 10, 18, 8, 0)),
        (3, at(&cal, 2026, 10, 18, 8, 30)),
        (2, at(&cal, 2026, 10, 18, 9, 0)),
    ]);
    assert!(
        is_eligible(&prize, &history, at(&cal, 2026, 10, 18, 12, 0), &cal),
        "Only one of today's records belongs to prize 2"
    );
}

/// 2026-10-18 is a Sunday.
#[test]
fn weekly_cap_resets_on_week_start() {
    let sunday_weeks = LocalCalendar::fixed(8 * 3600, Weekday::Sun);
    let prize = capped(3, LimitWindow::Weekly, 1);
    let history = history_of(&[(3, at(&sunday_weeks, 2026, 10, 18, 10, 0))]);

    assert!(!is_eligible(&prize, &history, at(&sunday_weeks, 2026, 10, 24, 23, 0), &sunday_weeks));
    assert!(is_eligible(&prize, &history, at(&sunday_weeks, 2026, 10, 25, 0, 0), &sunday_weeks));

    // With Monday weeks, Sunday the 18th closes the week of the 12th.
    let monday_weeks = LocalCalendar::fixed(8 * 3600, Weekday::Mon);
    let history = history_of(&[(3, at(&monday_weeks, 2026, 10, 18, 10, 0))]);
    assert!(!is_eligible(&prize, &history, at(&monday_weeks, 2026, 10, 18, 22, 0), &monday_weeks));
    assert!(is_eligible(&prize, &history, at(&monday_weeks, 2026, 10, 19, 0, 0), &monday_weeks));
}

#[test]
fn monthly_cap_spans_calendar_month() {
    let cal = LocalCalendar::default();
    let prize = capped(4, LimitWindow::Monthly, 1);

    let history = history_of(&[(4, at(&cal, 2026, 10, 1, 0, 0))]);
    assert!(!is_eligible(&prize, &history, at(&cal, 2026, 10, 31, 23, 59), &cal));
    assert!(is_eligible(&prize, &history, at(&cal, 2026, 11, 1, 0, 0), &cal));

    let history = history_of(&[(4, at(&cal, 2026, 9, 30, 23, 59))]);
    assert!(is_eligible(&prize, &history, at(&cal, 2026, 10, 1, 0, 1), &cal));
}

#[test]
fn uncapped_prize_is_always_eligible() {
    let cal = LocalCalendar::default();
    let prize = Prize {
        id: 1,
        name: "fallback".into(),
        description: String::new(),
        weight: 78.0,
        limit: None,
    };
    let now = at(&cal, 2026, 10, 18, 12, 0);
    let records: Vec<_> = (0..50).map(|i| (1, now - i * 1_000)).collect();
    assert!(is_eligible(&prize, &history_of(&records), now, &cal));
}

fn utc_ms(y: i32, m: u32, d: u32, h: u32, min: u32) -> EpochMillis {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap().timestamp_millis()
}

/// London's 2026-10-25 lasts 25 hours; the daily window stretches with it.
#[test]
fn daily_cap_follows_daylight_saving_day_length() {
    let london = LocalCalendar::named(Tz::Europe__London, Weekday::Sun);
    let prize = capped(2, LimitWindow::Daily, 1);
    // 00:30 BST on the 25th.
    let history = history_of(&[(2, utc_ms(2026, 10, 24, 23, 30))]);

    // 23:30 GMT on the 25th: same local day, 24h after the award.
    assert!(!is_eligible(&prize, &history, utc_ms(2026, 10, 25, 23, 30), &london));
    assert!(is_eligible(&prize, &history, utc_ms(2026, 10, 26, 0, 0), &london));

    // A fixed UTC offset files the award under the 24th instead.
    let utc = LocalCalendar::fixed(0, Weekday::Sun);
    assert!(is_eligible(&prize, &history, utc_ms(2026, 10, 25, 23, 30), &utc));
}

#[test]
fn windows_span_short_and_long_days() {
    let london = LocalCalendar::named(Tz::Europe__London, Weekday::Sun);

    let spring = window_containing(LimitWindow::Daily, utc_ms(2026, 3, 29, 12, 0), &london).unwrap();
    assert_eq!(spring.start, utc_ms(2026, 3, 29, 0, 0));
    assert_eq!(spring.end, utc_ms(2026, 3, 29, 23, 0));

    let autumn = window_containing(LimitWindow::Daily, utc_ms(2026, 10, 25, 12, 0), &london).unwrap();
    assert_eq!(autumn.start, utc_ms(2026, 10, 24, 23, 0));
    assert_eq!(autumn.end, utc_ms(2026, 10, 26, 0, 0));

    // The week of Sunday 2026-10-25 starts in BST and ends in GMT.
    let week = window_containing(LimitWindow::Weekly, utc_ms(2026, 10, 28, 12, 0), &london).unwrap();
    assert_eq!(week.start, utc_ms(2026, 10, 24, 23, 0));
    assert_eq!(week.end, utc_ms(2026, 11, 1, 0, 0));
}
