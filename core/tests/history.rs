//! History cap: count-based FIFO eviction.

use prizegrid_core::history::{HistoryLog, HistoryRecord, DEFAULT_HISTORY_LIMIT};

fn record(i: i64) -> HistoryRecord {
    HistoryRecord {
        prize_id: (i % 4 + 1) as u32,
        name: format!("prize-{}", i % 4 + 1),
        redemption_code: Some(format!("code-{i}")),
        awarded_at: 1_000 * i,
    }
}

/// Sixty appends leave exactly the newest fifty, oldest first.
#[test]
fn sixty_appends_keep_newest_fifty() {
    let mut log = HistoryLog::default();
    for i in 0..60 {
        log.append(record(i));
    }

    assert_eq!(log.len(), DEFAULT_HISTORY_LIMIT);
    let stamps: Vec<_> = log.records().iter().map(|r| r.awarded_at / 1_000).collect();
    let expected: Vec<_> = (10..60).collect();
    assert_eq!(stamps, expected, "oldest ten evicted, order preserved, nothing duplicated");
}

#[test]
fn recent_is_newest_first() {
    let mut log = HistoryLog::new(50);
    for i in 0..8 {
        log.append(record(i));
    }
    let recent: Vec<_> = log.recent(5).map(|r| r.awarded_at / 1_000).collect();
    assert_eq!(recent, vec![7, 6, 5, 4, 3]);
}

#[test]
fn records_for_filters_by_prize() {
    let mut log = HistoryLog::new(50);
    for i in 0..12 {
        log.append(record(i));
    }
    let ids: Vec<_> = log.records_for(2).map(|r| r.awarded_at / 1_000).collect();
    assert_eq!(ids, vec![1, 5, 9]);
}

#[test]
fn clear_empties_log() {
    let mut log = HistoryLog::new(3);
    for i in 0..5 {
        log.append(record(i));
    }
    assert_eq!(log.len(), 3);
    log.clear();
    assert!(log.is_empty());
    assert_eq!(log.limit(), 3);
}
