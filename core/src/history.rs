//! Append-only, capped record of past draws.
//!
//! Records are kept oldest-first; every append evicts from the front
//! until at most `limit` remain. Eviction is by count, never by age.

use crate::types::{EpochMillis, PrizeId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// One awarded prize. The serialized field names match the array the
/// widget already keeps in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "id")]
    pub prize_id:        PrizeId,
    /// Prize name at award time, for display.
    #[serde(default)]
    pub name:            String,
    #[serde(rename = "card", default)]
    pub redemption_code: Option<String>,
    #[serde(rename = "timestamp")]
    pub awarded_at:      EpochMillis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLog {
    records: Vec<HistoryRecord>,
    limit:   usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryLog {
    pub fn new(limit: usize) -> Self {
        Self { records: Vec::new(), limit }
    }

    /// Adopt previously stored records, keeping only the newest `limit`.
    pub fn from_records(records: Vec<HistoryRecord>, limit: usize) -> Self {
        let mut log = Self { records, limit };
        log.evict();
        log
    }

    pub fn append(&mut self, record: HistoryRecord) {
        self.records.push(record);
        self.evict();
    }

    fn evict(&mut self) {
        if self.records.len() > self.limit {
            let excess = self.records.len() - self.limit;
            self.records.drain(..excess);
        }
    }

    pub fn records_for(&self, prize_id: PrizeId) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter().filter(move |r| r.prize_id == prize_id)
    }

    /// The newest `n` records, newest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter().rev().take(n)
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_shape_round_trips_legacy_fields() {
        let json = r#"[{"card":"202610181200ABCDEF","name":"Trial Voucher","id":1,"timestamp":1760760000000}]"#;
        let records: Vec<HistoryRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].prize_id, 1);
        assert_eq!(records[0].redemption_code.as_deref(), Some("202610181200ABCDEF"));

        let back = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(back["id"], 1);
        assert_eq!(back["timestamp"], 1_760_760_000_000i64);
    }

    #[test]
    fn adopting_oversized_history_keeps_newest() {
        let records = (0..10)
            .map(|i| HistoryRecord {
                prize_id: 1,
                name: String::new(),
                redemption_code: None,
                awarded_at: i,
            })
            .collect();
        let log = HistoryLog::from_records(records, 4);
        let kept: Vec<_> = log.records().iter().map(|r| r.awarded_at).collect();
        assert_eq!(kept, vec![6, 7, 8, 9]);
    }
}
