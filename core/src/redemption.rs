//! Time-boxed, single-use redemption codes.
//!
//! Shape: 12 decimal digits giving the local issue minute (YYYYMMDDHHmm)
//! followed by 6 uppercase ASCII letters. A code is accepted only on the
//! day it encodes, only within `max_age_ms` after the encoded minute, and
//! only once. The stamp is wall-clock time in the widget's calendar; a
//! stamp that names a minute the clocks skipped is malformed.

use crate::{
    clock::LocalCalendar,
    error::Rejection,
    rng::DrawRng,
    types::EpochMillis,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const CODE_LEN: usize = 18;
const STAMP_LEN: usize = 12;
pub const DEFAULT_MAX_AGE_MS: i64 = 300_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePolicy {
    /// How long after the encoded minute a code stays valid.
    pub max_age_ms: i64,
}

impl Default for CodePolicy {
    fn default() -> Self {
        Self { max_age_ms: DEFAULT_MAX_AGE_MS }
    }
}

/// A well-shaped code with a real calendar timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionCode {
    raw:    String,
    issued: NaiveDateTime,
}

impl RedemptionCode {
    /// Trim surrounding whitespace and upper-case, as typed input arrives.
    pub fn normalize(input: &str) -> String {
        input.trim().to_ascii_uppercase()
    }

    pub fn parse(code: &str) -> Result<Self, Rejection> {
        let bytes = code.as_bytes();
        if bytes.len() != CODE_LEN
            || !bytes[..STAMP_LEN].iter().all(u8::is_ascii_digit)
            || !bytes[STAMP_LEN..].iter().all(u8::is_ascii_uppercase)
        {
            return Err(Rejection::MalformedFormat);
        }

        let field = |from: usize, to: usize| -> u32 {
            bytes[from..to]
                .iter()
                .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
        };
        let issued = NaiveDate::from_ymd_opt(field(0, 4) as i32, field(4, 6), field(6, 8))
            .and_then(|date| date.and_hms_opt(field(8, 10), field(10, 12), 0))
            .ok_or(Rejection::MalformedFormat)?;

        Ok(Self { raw: code.to_string(), issued })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Local minute encoded in the code.
    pub fn issued_local(&self) -> NaiveDateTime {
        self.issued
    }

    /// The instant the code was stamped, as seen from `now`. In a fall-back
    /// overlap the stamp reads twice; the later reading not after `now`
    /// wins. `None` for a stamp inside a spring-forward gap.
    pub fn issued_at(&self, calendar: &LocalCalendar, now: EpochMillis) -> Option<EpochMillis> {
        let instants = calendar.instants(&self.issued);
        instants
            .iter()
            .rev()
            .find(|at| **at <= now)
            .or_else(|| instants.first())
            .copied()
    }

    /// Mint a code for the current local minute. Not a security mechanism.
    pub fn issue(now: EpochMillis, calendar: &LocalCalendar, rng: &mut DrawRng) -> Option<Self> {
        let local = calendar.local(now)?;
        let mut raw = local.format("%Y%m%d%H%M").to_string();
        raw.extend((0..CODE_LEN - STAMP_LEN).map(|_| rng.next_uppercase()));
        Self::parse(&raw).ok()
    }
}

/// Every code ever accepted. Grows without bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsedCodeSet(BTreeSet<String>);

impl UsedCodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn insert(&mut self, code: &str) -> bool {
        self.0.insert(code.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for UsedCodeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Run every check without consuming the code.
pub fn check(
    code: &str,
    used: &UsedCodeSet,
    now: EpochMillis,
    calendar: &LocalCalendar,
    policy: &CodePolicy,
) -> Result<RedemptionCode, Rejection> {
    let parsed = RedemptionCode::parse(code)?;

    if calendar.local_date(now) != Some(parsed.issued.date()) {
        return Err(Rejection::Expired);
    }

    let issued_at = parsed.issued_at(calendar, now).ok_or(Rejection::MalformedFormat)?;
    let age = now - issued_at;
    if age < 0 || age > policy.max_age_ms {
        return Err(Rejection::OutOfWindow);
    }

    if used.contains(parsed.as_str()) {
        return Err(Rejection::AlreadyUsed);
    }

    Ok(parsed)
}

/// Check and, on success, mark the code used. The caller persists `used`.
pub fn validate(
    code: &str,
    used: &mut UsedCodeSet,
    now: EpochMillis,
    calendar: &LocalCalendar,
    policy: &CodePolicy,
) -> Result<RedemptionCode, Rejection> {
    let parsed = check(code, used, now, calendar, policy)?;
    used.insert(parsed.as_str());
    Ok(parsed)
}
