//! Weighted prize draw with fallback on capped prizes.
//!
//! A roll `r` in [0, 100) is compared against the running total of
//! weights in declared table order; the first prize whose total reaches
//! `r` is the candidate. A candidate that is at its cap is NOT redrawn
//! and the walk does NOT continue: the fallback prize is awarded instead.
//! The same happens when rounding leaves `r` above the last threshold.
//!
//! Consequence: once a capped prize saturates, its probability mass is
//! absorbed by the fallback, so observed award rates drift from the
//! configured weights. That is the intended behaviour.

use crate::{
    clock::LocalCalendar,
    eligibility::is_eligible,
    history::HistoryLog,
    prize::{Prize, PrizeTable},
    rng::DrawRng,
    types::{EpochMillis, PrizeId},
};

/// Outcome of one draw.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub prize:     &'a Prize,
    /// Prize the roll landed on, if any.
    pub candidate: Option<PrizeId>,
    pub roll:      f64,
    pub fell_back: bool,
}

/// Resolve a draw for an already-rolled `roll` in [0, 100).
pub fn select_with_roll<'a>(
    table: &'a PrizeTable,
    history: &HistoryLog,
    now: EpochMillis,
    calendar: &LocalCalendar,
    roll: f64,
) -> Selection<'a> {
    let fallback = table.fallback();
    match table.candidate_for_roll(roll) {
        Some(candidate) if is_eligible(candidate, history, now, calendar) => Selection {
            prize:     candidate,
            candidate: Some(candidate.id),
            roll,
            fell_back: false,
        },
        Some(candidate) => {
            log::debug!(
                "roll {roll:.4} hit capped prize {}; awarding fallback {}",
                candidate.id,
                fallback.id
            );
            Selection {
                prize:     fallback,
                candidate: Some(candidate.id),
                roll,
                fell_back: true,
            }
        }
        None => {
            log::debug!("roll {roll:.4} above last threshold; awarding fallback {}", fallback.id);
            Selection {
                prize:     fallback,
                candidate: None,
                roll,
                fell_back: true,
            }
        }
    }
}

/// Draw one prize. Always returns a prize.
pub fn select_prize<'a>(
    table: &'a PrizeTable,
    history: &HistoryLog,
    now: EpochMillis,
    calendar: &LocalCalendar,
    rng: &mut DrawRng,
) -> Selection<'a> {
    let roll = rng.next_f64() * 100.0;
    select_with_roll(table, history, now, calendar, roll)
}
