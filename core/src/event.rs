//! Everything the draw pipeline reports back to its host.
//!
//! Events accumulate on the engine and are drained by the caller; the
//! runner prints them as JSON lines.

use crate::{
    error::Rejection,
    types::{CellIndex, EpochMillis, PrizeId},
};
use serde::{Deserialize, Serialize};

/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrawEvent {
    // ── Redemption ─────────────────────────────────
    CodeAccepted {
        code: String,
        at:   EpochMillis,
    },
    CodeRejected {
        code:   String,
        reason: Rejection,
        at:     EpochMillis,
    },

    // ── Selection and animation ────────────────────
    PrizeSelected {
        roll:      f64,
        candidate: Option<PrizeId>,
        prize_id:  PrizeId,
        fell_back: bool,
    },
    AnimationStarted {
        target_cell: CellIndex,
        cycles:      u32,
        total_steps: u32,
    },

    // ── Outcome ────────────────────────────────────
    DrawCompleted {
        prize_id:          PrizeId,
        prize_name:        String,
        code:              Option<String>,
        at:                EpochMillis,
        history_persisted: bool,
    },
    DrawAborted {
        reason: String,
    },
    HistoryCleared {
        at: EpochMillis,
    },
}

impl DrawEvent {
    /// Stable snake_case name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CodeAccepted { .. }     => "code_accepted",
            Self::CodeRejected { .. }     => "code_rejected",
            Self::PrizeSelected { .. }    => "prize_selected",
            Self::AnimationStarted { .. } => "animation_started",
            Self::DrawCompleted { .. }    => "draw_completed",
            Self::DrawAborted { .. }      => "draw_aborted",
            Self::HistoryCleared { .. }   => "history_cleared",
        }
    }
}
