//! The prize catalogue: weighted entries plus per-prize award caps.
//!
//! The table is immutable once built. Declaration order is significant:
//! the selector walks prizes in exactly this order when accumulating
//! weights, so it must never be sorted.

use crate::{
    error::{DrawError, DrawResult},
    types::PrizeId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Calendar window an award cap is counted over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitWindow {
    Daily,
    Weekly,
    Monthly,
}

/// At most `count` awards of a prize per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeLimit {
    pub window: LimitWindow,
    pub count:  u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prize {
    pub id:          PrizeId,
    pub name:        String,
    pub description: String,
    /// Percentage points; the table's weights sum to about 100.
    pub weight:      f64,
    /// `None` means the prize is never capped.
    #[serde(default)]
    pub limit:       Option<PrizeLimit>,
}

impl Prize {
    pub fn is_capped(&self) -> bool {
        self.limit.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PrizeTableFile {
    prizes:      Vec<Prize>,
    fallback_id: Option<PrizeId>,
}

/// Ordered prize catalogue with a designated fallback entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PrizeTableFile", into = "PrizeTableRepr")]
pub struct PrizeTable {
    prizes:         Vec<Prize>,
    fallback_index: usize,
}

#[derive(Serialize)]
struct PrizeTableRepr {
    prizes:      Vec<Prize>,
    fallback_id: PrizeId,
}

impl From<PrizeTable> for PrizeTableRepr {
    fn from(table: PrizeTable) -> Self {
        let fallback_id = table.fallback().id;
        Self { prizes: table.prizes, fallback_id }
    }
}

impl TryFrom<PrizeTableFile> for PrizeTable {
    type Error = DrawError;

    fn try_from(file: PrizeTableFile) -> DrawResult<Self> {
        let fallback_id = match file.fallback_id {
            Some(id) => id,
            None => file
                .prizes
                .first()
                .map(|p| p.id)
                .ok_or_else(|| DrawError::InvalidConfig("prize table is empty".into()))?,
        };
        PrizeTable::new(file.prizes, fallback_id)
    }
}

impl PrizeTable {
    /// Build a table. The fallback is conventionally the first,
    /// highest-probability, uncapped entry.
    pub fn new(prizes: Vec<Prize>, fallback_id: PrizeId) -> DrawResult<Self> {
        if prizes.is_empty() {
            return Err(DrawError::InvalidConfig("prize table is empty".into()));
        }

        let mut seen = HashSet::new();
        for prize in &prizes {
            if !seen.insert(prize.id) {
                return Err(DrawError::InvalidConfig(format!(
                    "duplicate prize id {}",
                    prize.id
                )));
            }
            if !prize.weight.is_finite() || prize.weight <= 0.0 {
                return Err(DrawError::InvalidConfig(format!(
                    "prize {} has non-positive weight {}",
                    prize.id, prize.weight
                )));
            }
            if let Some(limit) = prize.limit {
                if limit.count == 0 {
                    return Err(DrawError::InvalidConfig(format!(
                        "prize {} has a zero award limit",
                        prize.id
                    )));
                }
            }
        }

        let fallback_index = prizes
            .iter()
            .position(|p| p.id == fallback_id)
            .ok_or_else(|| {
                DrawError::InvalidConfig(format!("fallback prize {fallback_id} not in table"))
            })?;

        let table = Self { prizes, fallback_index };

        if table.fallback().is_capped() {
            log::warn!(
                "fallback prize {} is capped; it will still be awarded past its cap",
                fallback_id
            );
        }
        let total = table.total_weight();
        if (total - 100.0).abs() > 0.5 {
            log::warn!("prize weights sum to {total:.3}, expected about 100");
        }

        Ok(table)
    }

    /// The shipped catalogue: one uncapped fallback plus three capped
    /// prizes of decreasing weight.
    pub fn builtin() -> Self {
        let prize = |id, name: &str, description: &str, weight, limit| Prize {
            id,
            name: name.to_string(),
            description: description.to_string(),
            weight,
            limit,
        };
        Self {
            prizes: vec![
                prize(1, "Trial Voucher", "One free hour at the tables", 78.0, None),
                prize(
                    2,
                    "Coaching Session",
                    "One hour of one-to-one coaching with the manager",
                    18.0,
                    Some(PrizeLimit { window: LimitWindow::Daily, count: 2 }),
                ),
                prize(
                    3,
                    "Weekly Membership",
                    "Membership for one week",
                    3.9,
                    Some(PrizeLimit { window: LimitWindow::Weekly, count: 1 }),
                ),
                prize(
                    4,
                    "Custom Cue",
                    "A made-to-order cue",
                    0.1,
                    Some(PrizeLimit { window: LimitWindow::Monthly, count: 1 }),
                ),
            ],
            fallback_index: 0,
        }
    }

    pub fn prizes(&self) -> &[Prize] {
        &self.prizes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prize> {
        self.prizes.iter()
    }

    pub fn len(&self) -> usize {
        self.prizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prizes.is_empty()
    }

    pub fn get(&self, id: PrizeId) -> Option<&Prize> {
        self.prizes.iter().find(|p| p.id == id)
    }

    pub fn fallback(&self) -> &Prize {
        &self.prizes[self.fallback_index]
    }

    pub fn total_weight(&self) -> f64 {
        self.prizes.iter().map(|p| p.weight).sum()
    }

    /// The first prize, in declared order, whose running weight total
    /// reaches `roll`. `None` when rounding leaves `roll` above the last
    /// threshold.
    pub fn candidate_for_roll(&self, roll: f64) -> Option<&Prize> {
        let mut acc = 0.0;
        for prize in &self.prizes {
            acc += prize.weight;
            if roll <= acc {
                return Some(prize);
            }
        }
        None
    }
}
