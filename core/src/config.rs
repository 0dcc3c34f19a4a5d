//! Widget configuration: the prize catalogue, the grid path the
//! highlight travels, animation feel, code policy and calendar.
//!
//! Loaded once at startup and immutable afterwards. In tests, use
//! `WidgetConfig::default_widget()`.

use crate::{
    animator::{AnimationPath, AnimationProfile, PrizeCellMap},
    clock::{CalendarZone, LocalCalendar},
    error::{DrawError, DrawResult},
    history::DEFAULT_HISTORY_LIMIT,
    prize::PrizeTable,
    redemption::CodePolicy,
    types::{CellIndex, PrizeId},
};
use serde::{Deserialize, Serialize};

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub prizes:        PrizeTable,
    pub path:          AnimationPath,
    pub cell_map:      PrizeCellMap,
    #[serde(default)]
    pub animation:     AnimationProfile,
    #[serde(default)]
    pub codes:         CodePolicy,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub calendar:      LocalCalendar,
}

impl WidgetConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: WidgetConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// The built-in widget: four prizes round a 3x3 grid.
    pub fn default_widget() -> Self {
        Self {
            prizes:        PrizeTable::builtin(),
            path:          AnimationPath::ring_3x3(),
            cell_map:      PrizeCellMap::new([(1, 1), (2, 5), (3, 7), (4, 3)]),
            animation:     AnimationProfile::default(),
            codes:         CodePolicy::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            calendar:      LocalCalendar::default(),
        }
    }

    pub fn validate(&self) -> DrawResult<()> {
        self.animation.validate()?;

        if self.history_limit == 0 {
            return Err(DrawError::InvalidConfig("history limit must be positive".into()));
        }
        if self.codes.max_age_ms < 0 {
            return Err(DrawError::InvalidConfig(format!(
                "code max age {}ms is negative",
                self.codes.max_age_ms
            )));
        }
        if let CalendarZone::Fixed(secs) = self.calendar.zone {
            if secs.abs() >= 86_400 {
                return Err(DrawError::InvalidConfig(format!(
                    "UTC offset {secs}s is out of range"
                )));
            }
        }

        let longest_run = u32::try_from(self.path.len())
            .ok()
            .and_then(|len| len.checked_mul(self.animation.cycles.most().saturating_add(1)));
        if longest_run.is_none() {
            return Err(DrawError::InvalidConfig(format!(
                "a {}-cell path with {} cycles overflows the step counter",
                self.path.len(),
                self.animation.cycles.most()
            )));
        }

        for prize in self.prizes.iter() {
            self.target_cell(prize.id)?;
        }
        for (prize_id, cell) in self.cell_map.iter() {
            if self.prizes.get(prize_id).is_none() {
                log::warn!("cell map entry for unknown prize {prize_id} (cell {cell}) is ignored");
            }
        }
        Ok(())
    }

    /// Cell the animation must stop on for `prize_id`.
    pub fn target_cell(&self, prize_id: PrizeId) -> DrawResult<CellIndex> {
        let cell = self
            .cell_map
            .cell_for(prize_id)
            .ok_or(DrawError::UnmappedPrize { prize_id })?;
        if !self.path.contains(cell) {
            return Err(DrawError::InvalidAnimationTarget { cell });
        }
        Ok(cell)
    }
}
