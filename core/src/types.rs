//! Shared primitive types used across the widget engine.

/// Stable identifier of a prize in the table.
pub type PrizeId = u32;

/// Index of a cell in the rendered grid (row-major).
pub type CellIndex = usize;

/// Milliseconds since the Unix epoch.
pub type EpochMillis = i64;

/// Storage key holding the JSON-encoded draw history.
pub const HISTORY_KEY: &str = "lotteryHistory";

/// Storage key holding the JSON-encoded set of consumed redemption codes.
pub const USED_CODES_KEY: &str = "usedCards";
