use crate::types::{CellIndex, PrizeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a redemption code was turned away. Checked in declaration order.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    #[error("code must be 12 digits followed by 6 uppercase letters")]
    MalformedFormat,

    #[error("code was not issued today")]
    Expired,

    #[error("code is outside its validity window")]
    OutOfWindow,

    #[error("code has already been used")]
    AlreadyUsed,
}

#[derive(Error, Debug)]
pub enum DrawError {
    #[error("Redemption code rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("A draw is already in progress")]
    DrawInProgress,

    #[error("Animation is already running")]
    AnimationBusy,

    #[error("Animation target cell {cell} is not on the path")]
    InvalidAnimationTarget { cell: CellIndex },

    #[error("Prize {prize_id} has no cell mapping")]
    UnmappedPrize { prize_id: PrizeId },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage read failed for '{key}': {reason}")]
    StorageRead { key: String, reason: String },

    #[error("Storage write failed for '{key}': {reason}")]
    StoragePersist { key: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DrawError {
    /// User-input errors the caller may re-prompt for.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

pub type DrawResult<T> = Result<T, DrawError>;
