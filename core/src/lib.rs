//! Prize-draw widget engine: weighted prize selection with award caps,
//! single-use time-boxed redemption codes, a capped draw history and a
//! highlight animation that always converges on the awarded prize's cell.
//!
//! Rendering, sound and page wiring belong to the host, which supplies a
//! `DrawObserver`, a `Clock` and a `KvStore`.

pub mod animator;
pub mod clock;
pub mod config;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod event;
pub mod history;
pub mod prize;
pub mod redemption;
pub mod rng;
pub mod selector;
pub mod store;
pub mod types;

pub use engine::{DrawEngine, DrawObserver, DrawTicket};
pub use error::{DrawError, DrawResult, Rejection};
