//! Deterministic random number generation.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! All randomness flows through DrawRng streams derived from the
//! single seed the engine was built with.
//!
//! Each concern gets its own stream, seeded from (seed XOR slot index).
//! Adding a new slot never changes the existing streams, so a seeded
//! engine awards the same prizes after unrelated features are added.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG stream.
pub struct DrawRng {
    pub name: &'static str,
    inner:    Pcg64Mcg,
}

impl DrawRng {
    /// Create a stream from the seed and a stable slot index.
    /// The index must never change once assigned.
    pub fn new(seed: u64, slot_index: u64) -> Self {
        let derived_seed = seed ^ (slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name:  "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll a u32 in [lo, hi]. Swapped bounds are tolerated.
    pub fn next_u32_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let span = u64::from(hi - lo) + 1;
        lo + self.next_u64_below(span) as u32
    }

    /// Roll an uppercase ASCII letter.
    pub fn next_uppercase(&mut self) -> char {
        (b'A' + self.next_u64_below(26) as u8) as char
    }
}

/// Hands out one stream per slot for a single engine instance.
pub struct RngBank {
    seed: u64,
}

impl RngBank {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stream(&self, slot: RngSlot) -> DrawRng {
        DrawRng::new(self.seed, slot as u64).with_name(slot.name())
    }
}

/// Stable slot assignments.
/// NEVER reorder or remove entries, only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum RngSlot {
    Selector   = 0,
    Animator   = 1,
    CodeIssuer = 2,
}

impl RngSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Selector   => "selector",
            Self::Animator   => "animator",
            Self::CodeIssuer => "code_issuer",
        }
    }
}
