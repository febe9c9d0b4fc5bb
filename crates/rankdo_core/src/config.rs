//! Ordering policy shared by every writer of one collection.
//!
//! # Invariants
//! - `step` is never zero, so `next`/`prev` always move strictly.
//! - Automatic rebalance is off unless `rebalance_max_digits` is set.

use crate::lexorank::DEFAULT_STEP;
use std::num::NonZeroU32;

/// Smallest accepted automatic-rebalance threshold. Fresh collections already
/// use one digit, so anything lower would rebalance on every write.
pub const MIN_REBALANCE_DIGITS: usize = 2;

/// Tunables for rank assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingPolicy {
    /// Units added or subtracted by append and single-neighbour moves.
    pub step: NonZeroU32,
    /// Rebalance after a write whose rank has more digits than this.
    /// `None` keeps rebalance a manual maintenance operation.
    pub rebalance_max_digits: Option<usize>,
}

impl Default for OrderingPolicy {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            rebalance_max_digits: None,
        }
    }
}

impl OrderingPolicy {
    /// Validates the policy at startup.
    pub fn validate(&self) -> Result<(), String> {
        match self.rebalance_max_digits {
            Some(max) if max < MIN_REBALANCE_DIGITS => Err(format!(
                "rebalance_max_digits must be at least {MIN_REBALANCE_DIGITS}, got {max}"
            )),
            _ => Ok(()),
        }
    }

    /// Whether a freshly written rank of `digit_count` digits should trigger
    /// an automatic rebalance.
    pub fn wants_rebalance(&self, digit_count: usize) -> bool {
        self.rebalance_max_digits
            .is_some_and(|max| digit_count > max)
    }
}
