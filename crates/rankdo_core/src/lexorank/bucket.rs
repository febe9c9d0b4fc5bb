//! Bucket generations and whole-collection rebalance planning.
//!
//! # Responsibility
//! - Model the three rank buckets and their rotation order.
//! - Compute evenly spaced replacement ranks for a full ordering.
//!
//! # Invariants
//! - A rebalance always targets the bucket after the current one, so new ranks
//!   never collide with ranks still stored under the current bucket.
//! - Planned ranks are canonical, strictly increasing, and use the minimal
//!   digit width that can hold every item.

use super::rank::{Rank, BASE};
use serde::{Deserialize, Serialize};

/// Coarse rank generation. Rotates `0 -> 1 -> 2 -> 0` on every rebalance.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Bucket {
    #[default]
    #[serde(rename = "0")]
    Zero,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
}

impl Bucket {
    /// Every bucket in ordinal order.
    pub const ALL: [Bucket; 3] = [Bucket::Zero, Bucket::One, Bucket::Two];

    /// Parses the single wire digit (`'0'`, `'1'` or `'2'`).
    pub fn from_char(value: char) -> Option<Self> {
        match value {
            '0' => Some(Self::Zero),
            '1' => Some(Self::One),
            '2' => Some(Self::Two),
            _ => None,
        }
    }

    /// Wire digit for this bucket.
    pub fn as_char(self) -> char {
        match self {
            Self::Zero => '0',
            Self::One => '1',
            Self::Two => '2',
        }
    }

    /// Bucket a rebalance moves the collection into.
    pub fn next(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Two,
            Self::Two => Self::Zero,
        }
    }
}

/// Replacement ranks for a whole collection.
///
/// Must be applied as one all-or-nothing write together with the switch of
/// the persisted current bucket to `target_bucket`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalancePlan<K> {
    /// Bucket every assignment lives in.
    pub target_bucket: Bucket,
    /// `(key, new rank)` in the same order as the input ordering.
    pub assignments: Vec<(K, Rank)>,
}

/// Plans a rebalance of `ordered` (ascending by current rank) into the bucket
/// after `current`.
///
/// Item `k` of `n` (1-based) receives the value `k * floor(36^w / (n + 1))`
/// written with `w` digits, where `w` is the smallest width with
/// `36^w >= n + 1`. Trailing zero digits are then dropped, which keeps the
/// value and therefore the order.
pub fn rebalance<K: Clone>(current: Bucket, ordered: &[K]) -> RebalancePlan<K> {
    let target_bucket = current.next();
    let slots = ordered.len() as u128 + 1;

    let mut width = 1usize;
    let mut span = u128::from(BASE);
    while span < slots {
        width += 1;
        span *= u128::from(BASE);
    }
    let gap = span / slots;

    let assignments = ordered
        .iter()
        .enumerate()
        .map(|(index, key)| {
            let digits = fixed_width_digits(gap * (index as u128 + 1), width);
            (key.clone(), Rank::from_digit_values(target_bucket, digits))
        })
        .collect();

    RebalancePlan {
        target_bucket,
        assignments,
    }
}

fn fixed_width_digits(mut value: u128, width: usize) -> Vec<u8> {
    let mut digits = vec![0u8; width];
    for slot in digits.iter_mut().rev() {
        *slot = (value % u128::from(BASE)) as u8;
        value /= u128::from(BASE);
    }
    digits
}
