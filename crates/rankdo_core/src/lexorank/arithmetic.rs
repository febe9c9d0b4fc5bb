//! Pure rank arithmetic: increment, decrement, midpoint and bisection.
//!
//! A digit string `d1 d2 .. dn` is read as the base-36 fraction
//! `0.d1d2..dn`. Every operation here works on that fraction, which is why
//! appending `'0'` never changes a value and why canonical ranks drop it.
//!
//! # Invariants
//! - `next(r, step) > r` and `prev(r, step) < r` for every `step >= 1`.
//! - `between(a, b)` returns `a < x < b` or fails with `InvalidRange`.
//! - Results always stay in the bucket of their input (`between` uses the
//!   lower bound's bucket).

use super::bucket::Bucket;
use super::rank::{Rank, RankError, BASE};
use std::num::NonZeroU32;

/// Step used by append and single-neighbour moves.
///
/// Leaves headroom after each tail append so that a later insert next to the
/// tail usually fits without growing the digit string.
pub const DEFAULT_STEP: NonZeroU32 = match NonZeroU32::new(8) {
    Some(step) => step,
    None => unreachable!(),
};

/// Symbol value used by `middle`; `'i'` in the alphabet.
pub const MIDDLE_VALUE: u8 = 18;

/// Returns a rank `step` units after `rank` at its least-significant digit.
///
/// When the addition carries out of the most significant digit, the digit
/// string is extended with one more position and the step is added there
/// instead, repeating until it fits.
pub fn next(rank: &Rank, step: NonZeroU32) -> Rank {
    let mut values = rank.digit_values();
    loop {
        if let Some(sum) = add_at_tail(&values, step.get()) {
            return Rank::from_digit_values(rank.bucket(), sum);
        }
        values.push(0);
    }
}

/// Returns a rank `step` units before `rank` at its least-significant digit.
///
/// When the subtraction would reach or pass zero, the digit string is
/// extended with one more position and the step is subtracted there instead.
pub fn prev(rank: &Rank, step: NonZeroU32) -> Rank {
    let mut values = rank.digit_values();
    loop {
        if let Some(difference) = sub_at_tail(&values, step.get()) {
            return Rank::from_digit_values(rank.bucket(), difference);
        }
        values.push(0);
    }
}

/// Rank of the first item inserted into an empty collection.
pub fn middle(bucket: Bucket) -> Rank {
    Rank::from_digit_values(bucket, vec![MIDDLE_VALUE])
}

/// Returns a rank strictly between `lower` and `upper`.
///
/// # Errors
/// - `RankError::InvalidRange` unless `lower < upper`.
pub fn between(lower: &Rank, upper: &Rank) -> Result<Rank, RankError> {
    if lower >= upper {
        return Err(RankError::InvalidRange {
            lower: lower.clone(),
            upper: upper.clone(),
        });
    }

    let lower_values = lower.digit_values();
    let upper_values = upper.digit_values();
    // Anything after `lower` in its own bucket precedes every rank of a later
    // bucket, so the upper bound only matters within the same bucket.
    let bound = (lower.bucket() == upper.bucket()).then_some(upper_values.as_slice());

    Ok(Rank::from_digit_values(
        lower.bucket(),
        midpoint(&lower_values, bound),
    ))
}

/// Bisects the open interval `(lower, upper)` of base-36 fractions.
///
/// `upper = None` stands for the exclusive bound `1.0`. Missing positions of
/// `lower` read as `0`. Requires `lower < upper`.
fn midpoint(lower: &[u8], upper: Option<&[u8]>) -> Vec<u8> {
    let base = BASE as u8;
    let mut upper = upper;
    let mut out = Vec::with_capacity(lower.len() + 1);
    let mut position = 0usize;

    loop {
        let low = lower.get(position).copied().unwrap_or(0);
        let high = match upper {
            Some(values) => values.get(position).copied().unwrap_or(0),
            None => base,
        };

        if upper.is_some() && low == high {
            out.push(low);
            position += 1;
            continue;
        }

        if high - low > 1 {
            out.push(low + (high - low) / 2);
            return out;
        }

        // Adjacent symbols. If the upper bound continues past this position,
        // its own symbol here already sorts strictly inside the interval.
        if let Some(values) = upper {
            if values.len() > position + 1 {
                out.push(high);
                return out;
            }
        }

        out.push(low);
        position += 1;
        upper = None;
    }
}

fn add_at_tail(values: &[u8], amount: u32) -> Option<Vec<u8>> {
    let base = u64::from(BASE);
    let mut sum = values.to_vec();
    let mut carry = u64::from(amount);

    for slot in sum.iter_mut().rev() {
        if carry == 0 {
            break;
        }
        let total = u64::from(*slot) + carry;
        *slot = (total % base) as u8;
        carry = total / base;
    }

    (carry == 0).then_some(sum)
}

fn sub_at_tail(values: &[u8], amount: u32) -> Option<Vec<u8>> {
    let base = u64::from(BASE);
    let mut difference = values.to_vec();
    let mut borrow = u64::from(amount);

    for slot in difference.iter_mut().rev() {
        if borrow == 0 {
            break;
        }
        let take = borrow % base;
        borrow /= base;
        let current = u64::from(*slot);
        if current >= take {
            *slot = (current - take) as u8;
        } else {
            *slot = (current + base - take) as u8;
            borrow += 1;
        }
    }

    if borrow > 0 || difference.iter().all(|value| *value == 0) {
        return None;
    }
    Some(difference)
}
