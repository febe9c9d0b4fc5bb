//! Rank value type and its wire codec.
//!
//! # Responsibility
//! - Represent a rank as `(bucket, digits)` instead of a raw string.
//! - Parse and format the `<bucket-digit><digits>` wire form.
//!
//! # Invariants
//! - `digits` is non-empty, lowercase base-36, and never ends with `'0'`.
//! - Because digits are canonical, deriving `Ord` on `(bucket, digits)` gives
//!   the same order as comparing digit strings with missing positions read as
//!   `'0'`, and the same order as plain byte comparison of the wire string.

use super::bucket::Bucket;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Number of symbols in the rank alphabet.
pub const BASE: u32 = 36;

/// Rank alphabet in ascending symbol order. Codepoint order matches.
pub const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static RANK_WIRE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-2][0-9a-z]+$").expect("valid rank regex"));

/// Errors produced by rank parsing and rank arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankError {
    /// Input is not a valid `<bucket-digit><digits>` rank string.
    Format { input: String, reason: &'static str },
    /// `between` was called with `lower >= upper`.
    InvalidRange { lower: Rank, upper: Rank },
}

impl Display for RankError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format { input, reason } => write!(f, "invalid rank `{input}`: {reason}"),
            Self::InvalidRange { lower, upper } => write!(
                f,
                "invalid rank range: lower `{lower}` must sort before upper `{upper}`"
            ),
        }
    }
}

impl Error for RankError {}

/// Sortable position key of one item in the ordered collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rank {
    bucket: Bucket,
    digits: String,
}

impl Rank {
    /// Builds a rank from a bucket and a canonical digit string.
    pub fn new(bucket: Bucket, digits: impl Into<String>) -> Result<Self, RankError> {
        let digits = digits.into();
        let input = format!("{}{digits}", bucket.as_char());
        validate_digits(&input, &digits)?;
        Ok(Self { bucket, digits })
    }

    /// Builds a rank from symbol values (`0..36`), dropping trailing zeros.
    ///
    /// Callers guarantee at least one non-zero value.
    pub(crate) fn from_digit_values(bucket: Bucket, mut values: Vec<u8>) -> Self {
        while values.last() == Some(&0) {
            values.pop();
        }
        debug_assert!(!values.is_empty(), "rank digits must encode a non-zero value");

        let digits = values
            .into_iter()
            .map(|value| char::from(ALPHABET[usize::from(value)]))
            .collect();
        Self { bucket, digits }
    }

    /// Bucket generation this rank belongs to.
    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    /// Canonical digit string without the bucket prefix.
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Symbol values of the digit string, most significant first.
    pub(crate) fn digit_values(&self) -> Vec<u8> {
        self.digits.bytes().filter_map(symbol_value).collect()
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.bucket.as_char(), self.digits)
    }
}

impl FromStr for Rank {
    type Err = RankError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse(value)
    }
}

impl TryFrom<String> for Rank {
    type Error = RankError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse(&value)
    }
}

impl From<Rank> for String {
    fn from(value: Rank) -> Self {
        value.to_string()
    }
}

/// Parses a wire rank string such as `"0i"` or `"1a9"`.
///
/// # Errors
/// - `RankError::Format` when the bucket digit is not `0|1|2`, the digit
///   string is empty or contains symbols outside `[0-9a-z]`, or the digit
///   string has a trailing `'0'` (not canonical).
pub fn parse(value: &str) -> Result<Rank, RankError> {
    let mut chars = value.chars();
    let bucket = chars
        .next()
        .and_then(Bucket::from_char)
        .ok_or_else(|| format_error(value, "bucket digit must be 0, 1 or 2"))?;
    let digits = chars.as_str();
    validate_digits(value, digits)?;

    Ok(Rank {
        bucket,
        digits: digits.to_string(),
    })
}

/// Formats a rank into its canonical wire string.
pub fn format(rank: &Rank) -> String {
    rank.to_string()
}

pub(crate) fn symbol_value(symbol: u8) -> Option<u8> {
    match symbol {
        b'0'..=b'9' => Some(symbol - b'0'),
        b'a'..=b'z' => Some(symbol - b'a' + 10),
        _ => None,
    }
}

fn validate_digits(input: &str, digits: &str) -> Result<(), RankError> {
    if digits.is_empty() {
        return Err(format_error(input, "rank needs at least one digit after the bucket"));
    }
    if !RANK_WIRE_RE.is_match(input) {
        return Err(format_error(input, "digits must be lowercase base-36 symbols"));
    }
    if digits.ends_with('0') {
        return Err(format_error(input, "trailing '0' digits are not canonical"));
    }
    Ok(())
}

fn format_error(input: &str, reason: &'static str) -> RankError {
    RankError::Format {
        input: input.to_string(),
        reason,
    }
}
