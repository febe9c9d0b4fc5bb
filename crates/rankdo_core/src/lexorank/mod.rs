//! Lexicographic rank algebra.
//!
//! # Responsibility
//! - Define the `Rank` value and its `<bucket-digit><digits>` wire form.
//! - Provide pure rank arithmetic (`next`, `prev`, `middle`, `between`).
//! - Plan bucket rotation and whole-collection rebalances.
//!
//! # Invariants
//! - Nothing in this module performs I/O or holds state.
//! - Wire strings sort under plain byte comparison exactly like `Rank` values.

pub mod arithmetic;
pub mod bucket;
pub mod rank;

pub use arithmetic::{between, middle, next, prev, DEFAULT_STEP};
pub use bucket::{rebalance, Bucket, RebalancePlan};
pub use rank::{format, parse, Rank, RankError};
