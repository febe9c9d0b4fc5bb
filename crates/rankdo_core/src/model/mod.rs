//! Domain model for the ordered todo collection.
//!
//! # Invariants
//! - Order is carried only by `Rank`; there is no integer position field.

pub mod todo;
