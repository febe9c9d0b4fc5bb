//! Persistence contracts for the ordered collection.
//!
//! # Responsibility
//! - Define the `OrderedStore` contract the reorder logic reads and writes.
//! - Keep SQLite details behind that contract.
//!
//! # Invariants
//! - Store errors are semantic (`NotFound`, `DuplicateRank`) where the cause
//!   is known, and carry the underlying DB error otherwise.

pub mod todo_repo;
