//! Use-case layer over the ordered todo store.
//!
//! # Responsibility
//! - Resolve move intents into ranks (`reorder_planner`).
//! - Expose list/add/edit/delete/move/rebalance flows (`todo_service`).
//! - Keep CLI and other callers away from rank arithmetic and SQL.

pub mod reorder_planner;
pub mod todo_service;
