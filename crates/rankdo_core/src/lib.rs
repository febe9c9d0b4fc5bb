//! Core library for rankdo, a todo list kept in user-defined order.
//!
//! Order is stored as lexicographic rank strings, so moving one todo
//! rewrites one row. See `lexorank` for the rank algebra and `service` for
//! the use-case entry points.

pub mod config;
pub mod db;
pub mod lexorank;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::OrderingPolicy;
pub use lexorank::{Bucket, Rank, RankError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::todo::{TodoId, TodoItem};
pub use repo::todo_repo::{OrderedStore, RepoError, RepoResult, SqliteTodoRepository};
pub use service::reorder_planner::{MoveIntent, PlanError, ReorderPlanner};
pub use service::todo_service::{RebalanceOutcome, TodoService, TodoServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
