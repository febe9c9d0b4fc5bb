//! Ordered todo use-case service.
//!
//! # Responsibility
//! - Provide list/add/edit/delete/move/rebalance entry points for callers.
//! - Run every read-compute-write sequence inside one store write scope.
//! - Apply the configured automatic rebalance policy after rank writes.
//!
//! # Invariants
//! - Rank algebra errors reach callers unchanged and are never retried here.
//! - Store conflicts (`DuplicateRank`) are reported, not retried; callers own
//!   retry policy.
//! - Descriptions are trimmed and must not be blank.

use crate::config::OrderingPolicy;
use crate::lexorank::{rebalance, Bucket, RankError};
use crate::model::todo::{TodoId, TodoItem};
use crate::repo::todo_repo::{OrderedStore, RepoError};
use crate::service::reorder_planner::{MoveIntent, PlanError, ReorderPlanner};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from todo service operations.
#[derive(Debug)]
pub enum TodoServiceError {
    /// Description is blank after trim.
    InvalidDescription,
    /// Target todo does not exist.
    TodoNotFound(TodoId),
    /// Computed rank is already held by another todo.
    DuplicateRank(String),
    /// Rank parsing or arithmetic failed.
    Rank(RankError),
    /// Neighbour move without any anchor rank.
    MissingNeighbor,
    /// Store-level failure.
    Repo(RepoError),
}

impl Display for TodoServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDescription => write!(f, "todo description must not be blank"),
            Self::TodoNotFound(id) => write!(f, "todo not found: {id}"),
            Self::DuplicateRank(rank) => write!(f, "rank already in use: {rank}"),
            Self::Rank(err) => write!(f, "{err}"),
            Self::MissingNeighbor => write!(f, "{}", PlanError::MissingNeighbor),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TodoServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Rank(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TodoServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::TodoNotFound(id),
            RepoError::DuplicateRank(rank) => Self::DuplicateRank(rank),
            other => Self::Repo(other),
        }
    }
}

impl From<RankError> for TodoServiceError {
    fn from(value: RankError) -> Self {
        Self::Rank(value)
    }
}

impl From<PlanError> for TodoServiceError {
    fn from(value: PlanError) -> Self {
        match value {
            PlanError::Rank(err) => Self::Rank(err),
            PlanError::MissingNeighbor => Self::MissingNeighbor,
            PlanError::Store(err) => err.into(),
        }
    }
}

/// Summary of one completed rebalance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalanceOutcome {
    pub from_bucket: Bucket,
    pub to_bucket: Bucket,
    /// Number of todos whose rank was rewritten.
    pub rewritten: usize,
}

/// Use-case facade over an ordered todo store.
pub struct TodoService<S: OrderedStore> {
    store: S,
    policy: OrderingPolicy,
}

impl<S: OrderedStore> TodoService<S> {
    /// Creates a service with the default ordering policy.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, OrderingPolicy::default())
    }

    /// Creates a service with an explicit ordering policy.
    pub fn with_policy(store: S, policy: OrderingPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &OrderingPolicy {
        &self.policy
    }

    /// Lists todos in order, optionally capped.
    pub fn list(&self, limit: Option<u32>) -> Result<Vec<TodoItem>, TodoServiceError> {
        self.store.list_ordered(limit).map_err(Into::into)
    }

    /// Loads one todo.
    pub fn get(&self, id: TodoId) -> Result<TodoItem, TodoServiceError> {
        self.store.get_by_id(id).map_err(Into::into)
    }

    /// Appends a new todo after the current last one.
    ///
    /// An empty collection places it at `middle(current bucket)`.
    pub fn add(&self, description: impl Into<String>) -> Result<TodoItem, TodoServiceError> {
        let description = normalize_description(description.into())?;
        let started_at = Instant::now();

        let result = self.store.atomically(|store| {
            let rank = self.planner(store).plan(&MoveIntent::AppendAtEnd)?;
            let item = store.insert(description.as_str(), &rank)?;
            self.settle(store, item)
        });
        log_outcome("todo_create", &result, started_at);
        result
    }

    /// Replaces the description of one todo; its rank is untouched.
    pub fn update_description(
        &self,
        id: TodoId,
        description: impl Into<String>,
    ) -> Result<TodoItem, TodoServiceError> {
        let description = normalize_description(description.into())?;
        let started_at = Instant::now();
        let result = self
            .store
            .update_description(id, description.as_str())
            .map_err(TodoServiceError::from);
        log_outcome("todo_update", &result, started_at);
        result
    }

    /// Deletes one todo. Neighbours keep their ranks.
    pub fn delete(&self, id: TodoId) -> Result<(), TodoServiceError> {
        let started_at = Instant::now();
        match self.store.delete(id) {
            Ok(()) => {
                info!(
                    "event=todo_delete module=service status=ok todo_id={id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=todo_delete module=service status=error todo_id={id} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err.into())
            }
        }
    }

    /// Moves a todo next to the given neighbour ranks.
    ///
    /// # Errors
    /// - `MissingNeighbor` when both ranks are absent (or empty).
    /// - `Rank` when a rank is malformed or `prev >= next`.
    pub fn move_by_neighbors(
        &self,
        id: TodoId,
        prev_rank: Option<&str>,
        next_rank: Option<&str>,
    ) -> Result<TodoItem, TodoServiceError> {
        let intent = MoveIntent::from_neighbors(prev_rank, next_rank)?;
        self.move_with(id, intent)
    }

    /// Moves a todo to a zero-based position of the current ordering.
    ///
    /// Positions past the end append after the last other todo.
    pub fn move_to_index(&self, id: TodoId, index: usize) -> Result<TodoItem, TodoServiceError> {
        self.move_with(
            id,
            MoveIntent::MoveToIndex {
                index,
                moving: Some(id),
            },
        )
    }

    /// Rewrites every rank into the next bucket with short, evenly spaced
    /// values. Runs as one atomic store write.
    pub fn rebalance(&self) -> Result<RebalanceOutcome, TodoServiceError> {
        let started_at = Instant::now();
        info!("event=rebalance module=service status=start");

        let result = self.store.atomically(rebalance_in);
        log_rebalance(&result, started_at);
        result
    }

    fn move_with(&self, id: TodoId, intent: MoveIntent) -> Result<TodoItem, TodoServiceError> {
        let started_at = Instant::now();
        let result = self.store.atomically(|store| {
            store.get_by_id(id)?;
            let rank = self.planner(store).plan(&intent)?;
            let item = store.update_rank(id, &rank)?;
            self.settle(store, item)
        });
        log_outcome("todo_move", &result, started_at);
        result
    }

    fn planner<'s>(&self, store: &'s S) -> ReorderPlanner<'s, S> {
        ReorderPlanner::new(store, self.policy.step)
    }

    /// Applies the automatic rebalance policy to a freshly written todo and
    /// returns its current state.
    ///
    /// Runs inside the caller's write scope, so a failed rebalance also
    /// discards the write that triggered it.
    fn settle(&self, store: &S, item: TodoItem) -> Result<TodoItem, TodoServiceError> {
        if !self.policy.wants_rebalance(item.rank.digits().len()) {
            return Ok(item);
        }
        info!(
            "event=rebalance_trigger module=service status=ok todo_id={} digits={}",
            item.id,
            item.rank.digits().len()
        );
        let started_at = Instant::now();
        let outcome = rebalance_in(store);
        log_rebalance(&outcome, started_at);
        outcome?;
        Ok(store.get_by_id(item.id)?)
    }
}

/// Rebalances the whole collection within an already open write scope.
fn rebalance_in<S: OrderedStore>(store: &S) -> Result<RebalanceOutcome, TodoServiceError> {
    let from_bucket = store.current_bucket()?;
    let ids: Vec<TodoId> = store
        .list_ordered(None)?
        .into_iter()
        .map(|item| item.id)
        .collect();
    let plan = rebalance(from_bucket, &ids);
    store.apply_rebalance(&plan)?;
    Ok(RebalanceOutcome {
        from_bucket,
        to_bucket: plan.target_bucket,
        rewritten: plan.assignments.len(),
    })
}

fn log_rebalance(result: &Result<RebalanceOutcome, TodoServiceError>, started_at: Instant) {
    match result {
        Ok(outcome) => info!(
            "event=rebalance module=service status=ok from_bucket={} to_bucket={} rewritten={} duration_ms={}",
            outcome.from_bucket.as_char(),
            outcome.to_bucket.as_char(),
            outcome.rewritten,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=rebalance module=service status=error duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
    }
}

fn normalize_description(value: String) -> Result<String, TodoServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TodoServiceError::InvalidDescription);
    }
    Ok(trimmed.to_string())
}

fn log_outcome(
    event: &'static str,
    result: &Result<TodoItem, TodoServiceError>,
    started_at: Instant,
) {
    match result {
        Ok(item) => info!(
            "event={event} module=service status=ok todo_id={} rank={} duration_ms={}",
            item.id,
            item.rank,
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event={event} module=service status=error duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
    }
}
