//! Move-intent resolution into a single new rank.
//!
//! # Responsibility
//! - Turn append, neighbour and index moves into one `Rank`.
//! - Read only the boundary items a move needs from the store.
//!
//! # Invariants
//! - The planner never writes; persisting the returned rank is the caller's
//!   job, ideally inside the same `OrderedStore::atomically` scope.
//! - Index moves exclude the moving item from their boundary lookup, so a
//!   move never bisects against the item's own current rank.

use crate::lexorank::{between, middle, next, parse, prev, Rank, RankError};
use crate::model::todo::{TodoId, TodoItem};
use crate::repo::todo_repo::{OrderedStore, RepoError};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::NonZeroU32;

/// Planner failure.
#[derive(Debug)]
pub enum PlanError {
    /// Rank parsing or arithmetic failed.
    Rank(RankError),
    /// A neighbour move named neither a previous nor a next rank.
    MissingNeighbor,
    /// Boundary lookup failed in the store.
    Store(RepoError),
}

impl Display for PlanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rank(err) => write!(f, "{err}"),
            Self::MissingNeighbor => {
                write!(f, "a move needs a previous rank, a next rank, or both")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Rank(err) => Some(err),
            Self::MissingNeighbor => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<RankError> for PlanError {
    fn from(value: RankError) -> Self {
        Self::Rank(value)
    }
}

impl From<RepoError> for PlanError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Where an item should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveIntent {
    /// After the current last item.
    AppendAtEnd,
    /// Directly after the given rank, with nothing known after it.
    InsertAfterOnly(Rank),
    /// Directly before the given rank, with nothing known before it.
    InsertBeforeOnly(Rank),
    /// Between two ranks, `prev < next`.
    InsertBetween(Rank, Rank),
    /// At a zero-based position of the ordering. `moving` is excluded from
    /// the boundary lookup when set.
    MoveToIndex {
        index: usize,
        moving: Option<TodoId>,
    },
}

impl MoveIntent {
    /// Builds a neighbour intent from optional wire ranks.
    ///
    /// Empty strings count as absent.
    ///
    /// # Errors
    /// - `PlanError::MissingNeighbor` when both ranks are absent.
    /// - `PlanError::Rank` when a supplied rank does not parse.
    pub fn from_neighbors(
        prev_rank: Option<&str>,
        next_rank: Option<&str>,
    ) -> Result<Self, PlanError> {
        let prev_rank = prev_rank.filter(|value| !value.is_empty());
        let next_rank = next_rank.filter(|value| !value.is_empty());

        match (prev_rank, next_rank) {
            (None, None) => Err(PlanError::MissingNeighbor),
            (Some(prev_rank), None) => Ok(Self::InsertAfterOnly(parse(prev_rank)?)),
            (None, Some(next_rank)) => Ok(Self::InsertBeforeOnly(parse(next_rank)?)),
            (Some(prev_rank), Some(next_rank)) => Ok(Self::InsertBetween(
                parse(prev_rank)?,
                parse(next_rank)?,
            )),
        }
    }
}

/// Resolves move intents against one store.
pub struct ReorderPlanner<'s, S: OrderedStore> {
    store: &'s S,
    step: NonZeroU32,
}

impl<'s, S: OrderedStore> ReorderPlanner<'s, S> {
    pub fn new(store: &'s S, step: NonZeroU32) -> Self {
        Self { store, step }
    }

    /// Computes the rank for `intent`.
    pub fn plan(&self, intent: &MoveIntent) -> Result<Rank, PlanError> {
        let rank = match intent {
            MoveIntent::AppendAtEnd => match self.store.get_last()? {
                Some(last) => next(&last.rank, self.step),
                None => self.first_rank()?,
            },
            MoveIntent::InsertAfterOnly(prev_rank) => next(prev_rank, self.step),
            MoveIntent::InsertBeforeOnly(next_rank) => prev(next_rank, self.step),
            MoveIntent::InsertBetween(prev_rank, next_rank) => between(prev_rank, next_rank)?,
            MoveIntent::MoveToIndex { index, moving } => self.plan_index(*index, *moving)?,
        };
        debug!("event=rank_plan module=planner status=ok intent={intent:?} rank={rank}");
        Ok(rank)
    }

    fn plan_index(&self, index: usize, moving: Option<TodoId>) -> Result<Rank, PlanError> {
        let wanted = index.saturating_add(1);
        let items = self.boundary_items(wanted, moving)?;

        if index == 0 {
            return match items.first() {
                Some(first) => Ok(prev(&first.rank, self.step)),
                None => self.first_rank(),
            };
        }

        if items.len() == wanted {
            return Ok(between(&items[index - 1].rank, &items[index].rank)?);
        }
        match items.last() {
            Some(last) => Ok(next(&last.rank, self.step)),
            None => self.first_rank(),
        }
    }

    /// First `count` items in rank order, skipping `moving`.
    fn boundary_items(
        &self,
        count: usize,
        moving: Option<TodoId>,
    ) -> Result<Vec<TodoItem>, PlanError> {
        let fetch = count.saturating_add(usize::from(moving.is_some()));
        let limit = u32::try_from(fetch).unwrap_or(u32::MAX);

        let mut items = self.store.list_ordered(Some(limit))?;
        if let Some(moving) = moving {
            items.retain(|item| item.id != moving);
        }
        items.truncate(count);
        Ok(items)
    }

    fn first_rank(&self) -> Result<Rank, PlanError> {
        Ok(middle(self.store.current_bucket()?))
    }
}
