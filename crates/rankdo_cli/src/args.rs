//! Command-line and environment configuration for the `rankdo` binary.

use clap::{Parser, Subcommand};
use rankdo_core::OrderingPolicy;
use std::num::NonZeroU32;
use std::path::PathBuf;
use uuid::Uuid;

/// Ordered todo list backed by a local SQLite file.
#[derive(Parser, Debug)]
#[command(name = "rankdo", version, about, long_about = None)]
pub struct Cli {
    /// Database name; the file is `./<db-name>.db`
    #[arg(long, global = true, env = "RANKDO_DB_NAME", default_value = "todos")]
    pub db_name: String,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true, env = "RANKDO_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Directory for rolling log files; logging stays off when unset
    #[arg(long, global = true, env = "RANKDO_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Rank units used by append and single-neighbour moves
    #[arg(long, global = true, env = "RANKDO_STEP", default_value = "8")]
    pub step: NonZeroU32,

    /// Rebalance automatically once a written rank has more digits than this
    #[arg(long, global = true, env = "RANKDO_REBALANCE_MAX_DIGITS")]
    pub rebalance_max_digits: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the core library version
    Version,
    #[command(flatten)]
    Todo(TodoCommand),
}

/// Subcommands that work on the todo database.
#[derive(Subcommand, Debug)]
pub enum TodoCommand {
    /// Print todos in order
    List {
        /// Show at most this many todos; 0 shows all
        #[arg(long)]
        limit: Option<u32>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Append a todo to the end of the list
    Add { description: String },
    /// Replace the description of a todo
    Edit { id: Uuid, description: String },
    /// Delete a todo
    Delete { id: Uuid },
    /// Move a todo next to neighbour ranks
    Move {
        id: Uuid,
        /// Rank the todo should follow
        #[arg(long)]
        prev: Option<String>,
        /// Rank the todo should precede
        #[arg(long)]
        next: Option<String>,
    },
    /// Move a todo to a zero-based position
    MoveTo { id: Uuid, index: usize },
    /// Rewrite all ranks into the next bucket
    Rebalance,
}

impl TodoCommand {
    /// Subcommand name for log lines; arguments may hold user text.
    pub fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Add { .. } => "add",
            Self::Edit { .. } => "edit",
            Self::Delete { .. } => "delete",
            Self::Move { .. } => "move",
            Self::MoveTo { .. } => "move-to",
            Self::Rebalance => "rebalance",
        }
    }
}

/// Maps the CLI `--limit` onto a store limit; `0` means no cap.
pub fn list_limit(limit: Option<u32>) -> Option<u32> {
    limit.filter(|limit| *limit > 0)
}

impl Cli {
    /// Database file path derived from `--db-name`.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(format!("./{}.db", self.db_name))
    }

    pub fn policy(&self) -> OrderingPolicy {
        OrderingPolicy {
            step: self.step,
            rebalance_max_digits: self.rebalance_max_digits,
        }
    }

    /// Validate the configuration at startup.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.db_name.trim();
        if name.is_empty() {
            return Err("db_name must not be empty".to_string());
        }
        if name.contains(['/', '\\']) {
            return Err(format!("db_name must be a plain name, got `{name}`"));
        }
        self.policy().validate()
    }
}
