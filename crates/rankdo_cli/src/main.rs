//! `rankdo` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration, start logging and open the todo database.
//! - Map each subcommand onto one `TodoService` call and print the result.

mod args;

use anyhow::{anyhow, Context, Result};
use args::{list_limit, Cli, Command, TodoCommand};
use clap::Parser;
use log::info;
use rankdo_core::db::open_db;
use rankdo_core::{
    core_version, default_log_level, init_logging, SqliteTodoRepository, TodoItem, TodoService,
};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.validate().map_err(|err| anyhow!(err))?;
    start_logging(&cli)?;

    match &cli.command {
        Command::Version => {
            println!("rankdo {}", core_version());
            Ok(())
        }
        Command::Todo(command) => run(&cli, command),
    }
}

fn run(cli: &Cli, command: &TodoCommand) -> Result<()> {
    let db_path = cli.db_path();
    let conn = open_db(&db_path)
        .with_context(|| format!("failed to open database `{}`", db_path.display()))?;
    let repo = SqliteTodoRepository::try_new(&conn).context("database is not a todo store")?;
    let service = TodoService::with_policy(repo, cli.policy());
    info!("event=cli_command module=cli status=start command={}", command.name());

    match command {
        TodoCommand::List { limit, json } => {
            let items = service.list(list_limit(*limit))?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for (position, item) in items.iter().enumerate() {
                    println!("{position:>4}  {:<12} {}  {}", item.rank, item.id, item.description);
                }
            }
        }
        TodoCommand::Add { description } => print_item(&service.add(description.as_str())?)?,
        TodoCommand::Edit { id, description } => {
            print_item(&service.update_description(*id, description.as_str())?)?;
        }
        TodoCommand::Delete { id } => {
            service.delete(*id)?;
            println!("deleted {id}");
        }
        TodoCommand::Move { id, prev, next } => {
            let moved = service.move_by_neighbors(*id, prev.as_deref(), next.as_deref())?;
            print_item(&moved)?;
        }
        TodoCommand::MoveTo { id, index } => print_item(&service.move_to_index(*id, *index)?)?,
        TodoCommand::Rebalance => {
            let outcome = service.rebalance()?;
            println!(
                "rebalanced {} todos from bucket {} to bucket {}",
                outcome.rewritten,
                outcome.from_bucket.as_char(),
                outcome.to_bucket.as_char()
            );
        }
    }
    Ok(())
}

fn start_logging(cli: &Cli) -> Result<()> {
    let Some(dir) = cli.log_dir.as_deref() else {
        return Ok(());
    };
    let dir = absolute_dir(dir)?;
    let level = cli.log_level.as_deref().unwrap_or_else(|| default_log_level());
    init_logging(level, &dir.to_string_lossy()).map_err(|err| anyhow!(err))
}

fn absolute_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir().context("cannot resolve current directory")?;
    Ok(cwd.join(dir))
}

fn print_item(item: &TodoItem) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}
