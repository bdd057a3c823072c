use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, WrapErr, eyre};
use std::path::{Path, PathBuf};
use taskindex::config::default_config_path;
use taskindex::jsonl::{load_tasks, save_tasks};
use taskindex::timefmt::{format_time, parse_time};
use taskindex::{Attribute, Config, Filter, Flag, Priority, TaskId, TaskIndex, TaskRecord};
use tracing::{Level, debug};

#[derive(Parser)]
#[command(name = "taskindex")]
#[command(about = "TaskIndex CLI - Task list kept in sorted in-memory indexes, saved as JSONL")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the task file (default: from config, else the user data directory)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        name: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(short, long, default_value = "normal")]
        priority: Priority,
    },

    /// List tasks (all, pending, done, priority, agenda, high/normal/low)
    List { filter: Option<String> },

    /// Search task names (lowercase terms match any case)
    Search { term: String },

    /// List tasks whose start, end or effective time lies in [FROM, TO)
    Range {
        /// start, end or time
        attribute: Attribute,
        from: String,
        to: String,
    },

    /// Mark a task done
    Done { id: u64 },

    /// Mark a task pending again
    Undo { id: u64 },

    /// Change attributes of a task
    Edit {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
    },

    /// Remove a task
    Remove { id: u64 },

    /// Reassign compact ids in creation order
    Renumber,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    // Setup tracing
    let level_name = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let level: Level = level_name
        .parse()
        .map_err(|_| eyre!("Invalid log level: {}", level_name))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    debug!(config = ?default_config_path(), "Configuration loaded");

    let tasks_file = config.resolve_tasks_file(cli.file.as_deref())?;
    let mut store = TaskIndex::new();
    store
        .load(load_tasks(&tasks_file)?)
        .wrap_err_with(|| format!("Failed to load {}", tasks_file.display()))?;

    match cli.command {
        Commands::Add {
            name,
            start,
            end,
            priority,
        } => {
            let start = parse_opt_time(start.as_deref())?;
            let end = parse_opt_time(end.as_deref())?;
            let task = store.create(name, start, end, Flag::Pending, priority)?;
            save(&tasks_file, &store)?;
            println!("Added task {}", task.id());
            print_rows(&[task]);
        }
        Commands::List { filter } => {
            let filter: Filter = filter.as_deref().unwrap_or(&config.default_filter).parse()?;
            let tasks = filter.apply(&store.query());
            if tasks.is_empty() {
                println!("No task to display");
            } else {
                print_rows(&tasks);
                println!("Total tasks in list: [{}]", tasks.len());
            }
        }
        Commands::Search { term } => {
            let tasks = store.query().search_name(&term);
            print_rows(&tasks);
            println!("{} matching task(s)", tasks.len());
        }
        Commands::Range { attribute, from, to } => {
            if !matches!(attribute, Attribute::StartTime | Attribute::EndTime | Attribute::Time) {
                return Err(eyre!("Range queries take start, end or time, not {}", attribute));
            }
            let tasks = store.query().range(attribute, parse_time(&from)?, parse_time(&to)?);
            print_rows(&tasks);
            println!("{} task(s) in range", tasks.len());
        }
        Commands::Done { id } => {
            let task = lookup(&store, id)?;
            update(&mut store, &tasks_file, task.clone(), task.with_flag(Flag::Done))?;
        }
        Commands::Undo { id } => {
            let task = lookup(&store, id)?;
            update(&mut store, &tasks_file, task.clone(), task.with_flag(Flag::Pending))?;
        }
        Commands::Edit {
            id,
            name,
            start,
            end,
            priority,
        } => {
            let task = lookup(&store, id)?;
            let mut edited = task.clone();
            if let Some(name) = name {
                edited = edited.with_name(name);
            }
            if let Some(start) = start {
                edited = edited.with_start_time(parse_time(&start)?);
            }
            if let Some(end) = end {
                edited = edited.with_end_time(parse_time(&end)?);
            }
            if let Some(priority) = priority {
                edited = edited.with_priority(priority);
            }
            update(&mut store, &tasks_file, task, edited)?;
        }
        Commands::Remove { id } => {
            let task = remove(&mut store, id)?;
            save(&tasks_file, &store)?;
            println!("Removed task {}", task.id());
        }
        Commands::Renumber => {
            let mapping = store.renumber();
            save(&tasks_file, &store)?;
            let moved = mapping.iter().filter(|(old, new)| old != new).count();
            println!("Renumbered {} task(s), {} id(s) changed", mapping.len(), moved);
        }
    }

    Ok(())
}

fn lookup(store: &TaskIndex, id: u64) -> Result<TaskRecord> {
    store.get(TaskId(id)).ok_or_else(|| eyre!("No task with id {}", id))
}

fn remove(store: &mut TaskIndex, id: u64) -> Result<TaskRecord> {
    let task = lookup(store, id)?;
    if !store.remove(&task) {
        return Err(eyre!("Task {} changed while being removed", id));
    }
    Ok(task)
}

fn update(store: &mut TaskIndex, tasks_file: &Path, old: TaskRecord, new: TaskRecord) -> Result<()> {
    let changed = old.diff(&new).changed();
    if changed.is_empty() {
        println!("Task {} unchanged", old.id());
        return Ok(());
    }

    store.replace(&old, new.clone())?;
    save(tasks_file, store)?;
    println!("Updated task {} ({})", new.id(), changed.join(", "));
    print_rows(&[new]);
    Ok(())
}

fn save(tasks_file: &Path, store: &TaskIndex) -> Result<()> {
    save_tasks(tasks_file, &store.query().all())
        .wrap_err_with(|| format!("Failed to save {}", tasks_file.display()))?;
    Ok(())
}

fn parse_opt_time(input: Option<&str>) -> Result<i64> {
    input.map(parse_time).transpose().map(|t| t.unwrap_or_default())
}

fn print_rows(tasks: &[TaskRecord]) {
    for task in tasks {
        let row = format!(
            "{:>4}  {:<6}  {:<16}  {:<16}  {}",
            task.id().0,
            task.priority().to_string().to_lowercase(),
            format_time(task.start_time()),
            format_time(task.end_time()),
            task.name()
        );

        let row = match task.priority() {
            Priority::High => row.red(),
            Priority::Normal => row.normal(),
            Priority::Low => row.blue(),
        };

        if task.is_done() {
            println!("{}", row.dimmed().strikethrough());
        } else {
            println!("{}", row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_range_command() {
        let cli = Cli::try_parse_from(["taskindex", "range", "start", "0", "100"]).unwrap();
        match cli.command {
            Commands::Range { attribute, from, to } => {
                assert_eq!(attribute, Attribute::StartTime);
                assert_eq!(from, "0");
                assert_eq!(to, "100");
            }
            _ => panic!("expected range command"),
        }
    }

    #[test]
    fn test_parse_add_with_priority() {
        let cli = Cli::try_parse_from(["taskindex", "add", "Pay rent", "-p", "high", "--end", "2026-11-01"]).unwrap();
        match cli.command {
            Commands::Add { name, priority, end, .. } => {
                assert_eq!(name, "Pay rent");
                assert_eq!(priority, Priority::High);
                assert_eq!(end.as_deref(), Some("2026-11-01"));
            }
            _ => panic!("expected add command"),
        }
    }

    #[test]
    fn test_remove_reports_missing_task() {
        let mut store = TaskIndex::new();
        let task = store.create("a", 0, 0, Flag::Pending, Priority::Normal).unwrap();

        assert_eq!(remove(&mut store, task.id().0).unwrap(), task);
        assert!(store.is_empty());
        assert!(remove(&mut store, task.id().0).is_err());
    }

    #[test]
    fn test_update_rejects_id_collision() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("tasks.jsonl");
        let mut store = TaskIndex::new();
        let a = store.create("a", 0, 0, Flag::Pending, Priority::Normal).unwrap();
        let b = store.create("b", 0, 0, Flag::Pending, Priority::Normal).unwrap();

        let clash = a.clone().with_id(b.id()).with_name("clash");
        assert!(update(&mut store, &path, a.clone(), clash).is_err());
        assert_eq!(store.get(a.id()), Some(a));
        assert_eq!(store.get(b.id()), Some(b));
        assert!(!path.exists());
    }

    #[test]
    fn test_parse_opt_time() {
        assert_eq!(parse_opt_time(None).unwrap(), 0);
        assert_eq!(parse_opt_time(Some("42")).unwrap(), 42);
        assert!(parse_opt_time(Some("whenever")).is_err());
    }
}
