// List filters translated from user-facing words into store queries

use crate::ordering::Attribute;
use crate::query::QueryEngine;
use crate::record::{Flag, Priority, TaskRecord};
use eyre::{Result, eyre};
use std::str::FromStr;

/// Which tasks a `list` shows, and in what order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// Every task, in creation order
    All,
    /// Tasks not yet done
    #[default]
    Pending,
    /// Tasks marked done
    Done,
    /// Every task, ordered high to low priority
    ByPriority,
    /// Tasks with exactly this priority
    Priority(Priority),
    /// Every task, ordered by start time (end time when no start is set)
    Agenda,
}

impl Filter {
    /// Run this filter against the store
    pub fn apply(self, query: &QueryEngine<'_>) -> Vec<TaskRecord> {
        match self {
            Filter::All => query.all(),
            Filter::Pending => query.search_flag(Flag::Pending),
            Filter::Done => query.search_flag(Flag::Done),
            Filter::ByPriority => query.sorted_dump(Attribute::Priority).collect(),
            Filter::Priority(priority) => query.search_priority(priority),
            Filter::Agenda => query.sorted_dump(Attribute::Time).collect(),
        }
    }
}

impl FromStr for Filter {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "pending" | "undone" | "" => Ok(Filter::Pending),
            "done" => Ok(Filter::Done),
            "priority" | "p" => Ok(Filter::ByPriority),
            "agenda" | "time" => Ok(Filter::Agenda),
            other => other
                .parse::<Priority>()
                .map(Filter::Priority)
                .map_err(|_| eyre!("Unknown filter: {} (expected all, pending, done, priority, agenda or high/normal/low)", s)),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "all"),
            Filter::Pending => write!(f, "pending"),
            Filter::Done => write!(f, "done"),
            Filter::ByPriority => write!(f, "priority"),
            Filter::Priority(p) => write!(f, "{}", p.to_string().to_lowercase()),
            Filter::Agenda => write!(f, "agenda"),
        }
    }
}
