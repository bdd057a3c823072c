// Task records and id allocation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp value meaning "no time set"
pub const TIME_UNSET: i64 = 0;

/// Creation-order identifier of a task, the universal tie-breaker of every ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    pub const MIN: TaskId = TaskId(u64::MIN);
    pub const MAX: TaskId = TaskId(u64::MAX);
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion flag. Ordinal order: pending before done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flag {
    #[default]
    Pending,
    Done,
}

impl Flag {
    pub fn ordinal(self) -> i64 {
        match self {
            Flag::Pending => 0,
            Flag::Done => 1,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Pending => write!(f, "PENDING"),
            Flag::Done => write!(f, "DONE"),
        }
    }
}

/// Task priority. Ordinal order: high, normal, low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub fn ordinal(self) -> i64 {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "HIGH"),
            Priority::Normal => write!(f, "NORMAL"),
            Priority::Low => write!(f, "LOW"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "normal" | "n" => Ok(Priority::Normal),
            "low" | "l" => Ok(Priority::Low),
            other => Err(eyre::eyre!("Unknown priority: {} (expected high/normal/low)", other)),
        }
    }
}

/// A single task.
///
/// Fields are private so that a record held by a caller can never have its
/// ordering attributes changed behind the store's back. Edits go through the
/// `with_*` methods, which return a new value to hand to `TaskIndex::replace`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    id: TaskId,
    name: String,
    #[serde(default)]
    start_time: i64,
    #[serde(default)]
    end_time: i64,
    #[serde(default)]
    flag: Flag,
    #[serde(default)]
    priority: Priority,
}

impl TaskRecord {
    /// Build a record with an explicit id (loading, or ids minted by an `IdAllocator`)
    pub fn new(
        id: TaskId,
        name: impl Into<String>,
        start_time: i64,
        end_time: i64,
        flag: Flag,
        priority: Priority,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            start_time,
            end_time,
            flag,
            priority,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    pub fn flag(&self) -> Flag {
        self.flag
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// A task without an end time
    pub fn is_floating(&self) -> bool {
        self.end_time == TIME_UNSET
    }

    pub fn is_done(&self) -> bool {
        self.flag == Flag::Done
    }

    /// Start time if set, otherwise end time
    pub fn effective_time(&self) -> i64 {
        if self.start_time != TIME_UNSET {
            self.start_time
        } else {
            self.end_time
        }
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_start_time(mut self, start_time: i64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_end_time(mut self, end_time: i64) -> Self {
        self.end_time = end_time;
        self
    }

    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flag = flag;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Equality of every visible attribute, ignoring the id
    pub fn attributes_eq(&self, other: &TaskRecord) -> bool {
        self.diff(other).attributes_match()
    }

    /// Per-attribute comparison against another record
    pub fn diff(&self, other: &TaskRecord) -> AttributeDiff {
        AttributeDiff {
            name: self.name == other.name,
            start_time: self.start_time == other.start_time,
            end_time: self.end_time == other.end_time,
            flag: self.flag == other.flag,
            priority: self.priority == other.priority,
            id: self.id == other.id,
        }
    }
}

impl fmt::Display for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}|{}",
            self.id, self.name, self.start_time, self.end_time, self.flag, self.priority
        )
    }
}

/// Which attributes two records share. `true` means equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDiff {
    pub name: bool,
    pub start_time: bool,
    pub end_time: bool,
    pub flag: bool,
    pub priority: bool,
    pub id: bool,
}

impl AttributeDiff {
    pub fn attributes_match(&self) -> bool {
        self.name && self.start_time && self.end_time && self.flag && self.priority
    }

    /// Names of the attributes that differ, id excluded
    pub fn changed(&self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if !self.name {
            changed.push("name");
        }
        if !self.start_time {
            changed.push("start_time");
        }
        if !self.end_time {
            changed.push("end_time");
        }
        if !self.flag {
            changed.push("flag");
        }
        if !self.priority {
            changed.push("priority");
        }
        changed
    }
}

/// Hands out strictly increasing task ids
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start allocating at `next`
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// The id the next call to `allocate` will return
    pub fn peek(&self) -> TaskId {
        TaskId(self.next)
    }

    /// Next id. Fails once every id below the reserved `TaskId::MAX` is used.
    pub fn allocate(&mut self) -> eyre::Result<TaskId> {
        let id = TaskId(self.next);
        if id == TaskId::MAX {
            return Err(eyre::eyre!("Task ids exhausted"));
        }
        self.next += 1;
        Ok(id)
    }

    /// Make sure `id` is never handed out again. Never moves backwards.
    pub fn fast_forward_past(&mut self, id: TaskId) {
        if id.0 >= self.next {
            self.next = id.0.saturating_add(1);
        }
    }

    pub(crate) fn reset(&mut self, next: u64) {
        self.next = next;
    }
}
