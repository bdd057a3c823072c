// Per-attribute total orders over task records

use crate::record::{TaskId, TaskRecord};
use std::fmt;

/// An attribute the store keeps a sorted index for.
///
/// Adding an ordering means adding a variant here and a line in `Attribute::key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Name,
    StartTime,
    EndTime,
    Flag,
    Priority,
    /// Start time, falling back to end time when the start is unset
    Time,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::Name,
        Attribute::StartTime,
        Attribute::EndTime,
        Attribute::Flag,
        Attribute::Priority,
        Attribute::Time,
    ];

    /// Position of this attribute's index inside the store
    pub(crate) fn slot(self) -> usize {
        match self {
            Attribute::Name => 0,
            Attribute::StartTime => 1,
            Attribute::EndTime => 2,
            Attribute::Flag => 3,
            Attribute::Priority => 4,
            Attribute::Time => 5,
        }
    }

    /// Primary sort value of `record` under this attribute
    pub fn value_of(self, record: &TaskRecord) -> KeyValue {
        match self {
            Attribute::Name => KeyValue::Text(record.name().to_string()),
            Attribute::StartTime => KeyValue::Int(record.start_time()),
            Attribute::EndTime => KeyValue::Int(record.end_time()),
            Attribute::Flag => KeyValue::Int(record.flag().ordinal()),
            Attribute::Priority => KeyValue::Int(record.priority().ordinal()),
            Attribute::Time => KeyValue::Int(record.effective_time()),
        }
    }

    /// Full index key of `record`: primary value, then id
    pub fn key(self, record: &TaskRecord) -> IndexKey {
        IndexKey {
            value: self.value_of(record),
            id: record.id(),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attribute::Name => "name",
            Attribute::StartTime => "start_time",
            Attribute::EndTime => "end_time",
            Attribute::Flag => "flag",
            Attribute::Priority => "priority",
            Attribute::Time => "time",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Attribute {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(Attribute::Name),
            "start" | "start_time" => Ok(Attribute::StartTime),
            "end" | "end_time" => Ok(Attribute::EndTime),
            "flag" => Ok(Attribute::Flag),
            "priority" => Ok(Attribute::Priority),
            "time" => Ok(Attribute::Time),
            other => Err(eyre::eyre!("Unknown attribute: {}", other)),
        }
    }
}

/// Primary sort value of an ordering.
///
/// Integer values sort before text values, so a bound of the wrong kind for
/// an ordering never matches any record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    Int(i64),
    Text(String),
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        KeyValue::Int(value)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Text(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::Text(value)
    }
}

impl From<crate::record::Flag> for KeyValue {
    fn from(value: crate::record::Flag) -> Self {
        KeyValue::Int(value.ordinal())
    }
}

impl From<crate::record::Priority> for KeyValue {
    fn from(value: crate::record::Priority) -> Self {
        KeyValue::Int(value.ordinal())
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(i) => write!(f, "{}", i),
            KeyValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Entry of a sorted index: primary value first, id as the tie-break.
///
/// Field order matters: the derived `Ord` compares `value` then `id`, which
/// makes every ordering strict even when many records share a value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexKey {
    pub value: KeyValue,
    pub id: TaskId,
}

impl IndexKey {
    /// Sentinel that sorts before every real record holding `value`
    pub fn lower_sentinel(value: KeyValue) -> Self {
        Self { value, id: TaskId::MIN }
    }

    /// Sentinel that sorts after every real record holding `value`
    pub fn upper_sentinel(value: KeyValue) -> Self {
        Self { value, id: TaskId::MAX }
    }
}
