// TaskIndex - In-memory task store kept in several synchronized sorted orders

pub mod config;
pub mod filter;
pub mod jsonl;
pub mod ordering;
pub mod query;
pub mod record;
pub mod store;
pub mod timefmt;

// Re-export main types for convenience
pub use config::Config;
pub use filter::Filter;
pub use ordering::{Attribute, IndexKey, KeyValue};
pub use query::{QueryEngine, SortedDump};
pub use record::{AttributeDiff, Flag, IdAllocator, Priority, TIME_UNSET, TaskId, TaskRecord};
pub use store::TaskIndex;
