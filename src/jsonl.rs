// JSONL file operations for task persistence

use crate::record::{TaskId, TaskRecord};
use eyre::{Context, Result, eyre};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Read every task from a JSONL file, one record per line
///
/// A missing file yields no tasks. Blank lines are ignored and malformed lines
/// are skipped with a warning. Two lines carrying the same id reject the whole
/// file.
pub fn load_tasks(path: &Path) -> Result<Vec<TaskRecord>> {
    if !path.exists() {
        debug!(file = ?path, "Task file does not exist yet");
        return Ok(Vec::new());
    }

    let file = File::open(path).with_context(|| format!("Failed to open task file {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut tasks = Vec::new();
    let mut first_seen: HashMap<TaskId, usize> = HashMap::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line_num = line_num + 1;
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num,
                    error = ?e,
                    "Failed to read line, skipping"
                );
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let task: TaskRecord = match serde_json::from_str(&line) {
            Ok(t) => t,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num,
                    error = ?e,
                    "Failed to parse task, skipping"
                );
                continue;
            }
        };

        if let Some(previous) = first_seen.insert(task.id(), line_num) {
            return Err(eyre!(
                "Duplicate task id {} in {} (lines {} and {})",
                task.id(),
                path.display(),
                previous,
                line_num
            ));
        }

        tasks.push(task);
    }

    info!(file = ?path, count = tasks.len(), "Loaded tasks from JSONL");
    Ok(tasks)
}

/// Rewrite a JSONL file with exactly `tasks`
///
/// An exclusive lock on the sibling `<name>.jsonl.lock` file is taken before
/// anything is written and held until the rename is done. Lines go to a
/// sibling temporary file, are flushed to disk, then renamed over `path`.
pub fn save_tasks<'a, I>(path: &Path, tasks: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a TaskRecord>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("Failed to create task file directory")?;
        }
    }

    let lock_file = lock_path(path);
    let lock = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_file)
        .with_context(|| format!("Failed to open lock file {}", lock_file.display()))?;
    lock.lock_exclusive().context("Failed to acquire file lock")?;

    let tmp_path = path.with_extension("jsonl.tmp");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)
        .context("Failed to open temporary task file")?;

    let mut writer = BufWriter::new(&file);
    let mut count = 0;
    for task in tasks {
        let json = serde_json::to_string(task).context("Failed to serialize task")?;
        writeln!(writer, "{}", json)?;
        count += 1;
    }
    writer.flush()?;
    drop(writer);
    file.sync_all()?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to replace task file {}", path.display()))?;
    lock.unlock().context("Failed to release file lock")?;

    info!(file = ?path, count, "Saved tasks to JSONL");
    Ok(count)
}

/// Lock file guarding writers of `path`
pub fn lock_path(path: &Path) -> PathBuf {
    path.with_extension("jsonl.lock")
}
