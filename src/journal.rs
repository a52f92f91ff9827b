//! JSONL command journal.
//!
//! Every dispatched command is recorded as a single line in the configured
//! log file (`logs/<logfile>`), and mirrored as a `tracing` event. Writes are
//! best-effort: a broken sink never fails the caller.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{error, info, warn};

/// The Logger collaborator consumed by the runtime.
pub trait CommandLog {
    /// A command ran and produced `output`.
    fn log_info(&mut self, command: &str, output: &str);
    /// A command failed with a kind it declared recoverable.
    fn log_warn(&mut self, command: &str, trace: &str);
    /// A command failed and the runtime is going down.
    fn log_error(&mut self, command: &str, trace: &str);
    /// Flush and release the sink.
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "UPPERCASE")]
enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Serialize)]
struct JournalEntry<'a> {
    ts_ms: u64,
    level: Level,
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commands_run: Option<usize>,
}

/// File-backed (or console-only) command journal.
pub struct Journal {
    sink: Option<BufWriter<File>>,
    commands_run: usize,
    closed: bool,
}

impl Journal {
    /// Journal that only emits `tracing` events.
    pub fn console() -> Self {
        let mut journal = Self {
            sink: None,
            commands_run: 0,
            closed: false,
        };
        journal.write(Level::Info, "opened", None, None, None);
        journal
    }

    /// Journal appending to `path`, creating it (and its directory) if needed.
    pub fn to_file(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut journal = Self {
            sink: Some(BufWriter::new(file)),
            commands_run: 0,
            closed: false,
        };
        journal.write(Level::Info, "opened", None, None, None);
        Ok(journal)
    }

    /// Number of commands that ran successfully since the journal was opened.
    pub fn commands_run(&self) -> usize {
        self.commands_run
    }

    fn write(
        &mut self,
        level: Level,
        event: &str,
        command: Option<&str>,
        detail: Option<&str>,
        commands_run: Option<usize>,
    ) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let entry = JournalEntry {
            ts_ms: now_ms(),
            level,
            event,
            command,
            detail,
            commands_run,
        };
        if let Ok(json) = serde_json::to_string(&entry) {
            let _ = writeln!(sink, "{json}");
            let _ = sink.flush();
        }
    }
}

impl CommandLog for Journal {
    fn log_info(&mut self, command: &str, output: &str) {
        info!(command, output, "Ran command");
        self.commands_run += 1;
        self.write(Level::Info, "ran", Some(command), Some(output), None);
    }

    fn log_warn(&mut self, command: &str, trace: &str) {
        warn!(command, "Command threw a recoverable exception:\n    {}", indent(trace));
        self.write(Level::Warn, "failed", Some(command), Some(trace), None);
    }

    fn log_error(&mut self, command: &str, trace: &str) {
        error!(command, "Command threw an exception:\n    {}", indent(trace));
        self.write(Level::Error, "failed", Some(command), Some(trace), None);
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        info!(commands_run = self.commands_run, "Journal closed");
        let count = self.commands_run;
        self.write(Level::Info, "closed", None, None, Some(count));
        self.sink = None;
    }
}

fn indent(trace: &str) -> String {
    trace.replace('\n', "\n    ")
}

fn now_ms() -> u64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn read_entries(path: &Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_journal_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("xavier.log");

        let mut journal = Journal::to_file(&path).unwrap();
        journal.log_info("neat", "Played neat.");
        journal.log_info("date", "Monday, December 17.");
        journal.log_warn("joke", "ConnectionError: request failed");
        journal.log_error("weather", "InvalidResponse: bad json\ncaused by: eof");
        journal.close();

        let entries = read_entries(&path);
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0]["event"], "opened");
        assert_eq!(entries[1]["level"], "INFO");
        assert_eq!(entries[1]["command"], "neat");
        assert_eq!(entries[1]["detail"], "Played neat.");
        assert_eq!(entries[3]["level"], "WARN");
        assert_eq!(entries[4]["level"], "ERROR");
        assert_eq!(entries[5]["event"], "closed");
        assert_eq!(entries[5]["commands_run"], 2);
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xavier.log");

        let mut journal = Journal::to_file(&path).unwrap();
        journal.close();
        journal.close();
        journal.log_info("late", "ignored by the sink");

        let entries = read_entries(&path);
        assert_eq!(entries.len(), 2);
        assert_eq!(journal.commands_run(), 1);
    }

    #[test]
    fn test_appends_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xavier.log");

        Journal::to_file(&path).unwrap().close();
        Journal::to_file(&path).unwrap().close();

        assert_eq!(read_entries(&path).len(), 4);
    }

    #[test]
    fn test_console_journal_counts() {
        let mut journal = Journal::console();
        journal.log_info("why", "Played why.");
        journal.close();
        assert_eq!(journal.commands_run(), 1);
    }
}
