//! Per-run append-only log mirrored to the console.
//!
//! Every workflow run gets a fresh timestamped file so operators can diff
//! runs after the fact. Logging is best-effort: a failed file append must
//! never take the workflow down.

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Severity tags written into each log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Success,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Success => "SUCCESS",
        }
    }
}

/// Append-only run log at a fixed path.
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Create a fresh `workflow.<timestamp>.log` under `dir`.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("create log dir {}", dir.display()))?;
        let name = format!("workflow.{}.log", Local::now().format("%Y%m%d_%H%M%S"));
        let path = dir.join(name);
        fs::write(&path, b"").with_context(|| format!("create log file {}", path.display()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log one `[timestamp] [LEVEL] message` line to console and file.
    pub fn log(&self, level: Level, message: &str) {
        let stamp = Local::now().format("%Y-%m-%dT%H:%M:%S%z");
        let entry = format!("[{stamp}] [{}] {message}", level.as_str());
        println!("{entry}");
        self.append(&entry);
    }

    /// Log a pretty-printed JSON payload after a header line.
    pub fn log_json<T: Serialize>(&self, title: &str, value: &T) {
        if !title.is_empty() {
            self.log(Level::Info, title);
        }
        match serde_json::to_string_pretty(value) {
            Ok(text) => {
                println!("{text}");
                self.append(&text);
            }
            Err(err) => self.log(Level::Warn, &format!("failed to serialize payload: {err}")),
        }
    }

    fn append(&self, text: &str) {
        let result = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{text}"));
        if let Err(err) = result {
            tracing::warn!("failed to append to {}: {err}", self.path.display());
        }
    }
}
