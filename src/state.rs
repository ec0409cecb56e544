//! Shared workflow state persisted as pretty-printed JSON.
//!
//! Every step runs as a separate process, so accumulated identifiers live in
//! one JSON object on disk. Access discipline is read fully, mutate in
//! memory, overwrite fully; the sequencer is the single writer.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const OPPORTUNITY_ID: &str = "OPPORTUNITY_ID";
pub const SOLUTION_ID: &str = "SOLUTION_ID";
pub const PRODUCT_ID: &str = "PRODUCT_ID";
pub const PRODUCT_CHANGESET_ID: &str = "PRODUCT_CHANGESET_ID";
pub const OFFER_CHANGESET_ID: &str = "OFFER_CHANGESET_ID";
pub const OFFER_ID: &str = "OFFER_ID";
pub const OFFER_ARN: &str = "OFFER_ARN";

/// Load/save endpoint for one state file path.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state file. Missing, unreadable, or malformed files yield an
    /// empty map; callers treat absent keys as "not set".
    pub fn load(&self) -> BTreeMap<String, String> {
        let Ok(bytes) = fs::read(&self.path) else {
            return BTreeMap::new();
        };
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
            tracing::warn!("ignoring malformed state file {}", self.path.display());
            return BTreeMap::new();
        };
        let Some(object) = value.as_object() else {
            tracing::warn!("ignoring non-object state file {}", self.path.display());
            return BTreeMap::new();
        };
        object
            .iter()
            .filter_map(|(key, value)| {
                value
                    .as_str()
                    .map(|text| (key.clone(), text.to_string()))
            })
            .collect()
    }

    /// Overwrite the state file with the full mapping, atomically relative
    /// to this process.
    pub fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let text = serde_json::to_string_pretty(values).context("serialize shared state")?;
        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = dir {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let mut staged = match dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new_in("."),
        }
        .context("stage state file")?;
        staged
            .write_all(text.as_bytes())
            .context("write staged state")?;
        staged
            .persist(&self.path)
            .with_context(|| format!("persist {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory view of the shared state with write-through mutation.
pub struct WorkflowState {
    store: StateStore,
    values: BTreeMap<String, String>,
}

impl WorkflowState {
    pub fn load(store: StateStore) -> Self {
        let values = store.load();
        Self { store, values }
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Set one key and rewrite the file in full.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.store.save(&self.values)
    }

    /// Remove one key and rewrite the file in full.
    pub fn unset(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        self.store.save(&self.values)
    }
}
