//! Command frequency store.
//!
//! Counts how often each exact command string has been issued. Drives the
//! "check preferences" reply and the suggestion list.
//!
//! The JSON backend reads the whole document and rewrites it on every
//! update through a temp file and rename. A missing or malformed file is an
//! empty store, never an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

/// Command string -> number of times issued
pub type CommandCounts = BTreeMap<String, u64>;

/// Reply used when nothing has been recorded yet
pub const NO_COMMANDS_YET: &str = "None yet.";

/// On-disk document layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub frequent_commands: CommandCounts,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode user data: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persisted command counters
pub trait FrequencyStore: Send + Sync {
    /// Snapshot of every counter
    fn counts(&self) -> CommandCounts;

    /// Increment the counter for `command`, returning the new count
    fn record(&self, command: &str) -> Result<u64, StoreError>;

    /// Highest-count command. Ties go to the lexicographically smallest.
    fn most_frequent(&self) -> Option<(String, u64)> {
        most_frequent(&self.counts())
    }

    /// Up to `limit` commands, most frequent first
    fn top(&self, limit: usize) -> Vec<String> {
        top_commands(&self.counts(), limit)
    }
}

pub fn most_frequent(counts: &CommandCounts) -> Option<(String, u64)> {
    let mut best: Option<(&String, u64)> = None;
    for (command, &count) in counts {
        if count > best.map_or(0, |(_, c)| c) {
            best = Some((command, count));
        }
    }
    best.map(|(command, count)| (command.clone(), count))
}

pub fn top_commands(counts: &CommandCounts, limit: usize) -> Vec<String> {
    let mut ranked: Vec<(&String, u64)> = counts.iter().map(|(c, n)| (c, *n)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(command, _)| command.clone())
        .collect()
}

/// Store backed by a single JSON file
pub struct JsonFrequencyStore {
    path: PathBuf,
    // Serializes read-modify-write within this process only
    write_lock: Mutex<()>,
}

impl JsonFrequencyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> UserData {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No user data at {}, starting empty", self.path.display());
                return UserData::default();
            }
            Err(e) => {
                warn!("Cannot read {}: {}, treating as empty", self.path.display(), e);
                return UserData::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(data) => data,
            Err(e) => {
                warn!("Malformed user data in {}: {}, treating as empty", self.path.display(), e);
                UserData::default()
            }
        }
    }

    fn save(&self, data: &UserData) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(data)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        // Readers see either the old document or the new one, never a partial write
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(write_err)?;
        fs::rename(&temp_path, &self.path).map_err(write_err)
    }
}

impl FrequencyStore for JsonFrequencyStore {
    fn counts(&self) -> CommandCounts {
        self.load().frequent_commands
    }

    fn record(&self, command: &str) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut data = self.load();
        let count = data
            .frequent_commands
            .entry(command.to_string())
            .or_insert(0);
        *count += 1;
        let count = *count;

        self.save(&data)?;
        Ok(count)
    }
}

/// Store kept in memory, used by tests and `voxad --ephemeral`
#[derive(Default)]
pub struct MemoryFrequencyStore {
    counts: Mutex<CommandCounts>,
}

impl MemoryFrequencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counts(counts: CommandCounts) -> Self {
        Self {
            counts: Mutex::new(counts),
        }
    }
}

impl FrequencyStore for MemoryFrequencyStore {
    fn counts(&self) -> CommandCounts {
        self.counts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, command: &str) -> Result<u64, StoreError> {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        let count = counts.entry(command.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}
