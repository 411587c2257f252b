//! Small key-value store backed by one JSON file per key.
//!
//! Reads never fail: a missing or corrupt entry falls back to the caller's
//! default and is logged. Writes report errors to the caller.

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::message::Message;

pub const MESSAGES_KEY: &str = "f1_qa_messages";
pub const SETTINGS_KEY: &str = "f1_qa_settings";

/// Most recent messages kept on disk and restored on startup.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the platform data directory (`<data_dir>/f1qa`).
    pub fn open_default() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;
        Ok(Self::new(data_dir.join("f1qa")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let contents = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "ignoring unreadable stored value");
                None
            }
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let contents = serde_json::to_string(value)?;
        fs::write(self.path_for(key), contents)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Persist the tail of the conversation.
    pub fn save_history(&self, messages: &[Message]) -> Result<()> {
        let start = messages.len().saturating_sub(HISTORY_LIMIT);
        self.save(MESSAGES_KEY, &messages[start..])
    }

    pub fn load_history(&self) -> Vec<Message> {
        let mut messages: Vec<Message> = self.get_or(MESSAGES_KEY, Vec::new());
        let start = messages.len().saturating_sub(HISTORY_LIMIT);
        messages.drain(..start);
        messages
    }
}
