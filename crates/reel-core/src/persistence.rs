//! Persisted user settings
//!
//! Volume and mute survive across sessions. The session reads every stored
//! setting once at construction and writes single keys on change.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Durable per-user settings storage
pub trait SettingsStore: Send {
    /// All stored settings
    fn load(&self) -> Result<Map<String, Value>>;

    /// Store a single setting
    fn save(&mut self, key: &str, value: Value) -> Result<()>;
}

/// In-memory store. Clones share the same settings.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    settings: Arc<Mutex<Map<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `settings`
    pub fn with_settings(settings: Map<String, Value>) -> Self {
        Self {
            settings: Arc::new(Mutex::new(settings)),
        }
    }

    /// Current value of a setting
    pub fn get(&self, key: &str) -> Option<Value> {
        self.settings.lock().ok()?.get(key).cloned()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Map<String, Value>> {
        self.settings
            .lock()
            .map(|settings| settings.clone())
            .map_err(|e| Error::persistence("*", e))
    }

    fn save(&mut self, key: &str, value: Value) -> Result<()> {
        let mut settings = self.settings.lock().map_err(|e| Error::persistence(key, e))?;
        settings.insert(key.to_string(), value);
        Ok(())
    }
}

/// Settings kept as a JSON object in a file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content)? {
            Value::Object(settings) => Ok(settings),
            _ => Err(Error::persistence(
                "*",
                format!("{} does not contain a JSON object", self.path.display()),
            )),
        }
    }

    fn save(&mut self, key: &str, value: Value) -> Result<()> {
        let mut settings = self.load()?;
        settings.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(&Value::Object(settings))?;
        std::fs::write(&self.path, content)?;

        debug!(key, path = %self.path.display(), "Setting saved");
        Ok(())
    }
}
