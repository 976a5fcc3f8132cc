//! Pending-action bridge: one deferred action that survives a full reload.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::PathBuf,
};

use tracing::{debug, warn};

use crate::{action::Action, error::KeyValueError};

pub const PENDING_ACTION_KEY: &str = "pendingAction";

/// Durable string key/value slots (browser local storage, a file on disk).
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), KeyValueError>;
    fn remove(&mut self, key: &str) -> Result<(), KeyValueError>;
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), KeyValueError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KeyValueError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Stores every key in one JSON object file. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    path: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> KeyValueError {
        KeyValueError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, KeyValueError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), KeyValueError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
            }
        }
        let raw = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, raw).map_err(|err| self.io_error(err))
    }

    /// Like `load`, but a corrupt file reads as empty so writes replace it.
    fn load_for_write(&self) -> Result<BTreeMap<String, String>, KeyValueError> {
        match self.load() {
            Err(KeyValueError::Corrupt(error)) => {
                warn!(%error, path = %self.path.display(), "overwriting corrupt state file");
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), KeyValueError> {
        let mut values = self.load_for_write()?;
        values.insert(key.to_string(), value);
        self.persist(&values)
    }

    fn remove(&mut self, key: &str) -> Result<(), KeyValueError> {
        let (mut values, corrupt) = match self.load() {
            Ok(values) => (values, false),
            Err(KeyValueError::Corrupt(_)) => (BTreeMap::new(), true),
            Err(err) => return Err(err),
        };
        if values.remove(key).is_some() || corrupt {
            self.persist(&values)?;
        }
        Ok(())
    }
}

pub struct PendingActionBridge {
    storage: Box<dyn KeyValueStore>,
}

impl PendingActionBridge {
    pub fn new(storage: Box<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryKeyValueStore::default()))
    }

    /// Stores `action`, replacing whatever was pending.
    pub fn save(&mut self, action: &Action) -> Result<(), KeyValueError> {
        let raw = serde_json::to_string(action)?;
        self.storage.set(PENDING_ACTION_KEY, raw)?;
        debug!(action = action.tag(), "pending action saved");
        Ok(())
    }

    /// Reads and clears the pending action. The slot is cleared before the
    /// contents are parsed, so corrupt contents are dropped for good.
    pub fn take(&mut self) -> Option<Action> {
        let raw = match self.storage.get(PENDING_ACTION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error @ KeyValueError::Corrupt(_)) => {
                warn!(%error, "discarding corrupt pending action storage");
                if let Err(error) = self.storage.remove(PENDING_ACTION_KEY) {
                    warn!(%error, "failed to clear pending action");
                }
                return None;
            }
            Err(error) => {
                warn!(%error, "failed to read pending action");
                return None;
            }
        };

        if let Err(error) = self.storage.remove(PENDING_ACTION_KEY) {
            warn!(%error, "failed to clear pending action");
        }

        match serde_json::from_str::<Action>(&raw) {
            Ok(action) => Some(action),
            Err(error) => {
                warn!(%error, "discarding malformed pending action");
                None
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.storage.get(PENDING_ACTION_KEY), Ok(Some(_)))
    }
}
