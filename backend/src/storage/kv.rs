//! # Key/Value Stores
//!
//! Durable client-side storage: plain string keys and values, no schema.
//! `YamlKeyValueStore` keeps everything in a single YAML file in the data
//! directory, written atomically through a temp file.

use anyhow::Result;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::traits::KeyValueStore;

/// Well-known keys
pub mod keys {
    pub const THEME: &str = "theme";
    pub const BALANCE_VISIBILITY: &str = "balance_visibility";
    pub const DEV_AUTH_BYPASS: &str = "dev_auth_bypass";

    /// Last `period` ("daily" or "monthly") whose usage counters were reset for `owner`
    pub fn usage_reset(period: &str, owner: &str) -> String {
        format!("usage_reset:{}:{}", period, owner)
    }

    /// Last time a low-balance alert fired for an entity
    pub fn low_balance_notified(domain: &str, id: &str) -> String {
        format!("low_balance_notified:{}:{}", domain, id)
    }
}

#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

pub struct YamlKeyValueStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl YamlKeyValueStore {
    /// Open the store at `path`, starting empty if the file does not exist or
    /// cannot be parsed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_yaml::from_str::<BTreeMap<String, String>>(&content) {
                Ok(values) => {
                    debug!("Loaded {} stored values from {:?}", values.len(), path);
                    values
                }
                Err(e) => {
                    warn!("Ignoring unreadable key/value file {:?}: {}", path, e);
                    BTreeMap::new()
                }
            }
        } else {
            info!("No key/value file at {:?}, starting empty", path);
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let yaml_content = serde_yaml::to_string(values)?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, yaml_content)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for YamlKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}
