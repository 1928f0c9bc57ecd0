//! # Application Configuration
//!
//! Settings loaded from a single YAML file. Every field has a default, so a
//! missing file or a partial one is fine.
//!
//! ## YAML Format
//!
//! ```yaml
//! data_directory: "/home/me/Documents/Finance Tracker"
//! auth:
//!   dev_bypass_allowed: false
//!   dev_user_id: "dev-user"
//! low_balance:
//!   cooldown_hours: 24
//!   thresholds:
//!     bank: 500.0
//!     wallet: 100.0
//! usage_reset:
//!   check_interval_secs: 300
//! ```

use anyhow::{Context, Result};
use chrono::Duration;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the table files and the settings store
    pub data_directory: PathBuf,
    pub auth: AuthConfig,
    pub low_balance: LowBalanceConfig,
    pub usage_reset: UsageResetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Whether the development sign-in bypass may be honored at all
    pub dev_bypass_allowed: bool,
    pub dev_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowBalanceConfig {
    pub cooldown_hours: u32,
    /// Default threshold per domain (`bank`, `card`, `wallet`, ...)
    pub thresholds: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageResetConfig {
    pub check_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            auth: AuthConfig::default(),
            low_balance: LowBalanceConfig::default(),
            usage_reset: UsageResetConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            dev_bypass_allowed: false,
            dev_user_id: "dev-user".to_string(),
        }
    }
}

impl Default for LowBalanceConfig {
    fn default() -> Self {
        let thresholds = [
            ("bank", 500.0),
            ("card", 1000.0),
            ("prepaid", 100.0),
            ("vault", 200.0),
            ("wallet", 100.0),
            ("pos", 0.0),
        ]
        .into_iter()
        .map(|(domain, threshold)| (domain.to_string(), threshold))
        .collect();

        Self {
            cooldown_hours: 24,
            thresholds,
        }
    }
}

impl Default for UsageResetConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 300,
        }
    }
}

/// `$HOME/Documents/Finance Tracker`, or a relative `data` directory when
/// no home directory is known
fn default_data_directory() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join("Documents").join("Finance Tracker"),
        None => PathBuf::from("data"),
    }
}

impl AppConfig {
    /// Load from `path`, falling back to defaults if the file does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let yaml_content =
            fs::read_to_string(path).with_context(|| format!("reading config file {:?}", path))?;
        let config: AppConfig = serde_yaml::from_str(&yaml_content)
            .with_context(|| format!("parsing config file {:?}", path))?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::hours(i64::from(self.low_balance.cooldown_hours))
    }

    /// Default low-balance threshold for `domain`, if one is configured
    pub fn threshold_for(&self, domain: &str) -> Option<f64> {
        self.low_balance.thresholds.get(domain).copied()
    }

    pub fn kv_path(&self) -> PathBuf {
        self.data_directory.join("settings.yaml")
    }
}
