use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    core::utils::{ensure_dir, PathResolver},
    currency::{CurrencyCode, CurrencyTable},
    errors::{Result, SplitError},
    ledger::ParticipantId,
    storage::json_backend::replace_file,
};

const DEFAULT_LOG_FILTER: &str = "budgetwise_core=info";
const DEFAULT_ACTING_EMAIL: &str = "you@budgetwise.local";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Attempts per row write before a persistence error is surfaced.
    #[serde(default = "PersistenceConfig::default_max_attempts")]
    pub max_attempts: u32,
}

impl PersistenceConfig {
    fn default_max_attempts() -> u32 {
        DEFAULT_MAX_ATTEMPTS
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Used when the storage session reports no signed-in user.
    pub acting_user: ParticipantId,
    pub acting_email: String,
    pub display_currency: CurrencyCode,
    pub persistence: PersistenceConfig,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            acting_user: ParticipantId::acting_default(),
            acting_email: DEFAULT_ACTING_EMAIL.into(),
            display_currency: CurrencyCode::default(),
            persistence: PersistenceConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

impl Config {
    pub fn validate(&self, currencies: &CurrencyTable) -> Result<()> {
        if self.acting_user.as_str().trim().is_empty() {
            return Err(SplitError::Config("acting_user must not be empty".into()));
        }
        if self.persistence.max_attempts == 0 {
            return Err(SplitError::Config(
                "persistence.max_attempts must be at least 1".into(),
            ));
        }
        if !currencies.contains(self.display_currency.as_str()) {
            return Err(SplitError::Config(format!(
                "currency `{}` is not in the currency table",
                self.display_currency
            )));
        }
        Ok(())
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::from_base(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        Self::from_base(base)
    }

    fn from_base(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        ensure_dir(&PathResolver::config_dir_in(&base))?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        serde_json::from_str(&data).map_err(|err| {
            SplitError::Config(format!("{} is malformed: {}", self.path.display(), err))
        })
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        replace_file(&self.path, &json)
    }
}
