use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{engine, errors::BillingError, storage::paths};

/// Front-end presentation settings: the slip masthead, the signature block,
/// and the labor percent used when a caller does not pass one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub title: String,
    pub signature: String,
    pub labor_percent_default: Decimal,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "SRI VIJAYA DURGA COCONUT TRADERS".into(),
            signature: "(S RamaPrasad)".into(),
            labor_percent_default: engine::default_labor_percent(),
        }
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, BillingError> {
        Self::from_base(paths::app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, BillingError> {
        Self::from_base(base)
    }

    fn from_base(base: PathBuf) -> Result<Self, BillingError> {
        fs::create_dir_all(&base)?;
        Ok(Self {
            path: paths::config_file_in(&base),
        })
    }

    /// Loads the configuration, falling back to defaults when no file exists.
    pub fn load(&self) -> Result<Config, BillingError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Config::default())
        }
    }

    /// Saves the configuration atomically by staging to a temporary file.
    pub fn save(&self, config: &Config) -> Result<(), BillingError> {
        let json = serde_json::to_string_pretty(config)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
