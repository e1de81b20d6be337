//! Node configuration as read from a TOML file.
//!
//! ```toml
//! [chain]
//! validator_update_interval = 200
//!
//! [forks]
//! signaled_forks = ["VIRTUAL_MACHINE"]
//!
//! [sync]
//! fast_sync = true
//! ```
//!
//! Missing sections and fields take their defaults.

use {
    crate::error::ConfigError,
    serde::{Deserialize, Serialize},
    std::{fs, path::Path},
    tessera_block_sync::SyncConfig,
    tessera_executor::ChainSpec,
    tessera_forks::ForkConfig,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub chain: ChainSpec,
    pub forks: ForkConfig,
    pub sync: SyncConfig,
}

impl NodeConfig {
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            chain: ChainSpec::dev_default(),
            forks: ForkConfig::dev_default(),
            sync: SyncConfig::dev_default(),
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chain
            .validate()
            .map_err(|err| ConfigError::ChainSpec(err.to_string()))?;
        self.forks.validate()?;
        self.sync.validate()?;
        Ok(())
    }
}
