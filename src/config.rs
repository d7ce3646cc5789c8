use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::ipc::EVENT_MODULE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read bridge config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Module tag placed on every request envelope.
    pub module: String,
    /// Reject event names outside the allowed charset before sending anything.
    pub strict_names: bool,
    /// Include payload bodies in debug logs.
    pub log_payloads: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            module: EVENT_MODULE.to_string(),
            strict_names: false,
            log_payloads: false,
        }
    }
}

impl BridgeConfig {
    /// Loads the YAML file at `config_path`, falling back to defaults when no
    /// path is given or the file does not exist.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                Ok(serde_yaml::from_str(&contents)?)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn with_strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    pub fn with_log_payloads(mut self, enabled: bool) -> Self {
        self.log_payloads = enabled;
        self
    }
}
