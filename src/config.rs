//! Vault configuration.
//!
//! ```yaml
//! logger:
//!   enable: true
//!   level: debug
//!   format: compact
//! management:
//!   kind: local
//!   directory: /var/lib/ontology-vault/management
//! repositories:
//!   home_directory: /var/lib/ontology-vault/repositories
//! reasoner:
//!   inference:
//!     class_hierarchy: true
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{management::ManagementGraphs, ontology::vocabulary, pool::PoolSettings, Error, Result};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logger: Logger,
    pub graphs: ManagementGraphs,
    pub management: ManagementBackend,
    pub repositories: RepositorySettings,
    pub reasoner: ReasonerSettings,
}

impl Config {
    /// Parses a YAML document.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the document is not valid configuration.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reads and parses a YAML file.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&content)
    }
}

/// Logger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Logger {
    pub enable: bool,
    pub level: LogLevel,
    pub format: LogFormat,
    /// Replaces the default filter, e.g. `ontology_vault=trace,warn`.
    pub override_filter: Option<String>,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            enable: true,
            level: LogLevel::Info,
            format: LogFormat::Compact,
            override_filter: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Where the management store keeps its statements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManagementBackend {
    #[default]
    InMemory,
    Local { directory: PathBuf },
}

/// Placement of pooled repositories and naming of inferred ontologies.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositorySettings {
    pub home_directory: PathBuf,
    /// New repositories go to this remote service when set.
    pub remote_server_url: Option<String>,
    pub inferred_prefix: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        let pool = PoolSettings::default();
        Self {
            home_directory: pool.home_directory,
            remote_server_url: pool.remote_server_url,
            inferred_prefix: vocabulary::DEFAULT_INFERRED_PREFIX.to_string(),
        }
    }
}

impl RepositorySettings {
    #[must_use]
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            home_directory: self.home_directory.clone(),
            remote_server_url: self.remote_server_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonerBackend {
    #[default]
    Native,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReasonerSettings {
    pub backend: ReasonerBackend,
    pub inference: InferenceSettings,
}

/// Toggles for the native reasoner.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceSettings {
    pub class_hierarchy: bool,
    pub property_hierarchy: bool,
    pub type_propagation: bool,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            class_hierarchy: true,
            property_hierarchy: true,
            type_propagation: true,
        }
    }
}
