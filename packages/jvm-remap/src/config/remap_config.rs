//! Remap configuration (YAML schema v1)
//!
//! ```yaml
//! version: 1
//! mappings: [runtime.tiny, mod.tiny]
//! anchor_namespace: intermediary
//! source_namespace: named
//! target_namespace: intermediary
//! classpath: [runtime.jar]
//! parallel:
//!   num_workers: 0
//!   stack_size_mb: 8
//! ```

use super::error::{ConfigError, ConfigResult};
use super::parallel::ParallelConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SUPPORTED_VERSIONS: &[u32] = &[1];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemapConfig {
    /// Schema version (always 1 for v1)
    pub version: u32,

    /// Mapping files, merged in this order
    pub mappings: Vec<PathBuf>,

    /// Namespace shared by every mapping file
    pub anchor_namespace: String,

    pub source_namespace: String,

    pub target_namespace: String,

    /// Reference artifacts (in the source namespace) for hierarchy lookups
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classpath: Vec<PathBuf>,

    #[serde(default)]
    pub parallel: ParallelConfig,
}

impl RemapConfig {
    pub fn new(
        mappings: Vec<PathBuf>,
        anchor_namespace: impl Into<String>,
        source_namespace: impl Into<String>,
        target_namespace: impl Into<String>,
    ) -> Self {
        Self {
            version: 1,
            mappings,
            anchor_namespace: anchor_namespace.into(),
            source_namespace: source_namespace.into(),
            target_namespace: target_namespace.into(),
            classpath: Vec::new(),
            parallel: ParallelConfig::default(),
        }
    }

    pub fn with_classpath(mut self, classpath: Vec<PathBuf>) -> Self {
        self.classpath = classpath;
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load and validate a YAML configuration file.
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(content)?;
        let version = match raw.get("version") {
            None | Some(serde_yaml::Value::Null) => return Err(ConfigError::MissingVersion),
            Some(value) => value.as_u64().unwrap_or(0) as u32,
        };
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let config: Self = serde_yaml::from_value(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self).map_err(ConfigError::Yaml)
    }

    /// Fail fast on absent settings, before any mapping file is read.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.mappings.is_empty() {
            return Err(ConfigError::missing(
                "mappings",
                "List at least one mapping file to merge.",
            ));
        }
        for (field, value) in [
            ("anchor_namespace", &self.anchor_namespace),
            ("source_namespace", &self.source_namespace),
            ("target_namespace", &self.target_namespace),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::missing(
                    field,
                    "Namespaces must name a column of the mapping files.",
                ));
            }
        }
        self.parallel.validate()
    }
}
