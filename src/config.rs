//! Model configuration
//!
//! Layered loading: built-in defaults, then an optional TOML file (an
//! explicit path, `tessella.toml` in the working directory, or the XDG
//! config directory), then `TESSELLA`-prefixed environment variables.

use std::path::{Path, PathBuf};

use config_crate::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::version::DECIMAL_DOT;

/// A built-in library installed at model construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltinLibraryDef {
    pub name: String,
    pub namespace: String,
    pub prefix: String,
    /// Simple type names the library provides.
    #[serde(default)]
    pub simple_types: Vec<String>,
}

/// Settings a model is constructed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Whether event delivery starts enabled.
    #[serde(default = "default_events_enabled")]
    pub events_enabled: bool,
    /// Scheme id assigned to libraries registered without one.
    #[serde(default = "default_version_scheme")]
    pub default_version_scheme: String,
    /// Built-in libraries installed at construction.
    #[serde(default = "default_builtins")]
    pub builtins: Vec<BuiltinLibraryDef>,
}

fn default_events_enabled() -> bool {
    true
}

fn default_version_scheme() -> String {
    DECIMAL_DOT.to_string()
}

fn default_builtins() -> Vec<BuiltinLibraryDef> {
    vec![BuiltinLibraryDef {
        name: "TessellaPrimitives".to_string(),
        namespace: "http://schemas.tessella.dev/primitives/v1".to_string(),
        prefix: "tsp".to_string(),
        simple_types: [
            "boolean", "integer", "decimal", "string", "date", "dateTime", "binary",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    }]
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            events_enabled: default_events_enabled(),
            default_version_scheme: default_version_scheme(),
            builtins: default_builtins(),
        }
    }
}

impl ModelConfig {
    /// Load from the default locations and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration. With an explicit path the file must exist;
    /// otherwise the default locations are all optional and the result
    /// falls back to defaults plus environment overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        match path {
            Some(file) => {
                builder = builder.add_source(File::from(file.to_path_buf()));
            }
            None => {
                builder = builder.add_source(File::with_name("tessella").required(false));
                if let Some(xdg) = Self::xdg_config_path() {
                    builder = builder.add_source(File::from(xdg).required(false));
                }
            }
        }
        builder = builder.add_source(Environment::with_prefix("TESSELLA").separator("__"));
        let settings = builder.build()?;
        let config: ModelConfig = settings.try_deserialize()?;
        debug!(?path, "configuration loaded");
        Ok(config)
    }

    fn xdg_config_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "tessella", "tessella")
            .map(|dirs| dirs.config_dir().join("tessella.toml"))
    }

    /// Write the configuration as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let rendered = toml::to_string_pretty(self)?;
        std::fs::write(path, rendered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::default();
        assert!(config.events_enabled);
        assert_eq!(config.default_version_scheme, DECIMAL_DOT);
        assert_eq!(config.builtins.len(), 1);
        assert_eq!(config.builtins[0].name, "TessellaPrimitives");
        assert!(config.builtins[0].simple_types.contains(&"string".to_string()));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tessella.toml");

        let mut config = ModelConfig::default();
        config.events_enabled = false;
        config.builtins.clear();
        config.save(&path).unwrap();

        let loaded = ModelConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tessella.toml");
        std::fs::write(&path, "events_enabled = false\n").unwrap();

        let loaded = ModelConfig::load_from(Some(&path)).unwrap();
        assert!(!loaded.events_enabled);
        assert_eq!(loaded.default_version_scheme, DECIMAL_DOT);
        assert_eq!(loaded.builtins.len(), 1);
    }

    #[test]
    fn test_explicit_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(ModelConfig::load_from(Some(&path)).is_err());
    }
}
