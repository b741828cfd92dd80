// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Configuration management for the loader.
//!
//! Layers, later ones winning: built-in defaults, the user config file
//! (`<config dir>/strata/strata.toml`), `strata.toml` in the working
//! directory (or an explicit path), then `STRATA_*` environment variables.
//! Command-line flags are applied on top by the binary through
//! [`LoaderConfig::set`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LoaderError, Result};
use crate::module_system::DEFAULT_LOCATION;
use crate::transport::{FsTransport, HttpTransport, Transport};

/// Name of the project config file.
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Default module file extension.
pub const DEFAULT_EXTENSION: &str = ".js";

/// Which transport serves module sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Files under a root directory
    #[default]
    Fs,
    /// GET requests against a base URL
    Http,
}

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Transport kind
    pub kind: TransportKind,

    /// Directory served by the filesystem transport
    pub root: PathBuf,

    /// Base URL for the HTTP transport
    pub base_url: Option<String>,

    /// HTTP client timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Fs,
            root: PathBuf::from("."),
            base_url: None,
            timeout_secs: crate::transport::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Loader configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Document location that relative entry ids resolve against
    pub location: String,

    /// Appended to module ids to form request paths
    pub extension: String,

    /// Transport settings
    pub transport: TransportConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            transport: TransportConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from default locations.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, reading `project_file` instead of
    /// `./strata.toml` when given.
    pub fn load_from(project_file: Option<&Path>) -> Result<Self> {
        let mut config = LoaderConfig::default();

        // Load from user config file
        if let Some(user_config_path) = user_config_path()
            && user_config_path.exists()
        {
            config.merge_from_file(&user_config_path)?;
        }

        // Load from project config file; an explicit path must exist
        match project_file {
            Some(path) => config.merge_from_file(path)?,
            None => {
                let project_config = PathBuf::from(CONFIG_FILE_NAME);
                if project_config.exists() {
                    config.merge_from_file(&project_config)?;
                }
            }
        }

        // Load from environment variables
        config.load_from_env()?;

        Ok(config)
    }

    /// Parse a complete configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Merge the keys present in a TOML file over the current values.
    pub fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        debug!("Reading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        self.merge_toml(&content)
    }

    /// Merge the keys present in TOML text over the current values.
    pub fn merge_toml(&mut self, content: &str) -> Result<()> {
        let table: toml::Table = toml::from_str(content)?;

        for (key, value) in &table {
            match (key.as_str(), value) {
                ("transport", toml::Value::Table(transport)) => {
                    for (inner_key, inner_value) in transport {
                        self.set(&format!("transport.{}", inner_key), &scalar(inner_value)?)?;
                    }
                }
                _ => self.set(key, &scalar(value)?)?,
            }
        }

        Ok(())
    }

    /// Load configuration from `STRATA_*` environment variables.
    pub fn load_from_env(&mut self) -> Result<()> {
        self.apply_env(std::env::vars())
    }

    /// Apply `STRATA_*` variables from an explicit list.
    ///
    /// `STRATA_ROOT` selects the filesystem transport and `STRATA_BASE_URL`
    /// the HTTP one.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "STRATA_LOCATION" => self.set("location", &value)?,
                "STRATA_EXTENSION" => self.set("extension", &value)?,
                "STRATA_ROOT" => {
                    self.set("transport.root", &value)?;
                    self.transport.kind = TransportKind::Fs;
                }
                "STRATA_BASE_URL" => {
                    self.set("transport.base_url", &value)?;
                    self.transport.kind = TransportKind::Http;
                }
                "STRATA_TIMEOUT" => self.set("transport.timeout_secs", &value)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Set a configuration value by dotted key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "location" => self.location = value.to_string(),
            "extension" => self.extension = value.to_string(),
            "transport.kind" => {
                self.transport.kind = match value {
                    "fs" => TransportKind::Fs,
                    "http" => TransportKind::Http,
                    other => {
                        return Err(LoaderError::Config(format!(
                            "unknown transport kind '{}' (expected fs or http)",
                            other
                        )));
                    }
                }
            }
            "transport.root" => self.transport.root = PathBuf::from(value),
            "transport.base_url" => self.transport.base_url = Some(value.to_string()),
            "transport.timeout_secs" => {
                self.transport.timeout_secs = value.parse().map_err(|_| {
                    LoaderError::Config(format!("timeout_secs must be a whole number, got '{}'", value))
                })?
            }
            other => {
                return Err(LoaderError::Config(format!("unknown key '{}'", other)));
            }
        }
        Ok(())
    }

    /// Get a configuration value by dotted key.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "location" => Some(self.location.clone()),
            "extension" => Some(self.extension.clone()),
            "transport.kind" => Some(
                match self.transport.kind {
                    TransportKind::Fs => "fs",
                    TransportKind::Http => "http",
                }
                .to_string(),
            ),
            "transport.root" => Some(self.transport.root.display().to_string()),
            "transport.base_url" => self.transport.base_url.clone(),
            "transport.timeout_secs" => Some(self.transport.timeout_secs.to_string()),
            _ => None,
        }
    }

    /// Build the configured transport.
    pub fn build_transport(&self) -> Result<Arc<dyn Transport>> {
        match self.transport.kind {
            TransportKind::Fs => Ok(Arc::new(FsTransport::new(self.transport.root.clone()))),
            TransportKind::Http => {
                let base_url = self.transport.base_url.as_deref().ok_or_else(|| {
                    LoaderError::Config("the http transport needs a base_url".to_string())
                })?;
                let timeout = Duration::from_secs(self.transport.timeout_secs);
                Ok(Arc::new(HttpTransport::new(base_url, timeout)?))
            }
        }
    }
}

/// Render a TOML scalar the way [`LoaderConfig::set`] expects it.
fn scalar(value: &toml::Value) -> Result<String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(n) => Ok(n.to_string()),
        other => Err(LoaderError::Config(format!(
            "expected a string or integer, got {}",
            other.type_str()
        ))),
    }
}

/// Get the user config file path.
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("strata").join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.location, "index.html");
        assert_eq!(config.extension, ".js");
        assert_eq!(config.transport.kind, TransportKind::Fs);
        assert_eq!(config.transport.timeout_secs, 30);
    }

    #[test]
    fn test_full_toml() {
        let config = LoaderConfig::from_toml_str(
            r#"
            location = "app/index.html"

            [transport]
            kind = "http"
            base_url = "http://localhost:8080"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.location, "app/index.html");
        assert_eq!(config.extension, ".js");
        assert_eq!(config.transport.kind, TransportKind::Http);
        assert_eq!(config.transport.timeout_secs, 5);
    }

    #[test]
    fn test_merge_keeps_unset_keys() {
        let mut config = LoaderConfig::default();
        config.set("extension", ".cjs").unwrap();
        config.merge_toml("[transport]\nroot = \"public\"").unwrap();
        assert_eq!(config.extension, ".cjs");
        assert_eq!(config.transport.root, PathBuf::from("public"));
    }

    #[test]
    fn test_merge_rejects_unknown_keys() {
        let mut config = LoaderConfig::default();
        let err = config.merge_toml("colour = \"blue\"").unwrap_err();
        assert!(matches!(err, LoaderError::Config(_)));
        assert!(matches!(
            config.merge_toml("not toml ="),
            Err(LoaderError::Toml(_))
        ));
    }

    #[test]
    fn test_merge_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "location = \"/site/index.html\"\n").unwrap();

        let mut config = LoaderConfig::default();
        config.merge_from_file(&path).unwrap();
        assert_eq!(config.location, "/site/index.html");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = LoaderConfig::default();
        config
            .apply_env(vars(&[
                ("STRATA_LOCATION", "x/index.html"),
                ("STRATA_BASE_URL", "http://example.test"),
                ("UNRELATED", "ignored"),
            ]))
            .unwrap();
        assert_eq!(config.location, "x/index.html");
        assert_eq!(config.transport.kind, TransportKind::Http);
        assert_eq!(
            config.get("transport.base_url").as_deref(),
            Some("http://example.test")
        );
    }

    #[test]
    fn test_invalid_values() {
        let mut config = LoaderConfig::default();
        assert!(config.set("transport.kind", "ftp").is_err());
        assert!(config.set("transport.timeout_secs", "soon").is_err());
        assert!(config.set("nope", "x").is_err());
    }

    #[test]
    fn test_http_transport_needs_base_url() {
        let mut config = LoaderConfig::default();
        config.set("transport.kind", "http").unwrap();
        assert!(matches!(
            config.build_transport(),
            Err(LoaderError::Config(_))
        ));

        config.set("transport.base_url", "http://localhost:1").unwrap();
        assert!(config.build_transport().is_ok());
    }
}
