// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Inline/external boundary: payloads strictly larger than this go to the object store.
pub const DEFAULT_INLINE_THRESHOLD_BYTES: u64 = 15 * 1024 * 1024;

#[derive(Debug)]
pub enum ConfigError {
    LoadError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::LoadError(msg) => write!(f, "Configuration load error: {}", msg),
            ConfigError::ValidationError(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Filesystem,
    /// Process-local maps. Nothing survives the process, so the `folio`
    /// command refuses it; use it for library embedding and tests.
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_inline_threshold_bytes")]
    pub inline_threshold_bytes: u64,
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            inline_threshold_bytes: default_inline_threshold_bytes(),
            backend: default_storage_backend(),
        }
    }
}

fn default_inline_threshold_bytes() -> u64 {
    DEFAULT_INLINE_THRESHOLD_BYTES
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Filesystem
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    #[serde(default = "default_pages_prefix")]
    pub pages_prefix: String,
    #[serde(default = "default_assets_prefix")]
    pub assets_prefix: String,
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,
    #[serde(default = "default_templates_prefix")]
    pub templates_prefix: String,
    #[serde(default = "default_site_title")]
    pub site_title: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pages_prefix: default_pages_prefix(),
            assets_prefix: default_assets_prefix(),
            static_prefix: default_static_prefix(),
            templates_prefix: default_templates_prefix(),
            site_title: default_site_title(),
        }
    }
}

fn default_pages_prefix() -> String {
    "pages".to_string()
}

fn default_assets_prefix() -> String {
    "files".to_string()
}

fn default_static_prefix() -> String {
    "static".to_string()
}

fn default_templates_prefix() -> String {
    "templates".to_string()
}

fn default_site_title() -> String {
    "Portfolio".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
    pub log_level: LevelFilter,
}

impl Default for ValidatedConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    /// Reads `config.yaml` under `root`. A missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join("config.yaml");
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Self::parse(&config_content).map_err(|e| match e {
            ConfigError::LoadError(msg) => ConfigError::LoadError(format!(
                "Failed to parse config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(raw).map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Loads and validates configuration at startup. If validation fails, the application should not start.
    pub fn load_and_validate(root: &Path) -> Result<ValidatedConfig, ConfigError> {
        Self::load(root)?.validate()
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.storage.inline_threshold_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "storage.inline_threshold_bytes must be greater than 0".to_string(),
            ));
        }
        Self::validate_export(&self.export)?;
        let log_level = LevelFilter::from_str(self.logging.level.trim()).map_err(|_| {
            ConfigError::ValidationError(format!(
                "logging.level must be one of off, error, warn, info, debug, trace; got: {}",
                self.logging.level
            ))
        })?;

        Ok(ValidatedConfig {
            storage: self.storage,
            export: self.export,
            logging: self.logging,
            log_level,
        })
    }

    fn validate_export(export: &ExportConfig) -> Result<(), ConfigError> {
        let prefixes = [
            ("pages_prefix", &export.pages_prefix),
            ("assets_prefix", &export.assets_prefix),
            ("static_prefix", &export.static_prefix),
            ("templates_prefix", &export.templates_prefix),
        ];
        for (name, value) in prefixes {
            let valid = !value.is_empty()
                && value != "."
                && value != ".."
                && value
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
            if !valid {
                return Err(ConfigError::ValidationError(format!(
                    "export.{} must be a single path segment, got: '{}'",
                    name, value
                )));
            }
        }
        for (idx, (name, value)) in prefixes.iter().enumerate() {
            if let Some((other, _)) = prefixes[idx + 1..].iter().find(|(_, v)| v == value) {
                return Err(ConfigError::ValidationError(format!(
                    "export.{} and export.{} must differ",
                    name, other
                )));
            }
        }
        Ok(())
    }
}
