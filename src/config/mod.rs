//! # Configuration Management Module
//!
//! Radiomenu reads a single TOML file with three sections:
//!
//! - [`MenuConfig`] - engine knobs (refresh timer, default language, keys, list page size)
//! - [`LoggingConfig`] - log level and optional log file
//! - `strings` - localized navigation strings keyed by language tag
//!
//! ## Usage
//!
//! ```rust,no_run
//! use radiomenu::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     config.validate()?;
//!     println!("default language: {}", config.menu.default_language);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [menu]
//! refresh_seconds = 0
//! default_language = "en"
//! accepted_keys = "0123456789"
//! list_options_per_page = 10
//!
//! [logging]
//! level = "info"
//! file = "radiomenu.log"
//!
//! [strings.de]
//! prev = "Zurück"
//! next = "Weiter"
//! cancel = "Abbrechen"
//! empty = "(leer)"
//! ```
//!
//! Every section and key is optional; missing values take the defaults shown above.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::fs;

use crate::popup::keys::KeySet;
use crate::popup::menu::LIST_OPTIONS_PER_PAGE;
use crate::validation::{validate_language_tag, validate_list_page_size};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub menu: MenuConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Localized strings: language tag -> key -> text.
    #[serde(default)]
    pub strings: HashMap<String, HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuConfig {
    /// Re-display interval in seconds; clients drop radio menus after a while. 0 disables.
    #[serde(default)]
    pub refresh_seconds: u64,
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Digits the client may press, e.g. "1230" for a three option menu with cancel.
    #[serde(default = "default_accepted_keys")]
    pub accepted_keys: String,
    #[serde(default = "default_list_options_per_page")]
    pub list_options_per_page: usize,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_accepted_keys() -> String {
    "0123456789".to_string()
}

fn default_list_options_per_page() -> usize {
    LIST_OPTIONS_PER_PAGE
}

impl Default for MenuConfig {
    fn default() -> Self {
        MenuConfig {
            refresh_seconds: 0,
            default_language: default_language(),
            accepted_keys: default_accepted_keys(),
            list_options_per_page: default_list_options_per_page(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::with_builtin_strings();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Defaults plus the English navigation strings spelled out, so `init` gives operators a
    /// table to copy for their own languages.
    pub fn with_builtin_strings() -> Self {
        let mut config = Config::default();
        let en = [
            ("prev", "Previous"),
            ("next", "Next"),
            ("cancel", "Cancel"),
            ("empty", "(empty)"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        config.strings.insert("en".to_string(), en);
        config
    }

    /// Check values serde cannot check by itself.
    pub fn validate(&self) -> Result<()> {
        validate_language_tag(&self.menu.default_language)
            .map_err(|e| anyhow!("menu.default_language: {}", e))?;
        self.menu
            .accepted_keys
            .parse::<KeySet>()
            .map_err(|e| anyhow!("menu.accepted_keys: {}", e))?;
        validate_list_page_size(self.menu.list_options_per_page)
            .map_err(|e| anyhow!("menu.list_options_per_page: {}", e))?;
        for tag in self.strings.keys() {
            validate_language_tag(tag).map_err(|e| anyhow!("strings.{}: {}", tag, e))?;
        }
        match self.logging.level.to_ascii_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" | "off" => Ok(()),
            other => Err(anyhow!("logging.level: unknown level '{}'", other)),
        }
    }
}
