// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Persistent settings live in a TOML file managed by `confy`. The backend
//! address can be overridden by the `DASHBOARD_BASE_URL` environment
//! variable, and command-line flags override both.

use std::time::Duration;

use dashboard_client::http::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use dashboard_client::{LogKind, SourceConfig};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "mysite-dashboard";
const CONFIG_NAME: &str = "config";

/// Environment variable that takes precedence over `base_url`.
pub const BASE_URL_ENV: &str = "DASHBOARD_BASE_URL";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Backend origin, e.g. `http://127.0.0.1:8000`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Seconds between status polls
    #[serde(default = "default_interval_secs")]
    pub status_interval_secs: u64,

    /// Seconds between log polls
    #[serde(default = "default_interval_secs")]
    pub log_interval_secs: u64,

    /// Upper bound on a single request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Log stream shown when the dashboard opens
    #[serde(default)]
    pub log_kind: LogKind,

    /// Saved theme name (`dark`, `plain`, or anything else for default)
    #[serde(default)]
    pub theme: Option<String>,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_interval_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            base_url: default_base_url(),
            status_interval_secs: default_interval_secs(),
            log_interval_secs: default_interval_secs(),
            request_timeout_secs: default_timeout_secs(),
            log_kind: LogKind::default(),
            theme: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults if missing
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Resolve the backend origin from environment variable or config
    #[must_use]
    pub fn resolve_base_url(&self) -> String {
        Self::pick_base_url(std::env::var(BASE_URL_ENV).ok(), &self.base_url)
    }

    fn pick_base_url(env_value: Option<String>, configured: &str) -> String {
        env_value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| configured.to_string())
    }

    #[must_use]
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs.max(1))
    }

    #[must_use]
    pub fn log_interval(&self) -> Duration {
        Duration::from_secs(self.log_interval_secs.max(1))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Transport settings derived from this configuration
    #[must_use]
    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            base_url: self.resolve_base_url(),
            timeout: self.request_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: AppConfig = toml_from("base_url = \"http://backend:9000\"\n");
        assert_eq!(config.base_url, "http://backend:9000");
        assert_eq!(config.status_interval_secs, 5);
        assert_eq!(config.log_interval_secs, 5);
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.log_kind, LogKind::Admin);
        assert_eq!(config.theme, None);
    }

    #[test]
    fn test_log_kind_and_theme_round_trip_through_toml() {
        let config: AppConfig = toml_from("log_kind = \"debug\"\ntheme = \"dark\"\n");
        assert_eq!(config.log_kind, LogKind::Debug);
        assert_eq!(config.theme.as_deref(), Some("dark"));
    }

    #[test]
    fn test_env_base_url_takes_precedence() {
        assert_eq!(
            AppConfig::pick_base_url(Some("http://env:1".to_string()), "http://file:2"),
            "http://env:1"
        );
        assert_eq!(
            AppConfig::pick_base_url(Some("  ".to_string()), "http://file:2"),
            "http://file:2"
        );
        assert_eq!(AppConfig::pick_base_url(None, "http://file:2"), "http://file:2");
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let config = AppConfig {
            status_interval_secs: 0,
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.status_interval(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }

    fn toml_from(text: &str) -> AppConfig {
        toml::from_str(text).unwrap()
    }
}
