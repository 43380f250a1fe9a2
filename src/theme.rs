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

//! Saved display theme and the terminal palette it selects.
//!
//! The theme is a free-form name persisted in the config file. Names that
//! look like stylesheet files (`dark.css`) are accepted and matched on
//! their stem.

use log::info;

use crate::config::AppConfig;

/// Name reported when no theme has been saved.
pub const DEFAULT_THEME: &str = "default";

const RESET: &str = "\x1b[0m";

/// ANSI styling for dashboard text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    Default,
    Dark,
    /// No escape codes at all.
    Plain,
}

impl Palette {
    /// Palette for a saved theme name.
    #[must_use]
    pub fn for_theme(theme: Option<&str>) -> Self {
        let Some(name) = theme else {
            return Self::Default;
        };
        let name = name.trim().to_ascii_lowercase();
        let stem = name.strip_suffix(".css").unwrap_or(&name);

        match stem {
            "dark" => Self::Dark,
            "plain" | "none" | "mono" => Self::Plain,
            _ => Self::Default,
        }
    }

    #[must_use]
    pub fn heading(self, text: &str) -> String {
        self.paint(text, "\x1b[1;36m", "\x1b[1;96m")
    }

    #[must_use]
    pub fn failure(self, text: &str) -> String {
        self.paint(text, "\x1b[31m", "\x1b[91m")
    }

    #[must_use]
    pub fn dim(self, text: &str) -> String {
        self.paint(text, "\x1b[2m", "\x1b[37m")
    }

    fn paint(self, text: &str, default_code: &str, dark_code: &str) -> String {
        match self {
            Self::Plain => text.to_string(),
            Self::Default => format!("{default_code}{text}{RESET}"),
            Self::Dark => format!("{dark_code}{text}{RESET}"),
        }
    }
}

/// The theme currently saved in `config`.
#[must_use]
pub fn current_theme(config: &AppConfig) -> &str {
    config
        .theme
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(DEFAULT_THEME)
}

/// Record a theme choice in `config`; empty or `default` clears it.
pub fn apply_theme(config: &mut AppConfig, name: &str) {
    let name = name.trim();
    config.theme = if name.is_empty() || name.eq_ignore_ascii_case(DEFAULT_THEME) {
        None
    } else {
        Some(name.to_string())
    };
    info!("Theme set to '{}'", current_theme(config));
}

/// Record a theme choice and persist it.
pub fn save_theme(config: &mut AppConfig, name: &str) -> Result<(), confy::ConfyError> {
    apply_theme(config, name);
    config.save()
}
