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

//! Response and request types for the admin backend.
//!
//! Polled responses (`/status`, `/logs/*`) are modelled as untagged enums
//! with an `Other` variant holding the raw JSON. A body that parses but
//! does not match the expected structure lands there instead of failing
//! the poll, and the renderer falls back to its stringified form.

pub mod actions;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub use actions::AdminApi;

/// Server status endpoint.
pub const STATUS_PATH: &str = "/status";
/// User listing endpoint.
pub const ADMIN_LIST_PATH: &str = "/admin/list";
/// Grant admin privileges endpoint.
pub const ADMIN_GRANT_PATH: &str = "/admin/grant";
/// Revoke admin privileges endpoint.
pub const ADMIN_REVOKE_PATH: &str = "/admin/revoke";
/// Login endpoint.
pub const LOGIN_PATH: &str = "/login";
/// Registration endpoint.
pub const REGISTER_PATH: &str = "/register";

/// Timestamp layout the backend uses for `start_time`.
const BACKEND_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Server start time exactly as the backend sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StartTime {
    /// Textual timestamp (RFC 3339 or `YYYY-MM-DD HH:MM:SS`).
    Text(String),
    /// Unix epoch seconds.
    Epoch(i64),
}

impl StartTime {
    /// Interpret the start time as a UTC instant.
    ///
    /// Naive backend timestamps carry no offset and are read as UTC.
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Text(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(text, BACKEND_TIME_FORMAT)
                        .ok()
                        .map(|naive| naive.and_utc())
                }),
            Self::Epoch(secs) => DateTime::from_timestamp(*secs, 0),
        }
    }
}

impl fmt::Display for StartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Epoch(secs) => write!(f, "{secs}"),
        }
    }
}

/// One `/status` reading. Extra fields (e.g. `server`) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: String,
    pub start_time: StartTime,
    pub uptime_seconds: u64,
}

/// Decoded `/status` body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StatusResponse {
    Snapshot(StatusSnapshot),
    /// Well-formed JSON that is not a status snapshot.
    Other(Value),
}

/// Which log stream the log region shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Short request log, one plain line per request.
    #[default]
    Admin,
    /// Full audit log, one JSON document per line.
    Debug,
}

impl LogKind {
    /// Backend path serving this log.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Admin => "/logs/admin",
            Self::Debug => "/logs/debug",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "a" => Ok(Self::Admin),
            "debug" | "d" => Ok(Self::Debug),
            other => Err(format!("unknown log kind '{other}' (expected admin or debug)")),
        }
    }
}

/// Decoded `/logs/*` body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LogResponse {
    /// Log lines in backend order.
    Lines(Vec<String>),
    /// Anything that is not an array of strings.
    Other(Value),
}

/// A user row from `/admin/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    /// The backend sends this as a MySQL tinyint (0/1) or a bool.
    #[serde(deserialize_with = "bool_or_int")]
    pub is_admin: bool,
}

/// Body of `/admin/list`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub users: Vec<UserEntry>,
    #[serde(default)]
    pub message: Option<String>,
    /// Refusal text sent with a 403.
    #[serde(default)]
    pub error: Option<String>,
}

/// Reply to a one-shot action (login, register, grant, revoke).
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ActionReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Only present on login.
    #[serde(default)]
    pub is_admin: Option<bool>,
}

impl ActionReply {
    /// Text to show the user.
    #[must_use]
    pub fn text(&self) -> &str {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or("(no message from server)")
    }

    /// Whether the body looked like a reply at all.
    #[must_use]
    pub fn has_text(&self) -> bool {
        self.message.is_some() || self.error.is_some()
    }
}

/// Login/registration body.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body for grant/revoke.
#[derive(Debug, Clone, Serialize)]
pub struct UsernameRequest {
    pub username: String,
}

fn bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
    })
}
