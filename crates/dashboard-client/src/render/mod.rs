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

//! Text rendering of poll results.
//!
//! Rendering never fails: unexpected shapes degrade to their JSON text and
//! errors become a failure-marker line.

use log::warn;
use serde_json::Value;

use crate::api::{LogKind, LogResponse, StatusResponse, UserList};
use crate::poller::PollError;

/// Prefix of every rendered failure.
pub const FAILURE_MARKER: &str = "❌";

/// Which part of the dashboard a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Status,
    Logs,
}

impl Region {
    const fn noun(self) -> &'static str {
        match self {
            Self::Status => "server status",
            Self::Logs => "logs",
        }
    }
}

/// One-line description of the server status.
#[must_use]
pub fn render_status(response: &StatusResponse) -> String {
    match response {
        StatusResponse::Snapshot(snapshot) => format!(
            "Server status: {}, started: {}, uptime: {} s",
            snapshot.status, snapshot.start_time, snapshot.uptime_seconds
        ),
        StatusResponse::Other(value) => {
            warn!("Status response is not a snapshot; showing raw JSON");
            value.to_string()
        }
    }
}

/// Log text for the given log kind.
#[must_use]
pub fn render_logs(kind: LogKind, response: &LogResponse) -> String {
    match (kind, response) {
        (LogKind::Admin, LogResponse::Lines(lines)) => lines.join("\n"),
        (LogKind::Debug, LogResponse::Lines(lines)) => lines
            .iter()
            .map(|line| pretty_line(line))
            .collect::<Vec<_>>()
            .join("\n"),
        (_, LogResponse::Other(Value::Array(items))) => {
            warn!("{kind} log holds non-string entries; showing them as JSON");
            items
                .iter()
                .map(|item| match (kind, item) {
                    (LogKind::Debug, Value::String(s)) => pretty_line(s),
                    (LogKind::Admin, Value::String(s)) => s.clone(),
                    (_, other) => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        (_, LogResponse::Other(value)) => {
            warn!("{kind} log is not a list; showing raw JSON");
            value.to_string()
        }
    }
}

/// Pretty-print a line that holds a JSON document; anything else is
/// returned unchanged.
#[must_use]
pub fn pretty_line(line: &str) -> String {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| line.to_string())
}

/// Failure text shown in place of a region's content.
#[must_use]
pub fn render_failure(region: Region, error: &PollError) -> String {
    format!("{} Unable to fetch {}: {}", FAILURE_MARKER, region.noun(), error)
}

/// Table of users and their admin flag.
#[must_use]
pub fn render_users(list: &UserList) -> String {
    if list.users.is_empty() {
        return list
            .message
            .clone()
            .or_else(|| list.error.clone())
            .unwrap_or_else(|| "No users.".to_string());
    }

    let width = list
        .users
        .iter()
        .map(|u| u.username.chars().count())
        .max()
        .unwrap_or(0)
        .max("USERNAME".len());

    let mut out = format!("{:<width$}  ADMIN", "USERNAME");
    for user in &list.users {
        out.push('\n');
        out.push_str(&format!(
            "{:<width$}  {}",
            user.username,
            if user.is_admin { "yes" } else { "no" }
        ));
    }
    out
}
