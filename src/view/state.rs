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

use chrono::{DateTime, Utc};
use dashboard_client::render::{render_failure, render_logs, render_status, Region};
use dashboard_client::{LogKind, LogResponse, PollError, StatusResponse};
use std::collections::VecDeque;

/// Diagnostic message with timestamp
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    pub timestamp: DateTime<Utc>,
    pub level: DiagnosticLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// What one dashboard region currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionState {
    /// Nothing received yet
    Pending,
    Ready(String),
    /// Failure-marker text from the latest cycle
    Failed(String),
}

impl RegionState {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            RegionState::Pending => "Loading...",
            RegionState::Ready(text) | RegionState::Failed(text) => text,
        }
    }
}

/// A poll result addressed to one region
#[derive(Debug, Clone)]
pub enum ViewUpdate {
    Status(Result<StatusResponse, PollError>),
    Logs {
        kind: LogKind,
        result: Result<LogResponse, PollError>,
    },
}

/// Everything the dashboard screen shows. Owned by the UI loop.
#[derive(Debug)]
pub struct DashboardView {
    pub status: RegionState,
    pub logs: RegionState,
    log_kind: LogKind,
    pub last_update: Option<DateTime<Utc>>,

    // Diagnostic messages (keep last 50)
    pub diagnostics: VecDeque<DiagnosticMessage>,
    max_diagnostics: usize,
}

impl DashboardView {
    #[must_use]
    pub fn new(log_kind: LogKind) -> Self {
        Self {
            status: RegionState::Pending,
            logs: RegionState::Pending,
            log_kind,
            last_update: None,
            diagnostics: VecDeque::with_capacity(50),
            max_diagnostics: 50,
        }
    }

    #[must_use]
    pub fn log_kind(&self) -> LogKind {
        self.log_kind
    }

    /// Switch the log region to another stream; its old text is discarded
    pub fn set_log_kind(&mut self, kind: LogKind) {
        if kind == self.log_kind {
            return;
        }
        self.log_kind = kind;
        self.logs = RegionState::Pending;
        self.add_diagnostic(DiagnosticLevel::Info, format!("Showing {kind} log"));
    }

    /// Render a poll result into its region
    pub fn apply(&mut self, update: ViewUpdate) {
        match update {
            ViewUpdate::Status(result) => {
                self.status = match result {
                    Ok(response) => {
                        if matches!(response, StatusResponse::Other(_)) {
                            self.add_diagnostic(
                                DiagnosticLevel::Warning,
                                "Status response had an unexpected shape".to_string(),
                            );
                        }
                        RegionState::Ready(render_status(&response))
                    }
                    Err(e) => {
                        self.add_diagnostic(DiagnosticLevel::Error, format!("Status poll failed: {e}"));
                        RegionState::Failed(render_failure(Region::Status, &e))
                    }
                };
            }
            ViewUpdate::Logs { kind, result } => {
                // Late result from a poller that was switched away from
                if kind != self.log_kind {
                    return;
                }
                self.logs = match result {
                    Ok(response) => {
                        if matches!(response, LogResponse::Other(_)) {
                            self.add_diagnostic(
                                DiagnosticLevel::Warning,
                                format!("{kind} log had an unexpected shape"),
                            );
                        }
                        RegionState::Ready(render_logs(kind, &response))
                    }
                    Err(e) => {
                        self.add_diagnostic(
                            DiagnosticLevel::Error,
                            format!("{kind} log poll failed: {e}"),
                        );
                        RegionState::Failed(render_failure(Region::Logs, &e))
                    }
                };
            }
        }
        self.last_update = Some(Utc::now());
    }

    /// Add a diagnostic message
    pub fn add_diagnostic(&mut self, level: DiagnosticLevel, message: String) {
        let diagnostic = DiagnosticMessage {
            timestamp: Utc::now(),
            level,
            message,
        };

        self.diagnostics.push_back(diagnostic);

        // Keep only the last N messages
        while self.diagnostics.len() > self.max_diagnostics {
            self.diagnostics.pop_front();
        }
    }

    /// Most recent diagnostics, oldest first
    pub fn recent_diagnostics(&self, count: usize) -> impl Iterator<Item = &DiagnosticMessage> {
        let skip = self.diagnostics.len().saturating_sub(count);
        self.diagnostics.iter().skip(skip)
    }
}
