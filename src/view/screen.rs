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

//! Plain terminal rendering of the dashboard view.

use std::io::{self, Write};

use chrono::Local;

use super::state::{DashboardView, DiagnosticLevel, RegionState};
use crate::theme::Palette;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const DIAGNOSTIC_LINES: usize = 3;

#[derive(Debug)]
pub struct Screen {
    palette: Palette,
    origin: String,
}

impl Screen {
    pub fn new(palette: Palette, origin: impl Into<String>) -> Self {
        Self {
            palette,
            origin: origin.into(),
        }
    }

    /// Full screen text for the current view
    pub fn compose(&self, view: &DashboardView) -> String {
        let p = self.palette;
        let updated = view.last_update.map_or_else(
            || "never".to_string(),
            |t| t.with_timezone(&Local).format("%H:%M:%S").to_string(),
        );

        let mut out = String::new();
        out.push_str(&p.heading(&format!("mysite dashboard - {}", self.origin)));
        out.push('\n');
        out.push_str(&p.dim(&format!("updated {updated}  [a] admin log  [d] debug log  [q] quit")));
        out.push_str("\n\n");

        out.push_str(&p.heading("Status"));
        out.push('\n');
        out.push_str(&self.region(&view.status));
        out.push_str("\n\n");

        out.push_str(&p.heading(&format!("Logs ({})", view.log_kind())));
        out.push('\n');
        out.push_str(&self.region(&view.logs));
        out.push('\n');

        let recent: Vec<_> = view.recent_diagnostics(DIAGNOSTIC_LINES).collect();
        if !recent.is_empty() {
            out.push('\n');
            for d in recent {
                let line = format!(
                    "{} {}",
                    d.timestamp.with_timezone(&Local).format("%H:%M:%S"),
                    d.message
                );
                out.push_str(&match d.level {
                    DiagnosticLevel::Error => p.failure(&line),
                    DiagnosticLevel::Warning | DiagnosticLevel::Info => p.dim(&line),
                });
                out.push('\n');
            }
        }

        out
    }

    /// Clear the terminal and draw the view
    pub fn draw(&self, view: &DashboardView) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(CLEAR_SCREEN.as_bytes())?;
        stdout.write_all(self.compose(view).as_bytes())?;
        stdout.flush()
    }

    fn region(&self, state: &RegionState) -> String {
        match state {
            RegionState::Failed(text) => self.palette.failure(text),
            RegionState::Pending => self.palette.dim(state.text()),
            RegionState::Ready(text) => text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::state::ViewUpdate;
    use dashboard_client::{LogKind, LogResponse, PollError};

    #[test]
    fn test_plain_screen_layout() {
        let mut view = DashboardView::new(LogKind::Admin);
        view.apply(ViewUpdate::Logs {
            kind: LogKind::Admin,
            result: Ok(LogResponse::Lines(vec!["line1".to_string(), "line2".to_string()])),
        });

        let text = Screen::new(Palette::Plain, "http://127.0.0.1:8000").compose(&view);
        assert!(text.starts_with("mysite dashboard - http://127.0.0.1:8000\n"));
        assert!(text.contains("Status\nLoading...\n"));
        assert!(text.contains("Logs (admin)\nline1\nline2\n"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_failure_shown_with_diagnostic() {
        let mut view = DashboardView::new(LogKind::Debug);
        view.apply(ViewUpdate::Status(Err(PollError::Transport(
            "timeout".to_string(),
        ))));

        let text = Screen::new(Palette::Plain, "x").compose(&view);
        assert!(text.contains("❌ Unable to fetch server status: timeout"));
        assert!(text.contains("Status poll failed: timeout"));
        assert!(text.contains("Logs (debug)"));
    }
}
