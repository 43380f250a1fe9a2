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

use log::{info, warn};
use std::time::Duration;
use tokio::sync::mpsc;

use dashboard_client::api::STATUS_PATH;
use dashboard_client::{HttpSource, LogKind, LogResponse, PollHandle, StatusResponse};

use crate::view::ViewUpdate;

/// The running log poller and the stream it reads
struct LogPoller {
    kind: LogKind,
    handle: PollHandle<LogResponse>,
}

/// Owns the dashboard's pollers and forwards their results to the view.
///
/// Pollers share nothing but the transport; each result travels to the UI
/// loop as a [`ViewUpdate`] over an unbounded channel.
pub struct PollerManager {
    source: HttpSource,
    updates: mpsc::UnboundedSender<ViewUpdate>,
    status_interval: Duration,
    log_interval: Duration,

    status: Option<PollHandle<StatusResponse>>,
    logs: Option<LogPoller>,
}

impl std::fmt::Debug for PollerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerManager")
            .field("base_url", &self.source.base_url())
            .field("status_running", &self.status.is_some())
            .field("log_kind", &self.log_kind())
            .finish_non_exhaustive()
    }
}

impl PollerManager {
    /// Create a manager; nothing is polled until a `start_*` call
    pub fn new(
        source: HttpSource,
        updates: mpsc::UnboundedSender<ViewUpdate>,
        status_interval: Duration,
        log_interval: Duration,
    ) -> Self {
        Self {
            source,
            updates,
            status_interval,
            log_interval,
            status: None,
            logs: None,
        }
    }

    /// Start the status poller if it is not already running
    pub fn start_status(&mut self) {
        if self.status.is_some() {
            return;
        }

        info!("Starting status poller ({:?})", self.status_interval);
        let tx = self.updates.clone();
        let handle = self.source.poll::<StatusResponse, _>(
            STATUS_PATH,
            self.status_interval,
            move |result| {
                let _ = tx.send(ViewUpdate::Status(result));
            },
        );
        self.status = Some(handle);
    }

    /// Start polling the given log stream, replacing any other log poller
    pub fn start_logs(&mut self, kind: LogKind) {
        if self.log_kind() == Some(kind) {
            return;
        }
        self.stop_logs();

        info!("Starting {} log poller ({:?})", kind, self.log_interval);
        let tx = self.updates.clone();
        let handle = self.source.poll::<LogResponse, _>(
            kind.endpoint(),
            self.log_interval,
            move |result| {
                let _ = tx.send(ViewUpdate::Logs { kind, result });
            },
        );
        self.logs = Some(LogPoller { kind, handle });
    }

    /// Switch the log region to another stream
    pub fn set_log_kind(&mut self, kind: LogKind) {
        match self.log_kind() {
            Some(current) if current == kind => {}
            Some(current) => {
                info!("Switching log poller from {} to {}", current, kind);
                self.start_logs(kind);
            }
            None => {
                warn!("No log poller running; starting {} log poller", kind);
                self.start_logs(kind);
            }
        }
    }

    /// Stream the log poller is reading, if any
    pub fn log_kind(&self) -> Option<LogKind> {
        self.logs.as_ref().map(|l| l.kind)
    }

    pub fn stop_status(&mut self) {
        if let Some(handle) = self.status.take() {
            handle.cancel();
        }
    }

    pub fn stop_logs(&mut self) {
        if let Some(logs) = self.logs.take() {
            info!("Stopping {} log poller", logs.kind);
            logs.handle.cancel();
        }
    }

    /// Stop every poller
    pub fn stop_all(&mut self) {
        self.stop_status();
        self.stop_logs();
    }

    /// Number of running pollers
    pub fn active_count(&self) -> usize {
        usize::from(self.status.is_some()) + usize::from(self.logs.is_some())
    }
}

impl Drop for PollerManager {
    fn drop(&mut self) {
        if self.active_count() > 0 {
            info!("Shutting down PollerManager - stopping all pollers");
        }
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_client::{PollError, SourceConfig};

    /// A source pointing at a port nothing listens on
    fn unreachable_source() -> HttpSource {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        HttpSource::new(SourceConfig {
            base_url: format!("http://{addr}"),
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    fn manager() -> (PollerManager, mpsc::UnboundedReceiver<ViewUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = PollerManager::new(
            unreachable_source(),
            tx,
            Duration::from_secs(60),
            Duration::from_secs(60),
        );
        (manager, rx)
    }

    #[tokio::test]
    async fn test_status_failure_is_forwarded() {
        let (mut manager, mut rx) = manager();
        manager.start_status();
        manager.start_status();
        assert_eq!(manager.active_count(), 1);

        let update = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            update,
            ViewUpdate::Status(Err(PollError::Transport(_)))
        ));
    }

    #[tokio::test]
    async fn test_switching_log_kind_replaces_poller() {
        let (mut manager, mut rx) = manager();
        manager.start_logs(LogKind::Admin);
        assert_eq!(manager.log_kind(), Some(LogKind::Admin));

        manager.set_log_kind(LogKind::Debug);
        assert_eq!(manager.log_kind(), Some(LogKind::Debug));
        assert_eq!(manager.active_count(), 1);

        // The admin poller may have delivered before the switch; a debug
        // update must follow
        let kind = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(ViewUpdate::Logs { kind: LogKind::Debug, .. }) = rx.recv().await {
                    return LogKind::Debug;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(kind, LogKind::Debug);
    }

    #[tokio::test]
    async fn test_stop_all() {
        let (mut manager, _rx) = manager();
        manager.start_status();
        manager.start_logs(LogKind::Admin);
        assert_eq!(manager.active_count(), 2);

        manager.stop_all();
        assert_eq!(manager.active_count(), 0);
        assert_eq!(manager.log_kind(), None);
    }
}
