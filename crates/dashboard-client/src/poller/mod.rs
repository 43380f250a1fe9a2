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

//! Fixed-interval polling with per-attempt timeout and cooperative cancel.
//!
//! A poller runs in a background task. It fetches immediately, then on
//! every multiple of the interval until its handle is cancelled or
//! dropped. Every attempt's outcome, success or failure, is handed to the
//! result callback; a failed cycle never stops the schedule and is never
//! retried early.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Why a poll cycle (or a one-shot request) produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// Network failure, timeout, or non-success HTTP status.
    #[error("{0}")]
    Transport(String),

    /// Body was not valid JSON.
    #[error("invalid JSON: {0}")]
    Decode(String),

    /// Valid JSON that the target type has no fallback for.
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

impl PollError {
    /// The error reported when an attempt outlives its timeout.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Transport("timeout".to_string())
    }
}

/// Configuration for a single poller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Label used in log output.
    pub name: String,
    /// Time between the starts of consecutive cycles.
    pub interval: Duration,
    /// Upper bound on one attempt. `None` leaves it to the transport.
    pub timeout: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            name: "poller".to_string(),
            interval: Duration::from_secs(5),
            timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// What the poller knows after its most recent cycle.
#[derive(Debug, Clone)]
pub struct PollState<T> {
    /// Outcome of the latest cycle, overwritten every time.
    pub last_result: Option<Result<T, PollError>>,
    /// Completed cycles.
    pub cycles: u64,
    pub last_polled_at: Option<DateTime<Utc>>,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            last_result: None,
            cycles: 0,
            last_polled_at: None,
        }
    }
}

/// Handle to a running poller.
///
/// Cancelling stops future cycles. An attempt already in flight runs to
/// completion and its result is discarded. Dropping the handle cancels.
pub struct PollHandle<T> {
    name: String,
    state: Arc<RwLock<PollState<T>>>,
    cancel_token: CancellationToken,
}

impl<T> std::fmt::Debug for PollHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollHandle")
            .field("name", &self.name)
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl<T: Clone> PollHandle<T> {
    /// Stop scheduling further cycles.
    pub fn cancel(&self) {
        if !self.cancel_token.is_cancelled() {
            info!("[{}] Poller cancelled", self.name);
        }
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the poller's state.
    #[must_use]
    pub fn state(&self) -> PollState<T> {
        self.state
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Entry point for spawning pollers.
#[derive(Debug, Clone, Copy)]
pub struct Poller;

impl Poller {
    /// Spawn a poller on the current tokio runtime.
    ///
    /// `fetch` is called once per cycle; `on_result` receives each
    /// completed attempt's outcome in cycle order.
    #[must_use]
    pub fn spawn<T, F, Fut, R>(config: PollerConfig, fetch: F, on_result: R) -> PollHandle<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, PollError>> + Send + 'static,
        R: FnMut(Result<T, PollError>) + Send + 'static,
    {
        let state = Arc::new(RwLock::new(PollState::default()));
        let cancel_token = CancellationToken::new();

        let task_state = Arc::clone(&state);
        let task_cancel = cancel_token.clone();
        let name = config.name.clone();

        tokio::spawn(async move {
            poll_loop(config, fetch, on_result, task_state, task_cancel).await;
        });

        PollHandle {
            name,
            state,
            cancel_token,
        }
    }
}

async fn poll_loop<T, F, Fut, R>(
    config: PollerConfig,
    mut fetch: F,
    mut on_result: R,
    state: Arc<RwLock<PollState<T>>>,
    cancel_token: CancellationToken,
) where
    T: Clone,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PollError>>,
    R: FnMut(Result<T, PollError>),
{
    let PollerConfig {
        name,
        interval,
        timeout,
    } = config;

    // tokio's interval panics on a zero period
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("[{}] Polling every {:?}", name, interval);

    loop {
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => {
                debug!("[{}] Poll loop exiting", name);
                return;
            }
            _ = ticker.tick() => {}
        }

        let attempt = fetch();
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, attempt).await {
                Ok(result) => result,
                Err(_elapsed) => Err(PollError::timeout()),
            },
            None => attempt.await,
        };

        if cancel_token.is_cancelled() {
            debug!("[{}] Discarding result of in-flight poll after cancel", name);
            return;
        }

        if let Err(e) = &result {
            warn!("[{}] Poll failed: {}", name, e);
        }

        if let Ok(mut s) = state.write() {
            s.cycles += 1;
            s.last_polled_at = Some(Utc::now());
            s.last_result = Some(result.clone());
        }

        on_result(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::{sleep, Instant};

    const INTERVAL: Duration = Duration::from_secs(5);

    fn config(timeout: Option<Duration>) -> PollerConfig {
        PollerConfig {
            name: "test".to_string(),
            interval: INTERVAL,
            timeout,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_immediately_then_every_interval() {
        let start = Instant::now();
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&offsets);

        let handle = Poller::spawn(
            config(None),
            move || {
                seen.lock().unwrap().push(start.elapsed());
                async { Ok::<_, PollError>(()) }
            },
            |_| {},
        );

        sleep(INTERVAL * 3 + INTERVAL / 2).await;
        handle.cancel();
        sleep(INTERVAL * 3).await;

        let offsets = offsets.lock().unwrap().clone();
        assert_eq!(
            offsets,
            vec![Duration::ZERO, INTERVAL, INTERVAL * 2, INTERVAL * 3]
        );
        assert_eq!(handle.state().cycles, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_schedule() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&results);

        let handle = Poller::spawn(
            config(None),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n % 2 == 0 {
                        Err(PollError::Transport("HTTP 500".to_string()))
                    } else {
                        Ok(n)
                    }
                }
            },
            move |result| sink.lock().unwrap().push(result),
        );

        sleep(INTERVAL * 3 + INTERVAL / 2).await;
        handle.cancel();

        let results = results.lock().unwrap().clone();
        assert_eq!(
            results,
            vec![
                Err(PollError::Transport("HTTP 500".to_string())),
                Ok(1),
                Err(PollError::Transport("HTTP 500".to_string())),
                Ok(3),
            ]
        );
        assert_eq!(handle.state().last_result, Some(Ok(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_times_out() {
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&results);

        let _handle = Poller::spawn(
            config(Some(Duration::from_secs(1))),
            || async {
                sleep(Duration::from_secs(60)).await;
                Ok::<_, PollError>("late")
            },
            move |result| sink.lock().unwrap().push(result),
        );

        sleep(Duration::from_millis(1500)).await;

        let results = results.lock().unwrap().clone();
        assert_eq!(results, vec![Err(PollError::timeout())]);
        assert_eq!(PollError::timeout().to_string(), "timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_result_dropped_after_cancel() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let delivered = Arc::new(AtomicU32::new(0));
        let sink = Arc::clone(&delivered);

        let handle = Poller::spawn(
            config(None),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    sleep(Duration::from_secs(2)).await;
                    Ok::<_, PollError>(())
                }
            },
            move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            },
        );

        sleep(Duration::from_secs(1)).await;
        handle.cancel();
        assert!(handle.is_cancelled());
        sleep(INTERVAL * 4).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
        assert_eq!(handle.state().cycles, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let handle = Poller::spawn(
            config(None),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, PollError>(()) }
            },
            |_| {},
        );

        sleep(INTERVAL / 2).await;
        drop(handle);
        sleep(INTERVAL * 3).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
