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

//! Client library for the mysite admin backend.
//!
//! The library is split into layers that can be used on their own:
//!
//! - **API layer**: typed request/response bodies, with permissive
//!   fallbacks for polled endpoints, plus one-shot account and admin calls
//! - **HTTP layer**: a cookie-keeping JSON transport with per-request timeout
//! - **Poller layer**: fixed-interval polling with cooperative cancellation
//! - **Render layer**: text rendering of status, logs, users, and failures
//!
//! # Quick Start
//!
//! ```no_run
//! use dashboard_client::{HttpSource, LogKind, LogResponse, SourceConfig};
//! use dashboard_client::render::render_logs;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = HttpSource::new(SourceConfig::default()).unwrap();
//!
//!     let handle = source.poll::<LogResponse, _>(
//!         LogKind::Admin.endpoint(),
//!         Duration::from_secs(5),
//!         |result| match result {
//!             Ok(logs) => println!("{}", render_logs(LogKind::Admin, &logs)),
//!             Err(e) => eprintln!("{e}"),
//!         },
//!     );
//!
//!     tokio::time::sleep(Duration::from_secs(30)).await;
//!     handle.cancel();
//! }
//! ```
//!
//! # Polling Anything
//!
//! [`Poller::spawn`] accepts any async fetch function, so the same loop
//! drives non-HTTP sources:
//!
//! ```
//! use dashboard_client::{PollError, Poller, PollerConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let handle = Poller::spawn(
//!     PollerConfig::default(),
//!     || async { Ok::<_, PollError>(42) },
//!     |result| assert_eq!(result, Ok(42)),
//! );
//! handle.cancel();
//! # }
//! ```

pub mod api;
pub mod http;
pub mod poller;
pub mod render;

pub use api::{
    ActionReply, AdminApi, Credentials, LogKind, LogResponse, StartTime, StatusResponse,
    StatusSnapshot, UserEntry, UserList,
};
pub use http::{HttpSource, SourceConfig};
pub use poller::{PollError, PollHandle, PollState, Poller, PollerConfig};
pub use render::{render_failure, render_logs, render_status, Region};
