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

//! JSON-over-HTTP transport for the admin backend.
//!
//! [`HttpSource`] wraps a shared `reqwest` client with the backend's base
//! URL. The client keeps a cookie store so the `admin_auth` cookie set by
//! a successful login is sent on every later request from the same
//! process.

use std::time::Duration;

use log::debug;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::poller::{PollError, PollHandle, Poller, PollerConfig};

/// Default backend origin.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default upper bound on a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Origin such as `http://127.0.0.1:8000`; a trailing slash is ignored.
    pub base_url: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Status and body of a response, read without judging the status.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Shared handle to the backend. Cloning is cheap and clones share the
/// connection pool and cookie store.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(config: SourceConfig) -> Result<Self, PollError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL for a backend path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// GET a path and decode its JSON body.
    ///
    /// A non-success status is a transport failure (`HTTP <code>`),
    /// whatever the body says.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PollError> {
        let response = self.get(path).await?;
        if !response.status.is_success() {
            return Err(status_error(response.status));
        }
        decode(&response.body)
    }

    /// GET a path, returning status and body as-is.
    pub async fn get(&self, path: &str) -> Result<RawResponse, PollError> {
        self.exchange(self.client.get(self.url(path))).await
    }

    /// POST a JSON body, returning status and body as-is.
    pub async fn post_json<B>(&self, path: &str, payload: &B) -> Result<RawResponse, PollError>
    where
        B: Serialize + ?Sized,
    {
        self.exchange(self.client.post(self.url(path)).json(payload))
            .await
    }

    /// Start polling `endpoint` every `interval`.
    ///
    /// Each cycle is one [`get_json`](Self::get_json) bounded by this
    /// source's timeout.
    #[must_use]
    pub fn poll<T, R>(&self, endpoint: &str, interval: Duration, on_result: R) -> PollHandle<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
        R: FnMut(Result<T, PollError>) + Send + 'static,
    {
        let source = self.clone();
        let endpoint = endpoint.to_string();
        let config = PollerConfig {
            name: endpoint.clone(),
            interval,
            timeout: Some(self.timeout),
        };

        Poller::spawn(
            config,
            move || {
                let source = source.clone();
                let endpoint = endpoint.clone();
                async move { source.get_json::<T>(&endpoint).await }
            },
            on_result,
        )
    }

    async fn exchange(&self, request: RequestBuilder) -> Result<RawResponse, PollError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let path = response.url().path().to_string();
        let body = response.bytes().await.map_err(transport_error)?;

        debug!("{} -> {} ({} bytes)", path, status, body.len());

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Decode a JSON body into `T`.
///
/// Malformed JSON is a [`PollError::Decode`]; JSON that `T` rejects is a
/// [`PollError::Shape`].
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, PollError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| PollError::Decode(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| PollError::Shape(e.to_string()))
}

/// Transport error for a non-success status.
#[must_use]
pub fn status_error(status: StatusCode) -> PollError {
    PollError::Transport(format!("HTTP {}", status.as_u16()))
}

fn transport_error(e: reqwest::Error) -> PollError {
    if e.is_timeout() {
        PollError::timeout()
    } else {
        PollError::Transport(e.to_string())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal canned-response HTTP server for transport tests.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One canned reply: status code, JSON body, optional cookie.
    #[derive(Debug, Clone)]
    pub struct Canned {
        pub code: u16,
        pub body: String,
        pub set_cookie: Option<String>,
    }

    impl Canned {
        pub fn json(code: u16, body: &str) -> Self {
            Self {
                code,
                body: body.to_string(),
                set_cookie: None,
            }
        }

        pub fn with_cookie(mut self, cookie: &str) -> Self {
            self.set_cookie = Some(cookie.to_string());
            self
        }
    }

    /// Raw text of every request the server has seen.
    pub type Seen = Arc<Mutex<Vec<String>>>;

    /// Serve `routes` (keyed by path) on an ephemeral port until the test
    /// runtime shuts down. Unknown paths get a 404.
    pub async fn serve(routes: HashMap<&'static str, Canned>) -> (String, Seen) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let routes = routes.clone();
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let mut read = 0;
                    // Read until the header block (and any short body) is in
                    loop {
                        let Ok(n) = stream.read(&mut buf[read..]).await else {
                            return;
                        };
                        read += n;
                        let text = String::from_utf8_lossy(&buf[..read]);
                        if n == 0 || request_complete(&text) {
                            break;
                        }
                    }
                    let request = String::from_utf8_lossy(&buf[..read]).to_string();
                    let path = request
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or("/")
                        .to_string();
                    log.lock().unwrap().push(request);

                    let reply = routes
                        .get(path.as_str())
                        .cloned()
                        .unwrap_or_else(|| Canned::json(404, r#"{"error":"not found"}"#));
                    let cookie = reply
                        .set_cookie
                        .map(|c| format!("Set-Cookie: {c}\r\n"))
                        .unwrap_or_default();
                    let response = format!(
                        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                        reply.code,
                        cookie,
                        reply.body.len(),
                        reply.body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        (format!("http://{addr}"), seen)
    }

    fn request_complete(text: &str) -> bool {
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..split]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        text.len() >= split + 4 + length
    }
}
