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

//! One-shot account and privilege calls.
//!
//! Each call is a single request with no retry. The backend answers
//! refusals (e.g. a missing admin cookie) with a non-success status and an
//! `{"error": ...}` body; that body is returned as an unsuccessful reply so
//! its text reaches the user. Only a non-success status without a readable
//! reply body becomes an error.

use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    ActionReply, Credentials, UserList, UsernameRequest, ADMIN_GRANT_PATH, ADMIN_LIST_PATH,
    ADMIN_REVOKE_PATH, LOGIN_PATH, REGISTER_PATH,
};
use crate::http::{decode, status_error, HttpSource, RawResponse};
use crate::poller::PollError;

/// Client for the backend's account and admin endpoints.
#[derive(Debug, Clone)]
pub struct AdminApi {
    source: HttpSource,
}

impl AdminApi {
    #[must_use]
    pub fn new(source: HttpSource) -> Self {
        Self { source }
    }

    /// The underlying transport (shares the session cookie).
    #[must_use]
    pub fn source(&self) -> &HttpSource {
        &self.source
    }

    /// Log in. On success the backend sets the session cookie, which this
    /// client's transport keeps for later requests.
    pub async fn login(&self, credentials: &Credentials) -> Result<ActionReply, PollError> {
        info!("Logging in as '{}'", credentials.username);
        self.post_action(LOGIN_PATH, credentials).await
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<ActionReply, PollError> {
        info!("Registering '{}'", credentials.username);
        self.post_action(REGISTER_PATH, credentials).await
    }

    pub async fn grant_admin(&self, username: &str) -> Result<ActionReply, PollError> {
        info!("Granting admin to '{}'", username);
        let body = UsernameRequest {
            username: username.to_string(),
        };
        self.post_action(ADMIN_GRANT_PATH, &body).await
    }

    pub async fn revoke_admin(&self, username: &str) -> Result<ActionReply, PollError> {
        info!("Revoking admin from '{}'", username);
        let body = UsernameRequest {
            username: username.to_string(),
        };
        self.post_action(ADMIN_REVOKE_PATH, &body).await
    }

    pub async fn list_users(&self) -> Result<UserList, PollError> {
        let response = self.source.get(ADMIN_LIST_PATH).await?;
        interpret(response, |list: &UserList| {
            list.message.is_some() || list.error.is_some()
        })
    }

    async fn post_action<B>(&self, path: &str, payload: &B) -> Result<ActionReply, PollError>
    where
        B: Serialize + ?Sized,
    {
        let response = self.source.post_json(path, payload).await?;
        interpret(response, ActionReply::has_text)
    }
}

/// Decode a reply, tolerating non-success statuses that carry one.
fn interpret<T, F>(response: RawResponse, has_text: F) -> Result<T, PollError>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    if response.status.is_success() {
        return decode(&response.body);
    }

    match decode::<T>(&response.body) {
        Ok(reply) if has_text(&reply) => Ok(reply),
        _ => Err(status_error(response.status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{serve, Canned};
    use crate::http::SourceConfig;
    use std::collections::HashMap;

    fn api(base_url: String) -> AdminApi {
        AdminApi::new(
            HttpSource::new(SourceConfig {
                base_url,
                ..Default::default()
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_login_cookie_is_sent_on_later_requests() {
        let (base, seen) = serve(HashMap::from([
            (
                "/login",
                Canned::json(200, r#"{"success":true,"message":"welcome","is_admin":true}"#)
                    .with_cookie("admin_auth=true; Path=/"),
            ),
            (
                "/admin/list",
                Canned::json(
                    200,
                    r#"{"success":true,"users":[{"username":"alice","is_admin":1}]}"#,
                ),
            ),
        ]))
        .await;

        let api = api(base);
        let reply = api
            .login(&Credentials::new("alice", "secret"))
            .await
            .unwrap();
        assert!(reply.success);
        assert_eq!(reply.text(), "welcome");
        assert_eq!(reply.is_admin, Some(true));

        let list = api.list_users().await.unwrap();
        assert_eq!(list.users.len(), 1);
        assert!(list.users[0].is_admin);

        let seen = seen.lock().unwrap().clone();
        assert!(seen[0].contains(r#""username":"alice""#));
        assert!(seen[0].contains(r#""password":"secret""#));
        assert!(seen[1].starts_with("GET /admin/list"));
        assert!(seen[1].to_ascii_lowercase().contains("cookie: admin_auth=true"));
    }

    #[tokio::test]
    async fn test_refusal_body_becomes_unsuccessful_reply() {
        let (base, _) = serve(HashMap::from([(
            "/admin/grant",
            Canned::json(403, r#"{"error":"not allowed"}"#),
        )]))
        .await;

        let reply = api(base).grant_admin("bob").await.unwrap();
        assert!(!reply.success);
        assert_eq!(reply.text(), "not allowed");
    }

    #[tokio::test]
    async fn test_unreadable_error_status_is_transport_failure() {
        let (base, _) = serve(HashMap::from([(
            "/admin/revoke",
            Canned::json(502, "<html>bad gateway</html>"),
        )]))
        .await;

        let result = api(base).revoke_admin("bob").await;
        assert_eq!(result, Err(PollError::Transport("HTTP 502".to_string())));
    }

    #[tokio::test]
    async fn test_register_failure_reply() {
        let (base, seen) = serve(HashMap::from([(
            "/register",
            Canned::json(200, r#"{"success":false,"message":"account exists"}"#),
        )]))
        .await;

        let reply = api(base)
            .register(&Credentials::new("carol", "pw"))
            .await
            .unwrap();
        assert!(!reply.success);
        assert_eq!(reply.text(), "account exists");
        assert!(seen.lock().unwrap()[0].starts_with("POST /register"));
    }
}
