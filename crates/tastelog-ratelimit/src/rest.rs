//! REST counter store.
//!
//! Speaks the JSON command protocol of HTTP-fronted Redis services: a command is
//! POSTed as a JSON array (`["EVAL", script, "1", key, window_ms]`) with a bearer
//! token, and the reply is `{"result": ...}` or `{"error": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{instrument, warn};

use crate::store::{INCREMENT_SCRIPT, Increment, RateLimitStore, StoreError, increment_from_reply};

#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    url: String,
    token: String,
    retries: u32,
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("url", &self.url)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl RestStore {
    /// Creates a client. No request is sent until the first command.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
        retries: u32,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            retries,
        })
    }

    /// Checks reachability and credentials.
    #[instrument(skip(self), fields(store.operation = "PING"))]
    pub async fn ping(&self) -> Result<(), StoreError> {
        match self.command(json!(["PING"])).await? {
            Value::String(reply) if reply.eq_ignore_ascii_case("pong") => Ok(()),
            other => Err(StoreError::Protocol(format!("unexpected PING reply: {}", other))),
        }
    }

    async fn command(&self, command: Value) -> Result<Value, StoreError> {
        let mut attempt = 0;

        let response = loop {
            let sent = self
                .client
                .post(&self.url)
                .bearer_auth(&self.token)
                .json(&command)
                .send()
                .await;

            match sent {
                Ok(response) => break response,
                // A connect error means nothing reached the server, so a retry
                // cannot double count.
                Err(e) if e.is_connect() && attempt < self.retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, "Rate limit store connect failed, retrying");
                }
                Err(e) => return Err(StoreError::Unavailable(e.to_string())),
            }
        };

        let status = response.status();
        if status.is_server_error() {
            return Err(StoreError::Unavailable(format!("store answered {}", status)));
        }

        let reply: CommandReply = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(format!("unreadable reply ({}): {}", status, e)))?;

        if let Some(error) = reply.error {
            return Err(StoreError::Protocol(error));
        }
        if !status.is_success() {
            return Err(StoreError::Protocol(format!("store answered {}", status)));
        }

        reply
            .result
            .ok_or_else(|| StoreError::Protocol("reply has no result".to_string()))
    }
}

#[async_trait]
impl RateLimitStore for RestStore {
    #[instrument(skip(self), fields(store.operation = "EVAL"))]
    async fn increment(&self, key: &str, window: Duration) -> Result<Increment, StoreError> {
        let window_ms = window.as_millis().to_string();
        let result = self
            .command(json!(["EVAL", INCREMENT_SCRIPT, "1", key, window_ms]))
            .await?;

        let pair = result
            .as_array()
            .filter(|items| items.len() == 2)
            .ok_or_else(|| StoreError::Protocol(format!("unexpected EVAL reply: {}", result)))?;

        match (pair[0].as_i64(), pair[1].as_i64()) {
            (Some(count), Some(ttl_ms)) => increment_from_reply(count, ttl_ms, window),
            _ => Err(StoreError::Protocol(format!("unexpected EVAL reply: {}", result))),
        }
    }

    fn backend(&self) -> &'static str {
        "rest"
    }
}
