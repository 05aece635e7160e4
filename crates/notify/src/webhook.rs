//! HTTP webhook delivery.
//!
//! Hands every message to a relay endpoint as a small JSON document; the
//! relay owns the chat-platform connection and performs the real send.

use std::collections::HashMap;

use crate::traits::{Delivery, NotifyError};

/// JSON body POSTed for every message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct WebhookPayload<'a> {
    /// `direct` or `channel`.
    pub kind: &'a str,
    /// External user id for `direct`, channel id for `channel`.
    pub target: &'a str,
    pub text: &'a str,
}

/// Delivers messages as JSON over HTTP to a relay endpoint.
///
/// Environment variable references (`${VAR_NAME}`) in the URL and header
/// values are resolved at construction time.
#[derive(Debug)]
pub struct WebhookDelivery {
    /// Target URL (env vars already resolved).
    url: String,
    /// Custom headers to include on every request.
    headers: HashMap<String, String>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookDelivery {
    /// Missing env vars referenced from `url` or `headers` produce a
    /// [`NotifyError::Config`] error.
    pub fn new(url: &str, headers: HashMap<String, String>) -> Result<Self, NotifyError> {
        let resolved_url = resolve_env_vars(url)?;
        if resolved_url.trim().is_empty() {
            return Err(NotifyError::Config("webhook url is empty".to_string()));
        }

        let mut resolved_headers = HashMap::with_capacity(headers.len());
        for (key, value) in &headers {
            resolved_headers.insert(key.clone(), resolve_env_vars(value)?);
        }

        Ok(Self {
            url: resolved_url,
            headers: resolved_headers,
            client: reqwest::Client::new(),
        })
    }

    /// Build from the process delivery settings; a token becomes a bearer header.
    pub fn from_config(url: &str, token: Option<&str>) -> Result<Self, NotifyError> {
        let mut headers = HashMap::new();
        if let Some(token) = token {
            headers.insert("Authorization".to_string(), format!("Bearer {token}"));
        }
        Self::new(url, headers)
    }

    async fn post(&self, payload: &WebhookPayload<'_>) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.url).json(payload);
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                url = %self.url,
                %status,
                body = %body_text,
                "webhook returned non-2xx status"
            );
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body: body_text,
            });
        }

        tracing::debug!(url = %self.url, kind = payload.kind, %status, "webhook message delivered");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Delivery for WebhookDelivery {
    async fn send_direct(&self, external_id: &str, text: &str) -> Result<(), NotifyError> {
        self.post(&WebhookPayload {
            kind: "direct",
            target: external_id,
            text,
        })
        .await
    }

    async fn send_to_channel(&self, channel_id: &str, text: &str) -> Result<(), NotifyError> {
        self.post(&WebhookPayload {
            kind: "channel",
            target: channel_id,
            text,
        })
        .await
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
///
/// Returns an error if a referenced variable is not set.
fn resolve_env_vars(input: &str) -> Result<String, NotifyError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(NotifyError::Config(format!(
                    "unclosed env var reference in: {input}"
                )));
            }
            let value = std::env::var(&var_name).map_err(|_| {
                NotifyError::Config(format!("env var not found: {var_name}"))
            })?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_in_url() {
        std::env::set_var("ONCALL_WEBHOOK_TEST_HOST", "relay.internal");
        let result = resolve_env_vars("https://${ONCALL_WEBHOOK_TEST_HOST}/send").unwrap();
        assert_eq!(result, "https://relay.internal/send");
        std::env::remove_var("ONCALL_WEBHOOK_TEST_HOST");
    }

    #[test]
    fn resolve_env_vars_missing_or_unclosed() {
        match resolve_env_vars("https://${ONCALL_NOT_SET_98765}/send").unwrap_err() {
            NotifyError::Config(msg) => assert!(msg.contains("ONCALL_NOT_SET_98765")),
            other => panic!("expected Config error, got: {other:?}"),
        }
        match resolve_env_vars("https://${UNCLOSED/send").unwrap_err() {
            NotifyError::Config(msg) => assert!(msg.contains("unclosed")),
            other => panic!("expected Config error, got: {other:?}"),
        }
        assert_eq!(resolve_env_vars("http://plain/x").unwrap(), "http://plain/x");
    }

    #[test]
    fn token_becomes_bearer_header() {
        let delivery =
            WebhookDelivery::from_config("http://localhost:9/send", Some("abc")).unwrap();
        assert_eq!(delivery.headers["Authorization"], "Bearer abc");
        assert_eq!(delivery.channel_name(), "webhook");
    }

    #[test]
    fn empty_url_is_rejected() {
        assert!(matches!(
            WebhookDelivery::from_config("  ", None),
            Err(NotifyError::Config(_))
        ));
    }

    #[test]
    fn payload_shape() {
        let payload = WebhookPayload {
            kind: "direct",
            target: "42",
            text: "hi",
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({ "kind": "direct", "target": "42", "text": "hi" })
        );
    }
}
