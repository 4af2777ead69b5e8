//! HTTP plumbing shared by the vendor protocols.
//!
//! Every call goes through [`HttpTransport::send`], which applies the
//! per-call timeout and turns non-success statuses into
//! [`TranslationError::Provider`]. Transport failures become
//! [`TranslationError::Connection`]; nothing is retried here.

use std::time::Duration;

use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::error::TranslationError;
use crate::provider::ProviderId;

#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    client: Client,
    provider: ProviderId,
}

impl HttpTransport {
    pub(crate) fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| TranslationError::connection(config.provider, e))?;
        Ok(Self {
            client,
            provider: config.provider,
        })
    }

    pub(crate) fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    pub(crate) fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send a request and fail on any non-success status.
    pub(crate) async fn send(&self, request: RequestBuilder, timeout: Duration) -> Result<Response> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TranslationError::connection(self.provider, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .map_err(|e| TranslationError::connection(self.provider, e))?;
        let message = error_message(&body);
        tracing::debug!(provider = %self.provider, status = status.as_u16(), "{message}");
        Err(TranslationError::Provider {
            provider: self.provider,
            status: status.as_u16(),
            message,
        })
    }

    /// Send and decode a JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<T> {
        let body = self.send_text(request, timeout).await?;
        serde_json::from_str(&body).map_err(|e| {
            TranslationError::malformed(self.provider, format!("{e}: {}", truncate(&body)))
        })
    }

    /// Send and return the raw body.
    pub(crate) async fn send_text(&self, request: RequestBuilder, timeout: Duration) -> Result<String> {
        let response = self.send(request, timeout).await?;
        response
            .text()
            .await
            .map_err(|e| TranslationError::connection(self.provider, e))
    }

    /// Decode newline-delimited JSON, one object per non-blank line.
    pub(crate) fn decode_jsonl(&self, body: &str) -> Result<Vec<Value>> {
        body.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|e| {
                    TranslationError::malformed(
                        self.provider,
                        format!("result line {}: {e}", idx + 1),
                    )
                })
            })
            .collect()
    }
}

/// The vendor's `error.message` when the body carries one, else the raw body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Encode values as newline-delimited JSON.
pub(crate) fn encode_jsonl<T: serde::Serialize>(items: &[T]) -> serde_json::Result<String> {
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(item)?);
        out.push('\n');
    }
    Ok(out)
}

fn truncate(body: &str) -> &str {
    const LIMIT: usize = 200;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
