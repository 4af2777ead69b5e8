//! Anthropic Messages and Message Batches API.
//!
//! Batches are created in one call: the request array travels inline in the
//! creation body. Results come back as JSONL from a per-batch results
//! endpoint.

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use super::BatchUnit;
use super::ChatRequest;
use super::VendorProtocol;
use super::merge_extra;
use crate::client::HttpTransport;
use crate::config::Endpoints;
use crate::config::ProviderConfig;
use crate::error::Result;
use crate::error::TranslationError;
use crate::provider::ProviderId;
use crate::types::BatchJob;
use crate::types::BatchStatus;

const API_VERSION: &str = "2023-06-01";

#[derive(Debug)]
pub struct AnthropicProtocol {
    config: ProviderConfig,
    http: HttpTransport,
}

impl AnthropicProtocol {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let http = HttpTransport::new(&config)?;
        Ok(Self { config, http })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-api-key", self.config.api_key())
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
    }

    fn url(&self, template: &str, batch_id: &str) -> String {
        Endpoints::resolve(template, batch_id)
    }
}

#[async_trait]
impl VendorProtocol for AnthropicProtocol {
    fn provider(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": [{"role": "user", "content": request.message}],
        });
        merge_extra(&mut body, request.extra);

        tracing::debug!(model = request.model, "sending Claude message");
        let response: MessagesResponse = self
            .http
            .send_json(
                self.authorized(self.http.post(&self.config.endpoints.chat)).json(&body),
                self.config.timeouts.request,
            )
            .await?;

        response
            .content
            .into_iter()
            .find_map(|block| match block.content_type.as_deref() {
                None | Some("text") => block.text,
                Some(_) => None,
            })
            .ok_or_else(|| TranslationError::malformed(ProviderId::Anthropic, "missing content[].text"))
    }

    async fn submit_batch(
        &self,
        model: &str,
        max_tokens: u32,
        units: &[BatchUnit],
    ) -> Result<BatchJob> {
        let requests: Vec<BatchRequest<'_>> = units
            .iter()
            .map(|unit| BatchRequest {
                custom_id: &unit.custom_id,
                params: BatchParams {
                    model,
                    max_tokens,
                    messages: [UserMessage {
                        role: "user",
                        content: &unit.prompt,
                    }],
                },
            })
            .collect();

        let batch: MessageBatch = self
            .http
            .send_json(
                self.authorized(self.http.post(&self.config.endpoints.batch_create))
                    .json(&json!({ "requests": requests })),
                self.config.timeouts.metadata,
            )
            .await?;
        Ok(batch.into_job())
    }

    async fn batch_status(&self, batch_id: &str) -> Result<BatchJob> {
        let url = self.url(&self.config.endpoints.batch_status, batch_id);
        let batch: MessageBatch = self
            .http
            .send_json(self.authorized(self.http.get(&url)), self.config.timeouts.metadata)
            .await?;
        Ok(batch.into_job())
    }

    async fn download_results(&self, job: &BatchJob) -> Result<Vec<Value>> {
        let url = self.url(&self.config.endpoints.batch_results, &job.id);
        let body = self
            .http
            .send_text(self.authorized(self.http.get(&url)), self.config.timeouts.request)
            .await?;
        self.http.decode_jsonl(&body)
    }

    fn result_text(&self, line: &Value) -> Option<String> {
        if line.pointer("/result/type").and_then(Value::as_str) != Some("succeeded") {
            return None;
        }
        line.pointer("/result/message/content")?
            .as_array()?
            .iter()
            .filter(|block| matches!(block.get("type").and_then(Value::as_str), None | Some("text")))
            .find_map(|block| block.get("text").and_then(Value::as_str))
            .map(str::to_string)
    }

    async fn cancel_batch(&self, batch_id: &str) -> Result<Value> {
        let url = self.url(&self.config.endpoints.batch_cancel, batch_id);
        self.http
            .send_json(self.authorized(self.http.post(&url)), self.config.timeouts.metadata)
            .await
    }

    async fn list_batches(&self, limit: u32) -> Result<Value> {
        let request = self
            .authorized(self.http.get(&self.config.endpoints.batch_list))
            .query(&[("limit", limit)]);
        self.http
            .send_json(request, self.config.timeouts.metadata)
            .await
    }
}

// Messages API types
#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: Option<String>,
    text: Option<String>,
}

// Message Batches API types
#[derive(Serialize)]
struct BatchRequest<'a> {
    custom_id: &'a str,
    params: BatchParams<'a>,
}

#[derive(Serialize)]
struct BatchParams<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [UserMessage<'a>; 1],
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessageBatch {
    id: String,
    processing_status: String,
    #[serde(default)]
    request_counts: RequestCounts,
    created_at: Option<DateTime<Utc>>,
    cancel_initiated_at: Option<String>,
    results_url: Option<String>,
}

#[derive(Deserialize, Default)]
struct RequestCounts {
    #[serde(default)]
    processing: usize,
    #[serde(default)]
    succeeded: usize,
    #[serde(default)]
    errored: usize,
    #[serde(default)]
    canceled: usize,
    #[serde(default)]
    expired: usize,
}

impl MessageBatch {
    fn status(&self) -> BatchStatus {
        match self.processing_status.as_str() {
            "in_progress" => BatchStatus::InProgress,
            "canceling" => BatchStatus::Cancelling,
            "ended" if self.cancel_initiated_at.is_some() => BatchStatus::Cancelled,
            "ended" if self.request_counts.succeeded == 0 && self.request_counts.expired > 0 => {
                BatchStatus::Expired
            }
            "ended" => BatchStatus::Completed,
            other => {
                tracing::warn!(batch_id = %self.id, "unknown Claude batch status `{other}`");
                BatchStatus::InProgress
            }
        }
    }

    fn into_job(self) -> BatchJob {
        let status = self.status();
        let counts = &self.request_counts;
        BatchJob {
            request_count: counts.processing
                + counts.succeeded
                + counts.errored
                + counts.canceled
                + counts.expired,
            succeeded_count: counts.succeeded,
            failed_count: counts.errored + counts.expired,
            id: self.id,
            provider: ProviderId::Anthropic,
            status,
            vendor_status: self.processing_status,
            created_at: self.created_at,
            output_handle: self.results_url,
            error_handle: None,
        }
    }
}
