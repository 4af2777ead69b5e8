//! OpenAI Chat Completions, Files and Batch API.
//!
//! Batches take two steps: the request lines are uploaded as a JSONL file,
//! then a batch is created that references the uploaded file. Results live
//! in a separate output file whose id only appears in the batch status.

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use reqwest::RequestBuilder;
use reqwest::multipart::Form;
use reqwest::multipart::Part;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use super::BatchUnit;
use super::ChatRequest;
use super::VendorProtocol;
use super::merge_extra;
use crate::client::HttpTransport;
use crate::client::encode_jsonl;
use crate::config::Endpoints;
use crate::config::ProviderConfig;
use crate::error::Result;
use crate::error::TranslationError;
use crate::provider::ProviderId;
use crate::types::BatchJob;
use crate::types::BatchStatus;

/// Endpoint every batch line targets.
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

const COMPLETION_WINDOW: &str = "24h";

const BATCH_FILE_NAME: &str = "batch-translations.jsonl";

#[derive(Debug)]
pub struct OpenAiProtocol {
    config: ProviderConfig,
    http: HttpTransport,
}

impl OpenAiProtocol {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let http = HttpTransport::new(&config)?;
        Ok(Self { config, http })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.config.api_key())
    }

    /// Upload a JSONL payload for batch processing and return its file id.
    async fn upload_batch_file(&self, jsonl: String) -> Result<String> {
        let Some(url) = self.config.endpoints.files_upload.as_deref() else {
            return Err(TranslationError::Configuration(
                "OpenAI file upload endpoint is not configured".to_string(),
            ));
        };

        let form = Form::new()
            .text("purpose", "batch")
            .part("file", Part::bytes(jsonl.into_bytes()).file_name(BATCH_FILE_NAME));

        let file: FileObject = self
            .http
            .send_json(
                self.authorized(self.http.post(url)).multipart(form),
                self.config.timeouts.metadata,
            )
            .await?;
        tracing::debug!(file_id = %file.id, "uploaded batch input file");
        Ok(file.id)
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<Value>> {
        let url = Endpoints::resolve(&self.config.endpoints.batch_results, file_id);
        let body = self
            .http
            .send_text(self.authorized(self.http.get(&url)), self.config.timeouts.request)
            .await?;
        self.http.decode_jsonl(&body)
    }
}

#[async_trait]
impl VendorProtocol for OpenAiProtocol {
    fn provider(&self) -> ProviderId {
        ProviderId::OpenAI
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
        let mut body = json!({
            "model": request.model,
            "messages": [{"role": "user", "content": request.message}],
            "max_tokens": request.max_tokens,
        });
        merge_extra(&mut body, request.extra);

        tracing::debug!(model = request.model, "sending ChatGPT completion");
        let response: ChatCompletionResponse = self
            .http
            .send_json(
                self.authorized(self.http.post(&self.config.endpoints.chat)).json(&body),
                self.config.timeouts.request,
            )
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                TranslationError::malformed(ProviderId::OpenAI, "missing choices[0].message.content")
            })
    }

    async fn submit_batch(
        &self,
        model: &str,
        max_tokens: u32,
        units: &[BatchUnit],
    ) -> Result<BatchJob> {
        let lines: Vec<BatchLine<'_>> = units
            .iter()
            .map(|unit| BatchLine {
                custom_id: &unit.custom_id,
                method: "POST",
                url: CHAT_COMPLETIONS_PATH,
                body: LineBody {
                    model,
                    max_tokens,
                    messages: [UserMessage {
                        role: "user",
                        content: &unit.prompt,
                    }],
                },
            })
            .collect();
        let jsonl = encode_jsonl(&lines)
            .map_err(|e| TranslationError::InvalidRequest(format!("cannot encode batch: {e}")))?;

        let input_file_id = self.upload_batch_file(jsonl).await?;

        let batch: Batch = self
            .http
            .send_json(
                self.authorized(self.http.post(&self.config.endpoints.batch_create))
                    .json(&json!({
                        "input_file_id": input_file_id,
                        "endpoint": CHAT_COMPLETIONS_PATH,
                        "completion_window": COMPLETION_WINDOW,
                    })),
                self.config.timeouts.metadata,
            )
            .await?;
        Ok(batch.into_job())
    }

    async fn batch_status(&self, batch_id: &str) -> Result<BatchJob> {
        let url = Endpoints::resolve(&self.config.endpoints.batch_status, batch_id);
        let batch: Batch = self
            .http
            .send_json(self.authorized(self.http.get(&url)), self.config.timeouts.metadata)
            .await?;
        Ok(batch.into_job())
    }

    async fn download_results(&self, job: &BatchJob) -> Result<Vec<Value>> {
        if !job.has_results() {
            return Err(TranslationError::BatchNotReady {
                batch_id: job.id.clone(),
                status: job.vendor_status.clone(),
            });
        }

        // Succeeded items live in the output file, failed ones in the error file.
        let mut lines = Vec::with_capacity(job.request_count);
        for file_id in [&job.output_handle, &job.error_handle].into_iter().flatten() {
            lines.extend(self.download_file(file_id).await?);
        }
        Ok(lines)
    }

    fn result_text(&self, line: &Value) -> Option<String> {
        line.pointer("/response/body/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    async fn cancel_batch(&self, batch_id: &str) -> Result<Value> {
        let url = Endpoints::resolve(&self.config.endpoints.batch_cancel, batch_id);
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

// Chat Completions types
#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// Files and Batch types
#[derive(Serialize)]
struct BatchLine<'a> {
    custom_id: &'a str,
    method: &'a str,
    url: &'a str,
    body: LineBody<'a>,
}

#[derive(Serialize)]
struct LineBody<'a> {
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
struct FileObject {
    id: String,
}

#[derive(Deserialize)]
struct Batch {
    id: String,
    status: String,
    #[serde(default)]
    request_counts: Option<RequestCounts>,
    created_at: Option<i64>,
    output_file_id: Option<String>,
    error_file_id: Option<String>,
}

#[derive(Deserialize, Default)]
struct RequestCounts {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    completed: usize,
    #[serde(default)]
    failed: usize,
}

impl Batch {
    fn status(&self) -> BatchStatus {
        match self.status.as_str() {
            "validating" => BatchStatus::Validating,
            "in_progress" | "finalizing" => BatchStatus::InProgress,
            "completed" => BatchStatus::Completed,
            "failed" => BatchStatus::Failed,
            "expired" => BatchStatus::Expired,
            "cancelling" => BatchStatus::Cancelling,
            "cancelled" => BatchStatus::Cancelled,
            other => {
                tracing::warn!(batch_id = %self.id, "unknown ChatGPT batch status `{other}`");
                BatchStatus::InProgress
            }
        }
    }

    fn into_job(self) -> BatchJob {
        let status = self.status();
        let counts = self.request_counts.unwrap_or_default();
        BatchJob {
            id: self.id,
            provider: ProviderId::OpenAI,
            status,
            vendor_status: self.status,
            request_count: counts.total,
            succeeded_count: counts.completed,
            failed_count: counts.failed,
            created_at: self
                .created_at
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
            output_handle: self.output_file_id.filter(|id| !id.is_empty()),
            error_handle: self.error_file_id.filter(|id| !id.is_empty()),
        }
    }
}
