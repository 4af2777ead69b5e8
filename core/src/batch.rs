//! Batch job lifecycle.
//!
//! The vendor owns every batch: this type only triggers vendor-side
//! transitions (create, cancel) and reports what the vendor says. There is
//! no polling loop and no local copy of job state; callers decide when to
//! ask again.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::error::TranslationError;
use crate::prompt::build_prompt;
use crate::protocol::BatchUnit;
use crate::protocol::VendorProtocol;
use crate::provider::MAX_LIST_LIMIT;
use crate::provider::ProviderId;
use crate::sanitize::strip_code_fence;
use crate::types::BatchJob;
use crate::types::BatchResultEntry;
use crate::types::BatchStatus;
use crate::types::MAX_TEXT_CHARS;
use crate::types::TranslationRequest;

#[derive(Clone)]
pub struct BatchOrchestrator {
    protocol: Arc<dyn VendorProtocol>,
    model: String,
}

impl BatchOrchestrator {
    pub fn new(protocol: Arc<dyn VendorProtocol>, model: impl Into<String>) -> Self {
        Self {
            protocol,
            model: model.into(),
        }
    }

    pub fn provider(&self) -> ProviderId {
        self.protocol.provider()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Validate requests and turn them into prompt-bearing batch units.
    pub fn prepare(&self, requests: &[TranslationRequest]) -> Result<Vec<BatchUnit>> {
        let provider = self.provider();
        if requests.is_empty() {
            return Err(TranslationError::InvalidRequest(
                "a batch needs at least one request".to_string(),
            ));
        }
        let max = provider.max_batch_size();
        if requests.len() > max {
            return Err(TranslationError::BatchSizeExceeded {
                provider,
                count: requests.len(),
                max,
            });
        }

        let mut seen = HashSet::with_capacity(requests.len());
        requests
            .iter()
            .map(|request| {
                if request.id.trim().is_empty() {
                    return Err(TranslationError::InvalidRequest(
                        "every batch request needs an id".to_string(),
                    ));
                }
                if !seen.insert(request.id.as_str()) {
                    return Err(TranslationError::InvalidRequest(format!(
                        "duplicate request id `{}`",
                        request.id
                    )));
                }
                check_text_length(&request.text)?;
                Ok(BatchUnit {
                    custom_id: request.id.clone(),
                    prompt: build_prompt(&request.text, &request.source_lang, &request.target_lang),
                })
            })
            .collect()
    }

    /// Submit a new batch job. Nothing is sent when validation fails.
    pub async fn create_batch(
        &self,
        requests: &[TranslationRequest],
        max_tokens: u32,
    ) -> Result<BatchJob> {
        let units = self.prepare(requests)?;
        let mut job = self
            .protocol
            .submit_batch(&self.model, max_tokens, &units)
            .await?;
        job.request_count = units.len();
        tracing::info!(
            provider = %job.provider,
            batch_id = %job.id,
            requests = job.request_count,
            "created batch"
        );
        Ok(job)
    }

    pub async fn status(&self, batch_id: &str) -> Result<BatchJob> {
        self.protocol.batch_status(batch_id).await
    }

    /// Fetch and decode results. Fails with `BatchNotReady`, without
    /// downloading anything, while the vendor has published no result or
    /// error file. A batch that failed, expired or was cancelled before
    /// producing any file yields no entries.
    pub async fn results(&self, batch_id: &str) -> Result<Vec<BatchResultEntry>> {
        let job = self.protocol.batch_status(batch_id).await?;
        if !job.has_results() {
            if ended_without_output(job.status) {
                tracing::info!(batch_id, status = %job.status, "batch ended without results");
                return Ok(Vec::new());
            }
            return Err(TranslationError::BatchNotReady {
                batch_id: batch_id.to_string(),
                status: job.vendor_status,
            });
        }

        let lines = self.protocol.download_results(&job).await?;
        let entries = lines
            .into_iter()
            .map(|line| self.result_entry(line))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(batch_id, entries = entries.len(), "decoded batch results");
        Ok(entries)
    }

    fn result_entry(&self, raw: Value) -> Result<BatchResultEntry> {
        let Some(custom_id) = raw.get("custom_id").and_then(Value::as_str) else {
            return Err(TranslationError::malformed(
                self.provider(),
                "result line without custom_id",
            ));
        };
        let custom_id = custom_id.to_string();
        let text = self
            .protocol
            .result_text(&raw)
            .map(|text| strip_code_fence(&text));
        if text.is_none() {
            tracing::warn!(custom_id = %custom_id, "batch item has no reply text");
        }
        Ok(BatchResultEntry {
            custom_id,
            raw,
            text,
        })
    }

    /// Ask the vendor to cancel. The acknowledgement is returned as-is, also
    /// when the job had already finished.
    pub async fn cancel(&self, batch_id: &str) -> Result<Value> {
        let ack = self.protocol.cancel_batch(batch_id).await?;
        tracing::info!(provider = %self.provider(), batch_id, "requested batch cancellation");
        Ok(ack)
    }

    pub async fn list(&self, limit: u32) -> Result<Value> {
        self.protocol.list_batches(clamp_list_limit(limit)).await
    }
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("provider", &self.provider())
            .field("model", &self.model)
            .finish()
    }
}

/// Terminal states in which a vendor may legitimately publish no files.
/// `Completed` is excluded: its files can lag behind the status flip.
fn ended_without_output(status: BatchStatus) -> bool {
    matches!(
        status,
        BatchStatus::Failed | BatchStatus::Expired | BatchStatus::Cancelled
    )
}

pub fn clamp_list_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_LIST_LIMIT)
}

pub(crate) fn check_text_length(text: &str) -> Result<()> {
    let len = text.chars().count();
    if len > MAX_TEXT_CHARS {
        return Err(TranslationError::InvalidRequest(format!(
            "text is {len} characters long, the limit is {MAX_TEXT_CHARS}"
        )));
    }
    Ok(())
}
