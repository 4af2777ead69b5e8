//! Vendor wire protocols.
//!
//! Each vendor speaks a different dialect for the same capability set: a
//! synchronous chat call plus an asynchronous batch lifecycle. A
//! [`VendorProtocol`] implementation owns one dialect; everything above it
//! (prompting, validation, sanitizing) is shared.

mod anthropic;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;

pub use anthropic::AnthropicProtocol;
pub use openai::OpenAiProtocol;

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::provider::ProviderId;
use crate::types::BatchJob;

/// A single chat call.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub message: &'a str,
    pub max_tokens: u32,
    /// Extra top-level body fields; these override the defaults.
    pub extra: Option<&'a Map<String, Value>>,
}

/// One prepared batch item: the correlation id and the full prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchUnit {
    pub custom_id: String,
    pub prompt: String,
}

#[async_trait]
pub trait VendorProtocol: Send + Sync + std::fmt::Debug {
    fn provider(&self) -> ProviderId;

    /// Send one chat call and return the model's reply text, unmodified.
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String>;

    /// Submit prepared units as a new batch job.
    async fn submit_batch(&self, model: &str, max_tokens: u32, units: &[BatchUnit])
    -> Result<BatchJob>;

    async fn batch_status(&self, batch_id: &str) -> Result<BatchJob>;

    /// Download and decode the result lines of a job that has an output
    /// artifact.
    async fn download_results(&self, job: &BatchJob) -> Result<Vec<Value>>;

    /// Reply text carried by one decoded result line, if the item succeeded.
    fn result_text(&self, line: &Value) -> Option<String>;

    async fn cancel_batch(&self, batch_id: &str) -> Result<Value>;

    /// `limit` is already clamped by the caller.
    async fn list_batches(&self, limit: u32) -> Result<Value>;
}

/// Build the protocol implementation for a resolved provider config.
pub fn protocol_for(config: ProviderConfig) -> Result<Arc<dyn VendorProtocol>> {
    let protocol: Arc<dyn VendorProtocol> = match config.provider {
        ProviderId::Anthropic => Arc::new(AnthropicProtocol::new(config)?),
        ProviderId::OpenAI => Arc::new(OpenAiProtocol::new(config)?),
    };
    Ok(protocol)
}

/// Merge `extra` over `body`; caller keys win.
pub(crate) fn merge_extra(body: &mut Value, extra: Option<&Map<String, Value>>) {
    let (Value::Object(target), Some(extra)) = (body, extra) else {
        return;
    };
    for (key, value) in extra {
        target.insert(key.clone(), value.clone());
    }
}
