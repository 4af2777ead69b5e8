//! Provider-neutral translator.
//!
//! A [`Translator`] pairs one vendor protocol with one model. Instances are
//! immutable: to use another model build a sibling with
//! [`Translator::with_model`], which shares the underlying HTTP client.

use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

use crate::batch::BatchOrchestrator;
use crate::batch::check_text_length;
use crate::config::ProviderConfig;
use crate::config::TranslatorConfig;
use crate::error::Result;
use crate::prompt::build_prompt;
use crate::protocol::ChatRequest;
use crate::protocol::VendorProtocol;
use crate::protocol::protocol_for;
use crate::provider::ProviderId;
use crate::sanitize::strip_code_fence;
use crate::types::BatchJob;
use crate::types::BatchResultEntry;
use crate::types::TranslationRequest;

#[derive(Clone, Debug)]
pub struct Translator {
    batches: BatchOrchestrator,
    protocol: Arc<dyn VendorProtocol>,
}

impl Translator {
    /// Build a translator from a resolved provider config.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let model = config.model.clone();
        let protocol = protocol_for(config)?;
        Ok(Self::with_protocol(protocol, model))
    }

    /// Build a translator for `provider` from the loaded configuration.
    /// Fails with a configuration error when no API key is available.
    pub fn from_config(config: &TranslatorConfig, provider: ProviderId) -> Result<Self> {
        Self::new(config.provider_config(provider)?)
    }

    /// Build a translator on top of an existing protocol implementation.
    pub fn with_protocol(protocol: Arc<dyn VendorProtocol>, model: impl Into<String>) -> Self {
        Self {
            batches: BatchOrchestrator::new(Arc::clone(&protocol), model),
            protocol,
        }
    }

    /// A translator for the same vendor that uses `model`.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self::with_protocol(Arc::clone(&self.protocol), model)
    }

    pub fn provider(&self) -> ProviderId {
        self.protocol.provider()
    }

    pub fn model(&self) -> &str {
        self.batches.model()
    }

    pub fn batches(&self) -> &BatchOrchestrator {
        &self.batches
    }

    /// Translate one HTML fragment and return the cleaned reply.
    pub async fn translate(
        &self,
        text: &str,
        from: &str,
        to: &str,
        max_tokens: u32,
    ) -> Result<String> {
        check_text_length(text)?;
        let prompt = build_prompt(text, from, to);
        tracing::debug!(provider = %self.provider(), from, to, "translating fragment");
        let reply = self
            .protocol
            .complete(ChatRequest {
                model: self.model(),
                message: &prompt,
                max_tokens,
                extra: None,
            })
            .await?;
        Ok(strip_code_fence(&reply))
    }

    /// Send a free-form message and return the reply as the model wrote it.
    pub async fn converse(
        &self,
        message: &str,
        max_tokens: u32,
        extra_options: Option<&Map<String, Value>>,
    ) -> Result<String> {
        self.protocol
            .complete(ChatRequest {
                model: self.model(),
                message,
                max_tokens,
                extra: extra_options,
            })
            .await
    }

    pub async fn create_batch(
        &self,
        requests: &[TranslationRequest],
        max_tokens: u32,
    ) -> Result<BatchJob> {
        self.batches.create_batch(requests, max_tokens).await
    }

    pub async fn get_batch_status(&self, batch_id: &str) -> Result<BatchJob> {
        self.batches.status(batch_id).await
    }

    pub async fn get_batch_results(&self, batch_id: &str) -> Result<Vec<BatchResultEntry>> {
        self.batches.results(batch_id).await
    }

    pub async fn cancel_batch(&self, batch_id: &str) -> Result<Value> {
        self.batches.cancel(batch_id).await
    }

    pub async fn list_batches(&self, limit: u32) -> Result<Value> {
        self.batches.list(limit).await
    }
}
