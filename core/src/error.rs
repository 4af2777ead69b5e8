//! Translation error types.

use thiserror::Error;

use crate::provider::ProviderId;

pub type Result<T> = std::result::Result<T, TranslationError>;

/// Translation error.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// A required credential or setting is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No response was received from the vendor (connect failure, DNS, timeout).
    #[error("connection to {provider} failed: {source}")]
    Connection {
        provider: ProviderId,
        #[source]
        source: reqwest::Error,
    },

    /// Vendor returned a non-success status.
    #[error("{provider} API error ({status}): {message}")]
    Provider {
        provider: ProviderId,
        status: u16,
        message: String,
    },

    /// Vendor answered successfully but the envelope had an unexpected shape.
    #[error("unexpected response from {provider}: {detail}")]
    MalformedResponse { provider: ProviderId, detail: String },

    #[error("batch of {count} requests exceeds the {provider} limit of {max}")]
    BatchSizeExceeded {
        provider: ProviderId,
        count: usize,
        max: usize,
    },

    /// Results were requested before the vendor produced an output artifact.
    #[error("batch {batch_id} has no results yet (status: {status})")]
    BatchNotReady { batch_id: String, status: String },

    /// Request rejected locally before anything was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TranslationError {
    pub(crate) fn connection(provider: ProviderId, source: reqwest::Error) -> Self {
        Self::Connection { provider, source }
    }

    pub(crate) fn malformed(provider: ProviderId, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider,
            detail: detail.into(),
        }
    }

    /// Whether a caller could reasonably retry the same call later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::BatchNotReady { .. } => true,
            Self::Provider { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
