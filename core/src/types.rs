//! Values passed across the translator boundary.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::prompt::DEFAULT_SOURCE_LANG;
use crate::prompt::DEFAULT_TARGET_LANG;
use crate::provider::ProviderId;

/// Upper bound on the length of one HTML fragment, in characters.
pub const MAX_TEXT_CHARS: usize = 50_000;

/// Default completion budget for a single translation.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// One HTML fragment to translate. `id` correlates batch results back to
/// the request and must be unique within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub id: String,
    pub text: String,
    #[serde(default = "default_source_lang", alias = "from")]
    pub source_lang: String,
    #[serde(default = "default_target_lang", alias = "to")]
    pub target_lang: String,
}

fn default_source_lang() -> String {
    DEFAULT_SOURCE_LANG.to_string()
}

fn default_target_lang() -> String {
    DEFAULT_TARGET_LANG.to_string()
}

impl TranslationRequest {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }
}

/// Lifecycle of a vendor batch job.
///
/// `Submitted -> Validating -> InProgress -> {Completed | Failed | Expired |
/// Cancelling -> Cancelled}`. Transitions happen on the vendor side; this
/// value is only ever observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Submitted,
    Validating,
    InProgress,
    Completed,
    Failed,
    Expired,
    Cancelling,
    Cancelled,
}

impl BatchStatus {
    /// Whether the vendor will make no further progress on the job.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Expired | Self::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Validating => "validating",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a vendor batch job as last reported by the vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: String,
    pub provider: ProviderId,
    pub status: BatchStatus,
    /// Status string exactly as the vendor reported it.
    pub vendor_status: String,
    pub request_count: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub created_at: Option<DateTime<Utc>>,
    /// Where results can be fetched from once the vendor has produced them:
    /// a results URL for Anthropic, an output file id for OpenAI.
    pub output_handle: Option<String>,
    /// OpenAI only: file id holding the lines of items that failed.
    #[serde(default)]
    pub error_handle: Option<String>,
}

impl BatchJob {
    /// Whether the vendor has published anything to download.
    pub fn has_results(&self) -> bool {
        self.output_handle.is_some() || self.error_handle.is_some()
    }

    /// One-line summary for logs and terminal output.
    pub fn summary(&self) -> String {
        let created = self
            .created_at
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "{id} | {provider} | {status} | {ok}/{total} succeeded, {failed} failed | created {created}",
            id = self.id,
            provider = self.provider,
            status = self.status,
            ok = self.succeeded_count,
            total = self.request_count,
            failed = self.failed_count,
        )
    }
}

/// One decoded line of a batch result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResultEntry {
    pub custom_id: String,
    /// The result line as the vendor wrote it.
    pub raw: serde_json::Value,
    /// Sanitized reply text, absent when the item failed.
    pub text: Option<String>,
}
