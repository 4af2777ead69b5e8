//! Provider definitions.
//!
//! Static defaults for the two supported vendors: display names, API
//! locations, default models and the hard limits each vendor enforces on
//! batch jobs.

use serde::Deserialize;
use serde::Serialize;

/// Largest page a `list_batches` call may request from either vendor.
pub const MAX_LIST_LIMIT: u32 = 100;

/// Provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Anthropic Messages API (the "claude" provider).
    #[default]
    Anthropic,
    /// OpenAI Chat Completions API (the "chatgpt" provider).
    #[serde(rename = "openai")]
    OpenAI,
}

impl ProviderId {
    pub const ALL: &'static [Self] = &[Self::Anthropic, Self::OpenAI];

    /// Get the provider definition.
    pub fn definition(self) -> &'static ProviderDef {
        match self {
            Self::Anthropic => &ANTHROPIC,
            Self::OpenAI => &OPENAI,
        }
    }

    /// Parse a provider discriminator, accepting vendor and product names.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Some(Self::Anthropic),
            "openai" | "chatgpt" | "gpt" => Some(Self::OpenAI),
            _ => None,
        }
    }

    /// Lowercase identifier used in config sections and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAI => "openai",
        }
    }

    pub fn max_batch_size(self) -> usize {
        self.definition().max_batch_size
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.definition().name)
    }
}

/// Provider definition with default configuration.
#[derive(Debug)]
pub struct ProviderDef {
    pub id: ProviderId,
    /// Display name.
    pub name: &'static str,
    pub default_base_url: &'static str,
    pub default_model: &'static str,
    /// Environment variable holding the API key.
    pub api_key_env: &'static str,
    /// Maximum number of requests in one batch job.
    pub max_batch_size: usize,
}

static ANTHROPIC: ProviderDef = ProviderDef {
    id: ProviderId::Anthropic,
    name: "Claude",
    default_base_url: "https://api.anthropic.com/v1",
    default_model: "claude-sonnet-4-5-20250929",
    api_key_env: "ANTHROPIC_API_KEY",
    max_batch_size: 100_000,
};

static OPENAI: ProviderDef = ProviderDef {
    id: ProviderId::OpenAI,
    name: "ChatGPT",
    default_base_url: "https://api.openai.com/v1",
    default_model: "gpt-4o",
    api_key_env: "OPENAI_API_KEY",
    max_batch_size: 50_000,
};
