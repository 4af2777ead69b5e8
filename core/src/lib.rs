//! HTML translation through Anthropic and OpenAI models.
//!
//! This crate provides:
//! - `Translator` - one-shot translation, free-form conversation and the
//!   batch lifecycle against a single vendor
//! - `BatchOrchestrator` - validation and submission of batch jobs, status,
//!   results, cancellation and listing
//! - `VendorProtocol` - the per-vendor wire dialect behind both
//! - `build_prompt` / `strip_code_fence` - prompt construction and reply
//!   cleanup
//! - `TranslatorConfig` - configuration loaded from `~/.dualtrans/config.toml`

mod batch;
mod client;
mod config;
mod error;
mod prompt;
mod protocol;
mod provider;
mod sanitize;
mod translator;
mod types;

pub use batch::BatchOrchestrator;
pub use batch::clamp_list_limit;
pub use config::Endpoints;
pub use config::ProviderConfig;
pub use config::ProviderSettings;
pub use config::Timeouts;
pub use config::TranslatorConfig;
pub use error::Result;
pub use error::TranslationError;
pub use prompt::DEFAULT_SOURCE_LANG;
pub use prompt::DEFAULT_TARGET_LANG;
pub use prompt::build_prompt;
pub use prompt::language_name;
pub use protocol::AnthropicProtocol;
pub use protocol::BatchUnit;
pub use protocol::ChatRequest;
pub use protocol::OpenAiProtocol;
pub use protocol::VendorProtocol;
pub use protocol::protocol_for;
pub use provider::MAX_LIST_LIMIT;
pub use provider::ProviderDef;
pub use provider::ProviderId;
pub use sanitize::strip_code_fence;
pub use translator::Translator;
pub use types::BatchJob;
pub use types::BatchResultEntry;
pub use types::BatchStatus;
pub use types::DEFAULT_MAX_TOKENS;
pub use types::MAX_TEXT_CHARS;
pub use types::TranslationRequest;
