//! Translator configuration.
//!
//! Configuration is stored at `~/.dualtrans/config.toml`:
//!
//! ```toml
//! [anthropic]
//! model = "claude-sonnet-4-5-20250929"
//!
//! [openai]
//! api_key = "sk-..."
//! base_url = "https://proxy.example.com/v1"
//! ```
//!
//! `ANTHROPIC_API_KEY` and `OPENAI_API_KEY` take precedence over keys stored
//! in the file.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::error::TranslationError;
use crate::provider::ProviderId;

/// Timeout for chat calls and result downloads (in milliseconds).
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 120_000;

/// Timeout for batch metadata calls: create, upload, status, cancel, list.
const DEFAULT_METADATA_TIMEOUT_MS: u64 = 60_000;

const CONFIG_DIR: &str = ".dualtrans";
const CONFIG_FILE: &str = "config.toml";

/// Per-provider settings as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API key (stored in config file).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name (overrides provider default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Custom base URL (for proxies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_timeout_ms: Option<u64>,
}

/// Translator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default)]
    pub anthropic: ProviderSettings,

    #[serde(default)]
    pub openai: ProviderSettings,
}

impl TranslatorConfig {
    /// Get the configuration file path.
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from file, or return default if not found.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) => {
                tracing::warn!("Failed to read translator config: {e}, using default");
                Self::default()
            }
        }
    }

    fn from_toml(content: &str) -> Self {
        match toml::from_str::<TranslatorConfig>(content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to parse translator config: {e}, using default");
                Self::default()
            }
        }
    }

    /// Write the config to `~/.dualtrans/config.toml`, readable by the owner only.
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "home directory not found"))?;
        let serialized = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, serialized)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        tracing::debug!(path = %path.display(), "saved translator config");
        Ok(())
    }

    pub fn settings(&self, provider: ProviderId) -> &ProviderSettings {
        match provider {
            ProviderId::Anthropic => &self.anthropic,
            ProviderId::OpenAI => &self.openai,
        }
    }

    /// API key from the environment, falling back to the config file.
    pub fn effective_api_key(&self, provider: ProviderId) -> Option<String> {
        self.effective_api_key_with(provider, |name| std::env::var(name).ok())
    }

    /// Like [`Self::effective_api_key`], with the environment supplied by the caller.
    pub fn effective_api_key_with(
        &self,
        provider: ProviderId,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        env(provider.definition().api_key_env)
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                self.settings(provider)
                    .api_key
                    .clone()
                    .filter(|k| !k.trim().is_empty())
            })
    }

    /// Resolve the full connection settings for one provider.
    pub fn provider_config(&self, provider: ProviderId) -> Result<ProviderConfig> {
        self.provider_config_with(provider, |name| std::env::var(name).ok())
    }

    fn provider_config_with(
        &self,
        provider: ProviderId,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ProviderConfig> {
        let def = provider.definition();
        let settings = self.settings(provider);
        let api_key = self
            .effective_api_key_with(provider, env)
            .unwrap_or_default();
        let base_url = settings
            .base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(def.default_base_url);

        let mut config = ProviderConfig::new(provider, api_key, base_url)?;
        if let Some(model) = settings.model.as_deref().filter(|m| !m.is_empty()) {
            config.model = model.to_string();
        }
        if let Some(ms) = settings.request_timeout_ms {
            config.timeouts.request = Duration::from_millis(ms);
        }
        if let Some(ms) = settings.metadata_timeout_ms {
            config.timeouts.metadata = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

/// Request timeouts, split by payload size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Chat completions and result downloads.
    pub request: Duration,
    /// Status, cancel, list, batch creation and file upload.
    pub metadata: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            metadata: Duration::from_millis(DEFAULT_METADATA_TIMEOUT_MS),
        }
    }
}

/// Fully resolved settings for one provider.
#[derive(Clone)]
pub struct ProviderConfig {
    pub provider: ProviderId,
    api_key: String,
    pub model: String,
    pub endpoints: Endpoints,
    pub timeouts: Timeouts,
}

impl ProviderConfig {
    /// Build a config with the provider's default model and endpoints rooted
    /// at `base_url`. Fails when `api_key` is blank.
    pub fn new(provider: ProviderId, api_key: impl Into<String>, base_url: &str) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TranslationError::Configuration(format!(
                "{} is not set",
                provider.definition().api_key_env
            )));
        }

        Ok(Self {
            provider,
            api_key,
            model: provider.definition().default_model.to_string(),
            endpoints: Endpoints::for_provider(provider, base_url),
            timeouts: Timeouts::default(),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoints", &self.endpoints)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

/// Endpoint set for one provider. Templates containing `{id}` are keyed by a
/// batch id, or by a file id for `batch_results` on OpenAI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub chat: String,
    pub files_upload: Option<String>,
    pub batch_create: String,
    pub batch_status: String,
    pub batch_results: String,
    pub batch_cancel: String,
    pub batch_list: String,
}

impl Endpoints {
    pub fn for_provider(provider: ProviderId, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        match provider {
            ProviderId::Anthropic => Self {
                chat: format!("{base}/messages"),
                files_upload: None,
                batch_create: format!("{base}/messages/batches"),
                batch_status: format!("{base}/messages/batches/{{id}}"),
                batch_results: format!("{base}/messages/batches/{{id}}/results"),
                batch_cancel: format!("{base}/messages/batches/{{id}}/cancel"),
                batch_list: format!("{base}/messages/batches"),
            },
            ProviderId::OpenAI => Self {
                chat: format!("{base}/chat/completions"),
                files_upload: Some(format!("{base}/files")),
                batch_create: format!("{base}/batches"),
                batch_status: format!("{base}/batches/{{id}}"),
                batch_results: format!("{base}/files/{{id}}/content"),
                batch_cancel: format!("{base}/batches/{{id}}/cancel"),
                batch_list: format!("{base}/batches"),
            },
        }
    }

    /// Substitute an id into an endpoint template.
    pub fn resolve(template: &str, id: &str) -> String {
        template.replace("{id}", &urlencoding::encode(id))
    }
}
