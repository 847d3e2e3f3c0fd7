//! Configuration types for outline and poster generation.
//!
//! Two layers live here:
//!
//! * [`TextProvidersConfig`] — the provider set (`text_providers.yaml`):
//!   which backends exist, which one is active, and the model parameters and
//!   credentials of each.
//! * [`GenerateConfig`] — how the pipeline finds that provider set and its
//!   prompt templates, built via [`GenerateConfigBuilder`].
//!
//! The provider set is loaded again on every request through
//! [`ProviderSource::load`], so edits to the YAML file take effect without a
//! restart. Nothing in this module caches it.

use crate::error::InkdraftError;
use crate::prompts::TemplateSource;
use crate::providers::ClientFactory;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default file name of the provider configuration.
pub const DEFAULT_PROVIDERS_FILE: &str = "text_providers.yaml";

/// Provider key used when `active_provider` is omitted.
pub const DEFAULT_ACTIVE_PROVIDER: &str = "google_gemini";

/// The provider configuration store.
///
/// ```yaml
/// active_provider: google_gemini
/// providers:
///   google_gemini:
///     type: google_gemini
///     model: gemini-2.0-flash-exp
///     temperature: 1.0
///     max_output_tokens: 8000
///     api_key: "..."
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextProvidersConfig {
    /// Key into [`Self::providers`] naming the backend to use.
    #[serde(default = "default_active_provider", deserialize_with = "null_as_default_active")]
    pub active_provider: String,

    /// Provider key → settings. Sorted so listings are deterministic.
    #[serde(default, deserialize_with = "null_as_default")]
    pub providers: BTreeMap<String, ProviderSettings>,
}

/// Settings of a single text-generation provider.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Backend type: `google_gemini`, `openai_compatible` or `openai`.
    #[serde(rename = "type", default = "default_provider_type")]
    pub kind: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Credential. Required for the active provider.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Endpoint override, e.g. `https://api.deepseek.com/v1` for an
    /// OpenAI-compatible service.
    #[serde(default)]
    pub base_url: Option<String>,

    /// HTTP timeout for the generation call. Falls back to
    /// [`GenerateConfig::default_timeout_secs`].
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_active_provider() -> String {
    DEFAULT_ACTIVE_PROVIDER.to_string()
}

fn default_provider_type() -> String {
    "google_gemini".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_max_output_tokens() -> u32 {
    8000
}

/// Treat an explicit YAML/JSON `null` the same as a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default_active<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_active_provider))
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: default_provider_type(),
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            api_key: None,
            base_url: None,
            timeout_secs: None,
        }
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderSettings {
    /// The credential, if one is set and not blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

impl Default for TextProvidersConfig {
    fn default() -> Self {
        Self {
            active_provider: default_active_provider(),
            providers: BTreeMap::new(),
        }
    }
}

impl TextProvidersConfig {
    /// Configuration used when no providers file exists: a single Gemini
    /// provider without a credential, so resolution fails with a hint to
    /// add one.
    pub fn builtin_default() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(DEFAULT_ACTIVE_PROVIDER.to_string(), ProviderSettings::default());
        Self {
            active_provider: default_active_provider(),
            providers,
        }
    }

    /// Parse a YAML document. An empty document yields an empty provider set.
    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Read and parse a providers file.
    ///
    /// A missing file is not an error: [`Self::builtin_default`] is returned
    /// instead. Unreadable files and malformed YAML are
    /// [`InkdraftError::ConfigLoad`].
    pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Self, InkdraftError> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                let config = Self::from_yaml_str(&raw).map_err(|e| InkdraftError::ConfigLoad {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                })?;
                debug!(
                    "Loaded provider configuration from {}: active={}",
                    path.display(),
                    config.active_provider
                );
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "{} not found, using built-in provider defaults",
                    path.display()
                );
                Ok(Self::builtin_default())
            }
            Err(e) => Err(InkdraftError::ConfigLoad {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }),
        }
    }

    /// Comma-separated provider keys, for error messages.
    pub fn available_providers(&self) -> String {
        self.providers
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Where the provider configuration comes from.
#[derive(Debug, Clone)]
pub enum ProviderSource {
    /// A YAML file, re-read on every request.
    File(PathBuf),
    /// A configuration held in memory (embedding applications, tests).
    Inline(TextProvidersConfig),
}

impl Default for ProviderSource {
    fn default() -> Self {
        ProviderSource::File(PathBuf::from(DEFAULT_PROVIDERS_FILE))
    }
}

impl ProviderSource {
    /// Produce a fresh copy of the provider configuration.
    pub async fn load(&self) -> Result<TextProvidersConfig, InkdraftError> {
        match self {
            ProviderSource::File(path) => TextProvidersConfig::load_from_path(path).await,
            ProviderSource::Inline(config) => Ok(config.clone()),
        }
    }

    /// Human-readable location used in remediation hints.
    pub fn location(&self) -> String {
        match self {
            ProviderSource::File(path) => path.display().to_string(),
            ProviderSource::Inline(_) => "the provider configuration".to_string(),
        }
    }
}

/// Configuration for outline/poster generation.
///
/// Built via [`GenerateConfig::builder()`] or using
/// [`GenerateConfig::default()`].
///
/// # Example
/// ```rust
/// use inkdraft::GenerateConfig;
///
/// let config = GenerateConfig::builder()
///     .providers_file("config/text_providers.yaml")
///     .templates_dir("prompts")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerateConfig {
    /// Provider configuration store. Default: `./text_providers.yaml`.
    pub providers: ProviderSource,

    /// Prompt template store. Default: built-in templates.
    pub templates: TemplateSource,

    /// Builds the text-generation client for the resolved provider.
    /// If None, uses [`crate::providers::HttpClientFactory`].
    pub client_factory: Option<Arc<dyn ClientFactory>>,

    /// HTTP timeout for providers without `timeout_secs`. Default: 120.
    pub default_timeout_secs: u64,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            providers: ProviderSource::default(),
            templates: TemplateSource::default(),
            client_factory: None,
            default_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for GenerateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateConfig")
            .field("providers", &self.providers)
            .field("templates", &self.templates)
            .field(
                "client_factory",
                &self.client_factory.as_ref().map(|_| "<dyn ClientFactory>"),
            )
            .field("default_timeout_secs", &self.default_timeout_secs)
            .finish()
    }
}

impl GenerateConfig {
    /// Create a new builder for `GenerateConfig`.
    pub fn builder() -> GenerateConfigBuilder {
        GenerateConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerateConfig`].
#[derive(Debug)]
pub struct GenerateConfigBuilder {
    config: GenerateConfig,
}

impl GenerateConfigBuilder {
    pub fn providers_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.providers = ProviderSource::File(path.into());
        self
    }

    pub fn providers(mut self, providers: TextProvidersConfig) -> Self {
        self.config.providers = ProviderSource::Inline(providers);
        self
    }

    pub fn templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.templates = TemplateSource::Directory(dir.into());
        self
    }

    pub fn templates(mut self, source: TemplateSource) -> Self {
        self.config.templates = source;
        self
    }

    pub fn client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.config.client_factory = Some(factory);
        self
    }

    pub fn default_timeout_secs(mut self, secs: u64) -> Self {
        self.config.default_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerateConfig, InkdraftError> {
        if self.config.default_timeout_secs == 0 {
            return Err(InkdraftError::Internal(
                "default_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
