//! Provider resolution: pick the active provider and check it is usable.
//!
//! Resolution runs on every request against a freshly loaded
//! [`TextProvidersConfig`]. All checks happen here, before any prompt is
//! composed or network call made, so a broken configuration never costs a
//! provider round-trip.

use crate::config::{ProviderSettings, TextProvidersConfig};
use crate::error::InkdraftError;
use crate::providers::TextRequest;
use tracing::{error, info};

/// Backend family selected by a provider's `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    GoogleGemini,
    OpenAiCompatible,
}

impl ProviderKind {
    /// Map a configured `type` string to a backend.
    pub fn from_type(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "google_gemini" | "gemini" => Some(ProviderKind::GoogleGemini),
            "openai_compatible" | "openai" => Some(ProviderKind::OpenAiCompatible),
            _ => None,
        }
    }
}

/// The active provider after validation.
#[derive(Debug, Clone)]
pub struct ResolvedProvider {
    /// Key of the provider in the configuration.
    pub name: String,
    pub kind: ProviderKind,
    pub settings: ProviderSettings,
    api_key: String,
}

impl ResolvedProvider {
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Model parameters for a generation call.
    pub fn text_request<'a>(&'a self, prompt: &'a str, images: &'a [Vec<u8>]) -> TextRequest<'a> {
        TextRequest {
            prompt,
            model: &self.settings.model,
            temperature: self.settings.temperature,
            max_output_tokens: self.settings.max_output_tokens,
            images,
        }
    }
}

/// Resolve and validate the active provider.
///
/// `location` names where the configuration lives, for remediation hints.
///
/// # Errors
/// - [`InkdraftError::NoProviders`] — the provider set is empty
/// - [`InkdraftError::UnknownProvider`] — `active_provider` is not a key
/// - [`InkdraftError::MissingApiKey`] — the provider has no credential
/// - [`InkdraftError::UnsupportedProviderType`] — unknown `type`
pub fn resolve_provider(
    config: &TextProvidersConfig,
    location: &str,
) -> Result<ResolvedProvider, InkdraftError> {
    if config.providers.is_empty() {
        error!("No text generation providers configured");
        return Err(InkdraftError::NoProviders {
            location: location.to_string(),
        });
    }

    let name = config.active_provider.as_str();
    let settings = config.providers.get(name).ok_or_else(|| {
        let available = config.available_providers();
        error!("Provider [{}] not found, available: {}", name, available);
        InkdraftError::UnknownProvider {
            provider: name.to_string(),
            available,
        }
    })?;

    let api_key = settings.credential().ok_or_else(|| {
        error!("Provider [{}] has no API key", name);
        InkdraftError::MissingApiKey {
            provider: name.to_string(),
            location: location.to_string(),
        }
    })?;

    let kind = ProviderKind::from_type(&settings.kind).ok_or_else(|| {
        InkdraftError::UnsupportedProviderType {
            provider: name.to_string(),
            kind: settings.kind.clone(),
        }
    })?;

    info!("Using text provider: {} (type={})", name, settings.kind);
    Ok(ResolvedProvider {
        name: name.to_string(),
        kind,
        api_key: api_key.to_string(),
        settings: settings.clone(),
    })
}
