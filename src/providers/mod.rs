//! Text-generation backends.
//!
//! The pipeline only ever talks to a [`TextGenerator`]: one call, prompt and
//! optional images in, raw text out. Concrete backends speak the REST
//! dialects of the services configured in `text_providers.yaml`:
//!
//! | `type`                         | Backend                  |
//! |--------------------------------|--------------------------|
//! | `google_gemini`                | [`gemini::GeminiClient`] |
//! | `openai_compatible`, `openai`  | [`openai::OpenAiCompatibleClient`] |
//!
//! [`ClientFactory`] turns a resolved provider into a client. The default
//! [`HttpClientFactory`] builds the HTTP backends; embedding applications and
//! tests supply their own.

pub mod gemini;
pub mod openai;

use crate::error::InkdraftError;
use crate::pipeline::provider::{ProviderKind, ResolvedProvider};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Parameters of a single generation call.
#[derive(Debug, Clone, Copy)]
pub struct TextRequest<'a> {
    pub prompt: &'a str,
    pub model: &'a str,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Raw reference image bytes, in request order.
    pub images: &'a [Vec<u8>],
}

/// Failure raised by a backend.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response contained no generated text")]
    EmptyResponse,

    #[error("{0}")]
    Other(String),
}

/// The external text-generation collaborator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider key this client is bound to, for logs and error messages.
    fn name(&self) -> &str;

    /// Generate text for `request`. Returns the model output unmodified.
    async fn generate(&self, request: &TextRequest<'_>) -> Result<String, ClientError>;
}

/// Builds a [`TextGenerator`] for a resolved provider.
pub trait ClientFactory: Send + Sync {
    fn create(&self, provider: &ResolvedProvider) -> Result<Arc<dyn TextGenerator>, InkdraftError>;
}

/// Default factory: HTTP clients for the supported provider types.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    /// Timeout applied when the provider sets no `timeout_secs`.
    pub default_timeout_secs: u64,
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self {
            default_timeout_secs: 120,
        }
    }
}

impl ClientFactory for HttpClientFactory {
    fn create(&self, provider: &ResolvedProvider) -> Result<Arc<dyn TextGenerator>, InkdraftError> {
        let timeout = Duration::from_secs(
            provider
                .settings
                .timeout_secs
                .unwrap_or(self.default_timeout_secs),
        );
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InkdraftError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let client: Arc<dyn TextGenerator> = match provider.kind {
            ProviderKind::GoogleGemini => Arc::new(gemini::GeminiClient::new(
                http,
                provider.name.clone(),
                provider.api_key().to_string(),
                provider.settings.base_url.clone(),
            )),
            ProviderKind::OpenAiCompatible => Arc::new(openai::OpenAiCompatibleClient::new(
                http,
                provider.name.clone(),
                provider.api_key().to_string(),
                provider.settings.base_url.clone(),
            )),
        };
        Ok(client)
    }
}

/// A reference image prepared for a JSON request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: &'static str,
    pub data: String,
}

/// Base64-encode an image, sniffing its MIME type from the magic bytes.
///
/// Unknown formats are labelled `image/png`; providers reject genuinely
/// undecodable payloads themselves.
pub fn encode_image(bytes: &[u8]) -> InlineImage {
    let mime_type = match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        _ => "image/png",
    };
    InlineImage {
        mime_type,
        data: STANDARD.encode(bytes),
    }
}

/// Read a non-success response into a [`ClientError::Status`].
pub(crate) async fn status_error(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ClientError::Status { status, body }
}
