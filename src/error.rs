//! Error types for the inkdraft library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`InkdraftError`] — **Fatal** for the request: the generation cannot
//!   proceed (blank topic, provider not configured, template unreadable,
//!   provider call failed). The pipeline converts these into a failed
//!   [`crate::output::GenerationResult`] at its outer boundary.
//!
//! * [`PosterError`] — **Expected**: the model answered, but its text did not
//!   contain a usable poster object. This happens occasionally with any model,
//!   so it is recovered locally into a failure result that keeps the raw
//!   model text for diagnosis.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a failure, used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied input was missing or malformed.
    Validation,
    /// Provider configuration is missing, inconsistent, or lacks credentials.
    Configuration,
    /// A prompt template could not be read.
    Template,
    /// The text-generation provider failed or returned nothing usable.
    Provider,
    /// The model output could not be turned into structured data
    /// (malformed JSON or a poster object failing schema validation).
    Parse,
    /// Anything not classified above.
    Internal,
}

impl ErrorKind {
    /// HTTP-equivalent status for this kind of failure.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            _ => 500,
        }
    }
}

/// All request-fatal errors returned by the inkdraft library.
///
/// Poster parsing failures use [`PosterError`] and are folded into the
/// result rather than propagated here.
#[derive(Debug, Error)]
pub enum InkdraftError {
    // ── Validation errors ────────────────────────────────────────────────
    /// `topic` was absent or only whitespace.
    #[error("Invalid request: topic must not be empty.\nProvide the subject you want an outline or poster for.")]
    MissingTopic,

    /// The request body could not be interpreted.
    #[error("Invalid request: {detail}")]
    InvalidRequest { detail: String },

    /// A base64 image entry could not be decoded.
    #[error("Invalid request: image #{index} is not valid base64: {detail}")]
    InvalidImage { index: usize, detail: String },

    // ── Configuration errors ─────────────────────────────────────────────
    /// The provider set is empty.
    #[error(
        "No text generation providers are configured.\n\
Add a provider under `providers:` in {location} and set `active_provider`."
    )]
    NoProviders { location: String },

    /// `active_provider` names a key that is not in the provider set.
    #[error(
        "Text generation provider '{provider}' is not configured.\n\
Available providers: {available}\n\
Set `active_provider` to one of them."
    )]
    UnknownProvider { provider: String, available: String },

    /// The active provider has no credential.
    #[error(
        "Text generation provider '{provider}' has no API key.\n\
Set `api_key` for this provider in {location}."
    )]
    MissingApiKey { provider: String, location: String },

    /// The active provider's `type` is not a backend this crate can drive.
    #[error(
        "Text generation provider '{provider}' has unsupported type '{kind}'.\n\
Supported types: google_gemini, openai_compatible, openai."
    )]
    UnsupportedProviderType { provider: String, kind: String },

    /// The provider configuration file exists but could not be read or parsed.
    #[error("Failed to load provider configuration '{path}': {detail}\nCheck the YAML indentation and syntax.")]
    ConfigLoad { path: PathBuf, detail: String },

    // ── Template errors ──────────────────────────────────────────────────
    /// A prompt template file could not be read.
    #[error("Failed to read prompt template '{template}' from '{path}': {source}")]
    TemplateUnreadable {
        template: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Provider errors ──────────────────────────────────────────────────
    /// The text-generation call failed or produced no text.
    #[error("Text generation with provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InkdraftError {
    /// Classify this error for status mapping and logging.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InkdraftError::MissingTopic
            | InkdraftError::InvalidRequest { .. }
            | InkdraftError::InvalidImage { .. } => ErrorKind::Validation,
            InkdraftError::NoProviders { .. }
            | InkdraftError::UnknownProvider { .. }
            | InkdraftError::MissingApiKey { .. }
            | InkdraftError::UnsupportedProviderType { .. }
            | InkdraftError::ConfigLoad { .. } => ErrorKind::Configuration,
            InkdraftError::TemplateUnreadable { .. } => ErrorKind::Template,
            InkdraftError::Provider { .. } => ErrorKind::Provider,
            InkdraftError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// The model output did not contain a valid poster object.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PosterError {
    /// No `{ … }` pair was found in the text.
    #[error("model output contains no JSON object")]
    NoJsonObject,

    /// The extracted text is not valid JSON, or not a JSON object.
    #[error("model output contains malformed JSON: {detail}")]
    MalformedJson { detail: String },

    /// The JSON object does not match the poster schema.
    #[error("poster data does not match the expected schema: {detail}")]
    Schema { detail: String },
}
