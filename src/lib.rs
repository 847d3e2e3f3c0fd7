//! # inkdraft
//!
//! Turn a topic (plus optional reference images) into a slide-style outline
//! or a single-page poster layout by prompting a configurable LLM provider
//! and parsing its free-form answer into structured data.
//!
//! ## Pipeline Overview
//!
//! ```text
//! request
//!  │
//!  ├─ 1. Normalise  multipart upload or JSON/base64 body → GenerationRequest
//!  ├─ 2. Resolve    reload text_providers.yaml, pick + validate active provider
//!  ├─ 3. Compose    (mode, style) → template, fill in topic, image hint
//!  ├─ 4. Generate   one call to Gemini / an OpenAI-compatible API
//!  ├─ 5. Parse      outline → typed pages, poster → validated JSON
//!  └─ 6. Assemble   GenerationResult (success or failure, never a panic)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use inkdraft::{generate, GenerateConfig, GenerationMode, GenerationRequest, Style};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider read from ./text_providers.yaml on every call
//!     let config = GenerateConfig::default();
//!     let request = GenerationRequest::new("秋季护肤", GenerationMode::Outline, Style::Sketch, vec![])?;
//!     let result = generate(&request, &config).await;
//!     for page in result.pages().unwrap_or_default() {
//!         println!("{:?}: {}", page.page_type, page.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `inkdraft` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod providers;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    GenerateConfig, GenerateConfigBuilder, ProviderSettings, ProviderSource, TextProvidersConfig,
};
pub use error::{ErrorKind, InkdraftError, PosterError};
pub use generate::{generate, generate_sync, handle_request};
pub use output::{GenerationResult, Outcome};
pub use pipeline::parse::{Page, PageType, PosterData, PosterSection, SectionStyle};
pub use pipeline::request::{
    GenerationMode, GenerationRequest, IncomingRequest, MultipartForm, RejectedRequest, RequestParts,
    Style, UploadedFile,
};
pub use prompts::{TemplateId, TemplateSource};
pub use providers::{ClientError, ClientFactory, HttpClientFactory, TextGenerator, TextRequest};
