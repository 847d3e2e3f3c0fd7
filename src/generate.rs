//! Generation entry points.
//!
//! Every entry point returns a [`GenerationResult`] and never an `Err`:
//! validation, configuration, template and provider failures become
//! `success: false` records with a diagnostic message, and poster parse
//! failures additionally keep the raw model text.
//!
//! ## Freshness
//!
//! The provider configuration is loaded and resolved again at the start of
//! every call. Nothing is cached between requests, so editing
//! `text_providers.yaml` takes effect on the next request.

use crate::config::GenerateConfig;
use crate::error::InkdraftError;
use crate::output::GenerationResult;
use crate::pipeline::request::{GenerationMode, GenerationRequest, IncomingRequest};
use crate::pipeline::{llm, parse, provider};
use crate::prompts::compose_prompt;
use crate::providers::{ClientFactory, HttpClientFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Normalise a front-end request and generate from it.
///
/// A blank topic or malformed body fails here, before any provider
/// configuration is read or any network call made.
pub async fn handle_request(request: IncomingRequest, config: &GenerateConfig) -> GenerationResult {
    let parts = match request.normalize() {
        Ok(parts) => parts,
        Err(rejected) => {
            warn!("Rejected generation request: {}", rejected.error);
            return GenerationResult::failure(rejected.mode, &rejected.error);
        }
    };

    let mode = parts.mode;
    match parts.into_request() {
        Ok(request) => generate(&request, config).await,
        Err(e) => {
            warn!("Generation request is missing a topic");
            GenerationResult::failure(mode, &e)
        }
    }
}

/// Generate an outline or poster for a validated request.
pub async fn generate(request: &GenerationRequest, config: &GenerateConfig) -> GenerationResult {
    let start = Instant::now();
    info!(
        "Starting generation: topic={}, mode={}, style={}, images={}",
        truncate(request.topic(), 50),
        request.mode,
        request.style,
        request.images.len()
    );

    match run(request, config).await {
        Ok(result) => {
            if result.is_success() {
                info!("Generation succeeded in {:.2}s", start.elapsed().as_secs_f64());
            } else {
                error!(
                    "Generation failed: {}",
                    result.error().unwrap_or("unknown error")
                );
            }
            result
        }
        Err(e) => {
            error!("Generation failed: {}", e);
            GenerationResult::failure(request.mode, &e)
        }
    }
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally; do not call from within an
/// async context.
pub fn generate_sync(request: &GenerationRequest, config: &GenerateConfig) -> GenerationResult {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(generate(request, config)),
        Err(e) => GenerationResult::failure(
            request.mode,
            &InkdraftError::Internal(format!("Failed to create tokio runtime: {}", e)),
        ),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    request: &GenerationRequest,
    config: &GenerateConfig,
) -> Result<GenerationResult, InkdraftError> {
    // ── Step 1: Reload and resolve provider ──────────────────────────────
    let providers = config.providers.load().await?;
    let resolved = provider::resolve_provider(&providers, &config.providers.location())?;

    // ── Step 2: Build client ─────────────────────────────────────────────
    let factory: Arc<dyn ClientFactory> = match config.client_factory {
        Some(ref f) => Arc::clone(f),
        None => Arc::new(HttpClientFactory {
            default_timeout_secs: config.default_timeout_secs,
        }),
    };
    let client = factory.create(&resolved)?;

    // ── Step 3: Compose prompt ───────────────────────────────────────────
    let prompt = compose_prompt(
        &config.templates,
        request.mode,
        request.style,
        request.topic(),
        request.images.len(),
    )
    .await?;

    // ── Step 4: Call provider ────────────────────────────────────────────
    let raw = llm::invoke(client.as_ref(), &resolved, &prompt, &request.images).await?;

    // ── Step 5: Parse and assemble ───────────────────────────────────────
    Ok(assemble(request.mode, raw, request.has_images()))
}

/// Parse raw model output for `mode` and wrap it in a result.
pub fn assemble(mode: GenerationMode, raw: String, has_images: bool) -> GenerationResult {
    match mode {
        GenerationMode::Outline => {
            let pages = parse::parse_outline(&raw);
            GenerationResult::outline(raw, pages, has_images)
        }
        GenerationMode::Poster => match parse::parse_poster(&raw) {
            Ok(poster) => GenerationResult::poster(poster, raw, has_images),
            Err(e) => {
                error!(
                    "Poster data parsing failed: {}; raw text: {}…",
                    e,
                    truncate(&raw, 200)
                );
                GenerationResult::poster_failure(&e, raw)
            }
        },
    }
}

/// First `max` characters of `s`, for log lines.
fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
