//! Provider invocation: one call, raw text back.
//!
//! This stage is intentionally thin. Prompt construction lives in
//! [`crate::prompts`] and output interpretation in [`super::parse`]; here we
//! only make the call, time it, and wrap failures as
//! [`InkdraftError::Provider`]. There is no retry: a failed call is reported
//! as-is.

use crate::error::InkdraftError;
use crate::pipeline::provider::ResolvedProvider;
use crate::providers::TextGenerator;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Send `prompt` (and `images`) to the provider and return its raw output.
///
/// Blank output is a provider failure.
pub async fn invoke(
    client: &dyn TextGenerator,
    provider: &ResolvedProvider,
    prompt: &str,
    images: &[Vec<u8>],
) -> Result<String, InkdraftError> {
    let request = provider.text_request(prompt, images);
    info!(
        "Calling text generation API: provider={}, model={}",
        client.name(),
        request.model
    );
    debug!(
        "Prompt: {} chars, {} images, temperature={}, max_output_tokens={}",
        prompt.chars().count(),
        images.len(),
        request.temperature,
        request.max_output_tokens
    );

    let start = Instant::now();
    match client.generate(&request).await {
        Ok(text) if text.trim().is_empty() => {
            warn!("Provider {} returned no text after {:?}", client.name(), start.elapsed());
            Err(InkdraftError::Provider {
                provider: client.name().to_string(),
                message: "response contained no generated text".into(),
            })
        }
        Ok(text) => {
            debug!(
                "Provider returned {} chars in {:?}",
                text.chars().count(),
                start.elapsed()
            );
            Ok(text)
        }
        Err(e) => {
            warn!("Provider {} failed after {:?}: {}", client.name(), start.elapsed(), e);
            Err(InkdraftError::Provider {
                provider: client.name().to_string(),
                message: e.to_string(),
            })
        }
    }
}
