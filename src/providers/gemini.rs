//! Google Gemini `generateContent` backend.

use super::{encode_image, status_error, ClientError, TextGenerator, TextRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiClient {
    http: Client,
    name: String,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: Client, name: String, api_key: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            http,
            name,
            api_key,
            base_url,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

fn request_body(request: &TextRequest<'_>) -> Value {
    let mut parts = vec![json!({ "text": request.prompt })];
    parts.extend(request.images.iter().map(|bytes| {
        let img = encode_image(bytes);
        json!({
            "inline_data": {
                "mime_type": img.mime_type,
                "data": img.data
            }
        })
    }));

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "temperature": request.temperature,
            "maxOutputTokens": request.max_output_tokens
        }
    })
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &Value) -> Option<String> {
    let parts = body["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &TextRequest<'_>) -> Result<String, ClientError> {
        let url = self.endpoint(request.model);
        debug!(provider = %self.name, url = %url, images = request.images.len(), "Sending Gemini request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: Value = response.json().await?;
        extract_text(&body).ok_or(ClientError::EmptyResponse)
    }
}
