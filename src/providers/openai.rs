//! OpenAI chat-completions backend, also used for compatible services
//! (DeepSeek, Qwen, local gateways) through `base_url`.

use super::{encode_image, status_error, ClientError, TextGenerator, TextRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiCompatibleClient {
    http: Client,
    name: String,
    api_key: String,
    endpoint: String,
}

impl OpenAiCompatibleClient {
    pub fn new(http: Client, name: String, api_key: String, base_url: Option<String>) -> Self {
        let base = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            http,
            name,
            api_key,
            endpoint: chat_endpoint(&base),
        }
    }
}

/// Accept both `https://host/v1` and a full `.../chat/completions` URL.
fn chat_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base)
    }
}

fn request_body(request: &TextRequest<'_>) -> Value {
    let content = if request.images.is_empty() {
        json!(request.prompt)
    } else {
        let mut parts = vec![json!({ "type": "text", "text": request.prompt })];
        parts.extend(request.images.iter().map(|bytes| {
            let img = encode_image(bytes);
            json!({
                "type": "image_url",
                "image_url": { "url": format!("data:{};base64,{}", img.mime_type, img.data) }
            })
        }));
        Value::Array(parts)
    };

    json!({
        "model": request.model,
        "messages": [{ "role": "user", "content": content }],
        "temperature": request.temperature,
        "max_tokens": request.max_output_tokens
    })
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &TextRequest<'_>) -> Result<String, ClientError> {
        debug!(provider = %self.name, url = %self.endpoint, images = request.images.len(), "Sending chat completion request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: Value = response.json().await?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or(ClientError::EmptyResponse)
    }
}
