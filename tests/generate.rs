//! Integration tests for the generation pipeline.
//!
//! A scripted [`TextGenerator`] stands in for the provider so these tests
//! cover request handling, provider resolution, prompt composition and
//! result assembly without network access.

use async_trait::async_trait;
use inkdraft::pipeline::provider::ResolvedProvider;
use inkdraft::{
    generate, handle_request, ClientError, ClientFactory, GenerateConfig, GenerationMode,
    GenerationRequest, IncomingRequest, InkdraftError, MultipartForm, PageType, SectionStyle,
    Style, TextGenerator, TextProvidersConfig, TextRequest, UploadedFile,
};
use std::sync::{Arc, Mutex};

// ── Test doubles ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Call {
    provider: String,
    model: String,
    prompt: String,
    images: usize,
}

struct Scripted {
    name: String,
    reply: Result<String, String>,
    calls: Arc<Mutex<Vec<Call>>>,
    model: String,
}

#[async_trait]
impl TextGenerator for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &TextRequest<'_>) -> Result<String, ClientError> {
        self.calls.lock().unwrap().push(Call {
            provider: self.name.clone(),
            model: self.model.clone(),
            prompt: request.prompt.to_string(),
            images: request.images.len(),
        });
        self.reply.clone().map_err(ClientError::Other)
    }
}

#[derive(Clone)]
struct ScriptedFactory {
    reply: Result<String, String>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedFactory {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: Arc::default(),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl ClientFactory for ScriptedFactory {
    fn create(&self, provider: &ResolvedProvider) -> Result<Arc<dyn TextGenerator>, InkdraftError> {
        Ok(Arc::new(Scripted {
            name: provider.name.clone(),
            reply: self.reply.clone(),
            calls: Arc::clone(&self.calls),
            model: provider.settings.model.clone(),
        }))
    }
}

const GEMINI_YAML: &str = r#"
active_provider: google_gemini
providers:
  google_gemini:
    type: google_gemini
    model: gemini-2.0-flash-exp
    api_key: test-key
"#;

fn providers(yaml: &str) -> TextProvidersConfig {
    TextProvidersConfig::from_yaml_str(yaml).unwrap()
}

fn config_with(yaml: &str, factory: &ScriptedFactory) -> GenerateConfig {
    GenerateConfig::builder()
        .providers(providers(yaml))
        .client_factory(Arc::new(factory.clone()))
        .build()
        .unwrap()
}

fn request(topic: &str, mode: GenerationMode, style: Style) -> GenerationRequest {
    GenerationRequest::new(topic, mode, style, vec![]).unwrap()
}

// ── Outline ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn outline_pages_from_model_text() {
    let factory = ScriptedFactory::replying("[封面] 标题<page>[内容] 第一点<page>[总结] 收尾");
    let config = config_with(GEMINI_YAML, &factory);

    let result = generate(
        &request("秋季穿搭", GenerationMode::Outline, Style::Sketch),
        &config,
    )
    .await;

    assert!(result.is_success(), "{:?}", result.error());
    assert_eq!(result.status_code(), 200);
    let pages = result.pages().unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0].page_type, PageType::Cover);
    assert_eq!(pages[1].page_type, PageType::Content);
    assert_eq!(pages[2].page_type, PageType::Summary);
    assert_eq!(pages[2].index, 2);

    let calls = factory.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].provider, "google_gemini");
    assert_eq!(calls[0].model, "gemini-2.0-flash-exp");
    assert!(calls[0].prompt.contains("秋季穿搭"));
    assert!(!calls[0].prompt.contains("{topic}"));
    assert!(!calls[0].prompt.contains("参考图片"));
}

#[tokio::test]
async fn classic_style_uses_its_own_template() {
    let factory = ScriptedFactory::replying("one page");
    let config = config_with(GEMINI_YAML, &factory);

    generate(&request("咖啡", GenerationMode::Outline, Style::Sketch), &config).await;
    generate(&request("咖啡", GenerationMode::Outline, Style::Classic), &config).await;

    let calls = factory.calls();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].prompt, calls[1].prompt);
}

#[tokio::test]
async fn outline_with_images_adds_hint_and_forwards_bytes() {
    let factory = ScriptedFactory::replying("[封面] x");
    let config = config_with(GEMINI_YAML, &factory);
    let req = GenerationRequest::new(
        "露营",
        GenerationMode::Outline,
        Style::Sketch,
        vec![vec![1, 2, 3], vec![4, 5]],
    )
    .unwrap();

    let result = generate(&req, &config).await;

    assert!(result.is_success());
    assert!(result.has_images);
    let calls = factory.calls();
    assert_eq!(calls[0].images, 2);
    assert!(calls[0].prompt.ends_with(
        "注意：用户提供了 2 张参考图片，请在生成大纲时考虑这些图片的内容和风格。"
    ));
}

// ── Poster ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn poster_json_extracted_from_prose() {
    let reply = r#"好的，以下是海报内容：
```json
{"title": "久坐的危害", "subtitle": "每天站起来", "sections": [
  {"icon": "⚠️", "heading": "腰椎", "content": "压力增加 {40%}", "style": "negative"},
  {"heading": "建议", "content": "每小时活动", "style": "positive"}
], "summary": "动起来"}
```
希望对你有帮助！"#;
    let factory = ScriptedFactory::replying(reply);
    let config = config_with(GEMINI_YAML, &factory);

    let result = generate(
        &request("久坐", GenerationMode::Poster, Style::Classic),
        &config,
    )
    .await;

    assert!(result.is_success(), "{:?}", result.error());
    let poster = result.poster_data().unwrap();
    assert_eq!(poster.title, "久坐的危害");
    assert_eq!(poster.sections.len(), 2);
    assert_eq!(poster.sections[0].content, "压力增加 {40%}");
    assert_eq!(poster.sections[0].style, SectionStyle::Negative);
    assert_eq!(poster.sections[1].icon, None);
    assert_eq!(result.raw_output(), Some(reply));

    let v = serde_json::to_value(&result).unwrap();
    assert_eq!(v["mode"], "poster");
    assert!(v.get("pages").is_none());
    assert!(v["poster_data"].is_object());
}

#[tokio::test]
async fn poster_without_json_keeps_raw_output() {
    let factory = ScriptedFactory::replying("抱歉，我无法生成海报。");
    let config = config_with(GEMINI_YAML, &factory);

    let result = generate(
        &request("海报", GenerationMode::Poster, Style::Sketch),
        &config,
    )
    .await;

    assert!(!result.is_success());
    assert_eq!(result.status_code(), 500);
    assert_eq!(result.raw_output(), Some("抱歉，我无法生成海报。"));
    assert!(result.error().unwrap().contains("invalid format"));
}

#[tokio::test]
async fn poster_missing_title_is_a_parse_failure() {
    let factory = ScriptedFactory::replying(r#"{"sections": []}"#);
    let config = config_with(GEMINI_YAML, &factory);

    let result = generate(
        &request("海报", GenerationMode::Poster, Style::Sketch),
        &config,
    )
    .await;

    assert!(!result.is_success());
    assert_eq!(result.status_code(), 500);
    assert!(result.raw_output().is_some());
}

#[tokio::test]
async fn blank_model_output_is_a_provider_failure() {
    for reply in ["", "   \n"] {
        let factory = ScriptedFactory::replying(reply);
        let config = config_with(GEMINI_YAML, &factory);

        let result = generate(&request("t", GenerationMode::Outline, Style::Sketch), &config).await;

        assert!(!result.is_success(), "reply {reply:?} should fail");
        assert_eq!(result.status_code(), 500);
        assert!(result.pages().is_none());
        assert!(result.error().unwrap().contains("no generated text"));
        assert_eq!(factory.calls().len(), 1);
    }
}

// ── Provider resolution ──────────────────────────────────────────────────────

#[tokio::test]
async fn missing_api_key_fails_before_any_call() {
    let yaml = r#"
active_provider: google_gemini
providers:
  google_gemini:
    type: google_gemini
    api_key: "   "
"#;
    let factory = ScriptedFactory::replying("unused");
    let config = config_with(yaml, &factory);

    let result = generate(&request("t", GenerationMode::Outline, Style::Sketch), &config).await;

    assert!(!result.is_success());
    assert_eq!(result.status_code(), 500);
    assert!(result.error().unwrap().contains("google_gemini"));
    assert!(result.raw_output().is_none());
    assert!(factory.calls().is_empty());
}

#[tokio::test]
async fn unknown_active_provider_lists_available() {
    let yaml = r#"
active_provider: nope
providers:
  zeta: {type: openai_compatible, api_key: k}
  alpha: {type: google_gemini, api_key: k}
"#;
    let factory = ScriptedFactory::replying("unused");
    let config = config_with(yaml, &factory);

    let result = generate(&request("t", GenerationMode::Outline, Style::Sketch), &config).await;

    let message = result.error().unwrap();
    assert!(message.contains("nope"));
    assert!(message.contains("alpha, zeta"));
    assert!(factory.calls().is_empty());
}

#[tokio::test]
async fn unsupported_provider_type_is_rejected() {
    let yaml = r#"
active_provider: custom
providers:
  custom: {type: anthropic_native, api_key: k}
"#;
    let factory = ScriptedFactory::replying("unused");
    let config = config_with(yaml, &factory);

    let result = generate(&request("t", GenerationMode::Outline, Style::Sketch), &config).await;

    assert!(!result.is_success());
    assert!(result.error().unwrap().contains("anthropic_native"));
    assert!(factory.calls().is_empty());
}

#[tokio::test]
async fn provider_failure_maps_to_500() {
    let factory = ScriptedFactory::failing("quota exceeded");
    let config = config_with(GEMINI_YAML, &factory);

    let result = generate(&request("t", GenerationMode::Outline, Style::Sketch), &config).await;

    assert!(!result.is_success());
    assert_eq!(result.status_code(), 500);
    let message = result.error().unwrap();
    assert!(message.contains("google_gemini"));
    assert!(message.contains("quota exceeded"));
    assert_eq!(factory.calls().len(), 1);
}

// ── Config reload ────────────────────────────────────────────────────────────

#[tokio::test]
async fn provider_file_is_reread_on_every_request() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("text_providers.yaml");
    std::fs::write(&path, GEMINI_YAML).unwrap();

    let factory = ScriptedFactory::replying("ok");
    let config = GenerateConfig::builder()
        .providers_file(&path)
        .client_factory(Arc::new(factory.clone()))
        .build()
        .unwrap();

    let req = request("t", GenerationMode::Outline, Style::Sketch);
    assert!(generate(&req, &config).await.is_success());

    std::fs::write(
        &path,
        r#"
active_provider: deepseek
providers:
  deepseek:
    type: openai_compatible
    model: deepseek-chat
    api_key: other-key
    base_url: https://api.deepseek.com/v1
"#,
    )
    .unwrap();
    assert!(generate(&req, &config).await.is_success());

    let calls = factory.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].provider, "google_gemini");
    assert_eq!(calls[1].provider, "deepseek");
    assert_eq!(calls[1].model, "deepseek-chat");
}

#[tokio::test]
async fn missing_provider_file_asks_for_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let factory = ScriptedFactory::replying("unused");
    let config = GenerateConfig::builder()
        .providers_file(dir.path().join("absent.yaml"))
        .client_factory(Arc::new(factory.clone()))
        .build()
        .unwrap();

    let result = generate(&request("t", GenerationMode::Outline, Style::Sketch), &config).await;

    assert!(!result.is_success());
    assert!(result.error().unwrap().contains("google_gemini"));
    assert!(factory.calls().is_empty());
}

#[tokio::test]
async fn malformed_provider_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("text_providers.yaml");
    std::fs::write(&path, "providers: [unclosed").unwrap();

    let factory = ScriptedFactory::replying("unused");
    let config = GenerateConfig::builder()
        .providers_file(&path)
        .client_factory(Arc::new(factory.clone()))
        .build()
        .unwrap();

    let result = generate(&request("t", GenerationMode::Outline, Style::Sketch), &config).await;

    assert!(!result.is_success());
    assert_eq!(result.status_code(), 500);
    assert!(result.error().unwrap().contains("provider configuration"));
    assert!(factory.calls().is_empty());
}

// ── Templates ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn template_directory_overrides_builtin() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("outline_prompt_sketch.txt"),
        "Outline about {topic} as {{json}}",
    )
    .unwrap();

    let factory = ScriptedFactory::replying("ok");
    let config = GenerateConfig::builder()
        .providers(providers(GEMINI_YAML))
        .templates_dir(dir.path())
        .client_factory(Arc::new(factory.clone()))
        .build()
        .unwrap();

    let result = generate(&request("tea", GenerationMode::Outline, Style::Sketch), &config).await;
    assert!(result.is_success());
    assert_eq!(factory.calls()[0].prompt, "Outline about tea as {json}");

    // poster template absent from the directory
    let result = generate(&request("tea", GenerationMode::Poster, Style::Sketch), &config).await;
    assert!(!result.is_success());
    assert!(result.error().unwrap().contains("poster_prompt.txt"));
    assert_eq!(factory.calls().len(), 1);
}

// ── Request handling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn blank_topic_rejected_with_400_and_no_call() {
    let factory = ScriptedFactory::replying("unused");
    let config = config_with(GEMINI_YAML, &factory);

    let result = handle_request(
        IncomingRequest::Json(br#"{"topic": "   ", "mode": "poster"}"#.to_vec()),
        &config,
    )
    .await;

    assert!(!result.is_success());
    assert_eq!(result.status_code(), 400);
    assert_eq!(result.mode, GenerationMode::Poster);
    assert!(factory.calls().is_empty());
}

#[tokio::test]
async fn json_request_with_data_url_images() {
    let factory = ScriptedFactory::replying("[封面] 好");
    let config = config_with(GEMINI_YAML, &factory);
    let body = serde_json::json!({
        "topic": "猫咪",
        "style": "classic",
        "images": ["data:image/png;base64,iVBORw0KGgo=", "AQID"]
    });

    let result = handle_request(
        IncomingRequest::Json(serde_json::to_vec(&body).unwrap()),
        &config,
    )
    .await;

    assert!(result.is_success(), "{:?}", result.error());
    assert!(result.has_images);
    let calls = factory.calls();
    assert_eq!(calls[0].images, 2);
    assert!(calls[0].prompt.contains("2 张参考图片"));
}

#[tokio::test]
async fn invalid_base64_image_is_a_validation_error() {
    let factory = ScriptedFactory::replying("unused");
    let config = config_with(GEMINI_YAML, &factory);

    let result = handle_request(
        IncomingRequest::Json(br#"{"topic": "x", "images": ["***"]}"#.to_vec()),
        &config,
    )
    .await;

    assert_eq!(result.status_code(), 400);
    assert!(factory.calls().is_empty());
}

#[tokio::test]
async fn rejected_poster_request_reports_poster_mode() {
    let factory = ScriptedFactory::replying("unused");
    let config = config_with(GEMINI_YAML, &factory);

    let result = handle_request(
        IncomingRequest::Json(br#"{"topic": "x", "mode": "poster", "images": ["***"]}"#.to_vec()),
        &config,
    )
    .await;

    assert_eq!(result.status_code(), 400);
    assert_eq!(result.mode, GenerationMode::Poster);
    let v = serde_json::to_value(&result).unwrap();
    assert_eq!(v["mode"], "poster");
    assert!(factory.calls().is_empty());
}

#[tokio::test]
async fn multipart_request_ignores_unnamed_uploads() {
    let factory = ScriptedFactory::replying("one");
    let config = config_with(GEMINI_YAML, &factory);
    let form = MultipartForm::new()
        .with_field("topic", "旅行")
        .with_field("mode", "bogus")
        .with_file(UploadedFile::new("images", "a.png", vec![0x89, b'P', b'N', b'G']))
        .with_file(UploadedFile::new("images", "", vec![1]))
        .with_file(UploadedFile::new("avatar", "b.png", vec![2]));

    let result = handle_request(IncomingRequest::Multipart(form), &config).await;

    assert!(result.is_success());
    assert_eq!(result.mode, GenerationMode::Outline);
    assert_eq!(factory.calls()[0].images, 1);
}
