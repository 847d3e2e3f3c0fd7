//! Request normalisation: multipart uploads and JSON bodies → one shape.
//!
//! Front ends deliver a generation request in one of two encodings:
//!
//! * `multipart/form-data` — `topic`, `mode`, `style` as form fields and the
//!   reference images as raw file uploads under `images`.
//! * JSON — `{topic, mode?, style?, images?}` where each image is a base64
//!   string, optionally carried as a data URL (`data:image/png;base64,…`).
//!
//! [`IncomingRequest::normalize`] maps both onto [`RequestParts`];
//! [`RequestParts::into_request`] applies the topic check and yields the
//! validated [`GenerationRequest`]. Multipart decoding itself belongs to the
//! HTTP layer; this module receives the already-split form.

use crate::error::InkdraftError;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::{alphabet, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Standard alphabet, padding optional: clients often drop trailing `=`.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// What to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Slide-style outline split into pages. (default)
    #[default]
    Outline,
    /// Single-page structured poster.
    Poster,
}

impl GenerationMode {
    /// Parse a mode field; absent or unrecognised values give the default.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("poster") => GenerationMode::Poster,
            _ => GenerationMode::Outline,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMode::Outline => "outline",
            GenerationMode::Poster => "poster",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual/tonal variant of the outline template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Hand-drawn note style. (default)
    #[default]
    Sketch,
    /// Conventional slide style.
    Classic,
}

impl Style {
    /// Parse a style field; absent or unrecognised values give the default.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("classic") => Style::Classic,
            _ => Style::Sketch,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Style::Sketch => "sketch",
            Style::Classic => "classic",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field the file was uploaded under.
    pub field: String,
    /// Client-side file name; parts without one are not files.
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(field: impl Into<String>, filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            filename: Some(filename.into()),
            data,
        }
    }
}

/// A decoded `multipart/form-data` body, parts in upload order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<UploadedFile>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    /// First value of a text field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A generation request as received from a front end.
#[derive(Debug, Clone)]
pub enum IncomingRequest {
    Multipart(MultipartForm),
    /// Raw JSON body bytes. An empty body is treated as `{}`.
    Json(Vec<u8>),
}

impl IncomingRequest {
    /// Whether a `Content-Type` header denotes a file upload.
    pub fn is_multipart(content_type: Option<&str>) -> bool {
        content_type
            .map(|ct| ct.to_ascii_lowercase().contains("multipart/form-data"))
            .unwrap_or(false)
    }

    /// Extract `(topic, mode, style, images)`.
    ///
    /// The topic is not checked here; see [`RequestParts::into_request`].
    ///
    /// # Errors
    /// [`InkdraftError::InvalidRequest`] for a malformed JSON body or image
    /// list, [`InkdraftError::InvalidImage`] for undecodable base64. The
    /// rejection carries the requested mode when the body named one.
    pub fn normalize(self) -> Result<RequestParts, RejectedRequest> {
        match self {
            IncomingRequest::Multipart(form) => Ok(normalize_multipart(form)),
            IncomingRequest::Json(body) => normalize_json(&body),
        }
    }
}

/// A request body that could not be normalised.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RejectedRequest {
    /// Mode the body asked for, or the default if it could not be read.
    pub mode: GenerationMode,
    #[source]
    pub error: InkdraftError,
}

impl From<InkdraftError> for RejectedRequest {
    fn from(error: InkdraftError) -> Self {
        Self {
            mode: GenerationMode::default(),
            error,
        }
    }
}

/// Canonical request fields before topic validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParts {
    pub topic: Option<String>,
    pub mode: GenerationMode,
    pub style: Style,
    pub images: Vec<Vec<u8>>,
}

impl RequestParts {
    /// Validate the topic and produce a [`GenerationRequest`].
    pub fn into_request(self) -> Result<GenerationRequest, InkdraftError> {
        GenerationRequest::new(self.topic.unwrap_or_default(), self.mode, self.style, self.images)
    }
}

/// A validated generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    topic: String,
    pub mode: GenerationMode,
    pub style: Style,
    /// Raw reference image bytes, in request order. May be empty.
    pub images: Vec<Vec<u8>>,
}

impl GenerationRequest {
    /// # Errors
    /// [`InkdraftError::MissingTopic`] if `topic` is blank.
    pub fn new(
        topic: impl Into<String>,
        mode: GenerationMode,
        style: Style,
        images: Vec<Vec<u8>>,
    ) -> Result<Self, InkdraftError> {
        let topic = topic.into().trim().to_string();
        if topic.is_empty() {
            return Err(InkdraftError::MissingTopic);
        }
        Ok(Self {
            topic,
            mode,
            style,
            images,
        })
    }

    /// The trimmed, non-empty topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }
}

fn normalize_multipart(form: MultipartForm) -> RequestParts {
    let topic = form.field("topic").map(str::to_string);
    let mode = GenerationMode::parse_lenient(form.field("mode"));
    let style = Style::parse_lenient(form.field("style"));
    let images = form
        .files
        .into_iter()
        .filter(|f| f.field == "images" && f.filename.as_deref().is_some_and(|n| !n.is_empty()))
        .map(|f| f.data)
        .collect();

    RequestParts {
        topic,
        mode,
        style,
        images,
    }
}

fn normalize_json(body: &[u8]) -> Result<RequestParts, RejectedRequest> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(body).map_err(|e| InkdraftError::InvalidRequest {
            detail: format!("body is not valid JSON: {}", e),
        })?
    };

    let obj = match value {
        Value::Object(obj) => obj,
        Value::Null => Default::default(),
        _ => {
            return Err(InkdraftError::InvalidRequest {
                detail: "body must be a JSON object".into(),
            }
            .into())
        }
    };

    let topic = obj.get("topic").and_then(Value::as_str).map(str::to_string);
    let mode = GenerationMode::parse_lenient(obj.get("mode").and_then(Value::as_str));
    let style = Style::parse_lenient(obj.get("style").and_then(Value::as_str));

    let images = match obj.get("images") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let s = entry.as_str().ok_or_else(|| InkdraftError::InvalidRequest {
                    detail: format!("image #{} must be a base64 string", index),
                })?;
                decode_image(index, s)
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| RejectedRequest { mode, error })?,
        Some(_) => {
            return Err(RejectedRequest {
                mode,
                error: InkdraftError::InvalidRequest {
                    detail: "`images` must be an array of base64 strings".into(),
                },
            })
        }
    };

    Ok(RequestParts {
        topic,
        mode,
        style,
        images,
    })
}

/// Drop a data-URL header (`data:image/png;base64,`) if present.
pub fn strip_data_url(encoded: &str) -> &str {
    match encoded.split_once(',') {
        Some((_, data)) => data,
        None => encoded,
    }
}

/// Decode a bare or data-URL base64 image. Embedded whitespace is ignored.
pub fn decode_image(index: usize, encoded: &str) -> Result<Vec<u8>, InkdraftError> {
    let data: Vec<u8> = strip_data_url(encoded)
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    LENIENT_BASE64
        .decode(&data)
        .map_err(|e| InkdraftError::InvalidImage {
            index,
            detail: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn mode_and_style_default_when_unrecognised() {
        assert_eq!(GenerationMode::parse_lenient(None), GenerationMode::Outline);
        assert_eq!(GenerationMode::parse_lenient(Some("slides")), GenerationMode::Outline);
        assert_eq!(GenerationMode::parse_lenient(Some("poster")), GenerationMode::Poster);
        assert_eq!(Style::parse_lenient(Some("")), Style::Sketch);
        assert_eq!(Style::parse_lenient(Some("classic")), Style::Classic);
    }

    #[test]
    fn multipart_detection() {
        assert!(IncomingRequest::is_multipart(Some(
            "multipart/form-data; boundary=----x"
        )));
        assert!(!IncomingRequest::is_multipart(Some("application/json")));
        assert!(!IncomingRequest::is_multipart(None));
    }

    #[test]
    fn multipart_keeps_named_image_files_in_order() {
        let form = MultipartForm::new()
            .with_field("topic", "秋季穿搭")
            .with_field("style", "classic")
            .with_file(UploadedFile::new("images", "a.png", vec![1]))
            .with_file(UploadedFile {
                field: "images".into(),
                filename: Some(String::new()),
                data: vec![9],
            })
            .with_file(UploadedFile::new("avatar", "me.png", vec![8]))
            .with_file(UploadedFile::new("images", "b.jpg", vec![2]));

        let parts = IncomingRequest::Multipart(form).normalize().unwrap();
        assert_eq!(parts.topic.as_deref(), Some("秋季穿搭"));
        assert_eq!(parts.mode, GenerationMode::Outline);
        assert_eq!(parts.style, Style::Classic);
        assert_eq!(parts.images, vec![vec![1], vec![2]]);
    }

    #[test]
    fn json_decodes_bare_and_data_url_images_identically() {
        let encoded = STANDARD.encode(b"\x89PNG fake");
        let body = serde_json::json!({
            "topic": "coffee",
            "mode": "poster",
            "images": [encoded.clone(), format!("data:image/png;base64,{encoded}")]
        });
        let parts = IncomingRequest::Json(body.to_string().into_bytes())
            .normalize()
            .unwrap();
        assert_eq!(parts.mode, GenerationMode::Poster);
        assert_eq!(parts.style, Style::Sketch);
        assert_eq!(parts.images.len(), 2);
        assert_eq!(parts.images[0], parts.images[1]);
        assert_eq!(parts.images[0], b"\x89PNG fake");
    }

    #[test]
    fn json_without_images_is_empty_not_error() {
        let parts = IncomingRequest::Json(br#"{"topic":"t","images":null}"#.to_vec())
            .normalize()
            .unwrap();
        assert!(parts.images.is_empty());
        let parts = IncomingRequest::Json(Vec::new()).normalize().unwrap();
        assert_eq!(parts, RequestParts::default());
    }

    #[test]
    fn padding_is_optional() {
        assert_eq!(decode_image(0, "aGk").unwrap(), b"hi");
        assert_eq!(decode_image(0, "aGk=").unwrap(), b"hi");
    }

    #[test]
    fn bad_base64_names_the_image() {
        let body = br#"{"topic":"t","images":["aGk=","!!!"]}"#.to_vec();
        match IncomingRequest::Json(body).normalize().unwrap_err().error {
            InkdraftError::InvalidImage { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_invalid_request() {
        let err = IncomingRequest::Json(b"{topic:".to_vec()).normalize().unwrap_err();
        assert!(matches!(err.error, InkdraftError::InvalidRequest { .. }), "got: {err:?}");
        let err = IncomingRequest::Json(b"[1,2]".to_vec()).normalize().unwrap_err();
        assert!(matches!(err.error, InkdraftError::InvalidRequest { .. }), "got: {err:?}");
        assert_eq!(err.mode, GenerationMode::Outline);
    }

    #[test]
    fn image_rejection_keeps_requested_mode() {
        let body = br#"{"topic":"x","mode":"poster","images":["***"]}"#.to_vec();
        let err = IncomingRequest::Json(body).normalize().unwrap_err();
        assert_eq!(err.mode, GenerationMode::Poster);
        assert!(matches!(err.error, InkdraftError::InvalidImage { index: 0, .. }));

        let body = br#"{"topic":"x","mode":"poster","images":"AQID"}"#.to_vec();
        let err = IncomingRequest::Json(body).normalize().unwrap_err();
        assert_eq!(err.mode, GenerationMode::Poster);
    }

    #[test]
    fn blank_topic_rejected() {
        let parts = RequestParts {
            topic: Some("   ".into()),
            ..Default::default()
        };
        assert!(matches!(parts.into_request(), Err(InkdraftError::MissingTopic)));
        assert!(matches!(
            RequestParts::default().into_request(),
            Err(InkdraftError::MissingTopic)
        ));
    }

    #[test]
    fn topic_is_trimmed() {
        let req = GenerationRequest::new("  咖啡  ", GenerationMode::Outline, Style::Sketch, vec![])
            .unwrap();
        assert_eq!(req.topic(), "咖啡");
        assert!(!req.has_images());
    }
}
