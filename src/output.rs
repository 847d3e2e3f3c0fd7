//! The result record returned for every generation request.
//!
//! [`GenerationResult`] serialises to the response body front ends send
//! back:
//!
//! ```json
//! {"success": true, "mode": "outline", "outline": "…", "pages": [...], "has_images": false}
//! {"success": true, "mode": "poster", "poster_data": {...}, "outline": "…", "has_images": true}
//! {"success": false, "mode": "poster", "error": "…", "outline": "…", "has_images": false}
//! ```
//!
//! Raw model text is kept under `outline` whenever the model answered, so a
//! failed poster parse can still be inspected.

use crate::error::{ErrorKind, InkdraftError, PosterError};
use crate::pipeline::parse::{Page, PosterData};
use crate::pipeline::request::GenerationMode;
use serde::ser::{Serialize, Serializer};

/// What a request produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Outline {
        outline: String,
        /// Always present; at least one page for non-blank output.
        pages: Vec<Page>,
    },
    Poster {
        poster_data: PosterData,
        outline: String,
    },
    Failed {
        error: String,
        kind: ErrorKind,
        /// Raw model text, when the model was reached.
        outline: Option<String>,
    },
}

/// Uniform success/failure record for a generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub mode: GenerationMode,
    pub has_images: bool,
    pub outcome: Outcome,
}

impl GenerationResult {
    pub fn outline(raw: String, pages: Vec<Page>, has_images: bool) -> Self {
        Self {
            mode: GenerationMode::Outline,
            has_images,
            outcome: Outcome::Outline {
                outline: raw,
                pages,
            },
        }
    }

    pub fn poster(poster_data: PosterData, raw: String, has_images: bool) -> Self {
        Self {
            mode: GenerationMode::Poster,
            has_images,
            outcome: Outcome::Poster {
                poster_data,
                outline: raw,
            },
        }
    }

    /// Poster output that could not be parsed; the raw text is retained.
    pub fn poster_failure(error: &PosterError, raw: String) -> Self {
        Self {
            mode: GenerationMode::Poster,
            has_images: false,
            outcome: Outcome::Failed {
                error: format!("Generated content has an invalid format: {}", error),
                kind: ErrorKind::Parse,
                outline: Some(raw),
            },
        }
    }

    /// Catch-all failure for any request-fatal error.
    pub fn failure(mode: GenerationMode, error: &InkdraftError) -> Self {
        Self {
            mode,
            has_images: false,
            outcome: Outcome::Failed {
                error: error.to_string(),
                kind: error.kind(),
                outline: None,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, Outcome::Failed { .. })
    }

    /// Failure message, if the request failed.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Raw model text, if the model was reached.
    pub fn raw_output(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Outline { outline, .. } | Outcome::Poster { outline, .. } => Some(outline),
            Outcome::Failed { outline, .. } => outline.as_deref(),
        }
    }

    pub fn pages(&self) -> Option<&[Page]> {
        match &self.outcome {
            Outcome::Outline { pages, .. } => Some(pages),
            _ => None,
        }
    }

    pub fn poster_data(&self) -> Option<&PosterData> {
        match &self.outcome {
            Outcome::Poster { poster_data, .. } => Some(poster_data),
            _ => None,
        }
    }

    /// HTTP-equivalent status: 200 on success, 400 for validation failures,
    /// 500 otherwise.
    pub fn status_code(&self) -> u16 {
        match &self.outcome {
            Outcome::Failed { kind, .. } => kind.status_code(),
            _ => 200,
        }
    }
}

#[derive(serde::Serialize)]
struct Wire<'a> {
    success: bool,
    mode: GenerationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    outline: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<&'a [Page]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    poster_data: Option<&'a PosterData>,
    has_images: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl Serialize for GenerationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Wire {
            success: self.is_success(),
            mode: self.mode,
            outline: self.raw_output(),
            pages: self.pages(),
            poster_data: self.poster_data(),
            has_images: self.has_images,
            error: self.error(),
        }
        .serialize(serializer)
    }
}
