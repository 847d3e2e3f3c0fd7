//! Response parsing: raw model text → pages or a validated poster.
//!
//! The two modes get opposite treatment:
//!
//! * **Outline** parsing is lenient and cannot fail. Whatever the model
//!   wrote becomes at least one page.
//! * **Poster** parsing is strict. The text must contain a JSON object that
//!   matches [`PosterData`]; anything else is a [`PosterError`] for the
//!   caller to fold into a failure result.

use crate::config::null_as_default;
use crate::error::PosterError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Outline ──────────────────────────────────────────────────────────────────

static RE_PAGE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<page>").unwrap());

static RE_TYPE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(\S+)\]").unwrap());

/// Legacy page delimiter, used when no `<page>` marker is present.
pub const LEGACY_DELIMITER: &str = "---";

/// Role of a page within the outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Cover,
    #[default]
    Content,
    Summary,
}

impl PageType {
    /// Map a bracketed tag (without brackets). Unknown tags are content.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "封面" => PageType::Cover,
            "总结" => PageType::Summary,
            _ => PageType::Content,
        }
    }
}

/// One page of an outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Zero-based position among the returned pages.
    pub index: usize,
    #[serde(rename = "type")]
    pub page_type: PageType,
    /// Trimmed segment text, type tag included.
    pub content: String,
}

/// Split outline text into typed pages.
///
/// Splits on `<page>` (any case) when present, otherwise on `---`. Empty
/// segments are dropped and `index` counts only the pages kept, so indices
/// are always `0..pages.len()`.
pub fn parse_outline(text: &str) -> Vec<Page> {
    let segments: Vec<&str> = if RE_PAGE_MARKER.is_match(text) {
        RE_PAGE_MARKER.split(text).collect()
    } else {
        text.split(LEGACY_DELIMITER).collect()
    };

    segments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(index, segment)| Page {
            index,
            page_type: detect_page_type(segment),
            content: segment.to_string(),
        })
        .collect()
}

fn detect_page_type(segment: &str) -> PageType {
    RE_TYPE_TAG
        .captures(segment)
        .map(|caps| PageType::from_tag(&caps[1]))
        .unwrap_or_default()
}

// ── Poster ───────────────────────────────────────────────────────────────────

/// Emotional tone of a poster section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionStyle {
    Positive,
    Negative,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosterSection {
    /// Icon keyword, e.g. `lightbulb`.
    #[serde(default)]
    pub icon: Option<String>,
    pub heading: String,
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub style: SectionStyle,
}

/// Structured content of a poster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosterData {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sections: Vec<PosterSection>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Locate the JSON object embedded in free-form model output.
///
/// Scans from the first `{` and returns the slice up to its matching `}`,
/// tracking string literals so braces inside strings do not count. Prose
/// before and after the object (greetings, ```json fences, sign-offs) is
/// ignored.
///
/// Failure modes:
/// - no `{` at all, or the object never closes (truncated output): `None`
/// - prose *before* the object containing a stray `{`: the scan starts
///   there, and the caller's JSON parse reports the problem
/// - several objects: only the first is returned
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract, parse and validate poster data from model output.
pub fn parse_poster(text: &str) -> Result<PosterData, PosterError> {
    let json = extract_json_object(text.trim()).ok_or(PosterError::NoJsonObject)?;

    let value: Value = serde_json::from_str(json).map_err(|e| PosterError::MalformedJson {
        detail: e.to_string(),
    })?;

    serde_json::from_value(value).map_err(|e| PosterError::Schema {
        detail: e.to_string(),
    })
}
