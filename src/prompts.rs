//! Prompt templates and prompt composition.
//!
//! Three templates exist, selected by `(mode, style)` through
//! [`TemplateId::select`]:
//!
//! | mode      | style     | template                        |
//! |-----------|-----------|---------------------------------|
//! | `outline` | `sketch`  | `outline_prompt_sketch.txt`     |
//! | `outline` | `classic` | `outline_prompt_classic.txt`    |
//! | `poster`  | any       | `poster_prompt.txt`             |
//!
//! Templates are built in; a [`TemplateSource::Directory`] replaces them with
//! files of the same names, read on every request.
//!
//! Each template contains one `{topic}` placeholder. `{{` and `}}` stand for
//! literal braces so templates can embed JSON examples; any other `{…}` is
//! left as written.

use crate::error::InkdraftError;
use crate::pipeline::request::{GenerationMode, Style};
use std::borrow::Cow;
use std::path::PathBuf;
use tracing::debug;

/// Identifier of a prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    OutlineSketch,
    OutlineClassic,
    Poster,
}

impl TemplateId {
    /// The `(mode, style)` → template lookup.
    pub fn select(mode: GenerationMode, style: Style) -> Self {
        match (mode, style) {
            (GenerationMode::Poster, _) => TemplateId::Poster,
            (GenerationMode::Outline, Style::Classic) => TemplateId::OutlineClassic,
            (GenerationMode::Outline, Style::Sketch) => TemplateId::OutlineSketch,
        }
    }

    /// File name inside a template directory.
    pub fn file_name(self) -> &'static str {
        match self {
            TemplateId::OutlineSketch => "outline_prompt_sketch.txt",
            TemplateId::OutlineClassic => "outline_prompt_classic.txt",
            TemplateId::Poster => "poster_prompt.txt",
        }
    }

    pub fn builtin(self) -> &'static str {
        match self {
            TemplateId::OutlineSketch => OUTLINE_SKETCH_PROMPT,
            TemplateId::OutlineClassic => OUTLINE_CLASSIC_PROMPT,
            TemplateId::Poster => POSTER_PROMPT,
        }
    }
}

/// Where prompt templates are read from.
#[derive(Debug, Clone, Default)]
pub enum TemplateSource {
    /// The templates compiled into this crate. (default)
    #[default]
    Builtin,
    /// A directory holding files named by [`TemplateId::file_name`].
    Directory(PathBuf),
}

impl TemplateSource {
    /// Fetch a template's text.
    ///
    /// # Errors
    /// [`InkdraftError::TemplateUnreadable`] if a directory template cannot
    /// be read. Built-in templates never fail.
    pub async fn load(&self, id: TemplateId) -> Result<Cow<'static, str>, InkdraftError> {
        match self {
            TemplateSource::Builtin => Ok(Cow::Borrowed(id.builtin())),
            TemplateSource::Directory(dir) => {
                let path = dir.join(id.file_name());
                let text = tokio::fs::read_to_string(&path).await.map_err(|source| {
                    InkdraftError::TemplateUnreadable {
                        template: id.file_name(),
                        path: path.clone(),
                        source,
                    }
                })?;
                debug!("Loaded prompt template {}", path.display());
                Ok(Cow::Owned(text))
            }
        }
    }
}

/// Substitute `{topic}` and unescape `{{` / `}}`.
pub fn interpolate(template: &str, topic: &str) -> String {
    let mut out = String::with_capacity(template.len() + topic.len());
    let mut rest = template;
    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{topic}") {
            out.push_str(topic);
            rest = after;
        } else {
            out.push_str(&tail[..1]);
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Advisory sentence appended when reference images accompany the request.
pub fn image_hint(image_count: usize) -> String {
    format!(
        "\n\n注意：用户提供了 {} 张参考图片，请在生成大纲时考虑这些图片的内容和风格。",
        image_count
    )
}

/// Build the final prompt for a request.
pub async fn compose_prompt(
    source: &TemplateSource,
    mode: GenerationMode,
    style: Style,
    topic: &str,
    image_count: usize,
) -> Result<String, InkdraftError> {
    let id = TemplateId::select(mode, style);
    let template = source.load(id).await?;
    let mut prompt = interpolate(&template, topic);
    if image_count > 0 {
        prompt.push_str(&image_hint(image_count));
        debug!("Added hint for {} reference images", image_count);
    }
    Ok(prompt)
}

/// Default outline template, hand-drawn note style.
pub const OUTLINE_SKETCH_PROMPT: &str = r#"你是一位擅长手绘笔记风格图文的内容策划。请围绕主题「{topic}」生成一组图文页面的大纲。

要求：
1. 总页数 6-9 页：第一页为封面，最后一页为总结，其余为内容页。
2. 每一页以类型标签开头：[封面]、[内容] 或 [总结]。
3. 页面之间用单独一行的 <page> 分隔。
4. 语言口语化、有亲和力，适合手绘涂鸦、便签、箭头和小图标的画面表达；每页给出标题和 3-5 条要点，并简要描述适合配的手绘元素。
5. 封面页包含吸引眼球的标题和一句副标题。
6. 总结页回顾核心观点，并给出一句行动建议。

只输出大纲正文，不要添加任何解释。

示例格式：
[封面]
标题：……
副标题：……
<page>
[内容]
标题：……
要点：
- ……
画面：……
<page>
[总结]
……"#;

/// Outline template, conventional slide style.
pub const OUTLINE_CLASSIC_PROMPT: &str = r#"你是一位资深的演示文稿内容策划。请围绕主题「{topic}」生成一份结构清晰、风格简洁专业的图文大纲。

要求：
1. 总页数 6-9 页：第一页为封面，最后一页为总结，其余为内容页。
2. 每一页以类型标签开头：[封面]、[内容] 或 [总结]。
3. 页面之间用单独一行的 <page> 分隔。
4. 每个内容页包含一个明确的小标题和 3-5 条信息密度高的要点，逻辑递进，避免口水话。
5. 封面页包含主标题与副标题；总结页提炼 3 条关键结论。
6. 版式说明以经典排版为准：留白充足、层级分明、配色克制。

只输出大纲正文，不要添加任何解释。"#;

/// Poster template. The model must answer with a single JSON object.
pub const POSTER_PROMPT: &str = r#"你是一位信息海报设计师。请围绕主题「{topic}」生成一张单页信息海报的内容。

请严格只输出一个 JSON 对象，不要输出 Markdown 代码块或任何额外说明。JSON 结构如下：
{{
  "title": "主标题（必填，12 字以内）",
  "subtitle": "一句话副标题（可选）",
  "quote": "一句金句（可选）",
  "sections": [
    {{
      "icon": "图标关键词，如 lightbulb、warning、check（可选）",
      "heading": "分区标题（必填）",
      "content": "分区正文，40-80 字（必填）",
      "style": "positive | negative | neutral 之一，默认 neutral"
    }}
  ],
  "summary": "底部总结（可选）"
}}

要求：
1. sections 包含 3-6 个分区，按阅读顺序排列。
2. style 用于表达情感倾向：建议/优点用 positive，误区/风险用 negative，其他用 neutral。
3. 所有字段值使用中文。"#;
