use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Raw markdown exactly as received from the caller.
    pub markdown: String,
}

impl RenderRequest {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
        }
    }
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Sanitised HTML ready to be served.
    pub html: String,
    /// Indicates whether the markdown contained any code blocks.
    pub contains_code: bool,
    /// Number of disallowed elements that were escaped into literal text.
    pub escaped_tags: u32,
}

/// Which attributes survive sanitisation.
///
/// The default keeps no attribute at all, which also removes `href` and `src`
/// from links and images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributePolicy {
    #[default]
    StripAll,
    /// Keep `href` on links and `src`/`alt` on images, restricted to safe URL schemes.
    LinksAndImages,
}

impl AttributePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributePolicy::StripAll => "strip-all",
            AttributePolicy::LinksAndImages => "links-and-images",
        }
    }
}

impl fmt::Display for AttributePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown attribute policy `{0}` (expected `strip-all` or `links-and-images`)")]
pub struct ParseAttributePolicyError(String);

impl FromStr for AttributePolicy {
    type Err = ParseAttributePolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "strip-all" | "strip_all" | "none" => Ok(AttributePolicy::StripAll),
            "links-and-images" | "links_and_images" => Ok(AttributePolicy::LinksAndImages),
            _ => Err(ParseAttributePolicyError(value.to_string())),
        }
    }
}

/// Structured errors surfaced by the rendering pipeline. Markdown itself has no
/// reject state, so these only signal internal failures.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown formatting failed: {message}")]
    Markdown { message: String },
    #[error("document processing failed: {message}")]
    Document { message: String },
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs or errors.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError>;
}
