mod config;
mod escape;

use std::{collections::HashSet, sync::Arc, time::Instant};

use comrak::{
    Arena, format_html,
    nodes::{AstNode, NodeValue},
    parse_document,
};
use metrics::{counter, histogram};
use once_cell::sync::{Lazy, OnceCell};
use thiserror::Error;
use tracing::debug;

use crate::application::render::types::{
    AttributePolicy, RenderError, RenderOutput, RenderRequest, RenderService,
};

use config::{allowed_tags, build_sanitizer, default_options};
use escape::{EscapeOutcome, escape_disallowed};

pub use config::ALLOWED_TAGS;

/// Comrak-based rendering pipeline: CommonMark conversion, escaping of
/// disallowed markup, then Ammonia allow-list sanitisation.
pub struct ComrakRenderService {
    options: comrak::Options<'static>,
    allowed_tags: HashSet<&'static str>,
    sanitizer: ammonia::Builder<'static>,
    attribute_policy: AttributePolicy,
}

impl ComrakRenderService {
    /// Construct a renderer for an explicit pipeline configuration.
    pub fn new(config: RenderPipelineConfig) -> Self {
        Self {
            options: default_options(),
            allowed_tags: allowed_tags(),
            sanitizer: build_sanitizer(config.attribute_policy),
            attribute_policy: config.attribute_policy,
        }
    }

    pub fn attribute_policy(&self) -> AttributePolicy {
        self.attribute_policy
    }

    /// Convert markdown into HTML without sanitising it. Trailing whitespace
    /// emitted by the converter is trimmed.
    pub fn render_unsanitized(&self, request: &RenderRequest) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);
        render_html_stage(root, &self.options)
    }

    /// Run only the sanitisation stages over an HTML fragment.
    pub fn sanitize(&self, html: &str) -> Result<String, RenderError> {
        let EscapeOutcome { html, .. } = escape_stage(html, &self.allowed_tags)?;
        Ok(sanitize_stage(&html, &self.sanitizer))
    }
}

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> =
    Lazy::new(|| Arc::new(ComrakRenderService::new(active_render_config())));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new(RenderPipelineConfig::default())
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let started = Instant::now();

        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);
        let contains_code = contains_code_block(root);

        let rendered_html = render_html_stage(root, &self.options)?;
        let EscapeOutcome { html, escaped_tags } =
            escape_stage(&rendered_html, &self.allowed_tags)?;
        let sanitized_html = sanitize_stage(&html, &self.sanitizer);

        if escaped_tags > 0 {
            counter!("mdrender_escaped_tags_total").increment(u64::from(escaped_tags));
            debug!(
                target = "application::render",
                escaped_tags, "disallowed markup escaped"
            );
        }
        histogram!("mdrender_render_ms").record(started.elapsed().as_secs_f64() * 1000.0);

        Ok(RenderOutput {
            html: sanitized_html,
            contains_code,
            escaped_tags,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderPipelineConfig {
    pub attribute_policy: AttributePolicy,
}

impl From<&crate::config::SanitizeSettings> for RenderPipelineConfig {
    fn from(settings: &crate::config::SanitizeSettings) -> Self {
        Self {
            attribute_policy: settings.attribute_policy,
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderConfigError {
    #[error("render service already configured")]
    AlreadyConfigured,
}

static RENDER_PIPELINE_CONFIG: OnceCell<RenderPipelineConfig> = OnceCell::new();

pub fn configure_render_service(config: RenderPipelineConfig) -> Result<(), RenderConfigError> {
    RENDER_PIPELINE_CONFIG
        .set(config)
        .map_err(|_| RenderConfigError::AlreadyConfigured)
}

fn active_render_config() -> RenderPipelineConfig {
    RENDER_PIPELINE_CONFIG.get().cloned().unwrap_or_default()
}

fn contains_code_block<'a>(root: &'a AstNode<'a>) -> bool {
    root.descendants().any(|node| {
        matches!(
            node.data.borrow().value,
            NodeValue::CodeBlock(_) | NodeValue::Code(_)
        )
    })
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    html.truncate(html.trim_end().len());
    Ok(html)
}

fn escape_stage(
    html: &str,
    allowed: &HashSet<&'static str>,
) -> Result<EscapeOutcome, RenderError> {
    escape_disallowed(html, allowed)
}

fn sanitize_stage(html: &str, sanitizer: &ammonia::Builder<'static>) -> String {
    sanitizer.clean(html).to_string()
}
