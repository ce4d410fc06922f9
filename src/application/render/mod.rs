//! Markdown rendering pipeline.
//!
//! The pipeline is pure: it accepts markdown input, produces deterministic,
//! sanitised HTML and surfaces structured errors. Request handling and
//! response shaping live in the HTTP layer.

mod service;
mod types;

pub use service::{
    ALLOWED_TAGS, ComrakRenderService, RenderConfigError, RenderPipelineConfig,
    configure_render_service, render_service,
};
pub use types::{
    AttributePolicy, ParseAttributePolicyError, RenderError, RenderOutput, RenderRequest,
    RenderService,
};
