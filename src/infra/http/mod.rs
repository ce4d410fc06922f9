mod json;
mod middleware;
mod render;

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware, routing::any};

use crate::application::render::RenderService;

pub use json::{ErrorBody, JsonError};
pub use middleware::RequestContext;
pub use render::{RequestAdmission, RequestMethod, render_markdown};

#[derive(Clone)]
pub struct HttpState {
    pub renderer: Arc<dyn RenderService>,
    pub max_body_bytes: usize,
}

/// Mount the render endpoint at `path`. Every method is routed to the handler
/// so non-POST requests receive the JSON rejection instead of axum's default 405.
pub fn build_router(state: HttpState, path: &str) -> Router {
    Router::new()
        .route(path, any(render_markdown))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
