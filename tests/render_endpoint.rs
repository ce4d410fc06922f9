use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
    response::Response,
};
use http_body_util::BodyExt;
use mdrender::application::render::{
    AttributePolicy, ComrakRenderService, RenderError, RenderOutput, RenderPipelineConfig,
    RenderRequest, RenderService,
};
use mdrender::infra::http::{HttpState, build_router};
use tower::ServiceExt;

const ROUTE: &str = "/api/render_markdown";
const INVALID_REQUEST_BODY: &str = r#"{"error": "Invalid Request Type"}"#;

fn app_with(renderer: Arc<dyn RenderService>, max_body_bytes: usize) -> Router {
    build_router(
        HttpState {
            renderer,
            max_body_bytes,
        },
        ROUTE,
    )
}

fn app() -> Router {
    app_with(Arc::new(ComrakRenderService::default()), 64 * 1024)
}

async fn send(app: Router, method: Method, body: impl Into<Body>) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(ROUTE)
        .header(CONTENT_TYPE, "text/plain")
        .body(body.into())
        .expect("request should build");
    app.oneshot(request).await.expect("router should respond")
}

async fn post(body: &str) -> (StatusCode, String, String) {
    let response = send(app(), Method::POST, body.to_string()).await;
    let status = response.status();
    let content_type = content_type(&response);
    (status, content_type, body_text(response).await)
}

fn content_type(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

#[tokio::test]
async fn renders_heading() {
    let (status, content_type, body) = post("# Hello World").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/html"));
    assert_eq!(body, "<h1>Hello World</h1>");
}

#[tokio::test]
async fn empty_body_renders_empty_html() {
    let (status, content_type, body) = post("").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/html"));
    assert_eq!(body, "");
}

#[tokio::test]
async fn script_injection_is_escaped() {
    let (status, content_type, body) = post("<script>alert('Injecting Javascript')</script>").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/html"));
    assert_eq!(
        body,
        "&lt;script&gt;alert('Injecting Javascript')&lt;/script&gt;"
    );
}

#[tokio::test]
async fn non_post_methods_are_rejected_with_json() {
    let methods = [
        Method::GET,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
        Method::PATCH,
        Method::CONNECT,
        Method::TRACE,
    ];

    for method in methods {
        let response = send(app(), method.clone(), "# Markdown Text").await;

        assert_eq!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "{method} must be rejected"
        );
        assert!(content_type(&response).starts_with("application/json"));
        assert_eq!(
            response
                .headers()
                .get("allow")
                .and_then(|value| value.to_str().ok()),
            Some("POST")
        );
        assert_eq!(body_text(response).await, INVALID_REQUEST_BODY);
    }
}

#[tokio::test]
async fn head_is_rejected() {
    let response = send(app(), Method::HEAD, Body::empty()).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(content_type(&response).starts_with("application/json"));
}

#[tokio::test]
async fn rejection_happens_before_body_is_read() {
    // An undecodable, oversized body would fail to read; the guard must answer first.
    let app = app_with(Arc::new(ComrakRenderService::default()), 4);
    let response = send(app, Method::GET, vec![0xff_u8; 64]).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_text(response).await, INVALID_REQUEST_BODY);
}

#[tokio::test]
async fn invalid_utf8_body_is_a_bad_request() {
    let response = send(app(), Method::POST, vec![0x23_u8, 0x20, 0xc3, 0x28]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = app_with(Arc::new(ComrakRenderService::default()), 8);
    let response = send(app, Method::POST, "# a much longer heading".to_string()).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let response = send(app(), Method::POST, "text".to_string()).await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .expect("request id header");
    assert_eq!(request_id.len(), 36);
}

#[tokio::test]
async fn links_and_images_lose_their_attributes_by_default() {
    let (status, _, body) =
        post("[home](https://example.com \"Home\")\n\n![logo](/logo.png)").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<p><a>home</a></p>\n<p><img></p>");
    assert!(!body.contains("href"));
    assert!(!body.contains("src"));
}

#[tokio::test]
async fn links_policy_keeps_link_targets() {
    let renderer = ComrakRenderService::new(RenderPipelineConfig {
        attribute_policy: AttributePolicy::LinksAndImages,
    });
    let app = app_with(Arc::new(renderer), 1024);
    let response = send(app, Method::POST, "[home](https://example.com)".to_string()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("href=\"https://example.com\""));
}

struct FailingRenderer;

impl RenderService for FailingRenderer {
    fn render(&self, _request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        Err(RenderError::Document {
            message: "rewriter unavailable".to_string(),
        })
    }
}

#[tokio::test]
async fn pipeline_failures_map_to_internal_error() {
    let app = app_with(Arc::new(FailingRenderer), 1024);
    let response = send(app, Method::POST, "# Hi".to_string()).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert!(!body.contains("rewriter unavailable"));
}
