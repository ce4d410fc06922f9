use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{
        HeaderValue, Method, Request, StatusCode,
        header::{ALLOW, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use metrics::counter;
use tracing::debug;

use crate::application::{
    error::{ErrorReport, HttpError},
    render::RenderRequest,
};

use super::{HttpState, json::JsonError};

const SOURCE: &str = "infra::http::render::render_markdown";
const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const INVALID_REQUEST_TYPE: &str = "Invalid Request Type";

/// HTTP methods the render endpoint distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
    Connect,
    Trace,
    Extension,
}

/// Outcome of the method guard, decided before the body is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAdmission {
    Accepted,
    Rejected,
}

impl RequestMethod {
    pub fn admission(self) -> RequestAdmission {
        match self {
            RequestMethod::Post => RequestAdmission::Accepted,
            RequestMethod::Get
            | RequestMethod::Head
            | RequestMethod::Put
            | RequestMethod::Delete
            | RequestMethod::Options
            | RequestMethod::Patch
            | RequestMethod::Connect
            | RequestMethod::Trace
            | RequestMethod::Extension => RequestAdmission::Rejected,
        }
    }
}

impl From<&Method> for RequestMethod {
    fn from(method: &Method) -> Self {
        match method.as_str() {
            "GET" => RequestMethod::Get,
            "HEAD" => RequestMethod::Head,
            "POST" => RequestMethod::Post,
            "PUT" => RequestMethod::Put,
            "DELETE" => RequestMethod::Delete,
            "OPTIONS" => RequestMethod::Options,
            "PATCH" => RequestMethod::Patch,
            "CONNECT" => RequestMethod::Connect,
            "TRACE" => RequestMethod::Trace,
            _ => RequestMethod::Extension,
        }
    }
}

/// Render the raw markdown request body into sanitised HTML.
pub async fn render_markdown(State(state): State<HttpState>, request: Request<Body>) -> Response {
    let method = request.method().clone();
    if RequestMethod::from(&method).admission() == RequestAdmission::Rejected {
        counter!("mdrender_requests_total", "outcome" => "rejected").increment(1);
        return method_not_allowed(&method);
    }

    let result = async {
        let markdown = read_markdown(request.into_body(), state.max_body_bytes).await?;
        let output = state.renderer.render(&RenderRequest::new(markdown))?;
        Ok::<_, HttpError>(output)
    }
    .await;

    match result {
        Ok(output) => {
            counter!("mdrender_requests_total", "outcome" => "rendered").increment(1);
            debug!(
                target = "mdrender::http::render",
                contains_code = output.contains_code,
                escaped_tags = output.escaped_tags,
                "markdown rendered"
            );
            html_response(output.html)
        }
        Err(err) => {
            counter!("mdrender_requests_total", "outcome" => "failed").increment(1);
            err.into_response()
        }
    }
}

async fn read_markdown(body: Body, limit: usize) -> Result<String, HttpError> {
    let bytes = to_bytes(body, limit).await.map_err(|err| {
        let inner = err.into_inner();
        if inner.is::<LengthLimitError>() {
            HttpError::new(
                SOURCE,
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large",
                format!("request body exceeds {limit} bytes"),
            )
        } else {
            HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request body could not be read",
                inner.to_string(),
            )
        }
    })?;

    String::from_utf8(Vec::from(bytes)).map_err(|err| {
        HttpError::from_error(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Request body must be UTF-8 text",
            &err,
        )
    })
}

fn method_not_allowed(method: &Method) -> Response {
    let mut response =
        JsonError::new(StatusCode::METHOD_NOT_ALLOWED, INVALID_REQUEST_TYPE).into_response();
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("POST"));
    ErrorReport::from_message(
        SOURCE,
        StatusCode::METHOD_NOT_ALLOWED,
        format!("method {method} is not accepted"),
    )
    .attach(&mut response);
    response
}

fn html_response(html: String) -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE))],
        html,
    )
        .into_response()
}
