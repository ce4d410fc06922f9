use std::io;

use axum::{
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};

use crate::application::error::HttpError;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Compact JSON with a space after every `:` and `,`, e.g. `{"error": "..."}`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

pub(crate) fn to_spaced_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, SpacedFormatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buffer)
        .map_err(|err| serde_json::Error::io(io::Error::new(io::ErrorKind::InvalidData, err)))
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

/// JSON error response carrying `{"error": "<message>"}`.
#[derive(Debug)]
pub struct JsonError {
    status: StatusCode,
    body: ErrorBody,
}

impl JsonError {
    pub fn new(status: StatusCode, message: &'static str) -> Self {
        Self {
            status,
            body: ErrorBody { error: message },
        }
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        match to_spaced_json(&self.body) {
            Ok(body) => {
                let mut response = (self.status, body).into_response();
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
                response
            }
            Err(err) => HttpError::from_error(
                "infra::http::json::JsonError",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &err,
            )
            .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        error: &'static str,
        codes: Vec<u16>,
    }

    #[test]
    fn spaced_json_puts_space_after_separators() {
        let body = ErrorBody {
            error: "Invalid Request Type",
        };
        assert_eq!(
            to_spaced_json(&body).unwrap(),
            r#"{"error": "Invalid Request Type"}"#
        );
    }

    #[test]
    fn spaced_json_separates_nested_values() {
        let sample = Sample {
            error: "x",
            codes: vec![1, 2],
        };
        assert_eq!(
            to_spaced_json(&sample).unwrap(),
            r#"{"error": "x", "codes": [1, 2]}"#
        );
    }
}
