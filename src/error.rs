//! Error types.
//!
//! Two families live here:
//!
//! - [`Error`] is infrastructure: binding to a port, accepting a connection.
//!   It never reaches an HTTP client.
//! - [`HttpError`] is what a handler or middleware propagates when it gives
//!   up on a request. It renders as `{"message": "..."}` with its status, the
//!   same shape for every route.

use std::error::Error as StdError;

use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::response::{IntoResponse, Response};
use crate::status::Status;

/// The error type returned by the server's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP responses
/// or [`HttpError`]s, not as `Error`s.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid listen address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// An error that ends request processing with a status code.
///
/// For 4xx statuses the message is sent to the client. For 5xx statuses the
/// client only sees the canonical reason phrase; the message and the internal
/// cause go to the log.
#[derive(Debug, Error)]
#[error("code={}, message={message}", .status.as_u16())]
pub struct HttpError {
    status: StatusCode,
    message: String,
    #[source]
    internal: Option<BoxError>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
}

impl HttpError {
    /// Error with an explicit status and client-facing message.
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self { status: status.into(), message: message.into(), internal: None }
    }

    /// Error whose message is the status' reason phrase.
    pub fn from_status(status: Status) -> Self {
        Self::new(status, status.reason())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, message)
    }

    pub fn unauthorized() -> Self {
        Self::from_status(Status::Unauthorized)
    }

    /// `500 Internal Server Error` wrapping `cause`.
    pub fn internal(cause: impl Into<BoxError>) -> Self {
        let cause = cause.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: cause.to_string(),
            internal: Some(cause),
        }
    }

    /// Attaches an underlying cause without changing status or message.
    pub fn with_internal(mut self, cause: impl Into<BoxError>) -> Self {
        self.internal = Some(cause.into());
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> &str { &self.message }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error() {
            match &self.internal {
                Some(cause) => error!(status = self.status.as_u16(), cause = %cause, "{}", self.message),
                None => error!(status = self.status.as_u16(), "{}", self.message),
            }
            self.status.canonical_reason().unwrap_or("Internal Server Error")
        } else {
            self.message.as_str()
        };

        // Serialising a struct holding one &str cannot fail.
        let body = serde_json::to_vec(&ErrorBody { message }).unwrap_or_default();
        Response::builder().status_code(self.status).json(body)
    }
}
