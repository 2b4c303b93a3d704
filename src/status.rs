//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted: `Response::status()`,
//! `Response::builder().status()`, [`HttpError::new`](crate::HttpError::new),
//! or as a bare handler return value.
//!
//! ```rust
//! use rabie::{Response, Status};
//!
//! Response::status(Status::NoContent);
//!
//! Response::builder()
//!     .status(Status::Created)
//!     .header(http::header::LOCATION, http::HeaderValue::from_static("/users/42"))
//!     .json(br#"{"id":42}"#.to_vec());
//!
//! async fn delete_user(_req: rabie::Request) -> Status {
//!     Status::NoContent
//! }
//! ```
//!
//! Only the codes this service (and its framework layer) actually emits are
//! listed. Anything else can still be expressed through
//! [`http::StatusCode`] on the response builder.

use http::StatusCode;

/// Status codes the service produces.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                            // 200
    Created,                       // 201
    NoContent,                     // 204

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,                    // 400
    Unauthorized,                  // 401
    Forbidden,                     // 403
    NotFound,                      // 404
    MethodNotAllowed,              // 405
    UnsupportedMediaType,          // 415

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError,           // 500
}

impl Status {
    /// Numeric code, e.g. `404`.
    pub fn as_u16(self) -> u16 {
        StatusCode::from(self).as_u16()
    }

    /// Canonical reason phrase, e.g. `"Not Found"`.
    pub fn reason(self) -> &'static str {
        StatusCode::from(self).canonical_reason().unwrap_or("")
    }
}

impl From<Status> for StatusCode {
    fn from(s: Status) -> StatusCode {
        match s {
            Status::Ok                   => StatusCode::OK,
            Status::Created              => StatusCode::CREATED,
            Status::NoContent            => StatusCode::NO_CONTENT,
            Status::BadRequest           => StatusCode::BAD_REQUEST,
            Status::Unauthorized         => StatusCode::UNAUTHORIZED,
            Status::Forbidden            => StatusCode::FORBIDDEN,
            Status::NotFound             => StatusCode::NOT_FOUND,
            Status::MethodNotAllowed     => StatusCode::METHOD_NOT_ALLOWED,
            Status::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Status::InternalServerError  => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        s.as_u16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_reasons_follow_the_registry() {
        assert_eq!(Status::Unauthorized.as_u16(), 401);
        assert_eq!(Status::MethodNotAllowed.as_u16(), 405);
        assert_eq!(Status::NotFound.reason(), "Not Found");
        assert_eq!(u16::from(Status::InternalServerError), 500);
    }
}
