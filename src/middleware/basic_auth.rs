//! HTTP Basic authentication (RFC 7617).

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::header::{self, HeaderValue};
use subtle::ConstantTimeEq;

use super::{Middleware, Next};
use crate::error::HttpError;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::IntoResponse;

const CHALLENGE: &str = r#"basic realm="Restricted""#;

/// A username/password pair taken from an `Authorization: Basic` header.
///
/// Lives for one request only.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Parses `Basic <base64(username:password)>`.
    ///
    /// The scheme is case-insensitive and the pair is split at the first
    /// `:`, so passwords may themselves contain colons.
    pub fn from_header(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self { username: username.to_owned(), password: password.to_owned() })
    }

    /// Compares both fields against the expected pair in constant time.
    ///
    /// Both comparisons always run; the time taken does not depend on where,
    /// or in which field, the first mismatch sits.
    pub fn matches(&self, username: &str, password: &str) -> bool {
        let user_ok = self.username.as_bytes().ct_eq(username.as_bytes());
        let pass_ok = self.password.as_bytes().ct_eq(password.as_bytes());
        bool::from(user_ok & pass_ok)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

type CheckFn = dyn Fn(&Credentials, &Request) -> bool + Send + Sync;

/// Rejects requests without acceptable Basic credentials.
///
/// The check is injected; the middleware only handles the header. A missing,
/// malformed or rejected header ends the request with `401` and a
/// `WWW-Authenticate` challenge; the downstream handler never runs.
#[derive(Clone)]
pub struct BasicAuth {
    check: Arc<CheckFn>,
}

impl BasicAuth {
    pub fn new(check: impl Fn(&Credentials, &Request) -> bool + Send + Sync + 'static) -> Self {
        Self { check: Arc::new(check) }
    }
}

impl Middleware for BasicAuth {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let accepted = req
            .header(header::AUTHORIZATION.as_str())
            .and_then(Credentials::from_header)
            .is_some_and(|creds| (self.check)(&creds, &req));

        Box::pin(async move {
            if accepted {
                return next.run(req).await;
            }
            let mut res = HttpError::unauthorized().into_response();
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
            res
        })
    }
}
