//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{self, HeaderMap};
use http::{Uri, Version};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::HttpError;
use crate::router::Resolved;
use crate::status::Status;
use crate::validate::{ValidationError, Validator};

/// An incoming HTTP request with its body already read into memory.
///
/// The body stream is drained before the request reaches any middleware, so
/// the connection is released on every path, successful or not.
pub struct Request {
    method: http::Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    remote_addr: SocketAddr,
    validator: Option<Arc<dyn Validator>>,
    route: Option<Resolved>,
}

impl Request {
    /// Reads the whole body of `req` and takes ownership of its head.
    ///
    /// A body that fails to read leaves the request with an empty body and a
    /// 400 route, so the global chain still runs and renders the rejection.
    pub(crate) async fn from_http<B>(req: http::Request<B>, remote_addr: SocketAddr) -> Self
    where
        B: hyper::body::Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let (body, route) = match body.collect().await {
            Ok(collected) => (collected.to_bytes(), None),
            Err(e) => {
                let err = HttpError::bad_request("failed to read request body").with_internal(e);
                (Bytes::new(), Some(Resolved::Rejected(err)))
            }
        };

        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            remote_addr,
            validator: None,
            route,
        }
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub(crate) fn set_route(&mut self, route: Resolved) {
        self.route = Some(route);
    }

    pub(crate) fn is_routed(&self) -> bool {
        self.route.is_some()
    }

    pub(crate) fn take_route(&mut self) -> Resolved {
        self.route.take().unwrap_or(Resolved::NotFound)
    }

    pub(crate) fn set_validator(&mut self, validator: Option<Arc<dyn Validator>>) {
        self.validator = validator;
    }

    pub fn method(&self) -> &http::Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn version(&self) -> Version { self.version }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> SocketAddr { self.remote_addr }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the first value of query parameter `key`, percent-decoded.
    ///
    /// A missing parameter reads as the empty string.
    pub fn query_param(&self, key: &str) -> String {
        self.uri
            .query()
            .and_then(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.into_owned())
            })
            .unwrap_or_default()
    }

    /// `Host` header, falling back to the URI authority (HTTP/2).
    pub fn host(&self) -> &str {
        self.header(header::HOST.as_str())
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
            .unwrap_or("")
    }

    /// Client address as seen through a reverse proxy.
    ///
    /// First hop of `X-Forwarded-For`, then `X-Real-IP`, then the peer address.
    pub fn real_ip(&self) -> String {
        if let Some(xff) = self.header("x-forwarded-for") {
            if let Some(first) = xff.split(',').map(str::trim).find(|s| !s.is_empty()) {
                return first.to_owned();
            }
        }
        if let Some(ip) = self.header("x-real-ip").map(str::trim).filter(|s| !s.is_empty()) {
            return ip.to_owned();
        }
        self.remote_addr.ip().to_string()
    }

    /// Decodes a JSON body into `T`.
    ///
    /// An empty body yields `T::default()`, leaving field checks to
    /// [`validate`](Request::validate). Other media types are rejected with
    /// `415`, malformed JSON with `400`.
    pub fn bind_json<T>(&self) -> Result<T, HttpError>
    where
        T: DeserializeOwned + Default,
    {
        if self.body.is_empty() {
            return Ok(T::default());
        }

        let media_type = self
            .header(header::CONTENT_TYPE.as_str())
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .unwrap_or("");
        if !media_type.eq_ignore_ascii_case("application/json") {
            return Err(HttpError::from_status(Status::UnsupportedMediaType));
        }

        serde_json::from_slice(&self.body).map_err(|e| {
            let message = match e.classify() {
                Category::Data => format!("Unmarshal type error: {e}"),
                Category::Syntax | Category::Eof | Category::Io => format!("Syntax error: {e}"),
            };
            HttpError::bad_request(message).with_internal(e)
        })
    }

    /// Runs the router's registered [`Validator`] against `value`.
    pub fn validate(&self, value: &dyn validator::Validate) -> Result<(), ValidationError> {
        match &self.validator {
            Some(v) => v.validate(value),
            None => Err(ValidationError::NotRegistered),
        }
    }
}
