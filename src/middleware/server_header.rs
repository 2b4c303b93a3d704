use http::header::{self, HeaderName, HeaderValue};

use super::{Middleware, Next};
use crate::handler::BoxFuture;
use crate::request::Request;

/// Stamps a `Server` header, plus any extra fixed headers, on every response.
///
/// Values are parsed when the middleware is built, so a bad value fails at
/// startup rather than per request.
///
/// # Panics
///
/// The constructors panic on a value that is not a legal header value, or
/// on a name that is not a lowercase token.
#[derive(Clone, Debug)]
pub struct ServerHeader {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl ServerHeader {
    pub fn new(server: &'static str) -> Self {
        Self { headers: vec![(header::SERVER, HeaderValue::from_static(server))] }
    }

    /// Adds another header set alongside `Server`.
    pub fn with(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers
            .push((HeaderName::from_static(name), HeaderValue::from_static(value)));
        self
    }
}

impl Middleware for ServerHeader {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let headers = self.headers.clone();
        Box::pin(async move {
            let mut res = next.run(req).await;
            for (name, value) in headers {
                res.headers_mut().insert(name, value);
            }
            res
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;

    use crate::{Router, Status};

    async fn refuse(_req: Request) -> Status {
        Status::BadRequest
    }

    #[tokio::test]
    async fn stamps_matched_and_unmatched_routes() {
        let app = Router::new()
            .layer(ServerHeader::new("unit/1.0").with("x-unit", "yes"))
            .get("/refuse", refuse);

        for path in ["/refuse", "/nowhere"] {
            let res = app.oneshot(http::Request::get(path).body(Bytes::new()).unwrap()).await;
            assert_eq!(res.headers()[header::SERVER], "unit/1.0");
            assert_eq!(res.headers()["x-unit"], "yes");
        }
    }

    #[tokio::test]
    async fn replaces_a_server_header_set_by_the_handler() {
        async fn branded(_req: Request) -> crate::Response {
            crate::Response::builder()
                .header(header::SERVER, HeaderValue::from_static("other"))
                .text("ok")
        }

        let app = Router::new().layer(ServerHeader::new("unit/1.0")).get("/", branded);
        let res = app.oneshot(http::Request::get("/").body(Bytes::new()).unwrap()).await;
        assert_eq!(res.headers().get_all(header::SERVER).iter().count(), 1);
        assert_eq!(res.headers()[header::SERVER], "unit/1.0");
    }
}
