//! Radix-tree request router, route groups and the global middleware chain.
//!
//! One tree per HTTP method, O(path-length) lookup. Route lookup happens
//! before the global chain runs; the chain's innermost step then invokes the
//! matched handler or produces the 404/405 fallback, so global middleware
//! sees every response, matched or not.

use std::collections::HashMap;
use std::future::ready;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http_body_util::Full;
use matchit::Router as MatchitRouter;

use crate::error::HttpError;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::method::Method;
use crate::middleware::{self, BoxedMiddleware, Middleware};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::status::Status;
use crate::validate::Validator;

/// Peer address reported for in-process requests.
const ONESHOT_PEER: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 0);

/// Outcome of route lookup, carried by the request into the chain.
pub(crate) enum Resolved {
    Found(BoxedHandler),
    MethodNotAllowed(Vec<Method>),
    NotFound,
    Rejected(HttpError),
}

/// The application router.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve).
/// Every builder method returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    middleware: Vec<BoxedMiddleware>,
    chain: BoxedHandler,
    validator: Option<Arc<dyn Validator>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            middleware: Vec::new(),
            chain: Arc::new(Dispatch),
            validator: None,
        }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `:name` or `{name}` syntax; `req.param("name")`
    /// retrieves them:
    ///
    /// ```rust,no_run
    /// # use rabie::{Method, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::Get,  "/users/:id", get_user)
    ///     .on(Method::Post, "/users",     create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or conflicts with an existing route.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.add(method, path, handler.into_boxed_handler())
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, path, handler)
    }

    /// Adds a global middleware. It wraps every request, including those
    /// that end in 404 or 405.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self.chain = middleware::wrap(Arc::new(Dispatch), &self.middleware);
        self
    }

    /// Registers the validator handlers reach through [`Request::validate`].
    pub fn validator(mut self, validator: impl Validator) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Registers a group of routes under `prefix` with its own middleware.
    ///
    /// ```rust,no_run
    /// # use rabie::{Request, Router};
    /// # use rabie::middleware::Logger;
    /// # async fn dashboard(_: Request) -> &'static str { "" }
    /// Router::new().group("/admin", |g| g.layer(Logger::new()).get("/main", dashboard));
    /// ```
    ///
    /// Group middleware wraps only the group's routes, first registered
    /// outermost, regardless of whether it was added before or after a route.
    pub fn group(self, prefix: &str, build: impl FnOnce(Group) -> Group) -> Self {
        let group = build(Group {
            prefix: prefix.trim_end_matches('/').to_owned(),
            middleware: Vec::new(),
            routes: Vec::new(),
        });

        let Group { middleware: stack, routes, .. } = group;
        routes.into_iter().fold(self, |router, (method, path, handler)| {
            router.add(method, &path, middleware::wrap(handler, &stack))
        })
    }

    fn add(mut self, method: Method, path: &str, handler: BoxedHandler) -> Self {
        let pattern = normalize(path);
        self.routes
            .entry(method)
            .or_default()
            .insert(pattern, handler)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    fn resolve(&self, method: &http::Method, path: &str) -> (Resolved, HashMap<String, String>) {
        let known = Method::try_from(method).ok();
        if let Some(tree) = known.and_then(|m| self.routes.get(&m)) {
            if let Ok(matched) = tree.at(path) {
                // Params arrive percent-encoded; undecodable ones stay raw.
                let params = matched.params.iter()
                    .map(|(k, v)| {
                        let value = urlencoding::decode(v)
                            .map(|d| d.into_owned())
                            .unwrap_or_else(|_| v.to_owned());
                        (k.to_owned(), value)
                    })
                    .collect();
                return (Resolved::Found(Arc::clone(matched.value)), params);
            }
        }

        let mut allowed: Vec<Method> = self.routes.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(m, _)| *m)
            .collect();
        if allowed.is_empty() {
            return (Resolved::NotFound, HashMap::new());
        }
        allowed.sort_by_key(|m| m.as_str());
        (Resolved::MethodNotAllowed(allowed), HashMap::new())
    }

    /// Routes one request through the global chain.
    pub(crate) fn handle(&self, mut req: Request) -> BoxFuture {
        if !req.is_routed() {
            let (resolved, params) = self.resolve(req.method(), req.path());
            req.set_params(params);
            req.set_route(resolved);
        }
        req.set_validator(self.validator.clone());
        self.chain.call(req)
    }

    /// Reads the body of `req`, then routes it.
    pub(crate) async fn respond<B>(&self, req: http::Request<B>, remote_addr: SocketAddr) -> Response
    where
        B: hyper::body::Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let req = Request::from_http(req, remote_addr).await;
        self.handle(req).await
    }

    /// Runs one request through the full chain without a socket.
    ///
    /// The peer address is `127.0.0.1:0`.
    pub async fn oneshot(&self, req: http::Request<Bytes>) -> Response {
        self.respond(req.map(Full::new), ONESHOT_PEER).await
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// Routes registered under a common prefix, sharing a middleware stack.
///
/// Obtained inside [`Router::group`].
pub struct Group {
    prefix: String,
    middleware: Vec<BoxedMiddleware>,
    routes: Vec<(Method, String, BoxedHandler)>,
}

impl Group {
    /// Adds middleware for every route in this group.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let full = format!("{}{}", self.prefix, path);
        self.routes.push((method, full, handler.into_boxed_handler()));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, path, handler)
    }
}

// ── Chain endpoint ────────────────────────────────────────────────────────────

/// Innermost step of the global chain: runs whatever lookup resolved.
struct Dispatch;

impl ErasedHandler for Dispatch {
    fn call(&self, mut req: Request) -> BoxFuture {
        match req.take_route() {
            Resolved::Found(handler) => handler.call(req),
            Resolved::MethodNotAllowed(allowed) => {
                let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
                let mut res = HttpError::from_status(Status::MethodNotAllowed).into_response();
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    res.headers_mut().insert(header::ALLOW, value);
                }
                Box::pin(ready(res))
            }
            Resolved::NotFound => {
                Box::pin(ready(HttpError::from_status(Status::NotFound).into_response()))
            }
            Resolved::Rejected(err) => Box::pin(ready(err.into_response())),
        }
    }
}

/// Rewrites `:name` segments to the `{name}` form the radix tree expects.
fn normalize(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{name}}}"),
            _ => segment.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use hyper::body::Frame;

    use crate::middleware::from_fn;
    use crate::middleware::{Next, ServerHeader};

    /// A body whose peer hangs up before the first frame.
    struct Reset;

    impl hyper::body::Body for Reset {
        type Data = Bytes;
        type Error = io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
            Poll::Ready(Some(Err(io::Error::other("reset"))))
        }
    }

    async fn echo_id(req: Request) -> String {
        req.param("id").unwrap_or("none").to_owned()
    }

    async fn ok(_req: Request) -> &'static str {
        "ok"
    }

    fn get(path: &str) -> http::Request<Bytes> {
        http::Request::get(path).body(Bytes::new()).unwrap()
    }

    #[test]
    fn colon_segments_become_braces() {
        assert_eq!(normalize("/cat/:name"), "/cat/{name}");
        assert_eq!(normalize("/a/:x/b/{y}"), "/a/{x}/b/{y}");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("/odd/:"), "/odd/:");
    }

    #[tokio::test]
    async fn path_params_reach_the_handler() {
        let app = Router::new().get("/users/:id", echo_id);
        let res = app.oneshot(get("/users/42")).await;
        assert_eq!(res.status_code(), http::StatusCode::OK);
        assert_eq!(res.body(), b"42");
    }

    #[tokio::test]
    async fn path_params_are_percent_decoded() {
        let app = Router::new().get("/users/:id", echo_id);
        let res = app.oneshot(get("/users/a%20b%25")).await;
        assert_eq!(res.body(), b"a b%");
    }

    #[tokio::test]
    async fn unknown_path_is_404_with_json_message() {
        let app = Router::new().get("/", ok);
        let res = app.oneshot(get("/missing")).await;
        assert_eq!(res.status_code(), http::StatusCode::NOT_FOUND);
        assert_eq!(res.body(), br#"{"message":"Not Found"}"#);
    }

    #[tokio::test]
    async fn wrong_method_is_405_with_allow() {
        let app = Router::new().get("/users", ok).post("/users", ok);
        let req = http::Request::delete("/users").body(Bytes::new()).unwrap();
        let res = app.oneshot(req).await;
        assert_eq!(res.status_code(), http::StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[header::ALLOW], "GET, POST");
    }

    #[tokio::test]
    async fn group_middleware_stays_inside_the_group() {
        let app = Router::new()
            .get("/open", ok)
            .group("/admin", |g| {
                g.get("/main", ok).layer(from_fn(|_req: Request, _next: Next| async {
                    Response::status(Status::Unauthorized)
                }))
            });

        assert_eq!(app.oneshot(get("/open")).await.status_code(), http::StatusCode::OK);
        assert_eq!(
            app.oneshot(get("/admin/main")).await.status_code(),
            http::StatusCode::UNAUTHORIZED
        );
        // Unregistered paths under the prefix fall through to the global 404.
        assert_eq!(app.oneshot(get("/admin/other")).await.status_code(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreadable_body_still_runs_global_middleware() {
        let app = Router::new()
            .layer(ServerHeader::new("rabie/1.0"))
            .post("/users", ok);
        let req = http::Request::post("/users").body(Reset).unwrap();
        let res = app.respond(req, ONESHOT_PEER).await;

        assert_eq!(res.status_code(), http::StatusCode::BAD_REQUEST);
        assert_eq!(res.headers()[header::SERVER], "rabie/1.0");
        assert_eq!(res.body(), br#"{"message":"failed to read request body"}"#);
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_routes_panic_at_startup() {
        let _ = Router::new().get("/users/:id", ok).get("/users/:name", ok);
    }
}
