//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: response decoration, access logging and
//! authentication-header inspection.
//!
//! A middleware receives the request and a [`Next`] handle for the rest of
//! the chain. It may answer on its own (short-circuit), or call
//! `next.run(req).await` and then inspect or decorate the response.
//!
//! Stacks are built once at startup. Layers registered first run outermost:
//!
//! ```text
//! Router::layer(a).layer(b)     request → a → b → dispatch → b → a → response
//! ```
//!
//! Built-in middleware:
//! - [`ServerHeader`]: stamps identifying headers on every response
//! - [`Logger`]: one templated access-log line per request
//! - [`BasicAuth`]: HTTP Basic authentication with an injected credential check

mod basic_auth;
mod logger;
mod server_header;

pub use basic_auth::{BasicAuth, Credentials};
pub use logger::{Logger, DEFAULT_FORMAT};
pub use server_header::ServerHeader;

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::Response;

/// A request/response interceptor.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request, next: Next) -> BoxFuture;
}

/// The remainder of the chain: further middleware, then the handler.
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    /// Passes `req` down the chain and resolves to its response.
    pub fn run(self, req: Request) -> BoxFuture {
        self.inner.call(req)
    }
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// One middleware bound to everything below it.
struct Layered {
    middleware: BoxedMiddleware,
    next: BoxedHandler,
}

impl ErasedHandler for Layered {
    fn call(&self, req: Request) -> BoxFuture {
        self.middleware.handle(req, Next { inner: Arc::clone(&self.next) })
    }
}

/// Wraps `endpoint` in `stack`, first element outermost.
pub(crate) fn wrap(endpoint: BoxedHandler, stack: &[BoxedMiddleware]) -> BoxedHandler {
    stack.iter().rev().fold(endpoint, |next, middleware| {
        Arc::new(Layered { middleware: Arc::clone(middleware), next })
    })
}

// ── from_fn ───────────────────────────────────────────────────────────────────

/// Builds a middleware from an async closure.
///
/// ```rust
/// use rabie::middleware::{from_fn, Next};
/// use rabie::{Request, Router};
///
/// let app = Router::new()
///     .layer(from_fn(|req: Request, next: Next| async move {
///         let mut res = next.run(req).await;
///         res.headers_mut().insert("x-served-by", "edge-1".parse().unwrap());
///         res
///     }));
/// ```
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FromFn(f)
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F>(F);

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin((self.0)(req, next))
    }
}
