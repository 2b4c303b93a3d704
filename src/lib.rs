//! # rabie
//!
//! A small HTTP demo service and the minimal framework layer it runs on.
//!
//! The service ([`app`]) exposes four routes: a static greeting, a "cat"
//! echo, JSON user creation with validation, and a Basic-auth protected
//! admin endpoint. The framework layer underneath is deliberately small:
//!
//! - Radix-tree routing via [`matchit`], with `:name` path parameters
//! - Route groups with their own [`middleware`] stack
//! - Global middleware that sees every response, including 404 and 405
//! - A pluggable [`Validator`] reachable from handlers
//! - Async I/O on tokio + hyper, graceful shutdown on SIGTERM / Ctrl-C
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use rabie::{HttpError, Json, Request, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .get("/users/:id", get_user)
//!         .post("/users", create_user);
//!
//!     Server::bind("0.0.0.0:3000").unwrap().serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Json<String> {
//!     Json(req.param("id").unwrap_or("unknown").to_owned())
//! }
//!
//! async fn create_user(req: Request) -> Result<Json<serde_json::Value>, HttpError> {
//!     let body: serde_json::Value = req.bind_json()?;
//!     Ok(Json(body))
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;
mod validate;

pub mod app;
pub mod config;
pub mod middleware;
pub mod telemetry;

pub use error::{Error, HttpError};
pub use handler::{BoxFuture, Handler};
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Json, Response, ResponseBuilder};
pub use router::{Group, Router};
pub use server::Server;
pub use status::Status;
pub use validate::{StructValidator, ValidationError, Validator};
