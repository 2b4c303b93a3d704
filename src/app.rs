//! The rabie demo service.
//!
//! | Method | Path | Auth | Success |
//! |---|---|---|---|
//! | GET | `/` | none | 200, text `Hello, World!` |
//! | GET | `/cat/:name?catname=` | none | 200, JSON string |
//! | POST | `/users` | none | 200, the user echoed as JSON |
//! | GET | `/admin/main` | Basic `joe` / `:secret:` | 200, decoded credentials as JSON |
//!
//! Every response carries `Server: rabie/1.0` and `X-Rabie-Marker`. Admin
//! requests are access-logged to stdout.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::header;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::HttpError;
use crate::middleware::{BasicAuth, Credentials, Logger, ServerHeader};
use crate::request::Request;
use crate::response::{IntoResponse, Json, Response};
use crate::router::Router;
use crate::status::Status;
use crate::validate::StructValidator;

pub const SERVER: &str = "rabie/1.0";
pub const MARKER_HEADER: &str = "x-rabie-marker";
pub const MARKER_VALUE: &str = "rabie/lol";

const ADMIN_USER: &str = "joe";
const ADMIN_PASSWORD: &str = ":secret:";

/// A user as submitted to `POST /users`. Never stored.
///
/// Missing fields decode as empty strings and are then caught by validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct User {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Serialize)]
struct ValidationFailure {
    error: String,
}

/// The service with its access log on stdout.
pub fn build() -> Router {
    router(Logger::new())
}

/// The service with a caller-supplied access logger for the admin group.
pub fn router(access_log: Logger) -> Router {
    Router::new()
        .layer(ServerHeader::new(SERVER).with(MARKER_HEADER, MARKER_VALUE))
        .validator(StructValidator)
        .get("/", hello)
        .get("/cat/:name", cat)
        .post("/users", create_user)
        .group("/admin", |g| {
            g.layer(access_log)
                .layer(BasicAuth::new(admin_only))
                .get("/main", admin_main)
        })
}

fn admin_only(creds: &Credentials, _req: &Request) -> bool {
    creds.matches(ADMIN_USER, ADMIN_PASSWORD)
}

// GET /
async fn hello(_req: Request) -> &'static str {
    "Hello, World!"
}

// GET /cat/:name?catname=
async fn cat(req: Request) -> Json<String> {
    let name = req.param("name").unwrap_or_default();
    Json(greeting(name, &req.query_param("catname")))
}

// POST /users
async fn create_user(req: Request) -> Result<Response, HttpError> {
    let user: User = req.bind_json()?;

    if let Err(e) = req.validate(&user) {
        let body = serde_json::to_vec(&ValidationFailure { error: e.to_string() })
            .map_err(HttpError::internal)?;
        return Ok(Response::builder().status(Status::BadRequest).json(body));
    }

    Ok(Json(user).into_response())
}

// GET /admin/main
//
// BasicAuth has already vetted the header; this only decodes it.
async fn admin_main(req: Request) -> Result<Json<String>, HttpError> {
    let auth = req.header(header::AUTHORIZATION.as_str()).unwrap_or("");
    let encoded = match auth.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("basic") => rest.trim(),
        _ => auth,
    };
    let decoded = STANDARD.decode(encoded).map_err(HttpError::internal)?;
    Ok(Json(String::from_utf8_lossy(&decoded).into_owned()))
}

/// Fills `template` with `value`.
///
/// Only `%s` is a placeholder and `%%` is a literal `%`; every other
/// character, including any other `%` sequence, is copied as-is. `value` is
/// inserted verbatim and never scanned for placeholders itself. A template
/// without a placeholder gets `value` appended after a space.
pub fn greeting(template: &str, value: &str) -> String {
    let mut out = String::with_capacity(template.len() + value.len() + 1);
    let mut substituted = false;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.peek() {
                Some('s') => {
                    chars.next();
                    out.push_str(value);
                    substituted = true;
                    continue;
                }
                Some('%') => {
                    chars.next();
                    out.push('%');
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }

    if !substituted && !value.is_empty() {
        out.push(' ');
        out.push_str(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use http::StatusCode;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn app() -> (Router, Captured) {
        let log = Captured::default();
        (router(Logger::new().writer(log.clone())), log)
    }

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
    }

    fn json(res: &Response) -> serde_json::Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    fn post_user(body: &'static str) -> http::Request<Bytes> {
        http::Request::post("/users")
            .header("content-type", "application/json")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    #[test]
    fn greeting_substitutes_placeholders_only() {
        assert_eq!(greeting("hello %s", "world"), "hello world");
        assert_eq!(greeting("%s and %s", "tom"), "tom and tom");
        assert_eq!(greeting("100%% %s", "cat"), "100% cat");
        assert_eq!(greeting("%d %x %s", "tom"), "%d %x tom");
        assert_eq!(greeting("trailing %", "tom"), "trailing % tom");
    }

    #[test]
    fn greeting_never_rescans_the_value() {
        assert_eq!(greeting("hi %s", "%s%s%n"), "hi %s%s%n");
    }

    #[test]
    fn greeting_without_placeholder_appends() {
        assert_eq!(greeting("garfield", "lasagna"), "garfield lasagna");
        assert_eq!(greeting("garfield", ""), "garfield");
    }

    #[tokio::test]
    async fn root_says_hello() {
        let (app, _) = app();
        let res = app.oneshot(http::Request::get("/").body(Bytes::new()).unwrap()).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"Hello, World!");
        assert_eq!(res.headers()[header::SERVER], SERVER);
        assert_eq!(res.headers()[MARKER_HEADER], MARKER_VALUE);
    }

    #[tokio::test]
    async fn cat_formats_name_with_catname() {
        let (app, _) = app();
        let req = http::Request::get("/cat/hello%20%25s?catname=world").body(Bytes::new()).unwrap();
        let res = app.oneshot(req).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(json(&res), "hello world");
    }

    #[tokio::test]
    async fn valid_user_is_echoed() {
        let (app, _) = app();
        let res = app.oneshot(post_user(r#"{"name":"Jon","email":"jon@labstack.com"}"#)).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        let user: User = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(user, User { name: "Jon".into(), email: "jon@labstack.com".into() });
    }

    #[tokio::test]
    async fn invalid_users_are_rejected_with_an_error() {
        let (app, _) = app();
        for body in [
            r#"{"email":"jon@labstack.com"}"#,
            r#"{"name":"Jon","email":"jon"}"#,
            r#"{"name":"","email":""}"#,
        ] {
            let res = app.oneshot(post_user(body)).await;
            assert_eq!(res.status_code(), StatusCode::BAD_REQUEST, "{body}");
            let error = json(&res)["error"].as_str().unwrap().to_owned();
            assert!(!error.is_empty(), "{body}");
        }
    }

    #[tokio::test]
    async fn malformed_user_json_is_a_bind_error() {
        let (app, _) = app();
        let res = app.oneshot(post_user(r#"{"name":"Jon","#)).await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert!(json(&res)["message"].as_str().unwrap().starts_with("Syntax error"));
    }

    #[tokio::test]
    async fn admin_returns_decoded_credentials_and_logs() {
        let (app, log) = app();
        let req = http::Request::get("/admin/main")
            .header("authorization", basic("joe", ":secret:"))
            .header("host", "localhost:1323")
            .body(Bytes::new())
            .unwrap();
        let res = app.oneshot(req).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(json(&res), "joe::secret:");
        assert_eq!(res.headers()[header::SERVER], SERVER);

        let line = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(line.ends_with("] 200 GET localhost:1323/admin/main 14 127.0.0.1\n"), "{line}");
    }

    #[tokio::test]
    async fn admin_rejects_wrong_credentials_and_still_logs() {
        let (app, log) = app();
        let req = http::Request::get("/admin/main")
            .header("authorization", basic("joe", ":secret;"))
            .body(Bytes::new())
            .unwrap();
        let res = app.oneshot(req).await;
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[header::SERVER], SERVER);

        let line = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(line.contains("] 401 GET /admin/main "), "{line}");
    }

    #[tokio::test]
    async fn public_routes_are_not_logged() {
        let (app, log) = app();
        app.oneshot(http::Request::get("/").body(Bytes::new()).unwrap()).await;
        assert!(log.0.lock().unwrap().is_empty());
    }
}
