//! Templated access log.
//!
//! The template is parsed into tokens once, when the middleware is built.
//! Per request the logger only fills in values and writes one line.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{Local, SecondsFormat};
use http::header;
use tracing::debug;

use super::{Middleware, Next};
use crate::handler::BoxFuture;
use crate::request::Request;

/// `[time] status method host+path bytes_out remote_ip`, newline-terminated.
pub const DEFAULT_FORMAT: &str =
    "[${time_rfc3339}] ${status} ${method} ${host}${path} ${bytes_out} ${remote_ip}\n";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tag {
    TimeRfc3339,
    TimeUnix,
    Status,
    Method,
    Host,
    Path,
    Uri,
    Protocol,
    BytesIn,
    BytesOut,
    RemoteIp,
    Latency,
    LatencyHuman,
    UserAgent,
    Referer,
    Unknown,
}

impl Tag {
    fn parse(name: &str) -> Self {
        match name {
            "time_rfc3339"  => Self::TimeRfc3339,
            "time_unix"     => Self::TimeUnix,
            "status"        => Self::Status,
            "method"        => Self::Method,
            "host"          => Self::Host,
            "path"          => Self::Path,
            "uri"           => Self::Uri,
            "protocol"      => Self::Protocol,
            "bytes_in"      => Self::BytesIn,
            "bytes_out"     => Self::BytesOut,
            "remote_ip"     => Self::RemoteIp,
            "latency"       => Self::Latency,
            "latency_human" => Self::LatencyHuman,
            "user_agent"    => Self::UserAgent,
            "referer"       => Self::Referer,
            _               => Self::Unknown,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Literal(String),
    Tag(Tag),
}

fn compile(format: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = format;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else { break };
        if start > 0 {
            tokens.push(Token::Literal(rest[..start].to_owned()));
        }
        tokens.push(Token::Tag(Tag::parse(&rest[start + 2..start + 2 + len])));
        rest = &rest[start + 2 + len + 1..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Literal(rest.to_owned()));
    }
    tokens
}

/// What the logger knows about one finished request.
struct Entry {
    method: String,
    host: String,
    path: String,
    uri: String,
    protocol: String,
    bytes_in: usize,
    remote_ip: String,
    user_agent: String,
    referer: String,
    status: u16,
    bytes_out: usize,
    latency: Duration,
}

impl Entry {
    fn render(&self, tokens: &[Token]) -> String {
        let mut line = String::with_capacity(128);
        for token in tokens {
            // Writing into a String cannot fail.
            let _ = match token {
                Token::Literal(text) => line.write_str(text),
                Token::Tag(tag) => match tag {
                    Tag::TimeRfc3339 => {
                        line.write_str(&Local::now().to_rfc3339_opts(SecondsFormat::Secs, true))
                    }
                    Tag::TimeUnix => write!(line, "{}", Local::now().timestamp()),
                    Tag::Status => write!(line, "{}", self.status),
                    Tag::Method => line.write_str(&self.method),
                    Tag::Host => line.write_str(&self.host),
                    Tag::Path => line.write_str(&self.path),
                    Tag::Uri => line.write_str(&self.uri),
                    Tag::Protocol => line.write_str(&self.protocol),
                    Tag::BytesIn => write!(line, "{}", self.bytes_in),
                    Tag::BytesOut => write!(line, "{}", self.bytes_out),
                    Tag::RemoteIp => line.write_str(&self.remote_ip),
                    Tag::Latency => write!(line, "{}", self.latency.as_nanos()),
                    Tag::LatencyHuman => write!(line, "{:?}", self.latency),
                    Tag::UserAgent => line.write_str(&self.user_agent),
                    Tag::Referer => line.write_str(&self.referer),
                    Tag::Unknown => Ok(()),
                },
            };
        }
        line
    }
}

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Writes one access-log line per request.
///
/// Tags use `${name}` syntax; see [`DEFAULT_FORMAT`]. Unknown tags render as
/// nothing. Output goes to stdout unless another writer is supplied. A
/// failing writer never fails the request.
#[derive(Clone)]
pub struct Logger {
    tokens: Arc<[Token]>,
    sink: Sink,
}

impl Logger {
    /// [`DEFAULT_FORMAT`] to stdout.
    pub fn new() -> Self {
        Self::with_format(DEFAULT_FORMAT)
    }

    pub fn with_format(format: &str) -> Self {
        Self {
            tokens: compile(format).into(),
            sink: Arc::new(Mutex::new(Box::new(io::stdout()))),
        }
    }

    /// Sends lines to `writer` instead of stdout.
    pub fn writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.sink = Arc::new(Mutex::new(Box::new(writer)));
        self
    }
}

impl Default for Logger {
    fn default() -> Self { Self::new() }
}

impl Middleware for Logger {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let tokens = Arc::clone(&self.tokens);
        let sink = Arc::clone(&self.sink);

        let header = |name: header::HeaderName| req.header(name.as_str()).unwrap_or("").to_owned();
        let mut entry = Entry {
            method: req.method().to_string(),
            host: req.host().to_owned(),
            path: req.path().to_owned(),
            uri: req.uri().to_string(),
            protocol: format!("{:?}", req.version()),
            bytes_in: req.body().len(),
            remote_ip: req.real_ip(),
            user_agent: header(header::USER_AGENT),
            referer: header(header::REFERER),
            status: 0,
            bytes_out: 0,
            latency: Duration::ZERO,
        };

        Box::pin(async move {
            let started = Instant::now();
            let res = next.run(req).await;
            entry.latency = started.elapsed();
            entry.status = res.status_code().as_u16();
            entry.bytes_out = res.body().len();

            let line = entry.render(&tokens);
            match sink.lock() {
                Ok(mut out) => {
                    if let Err(e) = out.write_all(line.as_bytes()).and_then(|()| out.flush()) {
                        debug!("access log write failed: {e}");
                    }
                }
                Err(_) => debug!("access log writer poisoned; line dropped"),
            }
            res
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;

    use crate::{Response, Router};

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

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    async fn five_bytes(_req: Request) -> Response {
        Response::text("hello")
    }

    #[test]
    fn compiles_literals_and_tags() {
        assert_eq!(
            compile("[${status}] ${host}${path} ${nope}!"),
            vec![
                Token::Literal("[".into()),
                Token::Tag(Tag::Status),
                Token::Literal("] ".into()),
                Token::Tag(Tag::Host),
                Token::Tag(Tag::Path),
                Token::Literal(" ".into()),
                Token::Tag(Tag::Unknown),
                Token::Literal("!".into()),
            ]
        );
    }

    #[test]
    fn unterminated_tag_is_literal() {
        assert_eq!(compile("a ${status"), vec![Token::Literal("a ${status".into())]);
    }

    #[tokio::test]
    async fn writes_one_line_per_request() {
        let out = Captured::default();
        let app = Router::new()
            .layer(
                Logger::with_format("${status} ${method} ${host}${path} ${bytes_out} ${remote_ip}\n")
                    .writer(out.clone()),
            )
            .get("/hello", five_bytes);

        let req = http::Request::get("/hello?x=1")
            .header("host", "example.test:1323")
            .body(Bytes::new())
            .unwrap();
        app.oneshot(req).await;

        assert_eq!(out.text(), "200 GET example.test:1323/hello 5 127.0.0.1\n");
    }

    #[tokio::test]
    async fn default_format_starts_with_a_timestamp() {
        let out = Captured::default();
        let app = Router::new().layer(Logger::new().writer(out.clone())).get("/hello", five_bytes);
        app.oneshot(http::Request::get("/hello").body(Bytes::new()).unwrap()).await;

        let line = out.text();
        let (stamp, rest) = line.trim_start_matches('[').split_once("] ").unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok(), "{stamp}");
        assert_eq!(rest, "200 GET /hello 5 127.0.0.1\n");
    }

    #[tokio::test]
    async fn broken_writer_does_not_fail_the_request() {
        let app = Router::new().layer(Logger::new().writer(Broken)).get("/hello", five_bytes);
        let res = app.oneshot(http::Request::get("/hello").body(Bytes::new()).unwrap()).await;
        assert_eq!(res.status_code(), http::StatusCode::OK);
        assert_eq!(res.body(), b"hello");
    }
}
