//! Just enough HTTP/1.1 for a read-only page server.
//!
//! Requests carry no body worth reading (only `GET` and `HEAD` are
//! routed), so parsing stops at the blank line ending the head.

use std::fmt;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::io::LocalFileReader;
use crate::zip::{EntryStream, ZipError};

/// Upper bound on the request line plus headers.
pub const MAX_HEAD_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Other(String),
}

impl Method {
    fn parse(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            other => Method::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Head => f.write_str("HEAD"),
            Method::Other(m) => f.write_str(m),
        }
    }
}

/// A parsed request head.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Request target with any query string or fragment removed
    pub path: String,
    /// Whether the client allows the connection to be reused
    pub keep_alive: bool,
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("connection closed")]
    Closed,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed request: {0}")]
    Malformed(&'static str),
    #[error("request head too large")]
    TooLarge,
}

/// Read one request head from `reader`.
///
/// Returns [`ParseError::Closed`] when the peer closes the connection
/// cleanly before sending anything.
pub async fn read_request<R>(reader: &mut R) -> Result<Request, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = MAX_HEAD_SIZE;

    let request_line = match read_line(reader, &mut budget).await? {
        Some(line) => line,
        None => return Err(ParseError::Closed),
    };

    let mut parts = request_line.split_ascii_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::Malformed("bad request line"));
    };

    let mut keep_alive = match version {
        "HTTP/1.1" => true,
        "HTTP/1.0" => false,
        _ => return Err(ParseError::Malformed("unsupported HTTP version")),
    };
    if !target.starts_with('/') {
        return Err(ParseError::Malformed("request target must be a path"));
    }

    loop {
        let line = read_line(reader, &mut budget)
            .await?
            .ok_or(ParseError::Malformed("headers ended early"))?;
        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or(ParseError::Malformed("bad header line"))?;
        let value = value.trim();

        if name.eq_ignore_ascii_case("connection") {
            for token in value.split(',').map(str::trim) {
                if token.eq_ignore_ascii_case("close") {
                    keep_alive = false;
                } else if token.eq_ignore_ascii_case("keep-alive") {
                    keep_alive = true;
                }
            }
        } else if (name.eq_ignore_ascii_case("content-length") && value != "0")
            || name.eq_ignore_ascii_case("transfer-encoding")
        {
            // A body would have to be drained before the next request.
            keep_alive = false;
        }
    }

    let path = target
        .split(['?', '#'])
        .next()
        .unwrap_or(target)
        .to_string();

    Ok(Request {
        method: Method::parse(method),
        path,
        keep_alive,
    })
}

/// Read one CRLF- (or LF-) terminated line, charging it to `budget`.
async fn read_line<R>(reader: &mut R, budget: &mut usize) -> Result<Option<String>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut limited = reader.take(*budget as u64);
    let n = limited.read_until(b'\n', &mut buf).await?;

    if n == 0 {
        return if *budget == 0 {
            Err(ParseError::TooLarge)
        } else {
            Ok(None)
        };
    }
    *budget -= n;
    if buf.last() != Some(&b'\n') {
        return Err(if *budget == 0 {
            ParseError::TooLarge
        } else {
            ParseError::Malformed("unterminated line")
        });
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| ParseError::Malformed("head is not UTF-8"))
}

/// Response status codes this server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
            Status::InternalServerError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

pub enum Body {
    Bytes(Vec<u8>),
    Entry(EntryStream<LocalFileReader>),
}

impl Body {
    fn len(&self) -> u64 {
        match self {
            Body::Bytes(bytes) => bytes.len() as u64,
            Body::Entry(stream) => stream.len(),
        }
    }
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Entry stream failed: {0}")]
    Entry(#[from] ZipError),
}

pub struct Response {
    pub status: Status,
    headers: Vec<(&'static str, String)>,
    body: Body,
}

impl Response {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Bytes(Vec::new()),
        }
    }

    pub fn html(markup: String) -> Self {
        Self::new(Status::Ok)
            .header("Content-Type", "text/html; charset=utf-8")
            .body(Body::Bytes(markup.into_bytes()))
    }

    /// A plain-text error page.
    pub fn error(status: Status, message: impl fmt::Display) -> Self {
        Self::new(status)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(Body::Bytes(format!("{status}: {message}\n").into_bytes()))
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serialize the response onto `writer`.
    ///
    /// With `head_only` the body is dropped unread after the head is sent.
    /// An entry body that fails mid-stream leaves the response truncated;
    /// the caller must close the connection in that case.
    pub async fn write_to<W>(
        self,
        writer: &mut W,
        head_only: bool,
        keep_alive: bool,
    ) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut head = format!("HTTP/1.1 {}\r\n", self.status);
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        head.push_str(if keep_alive {
            "Connection: keep-alive\r\n\r\n"
        } else {
            "Connection: close\r\n\r\n"
        });
        writer.write_all(head.as_bytes()).await?;

        if !head_only {
            match self.body {
                Body::Bytes(bytes) => writer.write_all(&bytes).await?,
                Body::Entry(stream) => {
                    stream.copy_to(writer).await?;
                }
            }
        }
        writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn parse(raw: &str) -> Result<Request, ParseError> {
        let mut reader = BufReader::new(raw.as_bytes());
        read_request(&mut reader).await
    }

    #[tokio::test]
    async fn parses_get_with_query() {
        let req = parse("GET /abc/3?x=1 HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/abc/3");
        assert!(req.keep_alive);
    }

    #[tokio::test]
    async fn connection_header_controls_reuse() {
        let req = parse("HEAD / HTTP/1.1\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(req.method, Method::Head);
        assert!(!req.keep_alive);

        let req = parse("GET / HTTP/1.0\nConnection: Keep-Alive\n\n")
            .await
            .unwrap();
        assert!(req.keep_alive);
    }

    #[tokio::test]
    async fn request_with_body_is_not_reused() {
        let req = parse("POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello")
            .await
            .unwrap();
        assert_eq!(req.method, Method::Other("POST".into()));
        assert!(!req.keep_alive);
    }

    #[tokio::test]
    async fn empty_input_is_closed() {
        assert!(matches!(parse("").await, Err(ParseError::Closed)));
    }

    #[tokio::test]
    async fn rejects_garbage() {
        for raw in [
            "GET\r\n\r\n",
            "GET / HTTP/2\r\n\r\n",
            "GET http://x/ HTTP/1.1\r\n\r\n",
            "GET / HTTP/1.1\r\nno colon here\r\n\r\n",
            "GET / HTTP/1.1\r\nHost: x\r\n",
        ] {
            assert!(
                matches!(parse(raw).await, Err(ParseError::Malformed(_))),
                "{raw:?}"
            );
        }
    }

    #[tokio::test]
    async fn rejects_oversized_head() {
        let raw = format!("GET / HTTP/1.1\r\nX-Big: {}\r\n\r\n", "a".repeat(MAX_HEAD_SIZE));
        assert!(matches!(parse(&raw).await, Err(ParseError::TooLarge)));
    }

    #[tokio::test]
    async fn writes_head_and_body() {
        let mut out = Vec::new();
        Response::html("<p>hi</p>".into())
            .write_to(&mut out, false, true)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(text.contains("Content-Length: 9\r\n"));
        assert!(text.contains("Connection: keep-alive\r\n"));
        assert!(text.ends_with("\r\n\r\n<p>hi</p>"));
    }

    #[tokio::test]
    async fn head_only_omits_body_but_keeps_length() {
        let mut out = Vec::new();
        Response::error(Status::NotFound, "nope")
            .write_to(&mut out, true, false)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Length: 20\r\n"));
        assert!(text.ends_with("Connection: close\r\n\r\n"));
    }
}
