//! Just enough HTTP to hand files to a build.
//!
//! One request per connection, `GET` only, no keep-alive. Anything fancier
//! belongs in a real application server.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};

/// First line of an HTTP request.
#[derive(Debug, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
}

/// Outcome of mapping a request target onto the document root.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Candidate path inside the document root. The file may still be
    /// missing; the caller turns a failed read into a 404.
    File(Utf8PathBuf),
    /// Target escapes the context path or the document root.
    Rejected,
}

/// Parses a `METHOD target HTTP/x.y` request line.
pub fn parse_request_line(line: &str) -> Option<RequestLine> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    let version = parts.next()?;
    if !version.starts_with("HTTP/") || parts.next().is_some() {
        return None;
    }
    Some(RequestLine {
        method: method.to_owned(),
        target: target.to_owned(),
    })
}

/// Maps a request target onto the document root.
///
/// The query string is ignored, `..` segments are rejected rather than
/// resolved, and a target naming a directory is answered with its
/// `index.html`.
pub fn resolve_target(doc_root: &Utf8Path, context_path: &str, target: &str) -> Resolution {
    let path = target.split(['?', '#']).next().unwrap_or(target);
    let Some(relative) = strip_context(path, context_path) else {
        return Resolution::Rejected;
    };
    let mut resolved = doc_root.to_owned();
    for segment in relative.split('/').filter(|segment| !segment.is_empty()) {
        if segment == "." {
            continue;
        }
        if segment == ".." {
            return Resolution::Rejected;
        }
        resolved.push(segment);
    }
    if resolved.as_std_path().is_dir() {
        resolved.push("index.html");
    }
    Resolution::File(resolved)
}

/// Strips the context path, insisting on a segment boundary so `/app2` is
/// not treated as living under `/app`.
fn strip_context<'a>(path: &'a str, context_path: &str) -> Option<&'a str> {
    if context_path == "/" {
        return Some(path);
    }
    let rest = path.strip_prefix(context_path)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Content type inferred from the file extension.
pub fn content_type_for(path: &Utf8Path) -> &'static str {
    match path.extension() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Writes a complete response and flushes the stream.
pub fn write_response(
    mut writer: impl Write,
    status: u16,
    reason: &str,
    content_type: &str,
    body: &[u8],
) -> io::Result<()> {
    write!(
        writer,
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )?;
    writer.write_all(body)?;
    writer.flush()
}
