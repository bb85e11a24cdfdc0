//! HTTP response handlers.
//!
//! HEAD requests go through the same handlers; tiny_http drops the body.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tiny_http::{Header, Request, Response, StatusCode};

use crate::utils::mime::types::PLAIN;

/// Respond with a repository file, honouring a single `Range`.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = crate::utils::mime::from_path(path);
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let file_size = file
        .metadata()
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();

    if let Some(range) = range_header(&request) {
        return match parse_range(&range, file_size) {
            Some((start, end)) => respond_range(request, file, content_type, start, end, file_size),
            None => {
                let response = text(416, "416 Range Not Satisfiable")?
                    .with_header(header("Content-Range", &format!("bytes */{file_size}"))?);
                request.respond(response).map_err(Into::into)
            }
        };
    }

    let response = Response::from_file(file)
        .with_header(header("Content-Type", content_type)?)
        .with_header(header("Accept-Ranges", "bytes")?);
    request.respond(response)?;
    Ok(())
}

fn respond_range(
    request: Request,
    mut file: File,
    content_type: &str,
    start: u64,
    end: u64,
    file_size: u64,
) -> Result<()> {
    let length = end - start + 1;
    file.seek(SeekFrom::Start(start))?;

    let response = Response::new(
        StatusCode(206),
        vec![
            header("Content-Type", content_type)?,
            header("Content-Range", &format!("bytes {start}-{end}/{file_size}"))?,
            header("Accept-Ranges", "bytes")?,
        ],
        file.take(length),
        Some(length as usize),
        None,
    );
    request.respond(response)?;
    Ok(())
}

/// Parse `bytes=start-end` into inclusive offsets, `None` if unsatisfiable.
fn parse_range(value: &str, file_size: u64) -> Option<(u64, u64)> {
    let spec = value.trim().strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());
    let last = file_size.checked_sub(1)?;

    let (start, end) = match (start.is_empty(), end.is_empty()) {
        // "-500": last 500 bytes
        (true, false) => {
            let suffix: u64 = end.parse().ok()?;
            if suffix == 0 {
                return None;
            }
            (file_size.saturating_sub(suffix), last)
        }
        // "100-": to the end
        (false, true) => (start.parse().ok()?, last),
        (false, false) => (start.parse().ok()?, end.parse::<u64>().ok()?.min(last)),
        (true, true) => return None,
    };

    (start <= end).then_some((start, end))
}

fn range_header(request: &Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case("range"))
        .map(|h| h.value.to_string())
}

pub fn respond_not_found(request: Request) -> Result<()> {
    request.respond(text(404, "404 Not Found")?)?;
    Ok(())
}

/// 401 with a Basic challenge.
pub fn respond_unauthorized(request: Request) -> Result<()> {
    let response = text(401, "401 Unauthorized")?
        .with_header(header("WWW-Authenticate", "Basic realm=\"Restricted\"")?);
    request.respond(response)?;
    Ok(())
}

pub fn respond_throttled(request: Request) -> Result<()> {
    request.respond(text(429, "429 Too Many Requests")?)?;
    Ok(())
}

pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    let response = text(405, "405 Method Not Allowed")?.with_header(header("Allow", "GET, HEAD")?);
    request.respond(response)?;
    Ok(())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    request.respond(text(503, "503 Service Unavailable")?)?;
    Ok(())
}

fn text(status: u16, body: &str) -> Result<Response<std::io::Cursor<Vec<u8>>>> {
    Ok(Response::from_string(body)
        .with_status_code(StatusCode(status))
        .with_header(header("Content-Type", PLAIN)?))
}

fn header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes())
        .map_err(|()| anyhow!("invalid header {key}: {value}"))
}
