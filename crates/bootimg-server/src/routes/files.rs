//! # Static File Routes
//!
//! Serves any [`StaticFileSystem`] over HTTP. One path segment names one
//! file; there are no directory listings.
//!
//! - `GET /{path}`: the whole file, or a single byte range.
//! - `HEAD /{path}`: the same headers with an empty body.
//!
//! Opening and reading run on the blocking pool. The body is streamed in
//! fixed-size chunks through a bounded channel, so a slow client holds at
//! most a few chunks in memory and a disconnected client stops the reader.

use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Bound;
use std::time::SystemTime;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::headers::{
    AcceptRanges, ContentLength, ContentRange, Header, HeaderMapExt, LastModified, Range,
};
use bootimg_core::{FileInfo, StaticFile, StaticFileSystem};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::AppError;

/// Read size for one body chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the reader task and the response body.
const CHANNEL_DEPTH: usize = 4;

/// Build the file router over `fs`.
pub fn router<F>(fs: F) -> Router
where
    F: StaticFileSystem + Clone + 'static,
{
    Router::new()
        .route("/{path}", get(serve_file::<F>))
        .with_state(fs)
}

/// The part of a file a request asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    /// The whole file.
    Full,
    /// Bytes `start..=end`.
    Partial { start: u64, end: u64 },
    /// The requested range lies outside the file.
    Unsatisfiable,
}

/// Resolve a `Range` header against a file of `len` bytes.
///
/// Only a single range is honored; a multi-range request gets the whole file.
/// A suffix longer than the file selects all of it.
fn select(range: Option<&Range>, len: u64) -> Selection {
    let Some(range) = range else {
        return Selection::Full;
    };
    if len > 0 && oversized_suffix(range, len) {
        return Selection::Partial {
            start: 0,
            end: len - 1,
        };
    }
    let ranges: Vec<_> = range.satisfiable_ranges(len).collect();
    let (start, end) = match ranges.as_slice() {
        [] => return Selection::Unsatisfiable,
        [single] => *single,
        _ => return Selection::Full,
    };

    let start = match start {
        Bound::Included(n) => n,
        Bound::Excluded(n) => n.saturating_add(1),
        Bound::Unbounded => 0,
    };
    let end = match end {
        Bound::Included(n) => n,
        Bound::Excluded(n) => n.saturating_sub(1),
        Bound::Unbounded => len.saturating_sub(1),
    };
    if len == 0 || start >= len || end < start {
        return Selection::Unsatisfiable;
    }
    Selection::Partial {
        start,
        end: end.min(len - 1),
    }
}

/// Whether `range` is the single spec `bytes=-N` with `N > len`.
///
/// `Range::satisfiable_ranges` drops such a suffix instead of clamping it.
fn oversized_suffix(range: &Range, len: u64) -> bool {
    let mut values: Vec<HeaderValue> = Vec::with_capacity(1);
    range.encode(&mut values);
    let Some(spec) = values
        .first()
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.strip_prefix("bytes="))
    else {
        return false;
    };
    if spec.contains(',') {
        return false;
    }
    spec.trim()
        .strip_prefix('-')
        .and_then(|suffix| suffix.trim().parse::<u64>().ok())
        .is_some_and(|suffix| suffix > len)
}

async fn serve_file<F>(
    State(fs): State<F>,
    Path(path): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, AppError>
where
    F: StaticFileSystem + Clone + 'static,
{
    let file = tokio::task::spawn_blocking(move || fs.open(&path))
        .await
        .map_err(|err| AppError::Internal(format!("open task failed: {err}")))??;
    let info = file.stat();
    if info.is_dir {
        return Err(AppError::NotFound(info.name));
    }

    // A malformed Range header is ignored, not rejected.
    let range = headers.typed_try_get::<Range>().ok().flatten();
    let selection = select(range.as_ref(), info.size);

    let mut response_headers = HeaderMap::new();
    response_headers.typed_insert(AcceptRanges::bytes());
    response_headers.typed_insert(LastModified::from(SystemTime::from(info.modified)));
    response_headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );

    let (status, offset, length) = match selection {
        Selection::Full => (StatusCode::OK, 0, info.size),
        Selection::Partial { start, end } => {
            let content_range = ContentRange::bytes(start..=end, info.size)
                .map_err(|_| AppError::Internal(format!("invalid range {start}-{end}")))?;
            response_headers.typed_insert(content_range);
            (StatusCode::PARTIAL_CONTENT, start, end - start + 1)
        }
        Selection::Unsatisfiable => {
            response_headers.typed_insert(ContentRange::unsatisfied_bytes(info.size));
            tracing::debug!(name = %info.name, size = info.size, "unsatisfiable range");
            return Ok((StatusCode::RANGE_NOT_SATISFIABLE, response_headers).into_response());
        }
    };
    response_headers.typed_insert(ContentLength(length));

    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        stream_body(file, &info, offset, length)
    };
    Ok((status, response_headers, body).into_response())
}

/// Stream `length` bytes of `file` starting at `offset`.
fn stream_body<T>(mut file: T, info: &FileInfo, offset: u64, length: u64) -> Body
where
    T: StaticFile + 'static,
{
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(CHANNEL_DEPTH);
    let name = info.name.clone();

    tokio::task::spawn_blocking(move || {
        if let Err(err) = file.seek(SeekFrom::Start(offset)) {
            let _ = tx.blocking_send(Err(err));
            return;
        }
        let mut remaining = length;
        while remaining > 0 {
            let want = remaining.min(CHUNK_SIZE as u64) as usize;
            let mut buf = vec![0u8; want];
            match file.read(&mut buf) {
                Ok(0) => {
                    tracing::warn!(%name, remaining, "image ended before its recorded size");
                    let _ = tx.blocking_send(Err(io::ErrorKind::UnexpectedEof.into()));
                    return;
                }
                Ok(n) => {
                    buf.truncate(n);
                    remaining -= n as u64;
                    if tx.blocking_send(Ok(Bytes::from(buf))).is_err() {
                        tracing::debug!(%name, remaining, "client went away");
                        return;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    tracing::warn!(%name, error = %err, "image read failed");
                    let _ = tx.blocking_send(Err(err));
                    return;
                }
            }
        }
    });

    Body::from_stream(ReceiverStream::new(rx))
}
