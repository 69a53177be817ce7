use crate::claim::{AuthorizationBinder, Credentials};
use crate::error::{StreamError, StreamResult};
use crate::range::{Resolution, parse_range_header, resolve_range};
use crate::resource::{ResourceKind, ResourcePath};
use crate::storage::{ByteStream, ObjectStore, StorageError};
use axum::body::Body;
use axum::http::{HeaderValue, Response, header};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::sync::Arc;
use tracing::{debug, error};

const CACHE_CONTROL: &str = "private,max-age=3600";

/// One media request as seen by the orchestrator
#[derive(Debug, Clone, Copy)]
pub struct StreamRequest<'a> {
    pub kind: ResourceKind,
    /// Raw object key from the route
    pub path: &'a str,
    pub credentials: Credentials<'a>,
    /// Raw `Range` header, if any
    pub range: Option<&'a HeaderValue>,
}

/// Drives a media request from path validation to byte relay
#[derive(Clone)]
pub struct Streamer {
    store: Arc<dyn ObjectStore>,
    binder: AuthorizationBinder,
    max_chunk_size: u64,
}

impl Streamer {
    pub fn new(store: Arc<dyn ObjectStore>, binder: AuthorizationBinder, max_chunk_size: u64) -> Self {
        Self {
            store,
            binder,
            max_chunk_size,
        }
    }

    pub fn max_chunk_size(&self) -> u64 {
        self.max_chunk_size
    }

    /// Validate, authorize and resolve the request, then commit the response.
    ///
    /// Every failure up to header emission is returned as a `StreamError`.
    /// Once the response is returned its status and headers are final; a store
    /// failure after that point only aborts the body.
    pub async fn stream(&self, request: StreamRequest<'_>) -> StreamResult<Response<Body>> {
        let path = ResourcePath::parse(request.kind, request.path)?;
        let caller = self.binder.authorize(&path, request.credentials)?;

        let raw_range = request
            .range
            .map(|value| value.to_str().map_err(|_| StreamError::RangeHeaderInvalid))
            .transpose()?;
        let parsed = parse_range_header(raw_range)?;

        let total_size = self
            .store
            .head_object(path.as_str())
            .await
            .map_err(not_found_as_missing)?;
        let resolution = resolve_range(parsed, total_size, self.max_chunk_size)?;

        let upstream = match resolution {
            Resolution::Full { total_size: 0 } => Ok(futures::stream::empty().boxed()),
            Resolution::Full { .. } => self.store.get_object(path.as_str(), None).await,
            Resolution::Partial(range) => {
                self.store
                    .get_object(path.as_str(), Some(range.start..=range.end))
                    .await
            }
        }
        .map_err(not_found_as_missing)?;

        debug!(
            user_id = %caller.user_id,
            path = %path,
            status = %resolution.status(),
            content_length = resolution.content_length(),
            total_size = resolution.total_size(),
            backend = self.store.backend_name(),
            "Serving object"
        );

        let mut builder = Response::builder()
            .status(resolution.status())
            .header(header::CONTENT_TYPE, path.content_type())
            .header(header::CONTENT_LENGTH, resolution.content_length())
            .header(header::ACCEPT_RANGES, "bytes")
            .header(header::CACHE_CONTROL, CACHE_CONTROL);
        if let Resolution::Partial(range) = resolution {
            builder = builder.header(header::CONTENT_RANGE, range.content_range());
        }

        let body = Body::from_stream(relay(
            upstream,
            resolution.content_length(),
            path.to_string(),
        ));
        builder
            .body(body)
            .map_err(|error| StreamError::Internal(error.into()))
    }
}

fn not_found_as_missing(error: StorageError) -> StreamError {
    match error {
        StorageError::NotFound(_) => StreamError::ResourceNotFound,
        other => other.into(),
    }
}

/// Tracks one relay; logs a disconnect if dropped before it finished.
struct RelayGuard {
    key: String,
    expected: u64,
    sent: u64,
    finished: bool,
}

impl RelayGuard {
    fn remaining(&self) -> u64 {
        self.expected - self.sent
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                key = %self.key,
                sent = self.sent,
                expected = self.expected,
                "Client disconnected, upstream read cancelled"
            );
        }
    }
}

/// Pull-based copy from the store stream to the response body.
///
/// Polled only when the connection can take more data. Forwards at most
/// `expected` bytes and fails the body if the store ends short or errors.
pub(crate) fn relay(
    mut upstream: ByteStream,
    expected: u64,
    key: String,
) -> impl Stream<Item = Result<Bytes, IoError>> + Send {
    async_stream::stream! {
        let mut guard = RelayGuard {
            key,
            expected,
            sent: 0,
            finished: false,
        };

        while guard.remaining() > 0 {
            match upstream.next().await {
                Some(Ok(mut chunk)) => {
                    if chunk.len() as u64 > guard.remaining() {
                        chunk.truncate(guard.remaining() as usize);
                    }
                    if chunk.is_empty() {
                        continue;
                    }
                    guard.sent += chunk.len() as u64;
                    yield Ok(chunk);
                }
                Some(Err(err)) => {
                    guard.finished = true;
                    error!(
                        key = %guard.key,
                        sent = guard.sent,
                        expected = guard.expected,
                        error = ?err,
                        "Store read failed mid-stream, aborting response"
                    );
                    yield Err(IoError::other(err));
                    return;
                }
                None => {
                    guard.finished = true;
                    error!(
                        key = %guard.key,
                        sent = guard.sent,
                        expected = guard.expected,
                        "Store stream ended early, aborting response"
                    );
                    yield Err(IoError::new(
                        IoErrorKind::UnexpectedEof,
                        "object stream ended before the advertised length",
                    ));
                    return;
                }
            }
        }

        guard.finished = true;
        debug!(key = %guard.key, sent = guard.sent, "Relay completed");
    }
}
