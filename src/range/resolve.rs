use super::ParsedRange;
use crate::error::StreamError;
use axum::http::StatusCode;

/// Inclusive byte interval actually served for a ranged request.
///
/// `start <= end < total_size` and `end - start + 1 <= max_chunk_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: u64,
    pub end: u64,
    pub total_size: u64,
}

impl ResolvedRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Never empty by construction
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_size)
    }
}

/// What the orchestrator will serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No `Range` header: the whole object, never clamped
    Full { total_size: u64 },
    /// A `Range` header was present
    Partial(ResolvedRange),
}

impl Resolution {
    pub fn status(&self) -> StatusCode {
        match self {
            Resolution::Full { .. } => StatusCode::OK,
            Resolution::Partial(_) => StatusCode::PARTIAL_CONTENT,
        }
    }

    pub fn content_length(&self) -> u64 {
        match self {
            Resolution::Full { total_size } => *total_size,
            Resolution::Partial(range) => range.len(),
        }
    }

    pub fn total_size(&self) -> u64 {
        match self {
            Resolution::Full { total_size } => *total_size,
            Resolution::Partial(range) => range.total_size,
        }
    }
}

/// Resolve a parsed `Range` against the object size and the chunk ceiling.
///
/// An explicit end must satisfy `start < end < total_size`; an open end
/// defaults to the last byte and only needs `start < total_size`. Oversized
/// intervals are clamped to `max_chunk_size` bytes from `start`.
pub fn resolve_range(
    parsed: Option<ParsedRange>,
    total_size: u64,
    max_chunk_size: u64,
) -> Result<Resolution, StreamError> {
    let Some(ParsedRange { start, end }) = parsed else {
        return Ok(Resolution::Full { total_size });
    };

    if total_size == 0 || max_chunk_size == 0 {
        return Err(StreamError::RangeNotSatisfiable);
    }
    let last = total_size - 1;

    let mut end = match end {
        Some(end) if end <= start || end > last => {
            return Err(StreamError::RangeNotSatisfiable);
        }
        Some(end) => end,
        None if start > last => return Err(StreamError::RangeNotSatisfiable),
        None => last,
    };

    if end - start + 1 > max_chunk_size {
        end = start.saturating_add(max_chunk_size - 1).min(last);
    }

    Ok(Resolution::Partial(ResolvedRange {
        start,
        end,
        total_size,
    }))
}
