use crate::error::StreamError;

const BYTES_UNIT: &str = "bytes=";

/// A syntactically valid `bytes=<start>-<end>?` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRange {
    pub start: u64,
    /// `None` when the client left the range open-ended
    pub end: Option<u64>,
}

/// Parse a raw `Range` header value.
///
/// Returns `Ok(None)` when no header was sent. Anything that does not match
/// `^bytes=\d+-(\d+)?$` is rejected, including suffix ranges (`bytes=-100`),
/// other units and multi-range requests.
pub fn parse_range_header(raw: Option<&str>) -> Result<Option<ParsedRange>, StreamError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let spec = raw
        .strip_prefix(BYTES_UNIT)
        .ok_or(StreamError::RangeHeaderInvalid)?;
    let (start, end) = spec
        .split_once('-')
        .ok_or(StreamError::RangeHeaderInvalid)?;

    let start = parse_bound(start)?;
    let end = if end.is_empty() {
        None
    } else {
        Some(parse_bound(end)?)
    };

    Ok(Some(ParsedRange { start, end }))
}

fn parse_bound(digits: &str) -> Result<u64, StreamError> {
    // `u64::from_str` would also take a leading '+'
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StreamError::RangeHeaderInvalid);
    }

    digits
        .parse::<u64>()
        .map_err(|_| StreamError::RangeHeaderInvalid)
}
