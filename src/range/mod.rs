//! Byte-range negotiation: parse a `Range` header, then resolve it against the
//! object size and the configured chunk ceiling.

mod parse;
mod resolve;

pub use parse::{ParsedRange, parse_range_header};
pub use resolve::{Resolution, ResolvedRange, resolve_range};
