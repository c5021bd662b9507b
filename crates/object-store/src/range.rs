//! Single-range `bytes=` resolution for grant downloads.
//!
//! Only one range per request is served. A specification is checked in this
//! order: syntax, range count, satisfiability against the current size, and
//! finally the length cap. Callers that have no specification at all should
//! read the whole blob instead of calling [`resolve`].

use std::fmt;

/// Rejections produced while resolving a range specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("invalid range header")]
    Malformed,
    #[error("can only accept a single range")]
    MultipleRanges,
    #[error("range not satisfiable for {size} bytes")]
    Unsatisfiable { size: u64 },
    #[error("range length {length} exceeds max chunk size {max}")]
    TooLarge { length: u64, max: u64 },
}

/// One parsed range-spec, before it is checked against a length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeSpec {
    /// `first-last` or `first-`
    FromTo { start: u64, end: Option<u64> },
    /// `-suffix-length`
    Suffix { len: u64 },
}

/// A validated window into a blob of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub offset: u64,
    pub length: u64,
    pub total: u64,
}

impl ResolvedRange {
    /// Offset of the last byte in the window.
    pub fn last(&self) -> u64 {
        // length is never zero for a resolved range
        self.offset + self.length - 1
    }

    /// Value for a `Content-Range` response header.
    pub fn content_range(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResolvedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes {}-{}/{}", self.offset, self.last(), self.total)
    }
}

/// Resolve `spec` against a blob of `size` bytes, capping the window at
/// `max_length` bytes.
pub fn resolve(spec: &str, size: u64, max_length: u64) -> Result<ResolvedRange, RangeError> {
    let specs = parse(spec)?;
    let [spec] = specs.as_slice() else {
        return Err(RangeError::MultipleRanges);
    };

    let (offset, last) = match *spec {
        RangeSpec::FromTo { start, end } => {
            if start >= size {
                return Err(RangeError::Unsatisfiable { size });
            }
            let last = end.map_or(size - 1, |end| end.min(size - 1));
            (start, last)
        }
        RangeSpec::Suffix { len } => {
            if len == 0 || size == 0 {
                return Err(RangeError::Unsatisfiable { size });
            }
            (size.saturating_sub(len), size - 1)
        }
    };

    let length = last - offset + 1;
    if length > max_length {
        return Err(RangeError::TooLarge {
            length,
            max: max_length,
        });
    }

    Ok(ResolvedRange {
        offset,
        length,
        total: size,
    })
}

fn parse(value: &str) -> Result<Vec<RangeSpec>, RangeError> {
    let (unit, rest) = value.trim().split_once('=').ok_or(RangeError::Malformed)?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return Err(RangeError::Malformed);
    }

    let mut out = Vec::new();
    for part in rest.split(',') {
        // Empty list elements are allowed and ignored
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some(suffix) = part.strip_prefix('-') {
            out.push(RangeSpec::Suffix {
                len: parse_u64(suffix)?,
            });
            continue;
        }

        let (start, end) = part.split_once('-').ok_or(RangeError::Malformed)?;
        let start = parse_u64(start)?;
        let end = if end.trim().is_empty() {
            None
        } else {
            Some(parse_u64(end)?)
        };

        if matches!(end, Some(end) if start > end) {
            return Err(RangeError::Malformed);
        }

        out.push(RangeSpec::FromTo { start, end });
    }

    if out.is_empty() {
        return Err(RangeError::Malformed);
    }
    Ok(out)
}

fn parse_u64(s: &str) -> Result<u64, RangeError> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::Malformed);
    }
    s.parse::<u64>().map_err(|_| RangeError::Malformed)
}
