//! Source location spans.
//!
//! Spans travel inside externs files so tooling can point back at the
//! declaration site, but they are never part of the cache-relevant view:
//! moving a declaration must not look like changing it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Byte range in a module's source file.
///
/// Layout: 8 bytes total, `start`/`end` byte offsets with `end` exclusive.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Dummy span for synthesized declarations.
    pub const DUMMY: Span = Span { start: 0, end: 0 };

    /// Create a new span.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    /// Length of the span in bytes.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Check if the span is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_span_len() {
        let span = Span::new(4, 10);
        assert_eq!(span.len(), 6);
        assert!(!span.is_empty());
        assert!(Span::DUMMY.is_empty());
    }

    #[test]
    fn test_span_debug_format() {
        assert_eq!(format!("{:?}", Span::new(3, 9)), "3..9");
    }
}
