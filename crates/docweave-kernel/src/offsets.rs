//! Offset tracking for batch planning.
//!
//! A tracker hands out absolute positions as content is appended to a plan.
//! Each planning pass owns exactly one tracker, seeded from a fresh read.

use docweave_types::utf16_len;

/// Running cursor over the absolute index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetTracker {
    current: usize,
}

impl OffsetTracker {
    /// Start at the given insertion point.
    pub fn new(start: usize) -> Self {
        Self { current: start }
    }

    /// The position the next appended text will occupy.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Append `text` at the cursor; returns the position it starts at.
    ///
    /// No validation: empty text is a no-op.
    pub fn advance(&mut self, text: &str) -> usize {
        let start = self.current;
        self.current += utf16_len(text);
        start
    }
}
