//! Handler priorities.

use std::fmt;

/// Handler priority; higher values run earlier.
///
/// Any `i32` is valid. The named tiers let core bookkeeping observe, and
/// possibly consume, events before user plugins see them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    /// Runs before core handlers.
    pub const PRE_CORE: Self = Self(5);
    /// Core protocol bookkeeping.
    pub const CORE: Self = Self(0);
    /// Runs right after core handlers.
    pub const POST_CORE: Self = Self(-5);
    /// Plugin default.
    pub const DEFAULT: Self = Self(-10);
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
