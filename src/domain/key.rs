//! Normalized cache keys for sector reports.

use std::fmt;

/// Normalized request signature for a sector analysis.
///
/// Raw sector names arrive in whatever spelling the caller used
/// (`"Technology"`, `" technology "`, `"TECHNOLOGY"`). All of them must
/// address the same cache entry and the same in-flight computation, so the
/// key is trimmed and lower-cased at construction. There is no way to build
/// a `SectorKey` that skips normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectorKey(String);

impl SectorKey {
    /// Build a key from a raw sector name, normalizing it.
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    /// View the normalized key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the normalized key is empty (raw input was all whitespace).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
