//! Identifiers and time for the frame pool

use crate::error::PoolError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ulid::Ulid;

/// Monotonic timestamp in milliseconds
///
/// Every pool and lifecycle operation receives the current time explicitly;
/// nothing in the crate reads a clock.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Millis(pub u64);

impl Millis {
    /// Time origin
    pub const ZERO: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn new(ms: u64) -> Self {
        Self(ms)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// `self + ms`, saturating at the end of time
    #[inline]
    #[must_use]
    pub const fn after(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    /// Milliseconds elapsed since `earlier`, zero if `earlier` is later
    #[inline]
    #[must_use]
    pub const fn since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::fmt::Display for Millis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Stable content identifier of a block
///
/// Used verbatim as the pool key and as the `{src}` segment of the block URL,
/// so it is restricted to URL-path-safe characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Src(String);

impl Src {
    /// Validate and wrap a content identifier
    ///
    /// # Errors
    /// `PoolError::InvalidSrc` if empty, contains `..`, or uses characters
    /// outside `[A-Za-z0-9._/-]`.
    pub fn new(raw: impl Into<String>) -> Result<Self, PoolError> {
        let raw = raw.into();
        let valid_chars = raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));

        if raw.is_empty() || raw.contains("..") || !valid_chars {
            return Err(PoolError::InvalidSrc(raw));
        }
        Ok(Self(raw))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Src {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Src {
    type Error = PoolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Src> for String {
    fn from(src: Src) -> Self {
        src.0
    }
}

impl AsRef<str> for Src {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Src {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A location in the document where a frame may be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlaceholderId(pub u64);

impl std::fmt::Display for PlaceholderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ph-{}", self.0)
    }
}

/// Unique identifier of one mount of one block instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MountId(pub Ulid);

impl MountId {
    /// Generate new mount ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for MountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn src_accepts_path_like_ids() {
        assert!(Src::new("sales-chart").is_ok());
        assert!(Src::new("reports/q3_summary.v2").is_ok());
    }

    #[test]
    fn src_rejects_unsafe_ids() {
        assert!(Src::new("").is_err());
        assert!(Src::new("../etc/passwd").is_err());
        assert!(Src::new("has space").is_err());
        assert!(Src::new("q?x=1").is_err());
    }

    #[test]
    fn src_serde_validates() {
        let ok: Src = serde_json::from_str("\"report-a\"").unwrap();
        assert_eq!(ok.as_str(), "report-a");
        assert!(serde_json::from_str::<Src>("\"a b\"").is_err());
    }

    #[test]
    fn millis_arithmetic_saturates() {
        assert_eq!(Millis::new(10).after(5), Millis::new(15));
        assert_eq!(Millis::new(u64::MAX).after(1), Millis::new(u64::MAX));
        assert_eq!(Millis::new(3).since(Millis::new(10)), 0);
        assert_eq!(Millis::new(10).since(Millis::new(3)), 7);
    }

    #[test]
    fn mount_ids_are_unique() {
        assert_ne!(MountId::new(), MountId::new());
    }
}
