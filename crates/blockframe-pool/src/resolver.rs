//! Block URL resolution
//!
//! Each `src` is served by the external block runtime at a fixed URL pattern.

use crate::types::Src;

/// Maps content identifiers to the URL their frame loads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcResolver {
    base_url: String,
    pattern: String,
}

impl SrcResolver {
    /// Create resolver from a base URL and a pattern containing `{src}`
    ///
    /// `{base}` in the pattern expands to `base_url` with any trailing `/`
    /// removed.
    #[must_use]
    pub fn new(base_url: impl Into<String>, pattern: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            pattern: pattern.into(),
        }
    }

    /// URL for one block
    #[must_use]
    pub fn resolve(&self, src: &Src) -> String {
        self.pattern
            .replace("{base}", &self.base_url)
            .replace("{src}", src.as_str())
    }

    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
