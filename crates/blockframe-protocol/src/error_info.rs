//! Classified error information
//!
//! Separates failures a reload can fix (transient load errors) from failures
//! that come from the block's own code (render and build errors).

use crate::message::WireError;
use serde::{Deserialize, Serialize};

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorClass {
    /// Network/load failure with no diagnostic detail
    TransientLoad,
    /// Exception thrown while rendering the block
    RenderError,
    /// Compile/bundle failure reported out of band
    BuildError,
}

impl ErrorClass {
    /// Render and build errors carry structured detail from the content
    #[inline]
    #[must_use]
    pub fn is_diagnostic(self) -> bool {
        matches!(self, Self::RenderError | Self::BuildError)
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::TransientLoad => "transient-load",
            Self::RenderError => "render-error",
            Self::BuildError => "build-error",
        };
        f.write_str(name)
    }
}

/// Error surfaced to the lifecycle controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    pub classification: ErrorClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_stack: Option<String>,
}

impl ErrorInfo {
    /// Create error with explicit classification
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>, classification: ErrorClass) -> Self {
        Self {
            message: message.into(),
            classification,
            source: None,
            line: None,
            column: None,
            stack: None,
            component_stack: None,
        }
    }

    /// Native frame load failure
    #[inline]
    #[must_use]
    pub fn load_failure(message: impl Into<String>) -> Self {
        Self::new(message, ErrorClass::TransientLoad)
    }

    /// Build/compile failure for a block's source
    #[inline]
    #[must_use]
    pub fn build_error(message: impl Into<String>) -> Self {
        Self::new(message, ErrorClass::BuildError)
    }

    /// With source location
    #[inline]
    #[must_use]
    pub fn with_location(mut self, source: impl Into<String>, line: u32, column: u32) -> Self {
        self.source = Some(source.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// With stack traces
    #[inline]
    #[must_use]
    pub fn with_stack(mut self, stack: Option<String>, component_stack: Option<String>) -> Self {
        self.stack = stack;
        self.component_stack = component_stack;
        self
    }

    /// Whether automatic retry is pointless for this error
    #[inline]
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        self.classification.is_diagnostic()
    }
}

impl From<WireError> for ErrorInfo {
    /// Build flags win over render flags; anything unflagged is transient.
    fn from(wire: WireError) -> Self {
        let classification = if wire.is_build_error == Some(true) {
            ErrorClass::BuildError
        } else if wire.is_render_error == Some(true) {
            ErrorClass::RenderError
        } else {
            ErrorClass::TransientLoad
        };

        let message = if wire.message.is_empty() {
            wire.name.unwrap_or_else(|| "unknown error".to_string())
        } else {
            wire.message
        };

        Self {
            message,
            classification,
            source: wire.source,
            line: wire.line,
            column: wire.column,
            stack: wire.stack,
            component_stack: wire.component_stack,
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.classification, self.message)?;
        if let Some(source) = &self.source {
            write!(f, " ({source}")?;
            if let (Some(line), Some(column)) = (self.line, self.column) {
                write!(f, ":{line}:{column}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unflagged_wire_error_is_transient() {
        let info = ErrorInfo::from(WireError::new("fetch failed"));
        assert_eq!(info.classification, ErrorClass::TransientLoad);
        assert!(!info.is_diagnostic());
    }

    #[test]
    fn build_flag_wins_over_render_flag() {
        let wire = WireError {
            message: "unexpected token".to_string(),
            is_render_error: Some(true),
            is_build_error: Some(true),
            ..WireError::default()
        };
        let info = ErrorInfo::from(wire);
        assert_eq!(info.classification, ErrorClass::BuildError);
        assert!(info.is_diagnostic());
    }

    #[test]
    fn render_error_keeps_detail() {
        let wire = WireError {
            message: "Cannot read properties of undefined".to_string(),
            stack: Some("at render".to_string()),
            component_stack: Some("at Chart".to_string()),
            source: Some("blocks/chart.tsx".to_string()),
            line: Some(3),
            column: Some(9),
            is_render_error: Some(true),
            ..WireError::default()
        };
        let info = ErrorInfo::from(wire);
        assert_eq!(info.classification, ErrorClass::RenderError);
        assert_eq!(info.stack.as_deref(), Some("at render"));
        assert_eq!(info.component_stack.as_deref(), Some("at Chart"));
        assert_eq!(
            info.to_string(),
            "render-error: Cannot read properties of undefined (blocks/chart.tsx:3:9)"
        );
    }

    #[test]
    fn empty_message_falls_back_to_name() {
        let wire = WireError {
            name: Some("TypeError".to_string()),
            ..WireError::default()
        };
        assert_eq!(ErrorInfo::from(wire).message, "TypeError");
        assert_eq!(ErrorInfo::from(WireError::default()).message, "unknown error");
    }
}
