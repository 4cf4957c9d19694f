//! Wire messages exchanged between the host and block content
//!
//! Every message is a JSON object tagged by `type`. Content → host messages
//! are [`InboundMessage`]; host → content messages are [`OutboundMessage`].

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};

/// Messages posted by block content to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundMessage {
    /// Initial layout settled
    Ready { height: f64 },
    /// Measured content height changed
    Resize { height: f64 },
    /// Uncaught failure inside the content
    Error { error: WireError },
}

impl InboundMessage {
    /// Decode and validate a raw JSON payload
    ///
    /// # Errors
    /// - `ProtocolError::Malformed` for invalid JSON or an unknown `type`
    /// - `ProtocolError::InvalidHeight` for negative or non-finite heights
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let message: Self = serde_json::from_str(raw)?;
        message.validate()
    }

    /// Decode from an already-parsed JSON value
    ///
    /// # Errors
    /// Same as [`InboundMessage::decode`].
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProtocolError> {
        let message: Self = serde_json::from_value(value)?;
        message.validate()
    }

    /// Message kind as it appears on the wire
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::Resize { .. } => "resize",
            Self::Error { .. } => "error",
        }
    }

    fn validate(self) -> Result<Self, ProtocolError> {
        match self {
            Self::Ready { height } | Self::Resize { height }
                if !height.is_finite() || height < 0.0 =>
            {
                Err(ProtocolError::InvalidHeight(height))
            }
            other => Ok(other),
        }
    }
}

/// Error payload as reported by block content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireError {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_render_error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_build_error: Option<bool>,
}

impl WireError {
    /// Create a bare error with only a message
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Messages posted by the host to block content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundMessage {
    /// Theme variables to apply at the content's root scope
    Theme {
        css: String,
        #[serde(rename = "isDark")]
        is_dark: bool,
    },
    /// Enter cross-frame drag-select mode
    GrabActivate,
    /// Leave drag-select mode
    GrabDeactivate,
}

impl OutboundMessage {
    /// Serialize to the JSON payload posted to the frame
    ///
    /// # Errors
    /// `ProtocolError::Malformed` if serialization fails.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Grab message for the requested mode
    #[inline]
    #[must_use]
    pub fn grab(active: bool) -> Self {
        if active {
            Self::GrabActivate
        } else {
            Self::GrabDeactivate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_ready_and_resize() {
        assert_eq!(
            InboundMessage::decode(r#"{"type":"ready","height":320}"#).unwrap(),
            InboundMessage::Ready { height: 320.0 }
        );
        assert_eq!(
            InboundMessage::decode(r#"{"type":"resize","height":12.5}"#).unwrap(),
            InboundMessage::Resize { height: 12.5 }
        );
    }

    #[test]
    fn decode_error_with_camel_case_fields() {
        let raw = r#"{
            "type": "error",
            "error": {
                "message": "x is not defined",
                "componentStack": "at Chart",
                "blockId": "sales-chart",
                "isRenderError": true,
                "line": 12,
                "column": 4
            }
        }"#;

        let InboundMessage::Error { error } = InboundMessage::decode(raw).unwrap() else {
            panic!("expected error message");
        };
        assert_eq!(error.message, "x is not defined");
        assert_eq!(error.component_stack.as_deref(), Some("at Chart"));
        assert_eq!(error.block_id.as_deref(), Some("sales-chart"));
        assert_eq!(error.is_render_error, Some(true));
        assert_eq!(error.line, Some(12));
        assert_eq!(error.column, Some(4));
        assert_eq!(error.is_build_error, None);
    }

    #[test]
    fn decode_error_without_message() {
        let msg = InboundMessage::decode(r#"{"type":"error","error":{}}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::Error {
                error: WireError::default()
            }
        );
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let err = InboundMessage::decode(r#"{"type":"explode"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn decode_rejects_bad_height() {
        let err = InboundMessage::decode(r#"{"type":"resize","height":-4}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidHeight(h) if h == -4.0));
    }

    #[test]
    fn from_value_validates() {
        let value = serde_json::json!({ "type": "ready", "height": 80 });
        assert_eq!(
            InboundMessage::from_value(value).unwrap(),
            InboundMessage::Ready { height: 80.0 }
        );
    }

    #[test]
    fn encode_outbound_wire_shape() {
        let theme = OutboundMessage::Theme {
            css: "--background: #fff;".to_string(),
            is_dark: false,
        };
        let json: serde_json::Value = serde_json::from_str(&theme.encode().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "theme", "css": "--background: #fff;", "isDark": false })
        );

        assert_eq!(
            OutboundMessage::grab(true).encode().unwrap(),
            r#"{"type":"grab-activate"}"#
        );
        assert_eq!(
            OutboundMessage::grab(false).encode().unwrap(),
            r#"{"type":"grab-deactivate"}"#
        );
    }

    #[test]
    fn kind_matches_wire_tag() {
        assert_eq!(InboundMessage::Ready { height: 1.0 }.kind(), "ready");
        assert_eq!(InboundMessage::Resize { height: 1.0 }.kind(), "resize");
        assert_eq!(
            InboundMessage::Error {
                error: WireError::new("x")
            }
            .kind(),
            "error"
        );
    }
}
