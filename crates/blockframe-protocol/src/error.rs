//! Protocol errors

use crate::channel::ChannelId;

/// Errors raised while decoding or routing wire messages
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Payload is not valid JSON or names an unknown message type
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Height is negative, NaN or infinite
    #[error("invalid height: {0}")]
    InvalidHeight(f64),

    /// Sender is not a frame known to the bus
    #[error("message from unknown channel {0}")]
    UnknownChannel(ChannelId),
}

impl ProtocolError {
    /// Whether the envelope came from a frame the bus does not track
    #[inline]
    #[must_use]
    pub fn is_unknown_sender(&self) -> bool {
        matches!(self, Self::UnknownChannel(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display() {
        let err = ProtocolError::InvalidHeight(-1.0);
        assert!(err.to_string().contains("invalid height"));

        let err = ProtocolError::UnknownChannel(ChannelId::new(7));
        assert!(err.to_string().contains("ch-7"));
        assert!(err.is_unknown_sender());
    }
}
