//! Channel-keyed message bus
//!
//! One host-wide listener receives every message posted by every pooled
//! frame. The bus resolves the sender's [`ChannelId`] to the frame it belongs
//! to in O(1) and decodes the payload into a typed [`InboundMessage`].

use crate::channel::ChannelId;
use crate::error::ProtocolError;
use crate::message::InboundMessage;
use std::collections::HashMap;

/// Raw message as delivered by the host, tagged with the sending channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub channel: ChannelId,
    pub payload: String,
}

impl Envelope {
    #[inline]
    #[must_use]
    pub fn new(channel: ChannelId, payload: impl Into<String>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }
}

/// Decoded message resolved to its registered target
#[derive(Debug, Clone, PartialEq)]
pub struct Routed<'a, K> {
    pub channel: ChannelId,
    pub target: &'a K,
    pub message: InboundMessage,
}

/// Route table from channels to their owners
#[derive(Debug, Clone)]
pub struct MessageBus<K> {
    routes: HashMap<ChannelId, K>,
}

impl<K> MessageBus<K> {
    /// Create empty bus
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Register a channel, replacing any previous target
    pub fn register(&mut self, channel: ChannelId, target: K) -> Option<K> {
        self.routes.insert(channel, target)
    }

    /// Forget a channel; later messages from it are rejected
    pub fn unregister(&mut self, channel: ChannelId) -> Option<K> {
        self.routes.remove(&channel)
    }

    /// Target registered for a channel
    #[inline]
    #[must_use]
    pub fn target(&self, channel: ChannelId) -> Option<&K> {
        self.routes.get(&channel)
    }

    /// Whether a channel is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, channel: ChannelId) -> bool {
        self.routes.contains_key(&channel)
    }

    /// Number of registered channels
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if bus is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Validate the sender and decode the payload
    ///
    /// The sender is checked before the payload is parsed, so garbage from an
    /// unknown frame reports `UnknownChannel` rather than `Malformed`.
    ///
    /// # Errors
    /// - `ProtocolError::UnknownChannel` if the channel is not registered
    /// - any decode error from [`InboundMessage::decode`]
    pub fn route(&self, envelope: &Envelope) -> Result<Routed<'_, K>, ProtocolError> {
        let target = self
            .routes
            .get(&envelope.channel)
            .ok_or(ProtocolError::UnknownChannel(envelope.channel))?;
        let message = InboundMessage::decode(&envelope.payload)?;

        Ok(Routed {
            channel: envelope.channel,
            target,
            message,
        })
    }
}

impl<K> Default for MessageBus<K> {
    fn default() -> Self {
        Self::new()
    }
}
