//! Wire contract tests
//!
//! Anchors the JSON shapes block content emits and accepts, and the bus
//! guarantee that one listener serves many frames without cross-talk.

use blockframe_protocol::{
    ChannelId, Envelope, ErrorClass, ErrorInfo, InboundMessage, MessageBus, ProtocolError,
};
use proptest::prelude::*;

#[test]
fn content_error_payload_classifies_as_render_error() {
    let mut bus = MessageBus::new();
    bus.register(ChannelId::new(4), "sales-chart");

    let envelope = Envelope::new(
        ChannelId::new(4),
        r#"{"type":"error","error":{"message":"boom","name":"TypeError","stack":"at x","isRenderError":true}}"#,
    );
    let routed = bus.route(&envelope).unwrap();

    let InboundMessage::Error { error } = routed.message else {
        panic!("expected error");
    };
    let info = ErrorInfo::from(error);
    assert_eq!(info.classification, ErrorClass::RenderError);
    assert_eq!(info.stack.as_deref(), Some("at x"));
}

#[test]
fn many_frames_share_one_bus_without_cross_talk() {
    let mut bus = MessageBus::new();
    for raw in 1..=50_u64 {
        bus.register(ChannelId::new(raw), format!("block-{raw}"));
    }

    for raw in 1..=50_u64 {
        let envelope = Envelope::new(
            ChannelId::new(raw),
            format!(r#"{{"type":"resize","height":{raw}}}"#),
        );
        let routed = bus.route(&envelope).unwrap();
        assert_eq!(routed.target, &format!("block-{raw}"));
        #[allow(clippy::cast_precision_loss)]
        let expected = raw as f64;
        assert_eq!(routed.message, InboundMessage::Resize { height: expected });
    }
}

proptest! {
    #[test]
    fn prop_valid_heights_are_accepted(height in 0.0_f64..1.0e7) {
        let raw = serde_json::json!({ "type": "ready", "height": height }).to_string();
        let decoded = InboundMessage::decode(&raw).unwrap();
        prop_assert_eq!(decoded, InboundMessage::Ready { height });
    }

    #[test]
    fn prop_negative_heights_are_rejected(height in -1.0e7_f64..-0.001) {
        let raw = serde_json::json!({ "type": "resize", "height": height }).to_string();
        let is_invalid_height = matches!(
            InboundMessage::decode(&raw),
            Err(ProtocolError::InvalidHeight(_))
        );
        prop_assert!(is_invalid_height);
    }
}
