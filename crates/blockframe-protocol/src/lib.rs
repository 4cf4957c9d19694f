//! Blockframe Protocol - wire contract between host and sandboxed block content
//!
//! Defines:
//! - Content → host messages (`ready`, `resize`, `error`)
//! - Host → content messages (`theme`, `grab-activate`, `grab-deactivate`)
//! - Error classification (transient load vs. render/build diagnostics)
//! - A channel-keyed message bus that demultiplexes many pooled frames
//!
//! # Example
//!
//! ```rust
//! use blockframe_protocol::{ChannelId, Envelope, InboundMessage, MessageBus};
//!
//! let mut bus = MessageBus::new();
//! bus.register(ChannelId::new(1), "sales-chart");
//!
//! let routed = bus
//!     .route(&Envelope::new(ChannelId::new(1), r#"{"type":"ready","height":240}"#))
//!     .unwrap();
//! assert_eq!(*routed.target, "sales-chart");
//! assert_eq!(routed.message, InboundMessage::Ready { height: 240.0 });
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod bus;
pub mod channel;
pub mod error;
pub mod error_info;
pub mod message;

pub use bus::{Envelope, MessageBus, Routed};
pub use channel::ChannelId;
pub use error::ProtocolError;
pub use error_info::{ErrorClass, ErrorInfo};
pub use message::{InboundMessage, OutboundMessage, WireError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
