//! Blockframe Pool - frames that outlive the document tree mounting them
//!
//! The document surface may tear down and rebuild the element hosting a
//! block on nearly every edit. This crate keeps each block's sandboxed frame
//! alive across that churn:
//! - Frames are keyed by a stable content identifier ([`Src`])
//! - Mounts borrow frames; releasing parks them instead of destroying them
//! - Only an explicit reload, eviction or cache clear ends a frame
//! - A readiness deadline turns silent frames into soft-ready ones
//!
//! # Example
//!
//! ```rust
//! use blockframe_pool::{FramePool, MemoryHost, Millis, MountHandle, MountId, PlaceholderId, PoolConfig, Src};
//!
//! let mut pool = FramePool::new(MemoryHost::new(), PoolConfig::default());
//! let src = Src::new("report-a").unwrap();
//!
//! let (handle, _signals) = MountHandle::new(MountId::new(), PlaceholderId(1));
//! let mount = handle.mount;
//! let first = pool.acquire(&src, handle, Millis::ZERO);
//! assert!(!first.reused);
//!
//! pool.release(&src, mount).unwrap();
//!
//! let (handle, _signals) = MountHandle::new(MountId::new(), PlaceholderId(2));
//! let second = pool.acquire(&src, handle, Millis::new(16));
//! assert!(second.reused);
//! assert_eq!(pool.host().fetch_count(&src), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod host;
pub mod memory_host;
pub mod pool;
pub mod record;
pub mod resolver;
pub mod types;

pub use config::{PoolConfig, DEFAULT_FRAME_HEIGHT, DEFAULT_READY_DEADLINE_MS};
pub use error::{HostError, PoolError};
pub use host::{FrameHost, FrameSpec, NodeId};
pub use memory_host::{HostOp, MemoryHost, MemoryNode};
pub use pool::{Acquisition, FramePool, PoolStats, ReadyTransition};
pub use record::{FrameRecord, MountHandle, MountSignal};
pub use resolver::SrcResolver;
pub use types::{Millis, MountId, PlaceholderId, Src};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
