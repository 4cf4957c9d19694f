//! Blockframe Core - lifecycle control for pooled block frames
//!
//! Layers a per-mount lifecycle over [`blockframe_pool`]:
//! - A pure state machine (`editing`, `loading`, `error`, `ready`) with
//!   automatic backoff for transient failures
//! - Theme pushes on first ready and after debounced theme changes
//! - Debounced height persistence into the document model
//! - Escalation of render and build errors to an automated fix agent
//!
//! All time is passed in explicitly; [`driver::run`] supplies it from tokio.
//!
//! # Example
//!
//! ```rust
//! use blockframe_core::{BlockIdentity, EmbedConfig, EmbedRuntime, Presentation};
//! use blockframe_pool::{MemoryHost, Millis, PlaceholderId, Src};
//!
//! let mut runtime = EmbedRuntime::new(MemoryHost::new(), EmbedConfig::default());
//! let block = BlockIdentity::new(Src::new("sales-chart").unwrap());
//! let mount = runtime.mount(block, PlaceholderId(1), Millis::ZERO).unwrap();
//! assert_eq!(runtime.presentation(mount), Some(Presentation::Skeleton));
//!
//! // No ready message before the deadline: the frame is shown anyway.
//! runtime.advance(Millis::new(5_000));
//! assert_eq!(runtime.presentation(mount), Some(Presentation::Content));
//! assert_eq!(runtime.theme_pushes(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod collab;
pub mod config;
pub mod debounce;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod mount;
pub mod portal;
pub mod retry;
pub mod runtime;
pub mod scenario;
pub mod theme;
pub mod timer;

pub use collab::{
    BlockIdentity, Discard, DocumentSink, FixRequester, RecordingDocument, RecordingFixer,
    RepairRequest,
};
pub use config::{EmbedConfig, PersistenceConfig, DEFAULT_HEIGHT_DEBOUNCE_MS};
pub use error::{ConfigError, EmbedError, LifecycleError, Result};
pub use lifecycle::{
    allowed_transitions, transition, validate_transition, Effect, LifecycleEvent, LifecycleState,
    Phase, Presentation, Transition,
};
pub use logging::{LogFormat, LoggingConfig};
pub use mount::MountAdapter;
pub use portal::{LayoutProbe, Placement, PortalLayer, Rect};
pub use retry::RetryPolicy;
pub use runtime::{EmbedRuntime, HostEvent};
pub use theme::{StaticTheme, ThemeConfig, ThemeSnapshot, ThemeSource, ThemeSynchronizer};
pub use timer::{TimerId, TimerQueue};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
