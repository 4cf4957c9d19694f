//! Testing utilities for Blockframe workspace
//!
//! Shared fixtures: a runtime wired to recording collaborators, block
//! builders and frame message payloads.

#![allow(missing_docs)]

use blockframe_core::{
    BlockIdentity, EmbedConfig, EmbedRuntime, LifecycleState, RecordingDocument, RecordingFixer,
    StaticTheme,
};
use blockframe_pool::{MemoryHost, Millis, MountId, PlaceholderId, Src};
use blockframe_protocol::{ChannelId, Envelope};
use parking_lot::RwLock;
use serde_json::json;
use std::sync::Arc;

pub fn src(raw: &str) -> Src {
    Src::new(raw).unwrap()
}

pub fn block(raw: &str) -> BlockIdentity {
    BlockIdentity::new(src(raw))
}

pub fn light_theme() -> StaticTheme {
    StaticTheme::new()
        .with_variable("--background", "oklch(1 0 0)")
        .with_variable("--foreground", "oklch(0.145 0 0)")
        .with_variable("--radius", "0.625rem")
}

pub fn ready_payload(height: f64) -> String {
    json!({ "type": "ready", "height": height }).to_string()
}

pub fn resize_payload(height: f64) -> String {
    json!({ "type": "resize", "height": height }).to_string()
}

pub fn render_error_payload(message: &str) -> String {
    json!({
        "type": "error",
        "error": {
            "message": message,
            "name": "TypeError",
            "stack": "TypeError: at Chart (App.tsx:12:4)",
            "componentStack": "in Chart\n in App",
            "source": "App.tsx",
            "line": 12,
            "column": 4,
            "isRenderError": true
        }
    })
    .to_string()
}

pub fn load_error_payload(message: &str) -> String {
    json!({ "type": "error", "error": { "message": message } }).to_string()
}

/// Runtime over a [`MemoryHost`] with recording collaborators
pub struct Harness {
    pub runtime: EmbedRuntime<MemoryHost>,
    pub document: RecordingDocument,
    pub fixer: RecordingFixer,
    pub theme: Arc<RwLock<StaticTheme>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EmbedConfig::default())
    }

    pub fn with_config(config: EmbedConfig) -> Self {
        let document = RecordingDocument::new();
        let fixer = RecordingFixer::new();
        let theme = Arc::new(RwLock::new(light_theme()));
        let runtime = EmbedRuntime::new(MemoryHost::new(), config)
            .with_theme_source(Arc::clone(&theme))
            .with_document(document.clone())
            .with_fixer(fixer.clone());
        Self {
            runtime,
            document,
            fixer,
            theme,
        }
    }

    pub fn mount(&mut self, raw_src: &str, placeholder: u64, at: u64) -> MountId {
        self.runtime
            .mount(block(raw_src), PlaceholderId(placeholder), Millis::new(at))
            .unwrap()
    }

    pub fn channel(&self, mount: MountId) -> ChannelId {
        self.runtime
            .channel_of(mount)
            .expect("mount owns no frame")
    }

    /// Deliver `payload` from the frame `mount` owns
    pub fn send(&mut self, mount: MountId, payload: &str, at: u64) {
        let envelope = Envelope::new(self.channel(mount), payload);
        self.runtime.deliver(&envelope, Millis::new(at)).unwrap();
    }

    pub fn load_error(&mut self, mount: MountId, at: u64) {
        let channel = self.channel(mount);
        self.runtime
            .native_load_error(channel, "net::ERR_CONNECTION_REFUSED", Millis::new(at))
            .unwrap();
    }

    /// Fire every timer due up to `at`, each at its own instant
    pub fn run_until(&mut self, at: u64) {
        while let Some(wakeup) = self.runtime.next_wakeup() {
            if wakeup.as_u64() > at {
                break;
            }
            self.runtime.advance(wakeup);
        }
        self.runtime.advance(Millis::new(at));
    }

    pub fn state(&self, mount: MountId) -> &LifecycleState {
        self.runtime.state(mount).expect("unknown mount")
    }

    pub fn host(&self) -> &MemoryHost {
        self.runtime.pool().host()
    }

    pub fn set_dark(&self, dark: bool) {
        self.theme.write().set_dark(dark);
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
