//! Theme synchronization into block frames
//!
//! Only a fixed list of named variables is read from the host theme, so a
//! snapshot costs the same whatever the size of the host stylesheet. Pushes
//! happen on a frame's first ready and, debounced, after the host's theme
//! attribute changes.

use crate::debounce::Debouncer;
use blockframe_pool::Millis;
use blockframe_protocol::OutboundMessage;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Design tokens forwarded to block content
pub const DEFAULT_THEME_VARIABLES: &[&str] = &[
    "--background",
    "--foreground",
    "--card",
    "--card-foreground",
    "--popover",
    "--popover-foreground",
    "--primary",
    "--primary-foreground",
    "--secondary",
    "--secondary-foreground",
    "--muted",
    "--muted-foreground",
    "--accent",
    "--accent-foreground",
    "--destructive",
    "--border",
    "--input",
    "--ring",
    "--chart-1",
    "--chart-2",
    "--chart-3",
    "--chart-4",
    "--chart-5",
    "--radius",
];

/// Debounce applied to theme attribute mutations
pub const DEFAULT_THEME_DEBOUNCE_MS: u64 = 50;

/// Where the host's current theme is read from
pub trait ThemeSource {
    /// Computed value of one variable, `None` if unset
    fn variable(&self, name: &str) -> Option<String>;

    /// Whether the dark theme is active
    fn is_dark(&self) -> bool;
}

/// Theme held in memory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticTheme {
    pub variables: BTreeMap<String, String>,
    pub dark: bool,
}

impl StaticTheme {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a variable set
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// With dark mode
    #[must_use]
    pub fn with_dark(mut self, dark: bool) -> Self {
        self.dark = dark;
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn set_dark(&mut self, dark: bool) {
        self.dark = dark;
    }
}

impl ThemeSource for StaticTheme {
    fn variable(&self, name: &str) -> Option<String> {
        self.variables.get(name).cloned()
    }

    fn is_dark(&self) -> bool {
        self.dark
    }
}

impl<T: ThemeSource> ThemeSource for Arc<RwLock<T>> {
    fn variable(&self, name: &str) -> Option<String> {
        self.read().variable(name)
    }

    fn is_dark(&self) -> bool {
        self.read().is_dark()
    }
}

/// Theme captured at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeSnapshot {
    /// `--name: value;` declarations in variable-list order
    pub css: String,
    pub is_dark: bool,
}

impl From<ThemeSnapshot> for OutboundMessage {
    fn from(snapshot: ThemeSnapshot) -> Self {
        Self::Theme {
            css: snapshot.css,
            is_dark: snapshot.is_dark,
        }
    }
}

/// Theme synchronizer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub debounce_ms: u64,
    pub variables: Vec<String>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_THEME_DEBOUNCE_MS,
            variables: DEFAULT_THEME_VARIABLES.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Snapshots the host theme and debounces attribute mutations
#[derive(Debug)]
pub struct ThemeSynchronizer {
    variables: Vec<String>,
    mutation: Debouncer<()>,
}

impl ThemeSynchronizer {
    #[must_use]
    pub fn new(config: &ThemeConfig) -> Self {
        Self {
            variables: config.variables.clone(),
            mutation: Debouncer::new(config.debounce_ms),
        }
    }

    /// Read the configured variables from `source`
    #[must_use]
    pub fn snapshot(&self, source: &dyn ThemeSource) -> ThemeSnapshot {
        let mut css = String::new();
        for name in &self.variables {
            if let Some(value) = source.variable(name) {
                if !css.is_empty() {
                    css.push(' ');
                }
                css.push_str(name);
                css.push_str(": ");
                css.push_str(value.trim());
                css.push(';');
            }
        }
        ThemeSnapshot {
            css,
            is_dark: source.is_dark(),
        }
    }

    /// Theme message for the current state of `source`
    #[must_use]
    pub fn message(&self, source: &dyn ThemeSource) -> OutboundMessage {
        self.snapshot(source).into()
    }

    /// The host's theme attribute changed
    pub fn attribute_mutated(&mut self, now: Millis) {
        self.mutation.push((), now);
    }

    /// Whether a debounced re-push is due at `now`
    pub fn poll(&mut self, now: Millis) -> bool {
        self.mutation.poll(now).is_some()
    }

    /// When the pending re-push becomes due
    #[must_use]
    pub fn due(&self) -> Option<Millis> {
        self.mutation.due()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synchronizer() -> ThemeSynchronizer {
        ThemeSynchronizer::new(&ThemeConfig::default())
    }

    #[test]
    fn snapshot_reads_only_known_variables() {
        let theme = StaticTheme::new()
            .with_variable("--background", "#ffffff")
            .with_variable("--radius", " 0.5rem ")
            .with_variable("--sidebar-width", "16rem");

        let snapshot = synchronizer().snapshot(&theme);
        assert_eq!(snapshot.css, "--background: #ffffff; --radius: 0.5rem;");
        assert!(!snapshot.is_dark);
    }

    #[test]
    fn shared_theme_reflects_updates() {
        let shared = Arc::new(RwLock::new(StaticTheme::new()));
        let sync = synchronizer();
        assert!(!sync.snapshot(&shared).is_dark);

        shared.write().set_dark(true);
        assert!(matches!(
            sync.message(&shared),
            OutboundMessage::Theme { is_dark: true, .. }
        ));
    }

    #[test]
    fn mutations_within_window_coalesce() {
        let mut sync = synchronizer();
        sync.attribute_mutated(Millis::new(0));
        sync.attribute_mutated(Millis::new(30));

        assert!(!sync.poll(Millis::new(50)));
        assert_eq!(sync.due(), Some(Millis::new(80)));
        assert!(sync.poll(Millis::new(80)));
        assert!(!sync.poll(Millis::new(200)));
    }
}
