//! Block lifecycle state machine
//!
//! A pure transition function: `(state, event) -> (state, effects)`. The
//! runtime owns timers, frames and persistence and carries out the returned
//! [`Effect`]s; nothing here reads a clock or touches the pool.
//!
//! ```text
//! editing ──source──▶ loading ──ready──▶ ready
//!                      │  ▲               │
//!                error │  │ retry timer   │ error
//!                      ▼  │               ▼
//!                     (auto retry)  ──▶ error ──manual retry──▶ loading
//! ```

use crate::error::LifecycleError;
use crate::retry::RetryPolicy;
use blockframe_protocol::ErrorInfo;
use serde::{Deserialize, Serialize};

/// Lifecycle phase of one mounted block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Block has no content source yet
    Editing,
    Loading,
    Error,
    Ready,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Editing => "editing",
            Self::Loading => "loading",
            Self::Error => "error",
            Self::Ready => "ready",
        })
    }
}

/// Phases reachable from `from`
#[must_use]
pub fn allowed_transitions(from: Phase) -> &'static [Phase] {
    use Phase::{Editing, Error, Loading, Ready};
    match from {
        Editing => &[Loading],
        Loading => &[Ready, Error],
        Ready => &[Loading, Error],
        Error => &[Loading],
    }
}

/// Validates a phase change; staying in place is always allowed
///
/// # Errors
/// `LifecycleError::IllegalTransition` when `to` is not reachable from `from`.
pub fn validate_transition(from: Phase, to: Phase) -> Result<(), LifecycleError> {
    if from == to || allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(LifecycleError::IllegalTransition { from, to })
    }
}

/// Everything the controller knows about one block instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleState {
    pub phase: Phase,
    /// Automatic attempts consumed since the last success or manual retry
    pub retry_count: u32,
    /// An automatic retry cycle is in progress
    pub is_auto_retrying: bool,
    /// A retry timer is armed
    pub retry_pending: bool,
    /// Content has been shown at least once for this mount
    pub has_loaded_once: bool,
    /// Last known content height
    pub height: Option<f64>,
    /// Readiness came from the deadline
    pub soft_ready: bool,
    /// Error shown to the user, or the last transient failure while retrying
    pub error: Option<ErrorInfo>,
}

impl LifecycleState {
    /// Fresh state in the editing phase
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Editing,
            retry_count: 0,
            is_auto_retrying: false,
            retry_pending: false,
            has_loaded_once: false,
            height: None,
            soft_ready: false,
            error: None,
        }
    }

    /// With a known height from persistence or the warm cache
    #[must_use]
    pub fn with_height(mut self, height: Option<f64>) -> Self {
        self.height = height;
        self
    }

    /// What the host surface should render for this state
    #[must_use]
    pub fn presentation(&self) -> Presentation {
        match self.phase {
            Phase::Editing => Presentation::Editing,
            Phase::Loading if self.has_loaded_once => Presentation::CornerIndicator,
            Phase::Loading => Presentation::Skeleton,
            Phase::Error => Presentation::ErrorPanel {
                can_fix: self.error.as_ref().is_some_and(ErrorInfo::is_diagnostic),
            },
            Phase::Ready => Presentation::Content,
        }
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// The block now has a content source
    SourceAvailable,
    /// Frame reported ready (or was promoted by its deadline)
    Ready { height: f64, soft: bool },
    /// Content height changed
    Resized { height: f64 },
    /// Frame, content or build failed
    Failed(ErrorInfo),
    /// The armed retry timer fired
    RetryTimerFired,
    /// User pressed retry
    ManualRetry,
    /// User asked for an automated fix
    EscalateFix,
}

/// Work the runtime performs after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Acquire a frame from the pool
    Acquire,
    /// Arm the retry timer
    ScheduleRetry { attempt: u32, delay_ms: u64 },
    /// Disarm the retry timer
    CancelRetry,
    /// Load the frame again without destroying it
    Reattempt,
    /// Destroy the frame and build a fresh one
    Reload,
    /// Persist a height (debounced by the runtime)
    CommitHeight(f64),
    /// Hand a diagnostic error to the fix requester
    RequestFix(ErrorInfo),
}

/// Result of [`transition`]
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: LifecycleState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(state: &LifecycleState) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
        }
    }
}

/// Apply `event` to `state`
///
/// Frame signals that do not apply to the current phase are dropped; user
/// actions that do not apply are rejected.
///
/// # Errors
/// - `LifecycleError::RetryUnavailable` for a manual retry outside `Error`
/// - `LifecycleError::NotDiagnostic` for a fix request without a render or
///   build error
pub fn transition(
    state: &LifecycleState,
    event: LifecycleEvent,
    policy: &RetryPolicy,
) -> Result<Transition, LifecycleError> {
    let mut next = state.clone();
    let mut effects = Vec::new();

    match (state.phase, event) {
        (Phase::Editing, LifecycleEvent::SourceAvailable) => {
            next.phase = Phase::Loading;
            effects.push(Effect::Acquire);
        }

        (Phase::Loading | Phase::Ready, LifecycleEvent::Ready { height, soft }) => {
            if state.retry_pending {
                effects.push(Effect::CancelRetry);
            }
            next.phase = Phase::Ready;
            next.retry_count = 0;
            next.is_auto_retrying = false;
            next.retry_pending = false;
            next.has_loaded_once = true;
            next.soft_ready = soft;
            next.error = None;
            next.height = Some(height);
            // A soft height is a placeholder and must not overwrite a real one.
            if !soft {
                effects.push(Effect::CommitHeight(height));
            }
        }

        (Phase::Loading | Phase::Ready, LifecycleEvent::Resized { height }) => {
            next.height = Some(height);
            effects.push(Effect::CommitHeight(height));
        }

        (Phase::Loading | Phase::Ready, LifecycleEvent::Failed(info)) if info.is_diagnostic() => {
            if state.retry_pending {
                effects.push(Effect::CancelRetry);
            }
            next.phase = Phase::Error;
            next.is_auto_retrying = false;
            next.retry_pending = false;
            next.error = Some(info);
        }

        (Phase::Loading | Phase::Ready, LifecycleEvent::Failed(_)) if state.retry_pending => {
            // The armed timer already covers this failure.
        }

        (Phase::Loading | Phase::Ready, LifecycleEvent::Failed(info)) => {
            if policy.allows(state.retry_count) {
                let attempt = state.retry_count + 1;
                next.phase = Phase::Loading;
                next.retry_count = attempt;
                next.is_auto_retrying = true;
                next.retry_pending = true;
                next.error = Some(info);
                effects.push(Effect::ScheduleRetry {
                    attempt,
                    delay_ms: policy.delay_for(attempt),
                });
            } else {
                next.phase = Phase::Error;
                next.is_auto_retrying = false;
                next.error = Some(info);
            }
        }

        (Phase::Error, LifecycleEvent::Failed(info)) if info.is_diagnostic() => {
            next.error = Some(info);
        }

        (Phase::Loading, LifecycleEvent::RetryTimerFired) if state.retry_pending => {
            next.retry_pending = false;
            effects.push(Effect::Reattempt);
        }

        (Phase::Error, LifecycleEvent::ManualRetry) => {
            next.phase = Phase::Loading;
            next.retry_count = 0;
            next.is_auto_retrying = false;
            next.retry_pending = false;
            next.soft_ready = false;
            next.error = None;
            effects.push(Effect::Reload);
        }

        (phase, LifecycleEvent::ManualRetry) => {
            return Err(LifecycleError::RetryUnavailable(phase));
        }

        (Phase::Error, LifecycleEvent::EscalateFix) => match &state.error {
            Some(info) if info.is_diagnostic() => effects.push(Effect::RequestFix(info.clone())),
            _ => return Err(LifecycleError::NotDiagnostic),
        },

        (_, LifecycleEvent::EscalateFix) => return Err(LifecycleError::NotDiagnostic),

        (phase, event) => {
            tracing::trace!(%phase, ?event, "event does not apply");
            return Ok(Transition::unchanged(state));
        }
    }

    validate_transition(state.phase, next.phase)?;
    Ok(Transition {
        state: next,
        effects,
    })
}

/// What the host surface renders for a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Presentation {
    /// Prompt editor, no frame
    Editing,
    /// Full placeholder; content never shown yet
    Skeleton,
    /// Content stays visible with a small loading badge
    CornerIndicator,
    /// Error panel; `can_fix` offers the automated fix action
    ErrorPanel { can_fix: bool },
    Content,
}
