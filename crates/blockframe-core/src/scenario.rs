//! Timed scenario replay over a headless host
//!
//! A scenario is a JSON list of steps stamped with the millisecond at which
//! they happen. Between steps every timer that comes due is fired at its own
//! instant, so a replay reproduces exactly what a live surface would see.

use crate::collab::{BlockIdentity, RecordingDocument, RecordingFixer, RepairRequest};
use crate::config::EmbedConfig;
use crate::lifecycle::{Phase, Presentation};
use crate::runtime::{EmbedRuntime, HostEvent};
use crate::theme::StaticTheme;
use blockframe_pool::{HostOp, MemoryHost, Millis, MountId, PlaceholderId, PoolError, PoolStats, Src};
use blockframe_protocol::{Envelope, ErrorInfo};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Scenario file contents
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub theme: StaticTheme,
    pub steps: Vec<TimedStep>,
    /// Keep firing timers until this instant after the last step
    #[serde(default)]
    pub until: Option<u64>,
}

impl Scenario {
    /// Parse a scenario from JSON
    ///
    /// # Errors
    /// `ScenarioError::Parse` for invalid JSON or unknown steps.
    pub fn from_json(raw: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimedStep {
    pub at: u64,
    #[serde(flatten)]
    pub step: Step,
}

/// One scripted host event; mounts are referred to by label
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Mount {
        mount: String,
        placeholder: u64,
        #[serde(default)]
        src: Option<String>,
        #[serde(default)]
        height: Option<f64>,
        #[serde(default)]
        prompt: Option<String>,
    },
    /// Block finished generating
    Specify { mount: String, src: String },
    Unmount { mount: String },
    /// Frame owned by `mount` posts `payload`
    Message {
        mount: String,
        payload: serde_json::Value,
    },
    LoadError { mount: String, message: String },
    BuildError { src: String, message: String },
    Theme {
        dark: bool,
        #[serde(default)]
        variables: BTreeMap<String, String>,
    },
    Retry { mount: String },
    Escalate { mount: String },
    Grab { mount: String, active: bool },
    ClearCache,
    /// Only fire timers
    Advance,
}

/// Scenario failures
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("step at {at}ms refers to unknown mount {label:?}")]
    UnknownLabel { at: u64, label: String },

    #[error("step at {at}ms: {source}")]
    InvalidSrc {
        at: u64,
        #[source]
        source: PoolError,
    },

    #[error("steps out of order: {at}ms after {previous}ms")]
    OutOfOrder { at: u64, previous: u64 },
}

/// Phase change observed during replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub at: u64,
    pub mount: String,
    pub phase: Phase,
    pub presentation: Presentation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// Step the runtime refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub at: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeightWrite {
    pub src: Src,
    pub height: f64,
}

/// Outcome of a replay
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub timeline: Vec<TimelineEntry>,
    pub rejected: Vec<Rejection>,
    pub host_ops: Vec<HostOp>,
    pub stats: PoolStats,
    pub theme_pushes: u64,
    pub height_writes: Vec<HeightWrite>,
    pub fix_requests: Vec<RepairRequest>,
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "timeline:")?;
        for entry in &self.timeline {
            write!(f, "  {:>7}ms  {:<12} {:<8} {:?}", entry.at, entry.mount, entry.phase, entry.presentation)?;
            if let Some(height) = entry.height {
                write!(f, " height={height}")?;
            }
            writeln!(f)?;
        }
        if !self.rejected.is_empty() {
            writeln!(f, "rejected:")?;
            for rejection in &self.rejected {
                writeln!(f, "  {:>7}ms  {}", rejection.at, rejection.reason)?;
            }
        }
        writeln!(f, "host operations: {}", self.host_ops.len())?;
        writeln!(
            f,
            "frames: created={} reused={} reloads={} soft_ready={} active={} parked={}",
            self.stats.total_created,
            self.stats.total_reused,
            self.stats.reloads,
            self.stats.soft_ready_count,
            self.stats.active_count,
            self.stats.parked_count
        )?;
        writeln!(f, "theme pushes: {}", self.theme_pushes)?;
        writeln!(f, "height writes: {}", self.height_writes.len())?;
        write!(f, "fix requests: {}", self.fix_requests.len())
    }
}

struct Replay {
    runtime: EmbedRuntime<MemoryHost>,
    theme: Arc<RwLock<StaticTheme>>,
    labels: IndexMap<String, MountId>,
    last_seen: IndexMap<String, Phase>,
    timeline: Vec<TimelineEntry>,
    rejected: Vec<Rejection>,
}

/// Run `scenario` against a fresh runtime over a [`MemoryHost`]
///
/// Steps the runtime rejects are reported, not fatal.
///
/// # Errors
/// Unknown mount labels, invalid `src` values or unordered steps.
pub fn replay(scenario: &Scenario, config: EmbedConfig) -> Result<ReplayReport, ScenarioError> {
    let document = RecordingDocument::new();
    let fixer = RecordingFixer::new();
    let theme = Arc::new(RwLock::new(scenario.theme.clone()));
    let runtime = EmbedRuntime::new(MemoryHost::new(), config)
        .with_theme_source(Arc::clone(&theme))
        .with_document(document.clone())
        .with_fixer(fixer.clone());

    let mut session = Replay {
        runtime,
        theme,
        labels: IndexMap::new(),
        last_seen: IndexMap::new(),
        timeline: Vec::new(),
        rejected: Vec::new(),
    };

    let mut previous = 0;
    for TimedStep { at, step } in &scenario.steps {
        if *at < previous {
            return Err(ScenarioError::OutOfOrder { at: *at, previous });
        }
        previous = *at;
        session.fire_until(*at);
        session.step(*at, step)?;
        session.observe(*at);
    }
    if let Some(until) = scenario.until {
        session.fire_until(until.max(previous));
    }

    let runtime = session.runtime;
    Ok(ReplayReport {
        timeline: session.timeline,
        rejected: session.rejected,
        host_ops: runtime.pool().host().ops().to_vec(),
        stats: runtime.pool().stats(),
        theme_pushes: runtime.theme_pushes(),
        height_writes: document
            .writes()
            .into_iter()
            .map(|(src, height)| HeightWrite { src, height })
            .collect(),
        fix_requests: fixer.requests(),
    })
}

impl Replay {
    /// Fire every timer due up to `at`, each at its own instant
    fn fire_until(&mut self, at: u64) {
        while let Some(wakeup) = self.runtime.next_wakeup() {
            if wakeup.as_u64() > at {
                break;
            }
            self.runtime.advance(wakeup);
            self.observe(wakeup.as_u64());
        }
        self.runtime.advance(Millis::new(at));
    }

    fn step(&mut self, at: u64, step: &Step) -> Result<(), ScenarioError> {
        let now = Millis::new(at);
        let event = match step {
            Step::Mount {
                mount,
                placeholder,
                src,
                height,
                prompt,
            } => {
                let id = MountId::new();
                self.labels.insert(mount.clone(), id);
                let mut block = match src {
                    Some(src) => BlockIdentity::new(parse_src(at, src)?),
                    None => BlockIdentity::pending(prompt.clone().unwrap_or_default()),
                };
                block.height = *height;
                HostEvent::Mount {
                    mount: id,
                    block,
                    placeholder: PlaceholderId(*placeholder),
                }
            }
            Step::Specify { mount, src } => HostEvent::UpdateBlock {
                mount: self.label(at, mount)?,
                block: BlockIdentity::new(parse_src(at, src)?),
            },
            Step::Unmount { mount } => {
                let id = self.label(at, mount)?;
                self.last_seen.shift_remove(mount);
                HostEvent::Unmount { mount: id }
            }
            Step::Message { mount, payload } => {
                let id = self.label(at, mount)?;
                let Some(channel) = self.runtime.channel_of(id) else {
                    self.reject(at, format!("{mount} owns no frame"));
                    return Ok(());
                };
                HostEvent::Message(Envelope::new(channel, payload.to_string()))
            }
            Step::LoadError { mount, message } => {
                let id = self.label(at, mount)?;
                let Some(channel) = self.runtime.channel_of(id) else {
                    self.reject(at, format!("{mount} owns no frame"));
                    return Ok(());
                };
                HostEvent::LoadError {
                    channel,
                    message: message.clone(),
                }
            }
            Step::BuildError { src, message } => HostEvent::BuildError {
                src: parse_src(at, src)?,
                error: ErrorInfo::build_error(message.clone()),
            },
            Step::Theme { dark, variables } => {
                {
                    let mut theme = self.theme.write();
                    theme.set_dark(*dark);
                    for (name, value) in variables {
                        theme.set(name.clone(), value.clone());
                    }
                }
                HostEvent::ThemeMutated
            }
            Step::Retry { mount } => HostEvent::ManualRetry {
                mount: self.label(at, mount)?,
            },
            Step::Escalate { mount } => HostEvent::EscalateFix {
                mount: self.label(at, mount)?,
            },
            Step::Grab { mount, active } => HostEvent::Grab {
                mount: self.label(at, mount)?,
                active: *active,
            },
            Step::ClearCache => HostEvent::ClearCache,
            Step::Advance => return Ok(()),
        };

        if let Err(err) = self.runtime.dispatch(event, now) {
            self.reject(at, err.to_string());
        }
        Ok(())
    }

    /// Record phase changes since the last observation
    fn observe(&mut self, at: u64) {
        for (label, id) in &self.labels {
            let Some(state) = self.runtime.state(*id) else {
                continue;
            };
            if self.last_seen.get(label) == Some(&state.phase) {
                continue;
            }
            self.last_seen.insert(label.clone(), state.phase);
            self.timeline.push(TimelineEntry {
                at,
                mount: label.clone(),
                phase: state.phase,
                presentation: state.presentation(),
                height: state.height,
            });
        }
    }

    fn label(&self, at: u64, label: &str) -> Result<MountId, ScenarioError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownLabel {
                at,
                label: label.to_string(),
            })
    }

    fn reject(&mut self, at: u64, reason: String) {
        tracing::debug!(at, %reason, "scenario step rejected");
        self.rejected.push(Rejection { at, reason });
    }
}

fn parse_src(at: u64, raw: &str) -> Result<Src, ScenarioError> {
    Src::new(raw).map_err(|source| ScenarioError::InvalidSrc { at, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOFT_READY: &str = r#"{
        "steps": [
            { "at": 0, "step": "mount", "mount": "chart", "src": "sales-chart", "placeholder": 1 }
        ],
        "until": 6000
    }"#;

    #[test]
    fn silent_frame_turns_soft_ready_at_deadline() {
        let scenario = Scenario::from_json(SOFT_READY).unwrap();
        let report = replay(&scenario, EmbedConfig::default()).unwrap();

        let phases: Vec<(u64, Phase)> = report.timeline.iter().map(|e| (e.at, e.phase)).collect();
        assert_eq!(phases, vec![(0, Phase::Loading), (5_000, Phase::Ready)]);
        assert_eq!(report.timeline[1].height, Some(100.0));
        assert_eq!(report.theme_pushes, 1);
        assert_eq!(report.stats.soft_ready_count, 1);
    }

    #[test]
    fn unknown_label_is_fatal() {
        let scenario = Scenario::from_json(
            r#"{ "steps": [ { "at": 0, "step": "unmount", "mount": "ghost" } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            replay(&scenario, EmbedConfig::default()),
            Err(ScenarioError::UnknownLabel { .. })
        ));
    }

    #[test]
    fn rejected_actions_are_reported() {
        let scenario = Scenario::from_json(
            r#"{ "steps": [
                { "at": 0, "step": "mount", "mount": "a", "src": "report-a", "placeholder": 1 },
                { "at": 10, "step": "retry", "mount": "a" }
            ] }"#,
        )
        .unwrap();
        let report = replay(&scenario, EmbedConfig::default()).unwrap();
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].at, 10);
    }

    #[test]
    fn unordered_steps_are_rejected() {
        let scenario = Scenario::from_json(
            r#"{ "steps": [
                { "at": 10, "step": "advance" },
                { "at": 5, "step": "advance" }
            ] }"#,
        )
        .unwrap();
        assert!(matches!(
            replay(&scenario, EmbedConfig::default()),
            Err(ScenarioError::OutOfOrder { at: 5, previous: 10 })
        ));
    }
}
