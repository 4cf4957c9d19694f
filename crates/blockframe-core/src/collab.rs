//! Collaborators outside the embedding core
//!
//! The document model supplies block identity and receives height writes;
//! the fix agent receives repair requests. Both are reached through traits so
//! the runtime never depends on either implementation.

use blockframe_pool::Src;
use blockframe_protocol::{ErrorClass, ErrorInfo};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A block as stored in the document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockIdentity {
    /// Content identifier; absent while the block is still being generated
    pub src: Option<Src>,
    /// Persisted content height
    pub height: Option<f64>,
    /// Tables the block reads from; carried through, never interpreted
    #[serde(default)]
    pub linked_tables: Vec<String>,
    #[serde(default)]
    pub editing: bool,
    pub prompt: Option<String>,
}

impl BlockIdentity {
    /// Block with content ready to load
    #[must_use]
    pub fn new(src: Src) -> Self {
        Self {
            src: Some(src),
            ..Self::default()
        }
    }

    /// Block still being written from `prompt`
    #[must_use]
    pub fn pending(prompt: impl Into<String>) -> Self {
        Self {
            editing: true,
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    #[must_use]
    pub fn with_linked_tables(mut self, tables: Vec<String>) -> Self {
        self.linked_tables = tables;
        self
    }

    /// Whether the block can leave the editing phase
    #[inline]
    #[must_use]
    pub fn is_specified(&self) -> bool {
        !self.editing && self.src.is_some()
    }
}

/// Receives debounced height writes for the document model
pub trait DocumentSink {
    fn commit_height(&mut self, src: &Src, height: f64);
}

/// Structured repair request for the automated fix agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairRequest {
    pub src: Src,
    pub message: String,
    pub classification: ErrorClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_stack: Option<String>,
}

impl RepairRequest {
    #[must_use]
    pub fn new(src: Src, error: &ErrorInfo) -> Self {
        Self {
            src,
            message: error.message.clone(),
            classification: error.classification,
            source: error.source.clone(),
            line: error.line,
            column: error.column,
            stack: error.stack.clone(),
            component_stack: error.component_stack.clone(),
        }
    }
}

/// Opens a fix session for a diagnostic error; fire-and-forget
pub trait FixRequester {
    fn request_fix(&mut self, request: RepairRequest);
}

/// Collaborator that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl DocumentSink for Discard {
    fn commit_height(&mut self, _src: &Src, _height: f64) {}
}

impl FixRequester for Discard {
    fn request_fix(&mut self, _request: RepairRequest) {}
}

/// Document sink that keeps every write; clones share the log
#[derive(Debug, Clone, Default)]
pub struct RecordingDocument {
    writes: Arc<Mutex<Vec<(Src, f64)>>>,
}

impl RecordingDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn writes(&self) -> Vec<(Src, f64)> {
        self.writes.lock().clone()
    }

    /// Last height written for `src`
    #[must_use]
    pub fn height_of(&self, src: &Src) -> Option<f64> {
        self.writes
            .lock()
            .iter()
            .rev()
            .find(|(s, _)| s == src)
            .map(|(_, h)| *h)
    }
}

impl DocumentSink for RecordingDocument {
    fn commit_height(&mut self, src: &Src, height: f64) {
        self.writes.lock().push((src.clone(), height));
    }
}

/// Fix requester that keeps every request; clones share the log
#[derive(Debug, Clone, Default)]
pub struct RecordingFixer {
    requests: Arc<Mutex<Vec<RepairRequest>>>,
}

impl RecordingFixer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RepairRequest> {
        self.requests.lock().clone()
    }
}

impl FixRequester for RecordingFixer {
    fn request_fix(&mut self, request: RepairRequest) {
        self.requests.lock().push(request);
    }
}
