//! Per-document undo/redo checkpoints.
//!
//! A snapshot is a deep copy of a document's body and inline-object table.
//! Each document has a bounded undo stack and an unbounded redo stack; a new
//! snapshot truncates redo history. Restoring is re-authoring: the body is
//! cleared and the snapshot's content groups are replayed through the normal
//! write pipeline (see [`crate::pipeline::Pipeline::replay_groups`]).
//!
//! State is process-local and not persisted.

use std::collections::{HashMap, VecDeque};

use dashmap::DashMap;
use serde::Serialize;
use strum::{Display, IntoStaticStr};

use docweave_types::{DocError, Document, InlineObject, Result, SnapshotId, StructuralElement, now_millis};

use crate::copy::{ContentGroup, extract_groups};

/// Default undo depth per document.
pub const DEFAULT_MAX_SNAPSHOTS: usize = 10;

/// A captured document state.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: SnapshotId,
    pub document_id: String,
    pub timestamp_ms: u64,
    pub label: String,
    pub body: Vec<StructuralElement>,
    pub inline_objects: HashMap<String, InlineObject>,
}

impl DocumentSnapshot {
    pub fn capture(doc: &Document, label: impl Into<String>) -> Self {
        Self {
            id: SnapshotId::new(),
            document_id: doc.document_id.clone(),
            timestamp_ms: now_millis(),
            label: label.into(),
            body: doc.body.clone(),
            inline_objects: doc.inline_objects.clone(),
        }
    }

    /// Replayable content groups.
    pub fn groups(&self) -> Vec<ContentGroup> {
        extract_groups(&self.body, &self.inline_objects)
    }
}

/// Which stack an entry sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HistoryStack {
    Undo,
    Redo,
}

/// A listing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub id: String,
    pub label: String,
    pub timestamp_ms: u64,
    pub stack: HistoryStack,
}

impl SnapshotSummary {
    fn of(snapshot: &DocumentSnapshot, stack: HistoryStack) -> Self {
        Self {
            id: snapshot.id.to_string(),
            label: snapshot.label.clone(),
            timestamp_ms: snapshot.timestamp_ms,
            stack,
        }
    }
}

#[derive(Debug, Default)]
struct History {
    /// Oldest first.
    undo: VecDeque<DocumentSnapshot>,
    /// Most recent last.
    redo: Vec<DocumentSnapshot>,
}

/// Undo/redo stacks for every document, keyed by document id.
#[derive(Debug)]
pub struct SnapshotStore {
    histories: DashMap<String, History>,
    max_snapshots: usize,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SNAPSHOTS)
    }
}

impl SnapshotStore {
    pub fn new(max_snapshots: usize) -> Self {
        Self { histories: DashMap::new(), max_snapshots: max_snapshots.max(1) }
    }

    /// Record a new checkpoint: clears redo, evicts the oldest beyond capacity.
    pub fn push(&self, snapshot: DocumentSnapshot) -> SnapshotId {
        let id = snapshot.id;
        let mut history = self.histories.entry(snapshot.document_id.clone()).or_default();
        history.redo.clear();
        push_bounded(&mut history.undo, snapshot, self.max_snapshots);
        id
    }

    /// The entry an undo (or redo) would restore, left in place.
    pub fn latest(&self, document_id: &str, stack: HistoryStack) -> Result<DocumentSnapshot> {
        let history = self.histories.get(document_id);
        let target = history.as_deref().and_then(|h| match stack {
            HistoryStack::Undo => h.undo.back(),
            HistoryStack::Redo => h.redo.last(),
        });
        target.cloned().ok_or_else(|| empty(stack, document_id))
    }

    /// Move the latest undo entry off the stack once it has been restored,
    /// recording `current` for redo.
    pub fn commit_undo(&self, current: DocumentSnapshot) {
        let mut history = self.histories.entry(current.document_id.clone()).or_default();
        history.undo.pop_back();
        history.redo.push(current);
    }

    /// Move the latest redo entry off the stack once it has been restored,
    /// recording `current` for undo.
    pub fn commit_redo(&self, current: DocumentSnapshot) {
        let mut history = self.histories.entry(current.document_id.clone()).or_default();
        history.redo.pop();
        push_bounded(&mut history.undo, current, self.max_snapshots);
    }

    /// Undo entries oldest→newest, then redo entries.
    pub fn list(&self, document_id: &str) -> Vec<SnapshotSummary> {
        self.histories
            .get(document_id)
            .map(|history| {
                history
                    .undo
                    .iter()
                    .map(|s| SnapshotSummary::of(s, HistoryStack::Undo))
                    .chain(history.redo.iter().map(|s| SnapshotSummary::of(s, HistoryStack::Redo)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `(undo, redo)` depths.
    pub fn depth(&self, document_id: &str) -> (usize, usize) {
        self.histories
            .get(document_id)
            .map(|h| (h.undo.len(), h.redo.len()))
            .unwrap_or((0, 0))
    }
}

fn push_bounded(stack: &mut VecDeque<DocumentSnapshot>, snapshot: DocumentSnapshot, max: usize) {
    stack.push_back(snapshot);
    while stack.len() > max {
        if let Some(evicted) = stack.pop_front() {
            tracing::debug!(doc = %evicted.document_id, id = %evicted.id.short(), "evicted oldest snapshot");
        }
    }
}

fn empty(stack: HistoryStack, document_id: &str) -> DocError {
    DocError::EmptyHistory { stack: stack.into(), document_id: document_id.to_string() }
}
