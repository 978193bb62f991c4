//! The engine facade: one entry point per document operation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use docweave_types::{Document, Result};

use crate::api::DocsApi;
use crate::batch::{BatchConfig, execute_chunked};
use crate::copy::{ContentGroup, extract_groups, table_model};
use crate::pipeline::{Pipeline, WriteReport};
use crate::render::render_markdown;
use crate::snapshot::{
    DEFAULT_MAX_SNAPSHOTS, DocumentSnapshot, HistoryStack, SnapshotStore, SnapshotSummary,
};
use crate::table::{CellEdit, CellImage, build_cell_edits, build_cell_images, insert_row_request};

/// Engine limits.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub batch: BatchConfig,
    /// Maximum Markdown passes (one per table) in a single write.
    pub max_table_chain: usize,
    /// Undo depth per document.
    pub max_snapshots: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            max_table_chain: 10,
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
        }
    }
}

/// Whether a write replaces the body or goes after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum WriteMode {
    #[default]
    Replace,
    Append,
}

/// Result of a direct table edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableEditReport {
    pub table_index: usize,
    pub cells: usize,
    pub operations: usize,
}

/// Result of an undo or redo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreReport {
    pub restored: SnapshotSummary,
    #[serde(flatten)]
    pub write: WriteReport,
}

/// Document operations over one [`DocsApi`] backend.
///
/// Holds the process-wide snapshot history, so build one per process and
/// share it.
pub struct DocEngine {
    api: Arc<dyn DocsApi>,
    config: EngineConfig,
    snapshots: SnapshotStore,
}

impl DocEngine {
    pub fn new(api: Arc<dyn DocsApi>, config: EngineConfig) -> Self {
        let snapshots = SnapshotStore::new(config.max_snapshots);
        Self { api, config, snapshots }
    }

    pub fn api(&self) -> &Arc<dyn DocsApi> {
        &self.api
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn pipeline<'a>(&'a self, document_id: &'a str) -> Pipeline<'a> {
        Pipeline::new(self.api.as_ref(), document_id, &self.config.batch)
    }

    pub async fn create_document(&self, title: &str) -> Result<Document> {
        let doc = self.api.create_document(title).await?;
        tracing::info!(doc = %doc.document_id, title, "document created");
        Ok(doc)
    }

    /// Write Markdown, replacing the body or appending to it.
    pub async fn write_markdown(&self, document_id: &str, markdown: &str, mode: WriteMode) -> Result<WriteReport> {
        let pipeline = self.pipeline(document_id);
        let cleared = match mode {
            WriteMode::Replace => pipeline.clear_body().await?,
            WriteMode::Append => 0,
        };
        let mut report = pipeline.write_markdown(markdown, self.config.max_table_chain).await?;
        report.operations += cleared;
        Ok(report)
    }

    /// Copy the formatted body of `source` into `target`.
    pub async fn copy_document(&self, source_id: &str, target_id: &str, mode: WriteMode) -> Result<WriteReport> {
        let source = self.api.get_document(source_id).await?;
        let groups = extract_groups(&source.body, &source.inline_objects);
        tracing::debug!(src = %source_id, dst = %target_id, groups = groups.len(), %mode, "copying document");

        let pipeline = self.pipeline(target_id);
        let cleared = match mode {
            WriteMode::Replace => pipeline.clear_body().await?,
            WriteMode::Append => 0,
        };
        let mut report = pipeline.replay_groups(&groups).await?;
        report.operations += cleared;
        Ok(report)
    }

    /// Append a copy of one table of `source` to `target`.
    pub async fn copy_table(&self, source_id: &str, table_index: usize, target_id: &str) -> Result<WriteReport> {
        let source = self.api.get_document(source_id).await?;
        let table = source.table(table_index)?;
        let model = table_model(table.table, &source.inline_objects);
        self.pipeline(target_id)
            .replay_groups(&[ContentGroup::Table(model)])
            .await
    }

    /// Replace the text of several cells in one descending-ordered batch.
    pub async fn edit_table_cells(
        &self,
        document_id: &str,
        table_index: usize,
        edits: &[CellEdit],
    ) -> Result<TableEditReport> {
        let doc = self.api.get_document(document_id).await?;
        let table = doc.table(table_index)?;
        let requests = build_cell_edits(table.table, edits)?;
        let operations = execute_chunked(self.api.as_ref(), document_id, &requests, &self.config.batch).await?;
        tracing::info!(doc = %document_id, table_index, cells = edits.len(), operations, "table cells edited");
        Ok(TableEditReport { table_index, cells: edits.len(), operations })
    }

    /// Insert images at the start of cells, as one batch that succeeds or
    /// fails as a unit.
    pub async fn insert_table_images(
        &self,
        document_id: &str,
        table_index: usize,
        images: &[CellImage],
    ) -> Result<TableEditReport> {
        let doc = self.api.get_document(document_id).await?;
        let table = doc.table(table_index)?;
        let requests = build_cell_images(table.table, images)?;
        self.api.batch_update(document_id, &requests).await?;
        tracing::info!(doc = %document_id, table_index, images = requests.len(), "table images inserted");
        Ok(TableEditReport { table_index, cells: images.len(), operations: requests.len() })
    }

    pub async fn insert_table_row(
        &self,
        document_id: &str,
        table_index: usize,
        row_index: usize,
        insert_below: bool,
    ) -> Result<TableEditReport> {
        let doc = self.api.get_document(document_id).await?;
        let table = doc.table(table_index)?;
        let request = insert_row_request(&table, row_index, insert_below)?;
        self.api.batch_update(document_id, std::slice::from_ref(&request)).await?;
        Ok(TableEditReport { table_index, cells: table.table.columns, operations: 1 })
    }

    pub async fn read_markdown(&self, document_id: &str) -> Result<String> {
        let doc = self.api.get_document(document_id).await?;
        Ok(render_markdown(&doc))
    }

    /// Capture the live document as a new undo checkpoint.
    pub async fn create_snapshot(&self, document_id: &str, label: Option<&str>) -> Result<SnapshotSummary> {
        let doc = self.api.get_document(document_id).await?;
        let label = label.map(str::to_string).unwrap_or_else(|| "snapshot".to_string());
        let snapshot = DocumentSnapshot::capture(&doc, label);
        let summary = SnapshotSummary {
            id: snapshot.id.to_string(),
            label: snapshot.label.clone(),
            timestamp_ms: snapshot.timestamp_ms,
            stack: HistoryStack::Undo,
        };
        self.snapshots.push(snapshot);
        tracing::info!(doc = %document_id, id = %summary.id, label = %summary.label, "snapshot created");
        Ok(summary)
    }

    /// Restore the latest checkpoint; the live state becomes redoable.
    ///
    /// The stacks only change once the restore has gone through.
    pub async fn undo(&self, document_id: &str) -> Result<RestoreReport> {
        let doc = self.api.get_document(document_id).await?;
        let target = self.snapshots.latest(document_id, HistoryStack::Undo)?;
        let current = DocumentSnapshot::capture(&doc, "before undo");
        let report = self.restore(document_id, target, HistoryStack::Undo).await?;
        self.snapshots.commit_undo(current);
        Ok(report)
    }

    /// Re-apply the latest undone state; the live state becomes undoable.
    pub async fn redo(&self, document_id: &str) -> Result<RestoreReport> {
        let doc = self.api.get_document(document_id).await?;
        let target = self.snapshots.latest(document_id, HistoryStack::Redo)?;
        let current = DocumentSnapshot::capture(&doc, "before redo");
        let report = self.restore(document_id, target, HistoryStack::Redo).await?;
        self.snapshots.commit_redo(current);
        Ok(report)
    }

    pub fn list_snapshots(&self, document_id: &str) -> Vec<SnapshotSummary> {
        self.snapshots.list(document_id)
    }

    async fn restore(
        &self,
        document_id: &str,
        snapshot: DocumentSnapshot,
        from: HistoryStack,
    ) -> Result<RestoreReport> {
        let pipeline = self.pipeline(document_id);
        let cleared = pipeline.clear_body().await?;
        let mut write = pipeline.replay_groups(&snapshot.groups()).await?;
        write.operations += cleared;
        tracing::info!(
            doc = %document_id,
            id = %snapshot.id.short(),
            %from,
            operations = write.operations,
            "snapshot restored"
        );
        Ok(RestoreReport {
            restored: SnapshotSummary {
                id: snapshot.id.to_string(),
                label: snapshot.label,
                timestamp_ms: snapshot.timestamp_ms,
                stack: from,
            },
            write,
        })
    }
}
