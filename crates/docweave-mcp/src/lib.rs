//! MCP server exposing the docweave document engine.
//!
//! Every tool is a thin caller into [`DocEngine`]: it resolves document ids,
//! converts parameters, and reports aggregate counts as JSON. Failures come
//! back as `Error: ...` text carrying the engine's error message, never as a
//! protocol error.
//!
//! ## Backends
//!
//! - **Memory**: in-process simulated documents, lost on exit
//! - **Google**: Docs REST API with a bearer token
//!
//! ## Module Structure
//!
//! - `config`: TOML configuration file
//! - `models`: Request types for MCP tools
//! - `helpers`: Parameter parsing

pub mod config;
mod helpers;
mod models;

use std::sync::Arc;

use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use serde_json::json;

use docweave_kernel::{CellEdit, CellImage, DocEngine, EngineConfig, MemoryDocs, WriteMode};

use crate::helpers::{document_id, error_text, parse_mode};
pub use crate::models::*;

/// MCP server over one [`DocEngine`].
#[derive(Clone)]
pub struct DocweaveMcp {
    engine: Arc<DocEngine>,
    tool_router: ToolRouter<Self>,
}

impl DocweaveMcp {
    pub fn new(engine: Arc<DocEngine>) -> Self {
        Self { engine, tool_router: Self::tool_router() }
    }

    /// Server over ephemeral in-memory documents.
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(Arc::new(DocEngine::new(Arc::new(MemoryDocs::new()), config)))
    }

    pub fn engine(&self) -> &Arc<DocEngine> {
        &self.engine
    }

    async fn write(&self, req: MarkdownWriteRequest, mode: WriteMode) -> String {
        let doc = document_id(&req.document);
        match self.engine.write_markdown(&doc, &req.markdown, mode).await {
            Ok(report) => json!({
                "success": true,
                "document_id": doc,
                "mode": mode,
                "operations": report.operations,
                "tables_filled": report.tables_filled,
                "passes": report.passes,
                "images": report.images,
            })
            .to_string(),
            Err(e) => error_text(&e),
        }
    }
}

#[tool_router]
impl DocweaveMcp {
    // ========================================================================
    // Document Tools
    // ========================================================================

    #[tool(description = "Create an empty document. Returns its id.")]
    async fn doc_create(&self, Parameters(req): Parameters<DocCreateRequest>) -> String {
        match self.engine.create_document(&req.title).await {
            Ok(doc) => json!({
                "success": true,
                "document_id": doc.document_id,
                "title": doc.title,
            })
            .to_string(),
            Err(e) => error_text(&e),
        }
    }

    #[tool(description = "Read a document as Markdown: headings, emphasis, links, lists, images and tables.")]
    async fn doc_read_markdown(&self, Parameters(req): Parameters<DocRefRequest>) -> String {
        let doc = document_id(&req.document);
        match self.engine.read_markdown(&doc).await {
            Ok(markdown) => markdown,
            Err(e) => error_text(&e),
        }
    }

    #[tool(description = "Replace the whole document body with formatted content written from Markdown. Tables are created natively and filled.")]
    async fn markdown_replace(&self, Parameters(req): Parameters<MarkdownWriteRequest>) -> String {
        self.write(req, WriteMode::Replace).await
    }

    #[tool(description = "Append formatted content written from Markdown after the document's existing content.")]
    async fn markdown_append(&self, Parameters(req): Parameters<MarkdownWriteRequest>) -> String {
        self.write(req, WriteMode::Append).await
    }

    #[tool(description = "Copy the formatted body of one document (text styles, headings, images, tables) into another. Mode: replace (default) or append.")]
    async fn document_copy(&self, Parameters(req): Parameters<DocumentCopyRequest>) -> String {
        let mode = match parse_mode(req.mode.as_deref()) {
            Ok(m) => m,
            Err(e) => return error_text(&e),
        };
        let (source, target) = (document_id(&req.source), document_id(&req.target));
        match self.engine.copy_document(&source, &target, mode).await {
            Ok(report) => json!({
                "success": true,
                "source": source,
                "target": target,
                "mode": mode,
                "operations": report.operations,
                "tables_filled": report.tables_filled,
                "images": report.images,
            })
            .to_string(),
            Err(e) => error_text(&e),
        }
    }

    // ========================================================================
    // Table Tools
    // ========================================================================

    #[tool(description = "Copy one formatted table, including cell styles and images, to the end of another document.")]
    async fn table_copy(&self, Parameters(req): Parameters<TableCopyRequest>) -> String {
        let (source, target) = (document_id(&req.source), document_id(&req.target));
        match self.engine.copy_table(&source, req.table_index, &target).await {
            Ok(report) => json!({
                "success": true,
                "source": source,
                "table_index": req.table_index,
                "target": target,
                "operations": report.operations,
                "tables_filled": report.tables_filled,
                "images": report.images,
            })
            .to_string(),
            Err(e) => error_text(&e),
        }
    }

    #[tool(description = "Replace the text of several table cells in one batch, optionally styled. Images already in a cell are kept.")]
    async fn table_cells_edit(&self, Parameters(req): Parameters<TableCellsEditRequest>) -> String {
        let doc = document_id(&req.document);
        let edits: Vec<CellEdit> = req.edits.into_iter().map(CellEdit::from).collect();
        match self.engine.edit_table_cells(&doc, req.table_index, &edits).await {
            Ok(report) => json!({ "success": true, "document_id": doc, "result": report }).to_string(),
            Err(e) => error_text(&e),
        }
    }

    #[tool(description = "Insert images at the start of table cells. All images go in one batch that succeeds or fails as a whole.")]
    async fn table_images_insert(&self, Parameters(req): Parameters<TableImagesInsertRequest>) -> String {
        let doc = document_id(&req.document);
        let images: Vec<CellImage> = req.images.into_iter().map(CellImage::from).collect();
        match self.engine.insert_table_images(&doc, req.table_index, &images).await {
            Ok(report) => json!({ "success": true, "document_id": doc, "result": report }).to_string(),
            Err(e) => error_text(&e),
        }
    }

    #[tool(description = "Insert an empty row above or below a reference row of a table.")]
    async fn table_row_insert(&self, Parameters(req): Parameters<TableRowInsertRequest>) -> String {
        let doc = document_id(&req.document);
        match self
            .engine
            .insert_table_row(&doc, req.table_index, req.row_index, req.insert_below)
            .await
        {
            Ok(report) => json!({
                "success": true,
                "document_id": doc,
                "table_index": req.table_index,
                "row_index": req.row_index,
                "insert_below": req.insert_below,
                "result": report,
            })
            .to_string(),
            Err(e) => error_text(&e),
        }
    }

    // ========================================================================
    // Snapshot Tools
    // ========================================================================

    #[tool(description = "Record the document's current content as an undo checkpoint. Clears redo history.")]
    async fn snapshot_create(&self, Parameters(req): Parameters<SnapshotCreateRequest>) -> String {
        let doc = document_id(&req.document);
        match self.engine.create_snapshot(&doc, req.label.as_deref()).await {
            Ok(snapshot) => json!({ "success": true, "document_id": doc, "snapshot": snapshot }).to_string(),
            Err(e) => error_text(&e),
        }
    }

    #[tool(description = "Restore the most recent checkpoint. The current content becomes redoable. Native list formatting is not restored.")]
    async fn snapshot_undo(&self, Parameters(req): Parameters<DocRefRequest>) -> String {
        let doc = document_id(&req.document);
        match self.engine.undo(&doc).await {
            Ok(report) => json!({ "success": true, "document_id": doc, "result": report }).to_string(),
            Err(e) => error_text(&e),
        }
    }

    #[tool(description = "Re-apply the most recently undone state.")]
    async fn snapshot_redo(&self, Parameters(req): Parameters<DocRefRequest>) -> String {
        let doc = document_id(&req.document);
        match self.engine.redo(&doc).await {
            Ok(report) => json!({ "success": true, "document_id": doc, "result": report }).to_string(),
            Err(e) => error_text(&e),
        }
    }

    #[tool(description = "List undo and redo checkpoints for a document, oldest first.")]
    async fn snapshot_list(&self, Parameters(req): Parameters<DocRefRequest>) -> String {
        let doc = document_id(&req.document);
        let snapshots = self.engine.list_snapshots(&doc);
        json!({
            "document_id": doc,
            "snapshots": snapshots,
            "count": snapshots.len(),
        })
        .to_string()
    }
}

#[tool_handler]
impl ServerHandler for DocweaveMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_instructions("Docweave document engine. Write Markdown into documents, copy formatted documents and tables, edit table cells, and undo/redo via snapshots. Tables are addressed by 0-based index in document order.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(result: &str) -> serde_json::Value {
        serde_json::from_str(result).unwrap_or_else(|e| panic!("not JSON ({e}): {result}"))
    }

    async fn create(mcp: &DocweaveMcp) -> String {
        let result = mcp
            .doc_create(Parameters(DocCreateRequest { title: "test".into() }))
            .await;
        parse(&result)["document_id"].as_str().unwrap().to_string()
    }

    fn write_req(document: &str, markdown: &str) -> Parameters<MarkdownWriteRequest> {
        Parameters(MarkdownWriteRequest { document: document.into(), markdown: markdown.into() })
    }

    #[tokio::test]
    async fn test_write_and_read_markdown() {
        let mcp = DocweaveMcp::in_memory(EngineConfig::default());
        let id = create(&mcp).await;

        let result = mcp.markdown_replace(write_req(&id, "# Hello\n\nSome *text*")).await;
        let parsed = parse(&result);
        assert_eq!(parsed["success"], true);
        assert_eq!(parsed["mode"], "replace");

        mcp.markdown_append(write_req(&id, "More")).await;
        let md = mcp.doc_read_markdown(Parameters(DocRefRequest { document: id.clone() })).await;
        assert_eq!(md, "# Hello\n\nSome *text*\n\nMore\n");
    }

    #[tokio::test]
    async fn test_url_is_accepted_as_document() {
        let mcp = DocweaveMcp::in_memory(EngineConfig::default());
        let id = create(&mcp).await;
        let url = format!("https://docs.google.com/document/d/{id}/edit");
        let result = mcp.markdown_replace(write_req(&url, "via url")).await;
        assert_eq!(parse(&result)["document_id"], id.as_str());
    }

    #[tokio::test]
    async fn test_table_tools() {
        let mcp = DocweaveMcp::in_memory(EngineConfig::default());
        let id = create(&mcp).await;
        mcp.markdown_replace(write_req(&id, "| a | b |\n|---|---|\n| c | d |")).await;

        let result = mcp
            .table_cells_edit(Parameters(TableCellsEditRequest {
                document: id.clone(),
                table_index: 0,
                edits: vec![CellEditParam {
                    row: 1,
                    col: 0,
                    text: "styled".into(),
                    style: Some(StyleParam { bold: Some(true), ..StyleParam::default() }),
                }],
            }))
            .await;
        assert_eq!(parse(&result)["result"]["cells"], 1);

        let result = mcp
            .table_row_insert(Parameters(TableRowInsertRequest {
                document: id.clone(),
                table_index: 0,
                row_index: 9,
                insert_below: true,
            }))
            .await;
        assert!(result.starts_with("Error: row 9 is out of range"), "{result}");

        let markdown = mcp.doc_read_markdown(Parameters(DocRefRequest { document: id.clone() })).await;
        assert!(markdown.contains("| **styled** |"), "{markdown}");
    }

    #[tokio::test]
    async fn test_copy_tools() {
        let mcp = DocweaveMcp::in_memory(EngineConfig::default());
        let src = create(&mcp).await;
        let dst = create(&mcp).await;
        mcp.markdown_replace(write_req(&src, "Intro\n\n| x |\n|---|\n| y |")).await;

        let result = mcp
            .table_copy(Parameters(TableCopyRequest { source: src.clone(), table_index: 0, target: dst.clone() }))
            .await;
        assert_eq!(parse(&result)["tables_filled"], 1);

        let result = mcp
            .document_copy(Parameters(DocumentCopyRequest {
                source: src.clone(),
                target: dst.clone(),
                mode: Some("sideways".into()),
            }))
            .await;
        assert!(result.starts_with("Error: invalid parameters"), "{result}");

        let result = mcp
            .document_copy(Parameters(DocumentCopyRequest { source: src.clone(), target: dst.clone(), mode: None }))
            .await;
        assert_eq!(parse(&result)["success"], true);
        let a = mcp.doc_read_markdown(Parameters(DocRefRequest { document: src })).await;
        let b = mcp.doc_read_markdown(Parameters(DocRefRequest { document: dst })).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_snapshot_tools() {
        let mcp = DocweaveMcp::in_memory(EngineConfig::default());
        let id = create(&mcp).await;
        let doc = || Parameters(DocRefRequest { document: id.clone() });

        let result = mcp.snapshot_undo(doc()).await;
        assert!(result.starts_with("Error: nothing to undo"), "{result}");

        mcp.markdown_replace(write_req(&id, "kept")).await;
        let result = mcp
            .snapshot_create(Parameters(SnapshotCreateRequest { document: id.clone(), label: Some("good".into()) }))
            .await;
        assert_eq!(parse(&result)["snapshot"]["label"], "good");
        mcp.markdown_replace(write_req(&id, "mistake")).await;

        let result = parse(&mcp.snapshot_undo(doc()).await);
        assert_eq!(result["result"]["restored"]["label"], "good");
        assert_eq!(mcp.doc_read_markdown(doc()).await, "kept\n");

        let listed = parse(&mcp.snapshot_list(doc()).await);
        assert_eq!(listed["count"], 1);
        assert_eq!(listed["snapshots"][0]["stack"], "redo");

        mcp.snapshot_redo(doc()).await;
        assert_eq!(mcp.doc_read_markdown(doc()).await, "mistake\n");
    }

    #[test]
    fn test_server_info_enables_tools() {
        let mcp = DocweaveMcp::in_memory(EngineConfig::default());
        assert!(mcp.get_info().capabilities.tools.is_some());
    }
}
