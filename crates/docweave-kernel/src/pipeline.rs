//! Multi-phase write pipeline.
//!
//! A Markdown write runs as a queue of passes. Each pass:
//!
//! - **A**: prepare the insertion point, parse the chunk, execute text,
//!   styles, bullets and the table skeleton as one planned batch, then place
//!   the pass's images.
//! - **B**: if a table was inserted, re-read, locate it by ordinal, fill its
//!   cells, place cell images, bold the header row and reset the paragraph
//!   after it.
//! - **C**: queue whatever Markdown followed the table.
//!
//! Document replay (copy and restore) reuses the same insertion point and
//! table fill with groups extracted from a live document instead of parsed
//! Markdown.
//!
//! Every phase starts from a fresh read; the only offsets carried across a
//! batch are the ones that batch planned itself.

use std::collections::VecDeque;

use docweave_types::{DocError, NamedStyle, Request, Result, TableModel};
use serde::Serialize;

use crate::api::DocsApi;
use crate::batch::{BatchConfig, ImageReport, execute_chunked, insert_images};
use crate::builder::{build_markdown_batch, build_paragraph_batch};
use crate::copy::ContentGroup;
use crate::markdown::parse_markdown;
use crate::table::{bold_row_requests, fill_image_placements, fill_table_requests};

/// Aggregate counts for one write.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriteReport {
    /// Requests sent, image insertions included.
    pub operations: usize,
    pub tables_filled: usize,
    pub passes: usize,
    pub images: ImageReport,
}

impl WriteReport {
    fn absorb_images(&mut self, images: ImageReport) {
        self.operations += images.inserted;
        self.images.merge(images);
    }
}

/// Where a pass inserts, and how many tables precede that point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionPoint {
    pub index: usize,
    pub tables_before: usize,
}

/// Runs the phases against one document.
pub struct Pipeline<'a> {
    api: &'a dyn DocsApi,
    document_id: &'a str,
    batch: &'a BatchConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(api: &'a dyn DocsApi, document_id: &'a str, batch: &'a BatchConfig) -> Self {
        Self { api, document_id, batch }
    }

    async fn execute(&self, requests: &[Request], report: &mut WriteReport) -> Result<()> {
        report.operations += execute_chunked(self.api, self.document_id, requests, self.batch).await?;
        Ok(())
    }

    /// Delete everything but the body's final newline. No-op when already
    /// minimal. Returns the number of requests sent.
    pub async fn clear_body(&self) -> Result<usize> {
        let doc = self.api.get_document(self.document_id).await?;
        let end = doc.end_index();
        if end <= 2 {
            return Ok(0);
        }
        let request = Request::DeleteRange { start: 1, end: end - 1 };
        self.api.batch_update(self.document_id, std::slice::from_ref(&request)).await?;
        tracing::debug!(doc = %self.document_id, end, "cleared body");
        Ok(1)
    }

    /// Make the trailing paragraph empty and plain, and return its start.
    ///
    /// A trailing paragraph with content gets a newline after it; the new
    /// empty paragraph inherits its style, so style and bullets are reset
    /// either way.
    pub async fn prepare_insertion_point(&self, report: &mut WriteReport) -> Result<InsertionPoint> {
        let doc = self.api.get_document(self.document_id).await?;
        let (element, paragraph) = doc
            .last_paragraph()
            .ok_or_else(|| DocError::remote("document body does not end with a paragraph"))?;

        let mut requests = Vec::with_capacity(3);
        let index = if paragraph.has_text() || paragraph.has_image() {
            requests.push(Request::InsertText { index: element.end_index - 1, text: "\n".into() });
            element.end_index
        } else {
            element.start_index
        };
        requests.extend(reset_paragraph(index));
        self.execute(&requests, report).await?;

        Ok(InsertionPoint { index, tables_before: doc.tables().len() })
    }

    /// Write Markdown at the end of the document, pass by pass.
    pub async fn write_markdown(&self, markdown: &str, max_passes: usize) -> Result<WriteReport> {
        let mut report = WriteReport::default();
        let mut queue = VecDeque::from([markdown.to_string()]);

        while let Some(chunk) = queue.pop_front() {
            if chunk.trim().is_empty() {
                continue;
            }
            if report.passes >= max_passes {
                return Err(DocError::RecursionLimit { depth: max_passes });
            }
            report.passes += 1;

            // Phase A
            let point = self.prepare_insertion_point(&mut report).await?;
            let parse = parse_markdown(&chunk, point.index)?;
            let planned = build_markdown_batch(&parse);
            tracing::debug!(
                doc = %self.document_id,
                pass = report.passes,
                at = point.index,
                requests = planned.requests.len(),
                images = planned.images.len(),
                "markdown pass"
            );
            self.execute(&planned.requests, &mut report).await?;
            let images = insert_images(self.api, self.document_id, &planned.images).await;
            report.absorb_images(images);

            // Phase B
            if let Some(fill) = &parse.table {
                self.fill_table(point.tables_before, &fill.model, fill.bold_headers, &mut report)
                    .await?;
            }

            // Phase C
            if let Some(rest) = parse.post_table_content {
                queue.push_front(rest);
            }
        }

        tracing::info!(
            doc = %self.document_id,
            operations = report.operations,
            tables = report.tables_filled,
            passes = report.passes,
            "markdown written"
        );
        Ok(report)
    }

    /// Fill the empty table at `ordinal` from `model`.
    pub async fn fill_table(
        &self,
        ordinal: usize,
        model: &TableModel,
        bold_headers: bool,
        report: &mut WriteReport,
    ) -> Result<()> {
        let doc = self.api.get_document(self.document_id).await?;
        let table = doc.table(ordinal).map_err(|_| missing_table(ordinal, model))?;
        if table.table.rows != model.rows || table.table.columns != model.columns {
            return Err(missing_table(ordinal, model));
        }
        let requests = fill_table_requests(table.table, model)?;
        self.execute(&requests, report).await?;

        if model.cells.iter().flatten().any(|c| !c.images.is_empty()) {
            let doc = self.api.get_document(self.document_id).await?;
            let placements = fill_image_placements(doc.table(ordinal)?.table, model)?;
            let images = insert_images(self.api, self.document_id, &placements).await;
            report.absorb_images(images);
        }

        let doc = self.api.get_document(self.document_id).await?;
        let table = doc.table(ordinal)?;
        let mut requests = if bold_headers && model.rows > 0 {
            bold_row_requests(table.table, 0)?
        } else {
            Vec::new()
        };
        if doc.body.iter().any(|el| el.start_index == table.end_index && el.as_paragraph().is_some()) {
            requests.extend(reset_paragraph(table.end_index));
        }
        self.execute(&requests, report).await?;

        report.tables_filled += 1;
        tracing::debug!(doc = %self.document_id, ordinal, rows = model.rows, columns = model.columns, "table filled");
        Ok(())
    }

    /// Re-author extracted content groups at the end of the document.
    pub async fn replay_groups(&self, groups: &[ContentGroup]) -> Result<WriteReport> {
        let mut report = WriteReport::default();
        for group in groups {
            report.passes += 1;
            match group {
                ContentGroup::Paragraphs(blocks) => {
                    let point = self.prepare_insertion_point(&mut report).await?;
                    let planned = build_paragraph_batch(blocks, point.index, &[]);
                    self.execute(&planned.requests, &mut report).await?;
                    let images = insert_images(self.api, self.document_id, &planned.images).await;
                    report.absorb_images(images);
                }
                ContentGroup::Table(model) => {
                    if model.is_empty() {
                        continue;
                    }
                    let ordinal = self.insert_table_at_end(model, &mut report).await?;
                    self.fill_table(ordinal, model, false, &mut report).await?;
                }
            }
        }
        tracing::info!(
            doc = %self.document_id,
            groups = groups.len(),
            operations = report.operations,
            tables = report.tables_filled,
            failed_images = report.images.failed.len(),
            "content replayed"
        );
        Ok(report)
    }

    /// Insert an empty table right after the current content; returns its
    /// ordinal.
    ///
    /// An empty trailing paragraph is first reset to unbulleted normal text,
    /// since the paragraph break inserted ahead of the table inherits its style.
    async fn insert_table_at_end(&self, model: &TableModel, report: &mut WriteReport) -> Result<usize> {
        let doc = self.api.get_document(self.document_id).await?;
        let (element, paragraph) = doc
            .last_paragraph()
            .ok_or_else(|| DocError::remote("document body does not end with a paragraph"))?;
        let at = element.end_index - 1;

        let mut requests = Vec::with_capacity(3);
        if !paragraph.has_text() && !paragraph.has_image() {
            requests.extend(reset_paragraph(element.start_index));
        }
        requests.push(Request::InsertTable { index: at, rows: model.rows, columns: model.columns });
        self.execute(&requests, report).await?;
        Ok(doc.tables_before(at))
    }
}

/// Normal text, no bullet, for the paragraph starting at `index`.
fn reset_paragraph(index: usize) -> [Request; 2] {
    [
        Request::UpdateParagraphStyle {
            start: index,
            end: index + 1,
            named_style: NamedStyle::NormalText,
        },
        Request::DeleteParagraphBullets { start: index, end: index + 1 },
    ]
}

fn missing_table(ordinal: usize, model: &TableModel) -> DocError {
    DocError::NotFound(format!(
        "newly inserted {}x{} table (expected at table index {ordinal})",
        model.rows, model.columns
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocs;

    async fn setup() -> (MemoryDocs, String) {
        let docs = MemoryDocs::new();
        let id = docs.create_document("pipeline").await.unwrap().document_id;
        (docs, id)
    }

    #[tokio::test]
    async fn test_insertion_point_on_empty_document() {
        let (docs, id) = setup().await;
        let config = BatchConfig::default();
        let pipeline = Pipeline::new(&docs, &id, &config);
        let mut report = WriteReport::default();
        let point = pipeline.prepare_insertion_point(&mut report).await.unwrap();
        assert_eq!(point, InsertionPoint { index: 1, tables_before: 0 });
        assert_eq!(docs.plain_text(&id).unwrap(), "\n");
    }

    #[tokio::test]
    async fn test_insertion_point_after_text_adds_separator() {
        let (docs, id) = setup().await;
        docs.batch_update(&id, &[Request::InsertText { index: 1, text: "abc".into() }])
            .await
            .unwrap();
        let config = BatchConfig::default();
        let pipeline = Pipeline::new(&docs, &id, &config);
        let mut report = WriteReport::default();
        let point = pipeline.prepare_insertion_point(&mut report).await.unwrap();
        assert_eq!(point.index, 5);
        assert_eq!(docs.plain_text(&id).unwrap(), "abc\n\n");
    }

    #[tokio::test]
    async fn test_clear_body() {
        let (docs, id) = setup().await;
        let config = BatchConfig::default();
        let pipeline = Pipeline::new(&docs, &id, &config);
        assert_eq!(pipeline.clear_body().await.unwrap(), 0);

        docs.batch_update(&id, &[Request::InsertText { index: 1, text: "one\ntwo".into() }])
            .await
            .unwrap();
        assert_eq!(pipeline.clear_body().await.unwrap(), 1);
        assert_eq!(docs.plain_text(&id).unwrap(), "\n");
    }

    #[tokio::test]
    async fn test_markdown_with_table_fills_and_continues() {
        let (docs, id) = setup().await;
        let config = BatchConfig::default();
        let pipeline = Pipeline::new(&docs, &id, &config);
        let md = "# Title\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\nAfter **bold**";
        let report = pipeline.write_markdown(md, 10).await.unwrap();
        assert_eq!(report.passes, 2);
        assert_eq!(report.tables_filled, 1);

        let doc = docs.get_document(&id).await.unwrap();
        let table = doc.table(0).unwrap();
        assert_eq!(table.table.cell(0, 1).unwrap().text(), "b");
        assert_eq!(table.table.cell(1, 0).unwrap().text(), "1");

        let (_, last) = doc.last_paragraph().unwrap();
        assert_eq!(last.text(), "After bold\n");
        assert_eq!(last.named_style, NamedStyle::NormalText);
        let title = doc.body[1].as_paragraph().unwrap();
        assert_eq!(title.text(), "Title\n");
        assert_eq!(title.named_style, NamedStyle::Heading1);
    }

    #[tokio::test]
    async fn test_pass_limit() {
        let (docs, id) = setup().await;
        let config = BatchConfig::default();
        let pipeline = Pipeline::new(&docs, &id, &config);
        let md = "| a |\n|---|\n| 1 |\n\nx\n\n| b |\n|---|\n| 2 |\n\ny";
        let err = pipeline.write_markdown(md, 2).await.unwrap_err();
        assert_eq!(err, DocError::RecursionLimit { depth: 2 });
    }
}
