//! Table sub-engine: cell replacement, batch cell edits, image placement,
//! fill and header formatting against a live table.
//!
//! Cells are addressed structurally (row, column) and resolved to offsets
//! from a fresh read. Every multi-cell batch is ordered descending by target
//! offset so no edit shifts a target that is still pending.

use std::collections::HashSet;

use docweave_types::{
    DocError, ImageInfo, ParagraphElementKind, Request, Result, Run, Table,
    TableCell, TableModel, TableRef, TextStyle, utf16_len,
};
use serde::{Deserialize, Serialize};

use crate::builder::{EditGroup, ImagePlacement, order_descending, sort_images_descending};

/// Replacement text for one cell; `style` applies to the whole new text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellEdit {
    pub row: usize,
    pub col: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyle>,
}

impl CellEdit {
    pub fn plain(row: usize, col: usize, text: impl Into<String>) -> Self {
        Self { row, col, text: text.into(), style: None }
    }
}

/// An image to place at the start of a cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellImage {
    pub row: usize,
    pub col: usize,
    pub image: ImageInfo,
}

/// Ranges holding the cell's text, excluding images and the final newline.
///
/// Image-only paragraphs are skipped. The last text-bearing paragraph keeps
/// its newline so the paragraph survives to receive the new text; earlier
/// ones are removed whole. Paragraphs mixing text and images give up only
/// their text runs.
pub fn text_ranges(cell: &TableCell) -> Vec<(usize, usize)> {
    let qualifying: Vec<_> = cell.paragraphs().filter(|(_, p)| p.has_text()).collect();
    let last = qualifying.len().saturating_sub(1);
    let mut ranges = Vec::new();

    for (i, (element, paragraph)) in qualifying.into_iter().enumerate() {
        if paragraph.has_image() {
            for el in &paragraph.elements {
                if let ParagraphElementKind::TextRun { content, .. } = &el.kind {
                    let end = if content.ends_with('\n') { el.end_index - 1 } else { el.end_index };
                    if end > el.start_index {
                        ranges.push((el.start_index, end));
                    }
                }
            }
        } else if i == last {
            ranges.push((element.start_index, element.end_index - 1));
        } else {
            ranges.push((element.start_index, element.end_index));
        }
    }
    ranges
}

/// Replace a cell's text, leaving its images in place.
///
/// Deletes run highest-first; the new text goes in at the lowest original
/// start, or at the cell's first content slot when nothing was deleted.
pub fn replace_cell_text(cell: &TableCell, text: &str, style: Option<&TextStyle>) -> EditGroup {
    let mut ranges = text_ranges(cell);
    ranges.sort_by(|a, b| b.0.cmp(&a.0));

    let at = ranges
        .iter()
        .map(|r| r.0)
        .min()
        .unwrap_or_else(|| cell.first_content_index());

    let mut requests: Vec<Request> = ranges
        .into_iter()
        .map(|(start, end)| Request::DeleteRange { start, end })
        .collect();

    if !text.is_empty() {
        requests.push(Request::InsertText { index: at, text: text.to_string() });
        if let Some(style) = style.filter(|s| !s.is_empty()) {
            requests.push(Request::UpdateTextStyle {
                start: at,
                end: at + utf16_len(text),
                style: style.clone(),
            });
        }
    }
    EditGroup { sort_index: at, requests }
}

/// Build one descending-ordered batch for several cell edits.
pub fn build_cell_edits(table: &Table, edits: &[CellEdit]) -> Result<Vec<Request>> {
    let mut seen = HashSet::new();
    let mut groups = Vec::with_capacity(edits.len());
    for edit in edits {
        if !seen.insert((edit.row, edit.col)) {
            return Err(DocError::InvalidParams(format!(
                "cell ({}, {}) is edited more than once in one batch",
                edit.row, edit.col
            )));
        }
        let cell = table.cell(edit.row, edit.col)?;
        groups.push(replace_cell_text(cell, &edit.text, edit.style.as_ref()));
    }
    Ok(order_descending(groups))
}

/// Image insertions at each target cell's first content slot, descending.
pub fn build_cell_images(table: &Table, images: &[CellImage]) -> Result<Vec<Request>> {
    let mut placements = Vec::with_capacity(images.len());
    for target in images {
        let cell = table.cell(target.row, target.col)?;
        placements.push(ImagePlacement {
            index: cell.first_content_index(),
            image: target.image.clone(),
        });
    }
    sort_images_descending(&mut placements);
    Ok(placements
        .into_iter()
        .map(|p| Request::InsertInlineImage { index: p.index, image: p.image })
        .collect())
}

/// Fill an empty table with the model's text and run styles.
pub fn fill_table_requests(table: &Table, model: &TableModel) -> Result<Vec<Request>> {
    let mut groups = Vec::new();
    for (r, row) in model.cells.iter().enumerate() {
        for (c, cell_model) in row.iter().enumerate() {
            if cell_model.runs.is_empty() {
                continue;
            }
            let at = table.cell(r, c)?.first_content_index();
            groups.push(EditGroup { sort_index: at, requests: cell_requests(at, &cell_model.runs) });
        }
    }
    Ok(order_descending(groups))
}

fn cell_requests(at: usize, runs: &[Run]) -> Vec<Request> {
    let text: String = runs.iter().map(|r| r.text.as_str()).collect();
    let mut requests = vec![Request::InsertText { index: at, text }];
    let mut offset = at;
    for run in runs {
        let len = run.len();
        if !run.style.is_empty() && len > 0 {
            requests.push(Request::UpdateTextStyle {
                start: offset,
                end: offset + len,
                style: run.style.clone(),
            });
        }
        offset += len;
    }
    requests
}

/// Placements for the model's cell images against a filled table.
pub fn fill_image_placements(table: &Table, model: &TableModel) -> Result<Vec<ImagePlacement>> {
    let mut placements = Vec::new();
    for (r, row) in model.cells.iter().enumerate() {
        for (c, cell_model) in row.iter().enumerate() {
            if cell_model.images.is_empty() {
                continue;
            }
            let at = table.cell(r, c)?.first_content_index();
            placements.extend(
                cell_model
                    .images
                    .iter()
                    .map(|image| ImagePlacement { index: at, image: image.clone() }),
            );
        }
    }
    sort_images_descending(&mut placements);
    Ok(placements)
}

/// Bold every text range in one row.
pub fn bold_row_requests(table: &Table, row: usize) -> Result<Vec<Request>> {
    let table_row = table.row(row)?;
    let mut requests = Vec::new();
    for cell in &table_row.cells {
        for (element, paragraph) in cell.paragraphs() {
            if paragraph.has_text() && element.end_index - 1 > element.start_index {
                requests.push(Request::UpdateTextStyle {
                    start: element.start_index,
                    end: element.end_index - 1,
                    style: TextStyle::bold(),
                });
            }
        }
    }
    Ok(requests)
}

/// Structural row insertion, validated against the live table.
pub fn insert_row_request(table: &TableRef<'_>, row_index: usize, insert_below: bool) -> Result<Request> {
    table.table.row(row_index)?;
    Ok(Request::InsertTableRow {
        table_start: table.start_index,
        row_index,
        insert_below,
    })
}
