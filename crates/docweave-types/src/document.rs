//! Typed read model of a remote document.
//!
//! The remote body is a flat, index-addressed stream: every structural
//! element owns a contiguous `[start_index, end_index)` range and every
//! paragraph ends with a newline that occupies one index slot.
//!
//! Element kinds are sum types, so every site that branches on kind is an
//! exhaustive `match`. Loosely-shaped JSON is handled once, in
//! [`crate::wire`], and converted into these types on deserialization.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{DocError, Result};
use crate::style::{ImageInfo, NamedStyle, TextStyle};

/// A full document read.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "crate::wire::RawDocument")]
pub struct Document {
    pub document_id: String,
    pub title: String,
    /// Top-level structural elements in index order.
    pub body: Vec<StructuralElement>,
    /// Inline object table: object id → image metadata.
    pub inline_objects: HashMap<String, InlineObject>,
    /// List table: list id → list properties.
    pub lists: HashMap<String, ListInfo>,
}

/// A top-level (or in-cell) content unit with its absolute range.
#[derive(Clone, Debug, PartialEq)]
pub struct StructuralElement {
    pub start_index: usize,
    pub end_index: usize,
    pub kind: ElementKind,
}

/// The kinds of structural element.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementKind {
    Paragraph(Paragraph),
    Table(Table),
    SectionBreak,
    TableOfContents,
}

/// A paragraph: positional elements plus paragraph-level style.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paragraph {
    pub elements: Vec<ParagraphElement>,
    pub named_style: NamedStyle,
    pub bullet: Option<Bullet>,
}

/// Membership of a paragraph in a native list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bullet {
    pub list_id: String,
    pub nesting_level: u32,
}

/// A positional element inside a paragraph.
#[derive(Clone, Debug, PartialEq)]
pub struct ParagraphElement {
    pub start_index: usize,
    pub end_index: usize,
    pub kind: ParagraphElementKind,
}

/// The kinds of paragraph element.
#[derive(Clone, Debug, PartialEq)]
pub enum ParagraphElementKind {
    TextRun { content: String, style: TextStyle },
    InlineObject { object_id: String, style: TextStyle },
    /// Page breaks, footnote references, and other elements this engine
    /// does not model. They still occupy their index range.
    Other,
}

/// A table with its row/cell structure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub rows: usize,
    pub columns: usize,
    pub table_rows: Vec<TableRow>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableRow {
    pub start_index: usize,
    pub end_index: usize,
    pub cells: Vec<TableCell>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableCell {
    pub start_index: usize,
    pub end_index: usize,
    pub content: Vec<StructuralElement>,
}

/// An inline object (image) referenced from paragraph elements.
#[derive(Clone, Debug, PartialEq)]
pub struct InlineObject {
    pub object_id: String,
    pub image: ImageInfo,
}

/// Properties of a native list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListInfo {
    /// Numbered (glyph type) rather than symbol bullets.
    pub ordered: bool,
}

/// A table located in the body, with its position among all tables.
#[derive(Clone, Copy, Debug)]
pub struct TableRef<'a> {
    pub ordinal: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub table: &'a Table,
}

impl StructuralElement {
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match &self.kind {
            ElementKind::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match &self.kind {
            ElementKind::Table(t) => Some(t),
            _ => None,
        }
    }
}

impl Paragraph {
    /// Concatenated text-run content, including the terminating newline.
    pub fn text(&self) -> String {
        self.elements
            .iter()
            .filter_map(|e| match &e.kind {
                ParagraphElementKind::TextRun { content, .. } => Some(content.as_str()),
                ParagraphElementKind::InlineObject { .. } | ParagraphElementKind::Other => None,
            })
            .collect()
    }

    /// At least one text run carries more than the structural newline.
    pub fn has_text(&self) -> bool {
        self.elements.iter().any(|e| match &e.kind {
            ParagraphElementKind::TextRun { content, .. } => !content.is_empty() && content != "\n",
            ParagraphElementKind::InlineObject { .. } | ParagraphElementKind::Other => false,
        })
    }

    pub fn has_image(&self) -> bool {
        self.elements
            .iter()
            .any(|e| matches!(e.kind, ParagraphElementKind::InlineObject { .. }))
    }

    /// Inline object ids in positional order.
    pub fn object_ids(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match &e.kind {
            ParagraphElementKind::InlineObject { object_id, .. } => Some(object_id.as_str()),
            ParagraphElementKind::TextRun { .. } | ParagraphElementKind::Other => None,
        })
    }
}

impl Table {
    pub fn row(&self, row: usize) -> Result<&TableRow> {
        self.table_rows
            .get(row)
            .ok_or_else(|| DocError::out_of_bounds("row", row, self.table_rows.len()))
    }

    pub fn cell(&self, row: usize, col: usize) -> Result<&TableCell> {
        let table_row = self.row(row)?;
        table_row
            .cells
            .get(col)
            .ok_or_else(|| DocError::out_of_bounds("column", col, table_row.cells.len()))
    }
}

impl TableCell {
    /// Paragraphs of the cell with their ranges.
    pub fn paragraphs(&self) -> impl Iterator<Item = (&StructuralElement, &Paragraph)> {
        self.content
            .iter()
            .filter_map(|el| el.as_paragraph().map(|p| (el, p)))
    }

    /// Index of the first content slot (start of the first paragraph).
    pub fn first_content_index(&self) -> usize {
        self.content
            .first()
            .map(|el| el.start_index)
            .unwrap_or(self.start_index + 1)
    }

    /// Cell text with the final paragraph newline stripped.
    pub fn text(&self) -> String {
        let text: String = self.paragraphs().map(|(_, p)| p.text()).collect();
        text.strip_suffix('\n').map(str::to_string).unwrap_or(text)
    }

    pub fn has_image(&self) -> bool {
        self.paragraphs().any(|(_, p)| p.has_image())
    }

    /// Images of the cell, resolved through the document's object table.
    pub fn images(&self, inline_objects: &HashMap<String, InlineObject>) -> Vec<ImageInfo> {
        self.paragraphs()
            .flat_map(|(_, p)| p.object_ids())
            .filter_map(|id| inline_objects.get(id).map(|o| o.image.clone()))
            .collect()
    }
}

impl Document {
    /// End of content: the end index of the last body element.
    pub fn end_index(&self) -> usize {
        self.body.last().map(|el| el.end_index).unwrap_or(1)
    }

    /// The final body paragraph, which always exists in a valid document.
    pub fn last_paragraph(&self) -> Option<(&StructuralElement, &Paragraph)> {
        self.body
            .last()
            .and_then(|el| el.as_paragraph().map(|p| (el, p)))
    }

    /// All top-level tables in index order.
    pub fn tables(&self) -> Vec<TableRef<'_>> {
        self.body
            .iter()
            .filter_map(|el| el.as_table().map(|t| (el, t)))
            .enumerate()
            .map(|(ordinal, (el, table))| TableRef {
                ordinal,
                start_index: el.start_index,
                end_index: el.end_index,
                table,
            })
            .collect()
    }

    /// The table at `ordinal` (0-based, in index order).
    pub fn table(&self, ordinal: usize) -> Result<TableRef<'_>> {
        let tables = self.tables();
        let len = tables.len();
        tables
            .into_iter()
            .nth(ordinal)
            .ok_or_else(|| DocError::out_of_bounds("table", ordinal, len))
    }

    /// Number of tables that start before `index`.
    pub fn tables_before(&self, index: usize) -> usize {
        self.tables().iter().filter(|t| t.start_index < index).count()
    }

    pub fn image(&self, object_id: &str) -> Option<&ImageInfo> {
        self.inline_objects.get(object_id).map(|o| &o.image)
    }

    pub fn is_ordered_list(&self, list_id: &str) -> bool {
        self.lists.get(list_id).map(|l| l.ordered).unwrap_or(false)
    }
}
