//! MCP request types.
//!
//! Documents may be given as a bare id or a full document URL everywhere a
//! `document`, `source` or `target` field appears.

use rmcp::schemars;
use serde::Deserialize;

use docweave_kernel::{CellEdit, CellImage};
use docweave_types::{ImageInfo, TextStyle};

// ============================================================================
// Document Tools
// ============================================================================

/// Create an empty document.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DocCreateRequest {
    #[schemars(description = "Title of the new document")]
    pub title: String,
}

/// Address one document.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DocRefRequest {
    #[schemars(description = "Document id or document URL")]
    pub document: String,
}

/// Write Markdown into a document.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MarkdownWriteRequest {
    #[schemars(description = "Document id or document URL")]
    pub document: String,
    #[schemars(
        description = "Markdown: headings, bold/italic/strikethrough, links, inline code, code blocks, images, ordered/unordered lists, GFM tables"
    )]
    pub markdown: String,
}

/// Copy a whole document body.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DocumentCopyRequest {
    #[schemars(description = "Source document id or URL")]
    pub source: String,
    #[schemars(description = "Target document id or URL")]
    pub target: String,
    #[schemars(description = "replace (default) clears the target first; append adds after its content")]
    pub mode: Option<String>,
}

// ============================================================================
// Table Tools
// ============================================================================

/// Copy one table to the end of another document.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TableCopyRequest {
    #[schemars(description = "Source document id or URL")]
    pub source: String,
    #[schemars(description = "0-based index of the table in the source document")]
    pub table_index: usize,
    #[schemars(description = "Target document id or URL")]
    pub target: String,
}

/// Optional text style for a cell edit. Unset fields keep their default.
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct StyleParam {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    #[schemars(description = "Hex color like #ff0000")]
    pub foreground_color: Option<String>,
    #[schemars(description = "Hex color like #ffff00")]
    pub background_color: Option<String>,
    #[schemars(description = "Font size in points")]
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    pub link_url: Option<String>,
}

impl From<StyleParam> for TextStyle {
    fn from(p: StyleParam) -> Self {
        TextStyle {
            bold: p.bold,
            italic: p.italic,
            underline: p.underline,
            strikethrough: p.strikethrough,
            foreground_color: p.foreground_color,
            background_color: p.background_color,
            font_size: p.font_size,
            font_family: p.font_family,
            link_url: p.link_url,
        }
        .normalized()
    }
}

/// Replacement text for one cell.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CellEditParam {
    pub row: usize,
    pub col: usize,
    #[schemars(description = "New cell text; existing images in the cell are kept")]
    pub text: String,
    #[schemars(description = "Style applied to the whole new text")]
    pub style: Option<StyleParam>,
}

impl From<CellEditParam> for CellEdit {
    fn from(p: CellEditParam) -> Self {
        CellEdit {
            row: p.row,
            col: p.col,
            text: p.text,
            style: p.style.map(TextStyle::from).filter(|s| !s.is_empty()),
        }
    }
}

/// Replace the text of several cells in one batch.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TableCellsEditRequest {
    #[schemars(description = "Document id or document URL")]
    pub document: String,
    #[schemars(description = "0-based table index in the document")]
    pub table_index: usize,
    #[schemars(description = "Cell edits; each cell may appear once")]
    pub edits: Vec<CellEditParam>,
}

/// An image for the start of one cell.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CellImageParam {
    pub row: usize,
    pub col: usize,
    #[schemars(description = "Publicly reachable image URL")]
    pub uri: String,
    #[schemars(description = "Width in points")]
    pub width: Option<f64>,
    #[schemars(description = "Height in points")]
    pub height: Option<f64>,
}

impl From<CellImageParam> for CellImage {
    fn from(p: CellImageParam) -> Self {
        CellImage {
            row: p.row,
            col: p.col,
            image: ImageInfo { uri: p.uri, width: p.width, height: p.height },
        }
    }
}

/// Insert images into table cells as one batch.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TableImagesInsertRequest {
    #[schemars(description = "Document id or document URL")]
    pub document: String,
    #[schemars(description = "0-based table index in the document")]
    pub table_index: usize,
    pub images: Vec<CellImageParam>,
}

/// Insert one row.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TableRowInsertRequest {
    #[schemars(description = "Document id or document URL")]
    pub document: String,
    #[schemars(description = "0-based table index in the document")]
    pub table_index: usize,
    #[schemars(description = "0-based reference row")]
    pub row_index: usize,
    #[schemars(description = "Insert below the reference row (default: true)")]
    #[serde(default = "default_true")]
    pub insert_below: bool,
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Snapshot Tools
// ============================================================================

/// Record an undo checkpoint.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SnapshotCreateRequest {
    #[schemars(description = "Document id or document URL")]
    pub document: String,
    #[schemars(description = "Optional label shown in snapshot_list")]
    pub label: Option<String>,
}
