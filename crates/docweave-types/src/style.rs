//! The run/style model.
//!
//! This is the intermediate representation shared by the Markdown front end,
//! the document-copy extractor, and the batch-request builder:
//!
//! ```text
//! ParagraphBlock
//!   ├── runs:   [Run { text, style }, ...]      text in offset order
//!   ├── images: [PositionedImage { offset }]    anchored inside the block text
//!   └── named_style: Option<NamedStyle>         heading level etc.
//!
//! TableModel
//!   └── cells[row][col] = Cell { runs, images }
//! ```
//!
//! Every length here is measured in UTF-16 code units, the unit of the
//! remote document's index space.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::error::{DocError, Result};

/// Length of `text` in the document's index unit (UTF-16 code units).
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Monospace family used for inline code and fenced code blocks.
pub const MONOSPACE_FAMILY: &str = "Courier New";

/// Sparse character-level style.
///
/// A field is `Some` only when it deviates from the default. Extraction from
/// a live document goes through [`TextStyle::normalized`] so that explicit
/// defaults (black text, `bold: false`) never surface as attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    /// `#rrggbb`, lowercase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<String>,
    /// `#rrggbb`, lowercase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
}

impl TextStyle {
    pub fn bold() -> Self {
        Self { bold: Some(true), ..Self::default() }
    }

    pub fn italic() -> Self {
        Self { italic: Some(true), ..Self::default() }
    }

    /// True when no attribute is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Drop attributes that restate the default.
    pub fn normalized(&self) -> Self {
        fn flag(v: Option<bool>) -> Option<bool> {
            v.filter(|b| *b)
        }
        let foreground_color = self
            .foreground_color
            .as_deref()
            .and_then(normalize_hex)
            .filter(|c| c != "#000000");
        Self {
            bold: flag(self.bold),
            italic: flag(self.italic),
            underline: flag(self.underline),
            strikethrough: flag(self.strikethrough),
            foreground_color,
            background_color: self.background_color.as_deref().and_then(normalize_hex),
            font_size: self.font_size,
            font_family: self.font_family.clone().filter(|f| !f.is_empty()),
            link_url: self.link_url.clone().filter(|u| !u.is_empty()),
        }
    }

    /// Overlay every attribute set in `other` onto `self`.
    pub fn merge(&mut self, other: &TextStyle) {
        if other.bold.is_some() {
            self.bold = other.bold;
        }
        if other.italic.is_some() {
            self.italic = other.italic;
        }
        if other.underline.is_some() {
            self.underline = other.underline;
        }
        if other.strikethrough.is_some() {
            self.strikethrough = other.strikethrough;
        }
        if other.foreground_color.is_some() {
            self.foreground_color = other.foreground_color.clone();
        }
        if other.background_color.is_some() {
            self.background_color = other.background_color.clone();
        }
        if other.font_size.is_some() {
            self.font_size = other.font_size;
        }
        if other.font_family.is_some() {
            self.font_family = other.font_family.clone();
        }
        if other.link_url.is_some() {
            self.link_url = other.link_url.clone();
        }
    }

    /// Remote field names for the attributes that are set, comma separated.
    ///
    /// This is the `fields` mask of an `updateTextStyle` request.
    pub fn field_mask(&self) -> String {
        let mut fields = Vec::new();
        if self.bold.is_some() {
            fields.push("bold");
        }
        if self.italic.is_some() {
            fields.push("italic");
        }
        if self.underline.is_some() {
            fields.push("underline");
        }
        if self.strikethrough.is_some() {
            fields.push("strikethrough");
        }
        if self.foreground_color.is_some() {
            fields.push("foregroundColor");
        }
        if self.background_color.is_some() {
            fields.push("backgroundColor");
        }
        if self.font_size.is_some() {
            fields.push("fontSize");
        }
        if self.font_family.is_some() {
            fields.push("weightedFontFamily");
        }
        if self.link_url.is_some() {
            fields.push("link");
        }
        fields.join(",")
    }
}

/// Normalize `#RGB`, `#RRGGBB` (with or without `#`) to lowercase `#rrggbb`.
pub fn normalize_hex(color: &str) -> Option<String> {
    let hex = color.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some(format!("#{}", hex.to_ascii_lowercase())),
        3 => {
            let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
            Some(format!("#{}", expanded.to_ascii_lowercase()))
        }
        _ => None,
    }
}

/// Parse `#rrggbb` into 0.0..=1.0 channels.
pub fn hex_to_rgb(color: &str) -> Option<(f64, f64, f64)> {
    let hex = normalize_hex(color)?;
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok().map(|v| v as f64 / 255.0);
    Some((channel(1)?, channel(3)?, channel(5)?))
}

/// Format 0.0..=1.0 channels as `#rrggbb`.
pub fn rgb_to_hex(red: f64, green: f64, blue: f64) -> String {
    let byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("#{:02x}{:02x}{:02x}", byte(red), byte(green), byte(blue))
}

/// Paragraph-level classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(ascii_case_insensitive)]
pub enum NamedStyle {
    #[default]
    #[strum(serialize = "NORMAL_TEXT", serialize = "normal")]
    NormalText,
    #[strum(serialize = "TITLE")]
    Title,
    #[strum(serialize = "SUBTITLE")]
    Subtitle,
    #[strum(serialize = "HEADING_1", serialize = "h1")]
    #[serde(rename = "HEADING_1")]
    Heading1,
    #[strum(serialize = "HEADING_2", serialize = "h2")]
    #[serde(rename = "HEADING_2")]
    Heading2,
    #[strum(serialize = "HEADING_3", serialize = "h3")]
    #[serde(rename = "HEADING_3")]
    Heading3,
    #[strum(serialize = "HEADING_4", serialize = "h4")]
    #[serde(rename = "HEADING_4")]
    Heading4,
    #[strum(serialize = "HEADING_5", serialize = "h5")]
    #[serde(rename = "HEADING_5")]
    Heading5,
    #[strum(serialize = "HEADING_6", serialize = "h6")]
    #[serde(rename = "HEADING_6")]
    Heading6,
}

impl NamedStyle {
    /// Parse from the remote name (case-insensitive); `h1`..`h6` accepted.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NamedStyle::NormalText => "NORMAL_TEXT",
            NamedStyle::Title => "TITLE",
            NamedStyle::Subtitle => "SUBTITLE",
            NamedStyle::Heading1 => "HEADING_1",
            NamedStyle::Heading2 => "HEADING_2",
            NamedStyle::Heading3 => "HEADING_3",
            NamedStyle::Heading4 => "HEADING_4",
            NamedStyle::Heading5 => "HEADING_5",
            NamedStyle::Heading6 => "HEADING_6",
        }
    }

    /// Heading style for a Markdown level (1..=6); other levels clamp.
    pub fn heading(level: u8) -> Self {
        match level {
            0 | 1 => NamedStyle::Heading1,
            2 => NamedStyle::Heading2,
            3 => NamedStyle::Heading3,
            4 => NamedStyle::Heading4,
            5 => NamedStyle::Heading5,
            _ => NamedStyle::Heading6,
        }
    }

    /// Markdown heading level, if this is a heading. Title renders as level 1.
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            NamedStyle::Heading1 | NamedStyle::Title => Some(1),
            NamedStyle::Heading2 | NamedStyle::Subtitle => Some(2),
            NamedStyle::Heading3 => Some(3),
            NamedStyle::Heading4 => Some(4),
            NamedStyle::Heading5 => Some(5),
            NamedStyle::Heading6 => Some(6),
            NamedStyle::NormalText => None,
        }
    }

    pub fn is_default(&self) -> bool {
        *self == NamedStyle::NormalText
    }
}

impl std::fmt::Display for NamedStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A maximal span of text sharing one style.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default, skip_serializing_if = "TextStyle::is_empty")]
    pub style: TextStyle,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), style: TextStyle::default() }
    }

    pub fn styled(text: impl Into<String>, style: TextStyle) -> Self {
        Self { text: text.into(), style }
    }

    pub fn len(&self) -> usize {
        utf16_len(&self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Append a run, merging with the previous one when the styles match.
/// Zero-length runs are dropped.
pub fn push_run(runs: &mut Vec<Run>, run: Run) {
    if run.text.is_empty() {
        return;
    }
    match runs.last_mut() {
        Some(last) if last.style == run.style => last.text.push_str(&run.text),
        _ => runs.push(run),
    }
}

fn runs_text(runs: &[Run]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

/// An image reference. Images are never carried inside run text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub uri: String,
    /// Points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl ImageInfo {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into(), width: None, height: None }
    }
}

/// An image anchored at a UTF-16 offset inside its owning block's text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionedImage {
    pub offset: usize,
    pub image: ImageInfo,
}

/// One paragraph of content, append-only while parsing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphBlock {
    pub runs: Vec<Run>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<PositionedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_style: Option<NamedStyle>,
}

impl ParagraphBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(named_style: NamedStyle) -> Self {
        Self { named_style: Some(named_style), ..Self::default() }
    }

    pub fn push_run(&mut self, run: Run) {
        push_run(&mut self.runs, run);
    }

    /// Anchor an image at the current end of the block text.
    pub fn push_image(&mut self, image: ImageInfo) {
        let offset = self.text_len();
        self.images.push(PositionedImage { offset, image });
    }

    pub fn text(&self) -> String {
        runs_text(&self.runs)
    }

    pub fn text_len(&self) -> usize {
        self.runs.iter().map(Run::len).sum()
    }

    /// True when there is neither text nor an image.
    pub fn is_blank(&self) -> bool {
        self.runs.is_empty() && self.images.is_empty()
    }
}

/// Content of one table cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub runs: Vec<Run>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageInfo>,
}

impl Cell {
    pub fn plain(text: impl Into<String>) -> Self {
        let mut cell = Self::default();
        push_run(&mut cell.runs, Run::plain(text));
        cell
    }

    pub fn text(&self) -> String {
        runs_text(&self.runs)
    }

    pub fn text_len(&self) -> usize {
        self.runs.iter().map(Run::len).sum()
    }
}

/// A rectangular grid of cells. Every row has exactly `columns` cells.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableModel {
    pub rows: usize,
    pub columns: usize,
    pub cells: Vec<Vec<Cell>>,
}

impl TableModel {
    /// Build a table from ragged rows, padding short rows with empty cells.
    pub fn from_rows(mut cells: Vec<Vec<Cell>>) -> Self {
        let columns = cells.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut cells {
            row.resize_with(columns, Cell::default);
        }
        Self { rows: cells.len(), columns, cells }
    }

    /// Build a plain-text table from ragged string rows.
    pub fn from_text(data: &[Vec<String>]) -> Self {
        Self::from_rows(
            data.iter()
                .map(|row| row.iter().map(|text| Cell::plain(text.as_str())).collect())
                .collect(),
        )
    }

    pub fn cell(&self, row: usize, col: usize) -> Result<&Cell> {
        let cells = self
            .cells
            .get(row)
            .ok_or_else(|| DocError::out_of_bounds("row", row, self.rows))?;
        cells
            .get(col)
            .ok_or_else(|| DocError::out_of_bounds("column", col, self.columns))
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns == 0
    }
}
