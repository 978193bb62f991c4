//! Pending mutation operations.
//!
//! Every variant carries absolute offsets computed when it was planned.
//! A batch is applied strictly in array order, each request shifting the
//! offsets after it by its own size; planners are responsible for ordering.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::style::{ImageInfo, NamedStyle, TextStyle};
use crate::wire::text_style_to_wire;

/// Native list presets used when creating bullets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulletPreset {
    /// Unordered: disc, circle, square.
    Disc,
    /// Ordered: decimal, alpha, roman.
    Decimal,
}

impl BulletPreset {
    pub fn for_ordered(ordered: bool) -> Self {
        if ordered { BulletPreset::Decimal } else { BulletPreset::Disc }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BulletPreset::Disc => "BULLET_DISC_CIRCLE_SQUARE",
            BulletPreset::Decimal => "NUMBERED_DECIMAL_ALPHA_ROMAN",
        }
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self, BulletPreset::Decimal)
    }
}

/// A single planned mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    InsertText {
        index: usize,
        text: String,
    },
    DeleteRange {
        start: usize,
        end: usize,
    },
    UpdateTextStyle {
        start: usize,
        end: usize,
        style: TextStyle,
    },
    UpdateParagraphStyle {
        start: usize,
        end: usize,
        named_style: NamedStyle,
    },
    CreateListBullets {
        start: usize,
        end: usize,
        preset: BulletPreset,
    },
    DeleteParagraphBullets {
        start: usize,
        end: usize,
    },
    InsertTable {
        index: usize,
        rows: usize,
        columns: usize,
    },
    InsertInlineImage {
        index: usize,
        image: ImageInfo,
    },
    /// Structural row insertion; independent of character offsets.
    InsertTableRow {
        table_start: usize,
        row_index: usize,
        insert_below: bool,
    },
}

impl Request {
    /// The lowest offset this request touches.
    pub fn anchor(&self) -> usize {
        match self {
            Request::InsertText { index, .. }
            | Request::InsertTable { index, .. }
            | Request::InsertInlineImage { index, .. } => *index,
            Request::DeleteRange { start, .. }
            | Request::UpdateTextStyle { start, .. }
            | Request::UpdateParagraphStyle { start, .. }
            | Request::CreateListBullets { start, .. }
            | Request::DeleteParagraphBullets { start, .. } => *start,
            Request::InsertTableRow { table_start, .. } => *table_start,
        }
    }

    /// Short name for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::InsertText { .. } => "insertText",
            Request::DeleteRange { .. } => "deleteContentRange",
            Request::UpdateTextStyle { .. } => "updateTextStyle",
            Request::UpdateParagraphStyle { .. } => "updateParagraphStyle",
            Request::CreateListBullets { .. } => "createParagraphBullets",
            Request::DeleteParagraphBullets { .. } => "deleteParagraphBullets",
            Request::InsertTable { .. } => "insertTable",
            Request::InsertInlineImage { .. } => "insertInlineImage",
            Request::InsertTableRow { .. } => "insertTableRow",
        }
    }

    /// Encode as one element of a remote `batchUpdate` `requests` array.
    pub fn to_wire(&self) -> Value {
        fn range(start: usize, end: usize) -> Value {
            json!({ "startIndex": start, "endIndex": end })
        }
        match self {
            Request::InsertText { index, text } => json!({
                "insertText": { "location": { "index": index }, "text": text }
            }),
            Request::DeleteRange { start, end } => json!({
                "deleteContentRange": { "range": range(*start, *end) }
            }),
            Request::UpdateTextStyle { start, end, style } => json!({
                "updateTextStyle": {
                    "range": range(*start, *end),
                    "textStyle": text_style_to_wire(style),
                    "fields": style.field_mask(),
                }
            }),
            Request::UpdateParagraphStyle { start, end, named_style } => json!({
                "updateParagraphStyle": {
                    "range": range(*start, *end),
                    "paragraphStyle": { "namedStyleType": named_style.as_str() },
                    "fields": "namedStyleType",
                }
            }),
            Request::CreateListBullets { start, end, preset } => json!({
                "createParagraphBullets": {
                    "range": range(*start, *end),
                    "bulletPreset": preset.as_str(),
                }
            }),
            Request::DeleteParagraphBullets { start, end } => json!({
                "deleteParagraphBullets": { "range": range(*start, *end) }
            }),
            Request::InsertTable { index, rows, columns } => json!({
                "insertTable": { "location": { "index": index }, "rows": rows, "columns": columns }
            }),
            Request::InsertInlineImage { index, image } => {
                let mut body = json!({ "location": { "index": index }, "uri": image.uri });
                let mut size = serde_json::Map::new();
                if let Some(w) = image.width {
                    size.insert("width".into(), json!({ "magnitude": w, "unit": "PT" }));
                }
                if let Some(h) = image.height {
                    size.insert("height".into(), json!({ "magnitude": h, "unit": "PT" }));
                }
                if !size.is_empty() {
                    body["objectSize"] = Value::Object(size);
                }
                json!({ "insertInlineImage": body })
            }
            Request::InsertTableRow { table_start, row_index, insert_below } => json!({
                "insertTableRow": {
                    "tableCellLocation": {
                        "tableStartLocation": { "index": table_start },
                        "rowIndex": row_index,
                        "columnIndex": 0,
                    },
                    "insertBelow": insert_below,
                }
            }),
        }
    }
}

/// Encode a request list as a `batchUpdate` body.
pub fn batch_body(requests: &[Request]) -> Value {
    json!({ "requests": requests.iter().map(Request::to_wire).collect::<Vec<_>>() })
}
