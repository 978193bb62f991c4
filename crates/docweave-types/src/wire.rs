//! Remote JSON shapes and their conversion into the typed model.
//!
//! Everything optional or loosely shaped in the remote API is absorbed here.
//! The rest of the workspace only sees [`crate::document`] types and
//! [`crate::ops::Request`].

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::document::{
    Bullet, Document, ElementKind, InlineObject, ListInfo, Paragraph, ParagraphElement,
    ParagraphElementKind, StructuralElement, Table, TableCell, TableRow,
};
use crate::style::{ImageInfo, NamedStyle, TextStyle, hex_to_rgb, rgb_to_hex};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawDocument {
    document_id: String,
    title: String,
    body: RawBody,
    inline_objects: HashMap<String, RawInlineObject>,
    lists: HashMap<String, RawList>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBody {
    content: Vec<RawStructuralElement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawStructuralElement {
    start_index: usize,
    end_index: usize,
    paragraph: Option<RawParagraph>,
    table: Option<RawTable>,
    table_of_contents: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawParagraph {
    elements: Vec<RawParagraphElement>,
    paragraph_style: Option<RawParagraphStyle>,
    bullet: Option<RawBullet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawParagraphStyle {
    named_style_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawBullet {
    list_id: String,
    nesting_level: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawParagraphElement {
    start_index: usize,
    end_index: usize,
    text_run: Option<RawTextRun>,
    inline_object_element: Option<RawInlineObjectElement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTextRun {
    content: String,
    text_style: RawTextStyle,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawInlineObjectElement {
    inline_object_id: String,
    text_style: RawTextStyle,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTextStyle {
    bold: Option<bool>,
    italic: Option<bool>,
    underline: Option<bool>,
    strikethrough: Option<bool>,
    foreground_color: Option<RawOptionalColor>,
    background_color: Option<RawOptionalColor>,
    font_size: Option<RawDimension>,
    weighted_font_family: Option<RawFontFamily>,
    link: Option<RawLink>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOptionalColor {
    color: Option<RawColor>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawColor {
    rgb_color: Option<RawRgb>,
}

// The remote omits zero channels.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRgb {
    red: f64,
    green: f64,
    blue: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDimension {
    magnitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawFontFamily {
    font_family: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLink {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTable {
    rows: usize,
    columns: usize,
    table_rows: Vec<RawTableRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTableRow {
    start_index: usize,
    end_index: usize,
    table_cells: Vec<RawTableCell>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTableCell {
    start_index: usize,
    end_index: usize,
    content: Vec<RawStructuralElement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawInlineObject {
    object_id: String,
    inline_object_properties: Option<RawInlineObjectProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawInlineObjectProperties {
    embedded_object: Option<RawEmbeddedObject>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawEmbeddedObject {
    image_properties: Option<RawImageProperties>,
    size: Option<RawSize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawImageProperties {
    content_uri: Option<String>,
    source_uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSize {
    width: Option<RawDimension>,
    height: Option<RawDimension>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawList {
    list_properties: Option<RawListProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawListProperties {
    nesting_levels: Vec<RawNestingLevel>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawNestingLevel {
    glyph_type: Option<String>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        let inline_objects = raw
            .inline_objects
            .into_iter()
            .filter_map(|(id, obj)| convert_inline_object(&id, obj).map(|o| (id, o)))
            .collect();
        let lists = raw
            .lists
            .into_iter()
            .map(|(id, list)| (id, convert_list(list)))
            .collect();
        Document {
            document_id: raw.document_id,
            title: raw.title,
            body: raw.body.content.into_iter().map(convert_element).collect(),
            inline_objects,
            lists,
        }
    }
}

fn convert_element(raw: RawStructuralElement) -> StructuralElement {
    let kind = if let Some(p) = raw.paragraph {
        ElementKind::Paragraph(convert_paragraph(p))
    } else if let Some(t) = raw.table {
        ElementKind::Table(convert_table(t))
    } else if raw.table_of_contents.is_some() {
        ElementKind::TableOfContents
    } else {
        // Section breaks carry no fields we use; unknown kinds are treated the same.
        ElementKind::SectionBreak
    };
    StructuralElement {
        start_index: raw.start_index,
        end_index: raw.end_index,
        kind,
    }
}

fn convert_paragraph(raw: RawParagraph) -> Paragraph {
    let named_style = raw
        .paragraph_style
        .and_then(|s| s.named_style_type)
        .and_then(|s| NamedStyle::from_str(&s))
        .unwrap_or_default();
    let elements = raw
        .elements
        .into_iter()
        .map(|el| {
            let kind = if let Some(run) = el.text_run {
                ParagraphElementKind::TextRun {
                    content: run.content,
                    style: convert_text_style(run.text_style),
                }
            } else if let Some(obj) = el.inline_object_element {
                ParagraphElementKind::InlineObject {
                    object_id: obj.inline_object_id,
                    style: convert_text_style(obj.text_style),
                }
            } else {
                ParagraphElementKind::Other
            };
            ParagraphElement {
                start_index: el.start_index,
                end_index: el.end_index,
                kind,
            }
        })
        .collect();
    Paragraph {
        elements,
        named_style,
        bullet: raw.bullet.map(|b| Bullet {
            list_id: b.list_id,
            nesting_level: b.nesting_level,
        }),
    }
}

fn convert_table(raw: RawTable) -> Table {
    let table_rows = raw
        .table_rows
        .into_iter()
        .map(|row| TableRow {
            start_index: row.start_index,
            end_index: row.end_index,
            cells: row
                .table_cells
                .into_iter()
                .map(|cell| TableCell {
                    start_index: cell.start_index,
                    end_index: cell.end_index,
                    content: cell.content.into_iter().map(convert_element).collect(),
                })
                .collect(),
        })
        .collect();
    Table {
        rows: raw.rows,
        columns: raw.columns,
        table_rows,
    }
}

fn convert_color(raw: Option<RawOptionalColor>) -> Option<String> {
    let rgb = raw?.color?.rgb_color?;
    Some(rgb_to_hex(rgb.red, rgb.green, rgb.blue))
}

fn convert_text_style(raw: RawTextStyle) -> TextStyle {
    TextStyle {
        bold: raw.bold,
        italic: raw.italic,
        underline: raw.underline,
        strikethrough: raw.strikethrough,
        foreground_color: convert_color(raw.foreground_color),
        background_color: convert_color(raw.background_color),
        font_size: raw.font_size.and_then(|d| d.magnitude),
        font_family: raw.weighted_font_family.map(|f| f.font_family),
        link_url: raw.link.and_then(|l| l.url),
    }
}

fn convert_inline_object(id: &str, raw: RawInlineObject) -> Option<InlineObject> {
    let embedded = raw.inline_object_properties?.embedded_object?;
    let props = embedded.image_properties?;
    let uri = props.content_uri.or(props.source_uri)?;
    let size = embedded.size.unwrap_or_default();
    let object_id = if raw.object_id.is_empty() { id.to_string() } else { raw.object_id };
    Some(InlineObject {
        object_id,
        image: ImageInfo {
            uri,
            width: size.width.and_then(|d| d.magnitude),
            height: size.height.and_then(|d| d.magnitude),
        },
    })
}

fn convert_list(raw: RawList) -> ListInfo {
    let ordered = raw
        .list_properties
        .and_then(|p| p.nesting_levels.into_iter().next())
        .and_then(|level| level.glyph_type)
        .map(|glyph| glyph != "GLYPH_TYPE_UNSPECIFIED" && glyph != "NONE")
        .unwrap_or(false);
    ListInfo { ordered }
}

/// Encode a sparse style as a remote `textStyle` object.
///
/// Only set attributes are emitted; pair with [`TextStyle::field_mask`].
pub fn text_style_to_wire(style: &TextStyle) -> Value {
    let mut out = serde_json::Map::new();
    if let Some(v) = style.bold {
        out.insert("bold".into(), json!(v));
    }
    if let Some(v) = style.italic {
        out.insert("italic".into(), json!(v));
    }
    if let Some(v) = style.underline {
        out.insert("underline".into(), json!(v));
    }
    if let Some(v) = style.strikethrough {
        out.insert("strikethrough".into(), json!(v));
    }
    if let Some(color) = style.foreground_color.as_deref() {
        out.insert("foregroundColor".into(), color_to_wire(color));
    }
    if let Some(color) = style.background_color.as_deref() {
        out.insert("backgroundColor".into(), color_to_wire(color));
    }
    if let Some(size) = style.font_size {
        out.insert("fontSize".into(), json!({ "magnitude": size, "unit": "PT" }));
    }
    if let Some(family) = style.font_family.as_deref() {
        out.insert("weightedFontFamily".into(), json!({ "fontFamily": family }));
    }
    if let Some(url) = style.link_url.as_deref() {
        out.insert("link".into(), json!({ "url": url }));
    }
    Value::Object(out)
}

fn color_to_wire(hex: &str) -> Value {
    let (red, green, blue) = hex_to_rgb(hex).unwrap_or((0.0, 0.0, 0.0));
    json!({ "color": { "rgbColor": { "red": red, "green": green, "blue": blue } } })
}
