//! In-memory document backend.
//!
//! Used for tests and the `memory` backend. Each document is a flat vector of
//! one-index-wide slots, so a request's effect on later offsets is exactly
//! what the remote API does:
//!
//! ```text
//! 0            1   2   3    4          5       6        7    8     9
//! SectionBreak 'H' 'i' '\n' TableStart RowStart CellStart '\n' TableEnd '\n'
//! └ section ┘ └ paragraph ┘ └──────────────── table ───────────────┘ └ para ┘
//! ```
//!
//! Batches are atomic: they are applied to a copy and committed only when
//! every request succeeds. All data is lost when dropped.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use docweave_types::{
    Bullet, DocError, Document, ElementKind, ImageInfo, InlineObject, ListInfo,
    NamedStyle, Paragraph, ParagraphElement, ParagraphElementKind, Request, Result,
    StructuralElement, Table, TableCell, TableRow, TextStyle,
};

use crate::api::DocsApi;

const TAB: u16 = 0x09;

/// One index slot.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    SectionBreak,
    Unit { unit: u16, style: TextStyle },
    Object { object_id: String, style: TextStyle },
    ParagraphEnd { named_style: NamedStyle, bullet: Option<Bullet>, style: TextStyle },
    TableStart { columns: usize },
    RowStart,
    CellStart,
    TableEnd,
}

impl Slot {
    fn is_content(&self) -> bool {
        matches!(self, Slot::Unit { .. } | Slot::Object { .. } | Slot::ParagraphEnd { .. })
    }

    fn text_style_mut(&mut self) -> Option<&mut TextStyle> {
        match self {
            Slot::Unit { style, .. } | Slot::Object { style, .. } | Slot::ParagraphEnd { style, .. } => {
                Some(style)
            }
            _ => None,
        }
    }

    fn paragraph_end(named_style: NamedStyle, bullet: Option<Bullet>) -> Self {
        Slot::ParagraphEnd { named_style, bullet, style: TextStyle::default() }
    }
}

#[derive(Debug, Clone)]
struct MemDoc {
    title: String,
    slots: Vec<Slot>,
    objects: HashMap<String, ImageInfo>,
    /// List id → ordered.
    lists: HashMap<String, bool>,
    next_object: u64,
    next_list: u64,
    batches: usize,
}

impl MemDoc {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            slots: vec![Slot::SectionBreak, Slot::paragraph_end(NamedStyle::NormalText, None)],
            objects: HashMap::new(),
            lists: HashMap::new(),
            next_object: 0,
            next_list: 0,
            batches: 0,
        }
    }
}

/// In-memory implementation of [`DocsApi`].
///
/// Thread-safe via internal `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryDocs {
    docs: RwLock<HashMap<String, MemDoc>>,
    unreachable: RwLock<HashSet<String>>,
}

impl MemoryDocs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make image insertion fail for this URI.
    pub fn mark_unreachable(&self, uri: &str) {
        self.unreachable.write().insert(uri.to_string());
    }

    /// Number of committed batch calls.
    pub fn batch_count(&self, document_id: &str) -> usize {
        self.docs.read().get(document_id).map(|d| d.batches).unwrap_or(0)
    }

    /// Body text with structure markers dropped; objects render as U+FFFC.
    pub fn plain_text(&self, document_id: &str) -> Result<String> {
        let docs = self.docs.read();
        let doc = docs
            .get(document_id)
            .ok_or_else(|| DocError::NotFound(format!("document {document_id}")))?;
        let mut units = Vec::new();
        for slot in &doc.slots {
            match slot {
                Slot::Unit { unit, .. } => units.push(*unit),
                Slot::Object { .. } => units.push(0xFFFC),
                Slot::ParagraphEnd { .. } => units.push(u16::from(b'\n')),
                _ => {}
            }
        }
        Ok(String::from_utf16_lossy(&units))
    }

    fn render(document_id: &str, doc: &MemDoc) -> Document {
        let mut pos = 0;
        let body = parse_elements(&doc.slots, &mut pos, false);

        let inline_objects = doc
            .objects
            .iter()
            .map(|(id, image)| {
                (id.clone(), InlineObject { object_id: id.clone(), image: image.clone() })
            })
            .collect();
        let lists = doc
            .lists
            .iter()
            .map(|(id, ordered)| (id.clone(), ListInfo { ordered: *ordered }))
            .collect();

        Document {
            document_id: document_id.to_string(),
            title: doc.title.clone(),
            body,
            inline_objects,
            lists,
        }
    }
}

// ============================================================================
// Rendering slots into the read model
// ============================================================================

fn parse_elements(slots: &[Slot], pos: &mut usize, in_cell: bool) -> Vec<StructuralElement> {
    let mut elements = Vec::new();
    while let Some(slot) = slots.get(*pos) {
        match slot {
            Slot::SectionBreak => {
                elements.push(StructuralElement {
                    start_index: *pos,
                    end_index: *pos + 1,
                    kind: ElementKind::SectionBreak,
                });
                *pos += 1;
            }
            Slot::TableStart { .. } => elements.push(parse_table(slots, pos)),
            Slot::RowStart | Slot::CellStart | Slot::TableEnd => {
                if in_cell {
                    break;
                }
                // Stray marker; skip it rather than loop.
                *pos += 1;
            }
            Slot::Unit { .. } | Slot::Object { .. } | Slot::ParagraphEnd { .. } => {
                elements.push(parse_paragraph(slots, pos));
            }
        }
    }
    elements
}

fn parse_paragraph(slots: &[Slot], pos: &mut usize) -> StructuralElement {
    let start = *pos;
    let mut elements: Vec<ParagraphElement> = Vec::new();
    let mut units: Vec<u16> = Vec::new();
    let mut run_start = start;
    let mut run_style: Option<TextStyle> = None;

    fn flush(
        elements: &mut Vec<ParagraphElement>,
        units: &mut Vec<u16>,
        run_start: usize,
        style: &mut Option<TextStyle>,
    ) {
        if let Some(style) = style.take() {
            let end = run_start + units.len();
            elements.push(ParagraphElement {
                start_index: run_start,
                end_index: end,
                kind: ParagraphElementKind::TextRun {
                    content: String::from_utf16_lossy(units),
                    style,
                },
            });
            units.clear();
        }
    }

    let mut named_style = NamedStyle::NormalText;
    let mut bullet = None;
    while let Some(slot) = slots.get(*pos) {
        match slot {
            Slot::Unit { unit, style } => {
                if run_style.as_ref() != Some(style) {
                    flush(&mut elements, &mut units, run_start, &mut run_style);
                    run_start = *pos;
                    run_style = Some(style.clone());
                }
                units.push(*unit);
                *pos += 1;
            }
            Slot::Object { object_id, style } => {
                flush(&mut elements, &mut units, run_start, &mut run_style);
                elements.push(ParagraphElement {
                    start_index: *pos,
                    end_index: *pos + 1,
                    kind: ParagraphElementKind::InlineObject {
                        object_id: object_id.clone(),
                        style: style.clone(),
                    },
                });
                *pos += 1;
            }
            Slot::ParagraphEnd { named_style: ns, bullet: b, style } => {
                // The newline joins the last run when styles match.
                if run_style.as_ref() != Some(style) {
                    flush(&mut elements, &mut units, run_start, &mut run_style);
                    run_start = *pos;
                    run_style = Some(style.clone());
                }
                units.push(u16::from(b'\n'));
                flush(&mut elements, &mut units, run_start, &mut run_style);
                named_style = *ns;
                bullet = b.clone();
                *pos += 1;
                break;
            }
            _ => break,
        }
    }

    StructuralElement {
        start_index: start,
        end_index: *pos,
        kind: ElementKind::Paragraph(Paragraph { elements, named_style, bullet }),
    }
}

fn parse_table(slots: &[Slot], pos: &mut usize) -> StructuralElement {
    let start = *pos;
    let columns = match slots.get(*pos) {
        Some(Slot::TableStart { columns }) => *columns,
        _ => 0,
    };
    *pos += 1;

    let mut table_rows = Vec::new();
    while matches!(slots.get(*pos), Some(Slot::RowStart)) {
        let row_start = *pos;
        *pos += 1;
        let mut cells = Vec::new();
        while matches!(slots.get(*pos), Some(Slot::CellStart)) {
            let cell_start = *pos;
            *pos += 1;
            let content = parse_elements(slots, pos, true);
            cells.push(TableCell { start_index: cell_start, end_index: *pos, content });
        }
        table_rows.push(TableRow { start_index: row_start, end_index: *pos, cells });
    }
    if matches!(slots.get(*pos), Some(Slot::TableEnd)) {
        *pos += 1;
    }

    StructuralElement {
        start_index: start,
        end_index: *pos,
        kind: ElementKind::Table(Table { rows: table_rows.len(), columns, table_rows }),
    }
}

// ============================================================================
// Applying requests
// ============================================================================

/// Table spans and their cells' content spans, for structural validation.
struct TableSpan {
    start: usize,
    end: usize,
    /// `(content_start, content_end)` per cell.
    cells: Vec<(usize, usize)>,
}

fn table_spans(slots: &[Slot]) -> Vec<TableSpan> {
    let mut spans = Vec::new();
    let mut current: Option<TableSpan> = None;
    let mut cell_start: Option<usize> = None;
    for (i, slot) in slots.iter().enumerate() {
        match slot {
            Slot::TableStart { .. } => {
                current = Some(TableSpan { start: i, end: i, cells: Vec::new() });
            }
            Slot::RowStart | Slot::CellStart | Slot::TableEnd => {
                if let (Some(span), Some(cs)) = (current.as_mut(), cell_start.take()) {
                    span.cells.push((cs, i));
                }
                if matches!(slot, Slot::CellStart) {
                    cell_start = Some(i + 1);
                }
                if matches!(slot, Slot::TableEnd) {
                    if let Some(mut span) = current.take() {
                        span.end = i + 1;
                        spans.push(span);
                    }
                }
            }
            _ => {}
        }
    }
    spans
}

fn invalid(i: usize, request: &Request, reason: impl std::fmt::Display) -> DocError {
    DocError::Remote {
        message: format!("Invalid requests[{i}].{}: {reason}", request.kind()),
        status: Some(400),
    }
}

/// Index of the paragraph end that terminates the paragraph containing `index`.
fn paragraph_end_at(slots: &[Slot], index: usize) -> Option<usize> {
    (index..slots.len()).find(|&i| matches!(slots[i], Slot::ParagraphEnd { .. }))
}

/// Paragraph ranges `[start, end_slot]` overlapping `[start, end)`.
fn overlapping_paragraphs(slots: &[Slot], start: usize, end: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut para_start = 0;
    for (i, slot) in slots.iter().enumerate() {
        match slot {
            Slot::ParagraphEnd { .. } => {
                if para_start < end && i + 1 > start {
                    out.push((para_start, i));
                }
                para_start = i + 1;
            }
            Slot::Unit { .. } | Slot::Object { .. } => {}
            _ => para_start = i + 1,
        }
    }
    out
}

fn check_content_index(doc: &MemDoc, index: usize) -> std::result::Result<(), String> {
    match doc.slots.get(index) {
        Some(slot) if index > 0 && slot.is_content() => Ok(()),
        Some(_) => Err(format!("index {index} must be inside the bounds of an existing paragraph")),
        None => Err(format!(
            "index {index} must be less than the end index of the referenced segment, {}",
            doc.slots.len()
        )),
    }
}

fn check_range(doc: &MemDoc, start: usize, end: usize) -> std::result::Result<(), String> {
    if start == 0 || start >= end || end > doc.slots.len() {
        return Err(format!("invalid range [{start}, {end}) for segment of length {}", doc.slots.len()));
    }
    Ok(())
}

fn apply(doc: &mut MemDoc, i: usize, request: &Request, unreachable: &HashSet<String>) -> Result<()> {
    match request {
        Request::InsertText { index, text } => {
            if text.is_empty() {
                return Err(invalid(i, request, "text must not be empty"));
            }
            check_content_index(doc, *index).map_err(|e| invalid(i, request, e))?;
            let (named_style, bullet) = match paragraph_end_at(&doc.slots, *index).map(|p| &doc.slots[p]) {
                Some(Slot::ParagraphEnd { named_style, bullet, .. }) => (*named_style, bullet.clone()),
                _ => (NamedStyle::NormalText, None),
            };
            let new_slots: Vec<Slot> = text
                .encode_utf16()
                .map(|unit| {
                    if unit == u16::from(b'\n') {
                        Slot::paragraph_end(named_style, bullet.clone())
                    } else {
                        Slot::Unit { unit, style: TextStyle::default() }
                    }
                })
                .collect();
            doc.slots.splice(*index..*index, new_slots);
        }

        Request::DeleteRange { start, end } => {
            check_range(doc, *start, *end).map_err(|e| invalid(i, request, e))?;
            if *end >= doc.slots.len() {
                return Err(invalid(i, request, "the final newline of the body cannot be deleted"));
            }
            for span in table_spans(&doc.slots) {
                let intersects = *start < span.end && *end > span.start;
                let covers = *start <= span.start && *end >= span.end;
                if !intersects || covers {
                    continue;
                }
                match span.cells.iter().find(|(cs, ce)| *start >= *cs && *end <= *ce) {
                    Some((_, ce)) if *end < *ce => {}
                    Some(_) => {
                        return Err(invalid(i, request, "the final newline of a table cell cannot be deleted"));
                    }
                    None => return Err(invalid(i, request, "a deletion cannot partially cover a table")),
                }
            }
            doc.slots.drain(*start..*end);
        }

        Request::UpdateTextStyle { start, end, style } => {
            check_range(doc, *start, *end).map_err(|e| invalid(i, request, e))?;
            for slot in &mut doc.slots[*start..*end] {
                if let Some(existing) = slot.text_style_mut() {
                    existing.merge(style);
                }
            }
        }

        Request::UpdateParagraphStyle { start, end, named_style } => {
            check_range(doc, *start, *end).map_err(|e| invalid(i, request, e))?;
            for (_, p) in overlapping_paragraphs(&doc.slots, *start, *end) {
                if let Slot::ParagraphEnd { named_style: ns, .. } = &mut doc.slots[p] {
                    *ns = *named_style;
                }
            }
        }

        Request::CreateListBullets { start, end, preset } => {
            check_range(doc, *start, *end).map_err(|e| invalid(i, request, e))?;
            let paragraphs = overlapping_paragraphs(&doc.slots, *start, *end);
            if paragraphs.is_empty() {
                return Ok(());
            }
            doc.next_list += 1;
            let list_id = format!("kix.list{}", doc.next_list);
            doc.lists.insert(list_id.clone(), preset.is_ordered());
            // Leading tabs become the nesting level and are removed; last
            // paragraph first so earlier starts stay put.
            for &(para_start, para_end) in paragraphs.iter().rev() {
                let tabs = doc.slots[para_start..para_end]
                    .iter()
                    .take_while(|slot| matches!(slot, Slot::Unit { unit, .. } if *unit == TAB))
                    .count();
                if let Slot::ParagraphEnd { bullet, .. } = &mut doc.slots[para_end] {
                    *bullet = Some(Bullet { list_id: list_id.clone(), nesting_level: tabs as u32 });
                }
                doc.slots.drain(para_start..para_start + tabs);
            }
        }

        Request::DeleteParagraphBullets { start, end } => {
            check_range(doc, *start, *end).map_err(|e| invalid(i, request, e))?;
            for (_, p) in overlapping_paragraphs(&doc.slots, *start, *end) {
                if let Slot::ParagraphEnd { bullet, .. } = &mut doc.slots[p] {
                    *bullet = None;
                }
            }
        }

        Request::InsertTable { index, rows, columns } => {
            if *rows == 0 || *columns == 0 {
                return Err(invalid(i, request, "a table needs at least one row and one column"));
            }
            check_content_index(doc, *index).map_err(|e| invalid(i, request, e))?;
            if table_spans(&doc.slots).iter().any(|s| *index > s.start && *index < s.end) {
                return Err(invalid(i, request, "nested tables are not supported"));
            }
            let (named_style, bullet) = match paragraph_end_at(&doc.slots, *index).map(|p| &doc.slots[p]) {
                Some(Slot::ParagraphEnd { named_style, bullet, .. }) => (*named_style, bullet.clone()),
                _ => (NamedStyle::NormalText, None),
            };
            let mut new_slots = vec![Slot::paragraph_end(named_style, bullet), Slot::TableStart { columns: *columns }];
            for _ in 0..*rows {
                new_slots.push(Slot::RowStart);
                for _ in 0..*columns {
                    new_slots.push(Slot::CellStart);
                    new_slots.push(Slot::paragraph_end(NamedStyle::NormalText, None));
                }
            }
            new_slots.push(Slot::TableEnd);
            doc.slots.splice(*index..*index, new_slots);
        }

        Request::InsertInlineImage { index, image } => {
            if unreachable.contains(&image.uri) {
                return Err(invalid(i, request, format!("image at {} could not be retrieved", image.uri)));
            }
            check_content_index(doc, *index).map_err(|e| invalid(i, request, e))?;
            doc.next_object += 1;
            let object_id = format!("kix.obj{}", doc.next_object);
            doc.objects.insert(object_id.clone(), image.clone());
            doc.slots.insert(*index, Slot::Object { object_id, style: TextStyle::default() });
        }

        Request::InsertTableRow { table_start, row_index, insert_below } => {
            let span = table_spans(&doc.slots)
                .into_iter()
                .find(|s| s.start == *table_start)
                .ok_or_else(|| invalid(i, request, format!("no table starts at index {table_start}")))?;
            let columns = match &doc.slots[span.start] {
                Slot::TableStart { columns } => *columns,
                _ => 0,
            };
            let row_starts: Vec<usize> = (span.start..span.end)
                .filter(|&p| matches!(doc.slots[p], Slot::RowStart))
                .collect();
            let Some(&row_start) = row_starts.get(*row_index) else {
                return Err(invalid(
                    i,
                    request,
                    format!("row {row_index} is out of range (table has {} rows)", row_starts.len()),
                ));
            };
            let at = if *insert_below {
                row_starts.get(row_index + 1).copied().unwrap_or(span.end - 1)
            } else {
                row_start
            };
            let mut new_slots = vec![Slot::RowStart];
            for _ in 0..columns {
                new_slots.push(Slot::CellStart);
                new_slots.push(Slot::paragraph_end(NamedStyle::NormalText, None));
            }
            doc.slots.splice(at..at, new_slots);
        }
    }
    Ok(())
}

#[async_trait]
impl DocsApi for MemoryDocs {
    async fn get_document(&self, document_id: &str) -> Result<Document> {
        let docs = self.docs.read();
        let doc = docs
            .get(document_id)
            .ok_or_else(|| DocError::NotFound(format!("document {document_id}")))?;
        Ok(Self::render(document_id, doc))
    }

    async fn batch_update(&self, document_id: &str, requests: &[Request]) -> Result<()> {
        let unreachable = self.unreachable.read().clone();
        let mut docs = self.docs.write();
        let doc = docs
            .get_mut(document_id)
            .ok_or_else(|| DocError::NotFound(format!("document {document_id}")))?;

        let mut working = doc.clone();
        for (i, request) in requests.iter().enumerate() {
            apply(&mut working, i, request, &unreachable)?;
        }
        working.batches += 1;
        *doc = working;
        Ok(())
    }

    async fn create_document(&self, title: &str) -> Result<Document> {
        let document_id = format!("mem-{}", uuid::Uuid::new_v4().simple());
        let doc = MemDoc::new(title);
        let rendered = Self::render(&document_id, &doc);
        self.docs.write().insert(document_id, doc);
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docweave_types::BulletPreset;

    async fn new_doc(docs: &MemoryDocs) -> String {
        docs.create_document("test").await.unwrap().document_id
    }

    #[tokio::test]
    async fn test_new_document_layout() {
        let docs = MemoryDocs::new();
        let id = new_doc(&docs).await;
        let doc = docs.get_document(&id).await.unwrap();
        assert_eq!(doc.body.len(), 2);
        assert!(matches!(doc.body[0].kind, ElementKind::SectionBreak));
        assert_eq!((doc.body[1].start_index, doc.body[1].end_index), (1, 2));
        assert_eq!(doc.end_index(), 2);
    }

    #[tokio::test]
    async fn test_insert_splits_paragraphs_and_inherits_style() {
        let docs = MemoryDocs::new();
        let id = new_doc(&docs).await;
        docs.batch_update(
            &id,
            &[
                Request::UpdateParagraphStyle { start: 1, end: 2, named_style: NamedStyle::Heading1 },
                Request::InsertText { index: 1, text: "ab\ncd".into() },
            ],
        )
        .await
        .unwrap();

        let doc = docs.get_document(&id).await.unwrap();
        let paras: Vec<_> = doc.body.iter().filter_map(|e| e.as_paragraph()).collect();
        assert_eq!(paras.len(), 2);
        assert_eq!(paras[0].text(), "ab\n");
        assert_eq!(paras[1].text(), "cd\n");
        assert!(paras.iter().all(|p| p.named_style == NamedStyle::Heading1));
        assert_eq!(doc.end_index(), 7);
    }

    #[tokio::test]
    async fn test_batch_is_atomic() {
        let docs = MemoryDocs::new();
        let id = new_doc(&docs).await;
        let err = docs
            .batch_update(
                &id,
                &[
                    Request::InsertText { index: 1, text: "kept?".into() },
                    Request::DeleteRange { start: 1, end: 7 },
                ],
            )
            .await
            .unwrap_err();
        assert!(err.is_remote());
        assert_eq!(docs.plain_text(&id).unwrap(), "\n");
        assert_eq!(docs.batch_count(&id), 0);
    }

    #[tokio::test]
    async fn test_table_layout_and_cell_guards() {
        let docs = MemoryDocs::new();
        let id = new_doc(&docs).await;
        docs.batch_update(
            &id,
            &[
                Request::InsertText { index: 1, text: "Hi".into() },
                Request::InsertTable { index: 3, rows: 2, columns: 2 },
            ],
        )
        .await
        .unwrap();

        let doc = docs.get_document(&id).await.unwrap();
        let table = doc.table(0).unwrap();
        // "Hi\n" 1..4, table from 4
        assert_eq!(table.start_index, 4);
        assert_eq!(table.table.rows, 2);
        assert_eq!(table.table.columns, 2);
        let cell = table.table.cell(0, 0).unwrap();
        assert_eq!(cell.start_index, 6);
        assert_eq!(cell.first_content_index(), 7);
        assert_eq!(table.table.cell(1, 1).unwrap().first_content_index(), 14);
        // start + 1 + rows * (1 + 2 * cols) + 1
        assert_eq!(table.end_index, 4 + 1 + 2 * 5 + 1);
        assert!(doc.body.last().unwrap().as_paragraph().is_some());

        // Deleting a cell's only newline is rejected.
        let err = docs
            .batch_update(&id, &[Request::DeleteRange { start: 7, end: 8 }])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("table cell"));

        // Partially covering a table is rejected; covering it whole is fine.
        let err = docs
            .batch_update(&id, &[Request::DeleteRange { start: 2, end: 6 }])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("partially"));
        docs.batch_update(&id, &[Request::DeleteRange { start: 1, end: 16 }])
            .await
            .unwrap();
        assert_eq!(docs.plain_text(&id).unwrap(), "\n");
    }

    #[tokio::test]
    async fn test_row_insertion() {
        let docs = MemoryDocs::new();
        let id = new_doc(&docs).await;
        docs.batch_update(&id, &[Request::InsertTable { index: 1, rows: 1, columns: 3 }])
            .await
            .unwrap();
        let start = docs.get_document(&id).await.unwrap().table(0).unwrap().start_index;
        docs.batch_update(
            &id,
            &[Request::InsertTableRow { table_start: start, row_index: 0, insert_below: true }],
        )
        .await
        .unwrap();
        let doc = docs.get_document(&id).await.unwrap();
        assert_eq!(doc.table(0).unwrap().table.rows, 2);

        let err = docs
            .batch_update(
                &id,
                &[Request::InsertTableRow { table_start: start, row_index: 9, insert_below: false }],
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn test_bullet_tabs_set_nesting_and_are_removed() {
        let docs = MemoryDocs::new();
        let id = new_doc(&docs).await;
        docs.batch_update(
            &id,
            &[
                Request::InsertText { index: 1, text: "a\n\tb\n\t\tc\nd".into() },
                Request::CreateListBullets { start: 1, end: 10, preset: BulletPreset::Decimal },
                Request::CreateListBullets { start: 7, end: 8, preset: BulletPreset::Disc },
            ],
        )
        .await
        .unwrap();
        assert_eq!(docs.plain_text(&id).unwrap(), "a\nb\nc\nd\n");

        let doc = docs.get_document(&id).await.unwrap();
        let bullets: Vec<_> = doc
            .body
            .iter()
            .filter_map(|e| e.as_paragraph())
            .map(|p| p.bullet.clone().unwrap())
            .collect();
        let levels: Vec<u32> = bullets.iter().map(|b| b.nesting_level).collect();
        assert_eq!(levels, vec![0, 1, 2, 0]);
        assert_eq!(bullets[0].list_id, bullets[2].list_id);
        assert_ne!(bullets[2].list_id, bullets[3].list_id);
        assert!(doc.is_ordered_list(&bullets[0].list_id));
        assert!(!doc.is_ordered_list(&bullets[3].list_id));
    }

    #[tokio::test]
    async fn test_runs_group_by_style() {
        let docs = MemoryDocs::new();
        let id = new_doc(&docs).await;
        docs.batch_update(
            &id,
            &[
                Request::InsertText { index: 1, text: "plain bold".into() },
                Request::UpdateTextStyle { start: 7, end: 11, style: TextStyle::bold() },
            ],
        )
        .await
        .unwrap();
        let doc = docs.get_document(&id).await.unwrap();
        let p = doc.body[1].as_paragraph().unwrap();
        assert_eq!(p.elements.len(), 3);
        match &p.elements[1].kind {
            ParagraphElementKind::TextRun { content, style } => {
                assert_eq!(content, "bold");
                assert_eq!(style.bold, Some(true));
            }
            other => panic!("expected text run, got {:?}", other),
        }
    }
}
