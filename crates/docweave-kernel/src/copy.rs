//! Document-copy front end: live structural elements → run/style model.
//!
//! Consecutive paragraphs form one paragraph group; every table is its own
//! atomic group. Styles are normalized into the sparse form, images are
//! resolved through the inline-object table and anchored at their offset
//! within the paragraph.

use std::collections::HashMap;

use docweave_types::{
    Cell, ElementKind, InlineObject, Paragraph, ParagraphBlock, ParagraphElementKind,
    PositionedImage, Run, StructuralElement, Table, TableModel, push_run, utf16_len,
};

use crate::markdown::LINE_BREAK;

/// One unit of replay.
#[derive(Clone, Debug, PartialEq)]
pub enum ContentGroup {
    Paragraphs(Vec<ParagraphBlock>),
    Table(TableModel),
}

/// Group structural elements for replay.
///
/// Section breaks and tables of contents carry no replayable content and are
/// skipped.
pub fn extract_groups(
    body: &[StructuralElement],
    inline_objects: &HashMap<String, InlineObject>,
) -> Vec<ContentGroup> {
    let mut groups = Vec::new();
    let mut paragraphs: Vec<ParagraphBlock> = Vec::new();

    for element in body {
        match &element.kind {
            ElementKind::Paragraph(p) => paragraphs.push(paragraph_block(p, inline_objects)),
            ElementKind::Table(t) => {
                if !paragraphs.is_empty() {
                    groups.push(ContentGroup::Paragraphs(std::mem::take(&mut paragraphs)));
                }
                groups.push(ContentGroup::Table(table_model(t, inline_objects)));
            }
            ElementKind::SectionBreak | ElementKind::TableOfContents => {}
        }
    }
    if !paragraphs.is_empty() {
        groups.push(ContentGroup::Paragraphs(paragraphs));
    }
    groups
}

/// Extract one paragraph, dropping its terminating newline.
pub fn paragraph_block(
    paragraph: &Paragraph,
    inline_objects: &HashMap<String, InlineObject>,
) -> ParagraphBlock {
    let mut block = ParagraphBlock {
        named_style: (!paragraph.named_style.is_default()).then_some(paragraph.named_style),
        ..ParagraphBlock::default()
    };
    let mut runs = Vec::new();
    let mut offset = 0;
    for element in &paragraph.elements {
        match &element.kind {
            ParagraphElementKind::TextRun { content, style } => {
                offset += utf16_len(content);
                push_run(&mut runs, Run::styled(content.as_str(), style.normalized()));
            }
            ParagraphElementKind::InlineObject { object_id, .. } => {
                match inline_objects.get(object_id) {
                    Some(object) => block.images.push(PositionedImage {
                        offset,
                        image: object.image.clone(),
                    }),
                    None => tracing::debug!(object_id, "inline object without image properties"),
                }
            }
            ParagraphElementKind::Other => {}
        }
    }
    strip_final_newline(&mut runs);
    block.runs = runs;
    // An image recorded after the stripped newline anchors at the end.
    let len = block.text_len();
    for image in &mut block.images {
        image.offset = image.offset.min(len);
    }
    block
}

/// Extract a table as a rectangular grid of cells.
///
/// The cell's own final newline is dropped; the newlines between the
/// paragraphs of a multi-paragraph cell become [`LINE_BREAK`], so the
/// replayed cell holds one paragraph.
pub fn table_model(table: &Table, inline_objects: &HashMap<String, InlineObject>) -> TableModel {
    let cells = table
        .table_rows
        .iter()
        .map(|row| {
            row.cells
                .iter()
                .map(|cell| {
                    let mut out = Cell::default();
                    for (_, paragraph) in cell.paragraphs() {
                        for element in &paragraph.elements {
                            if let ParagraphElementKind::TextRun { content, style } = &element.kind {
                                push_run(&mut out.runs, Run::styled(content.as_str(), style.normalized()));
                            }
                        }
                    }
                    strip_final_newline(&mut out.runs);
                    for run in &mut out.runs {
                        run.text = run.text.replace('\n', &LINE_BREAK.to_string());
                    }
                    out.images = cell.images(inline_objects);
                    out
                })
                .collect()
        })
        .collect();
    TableModel::from_rows(cells)
}

fn strip_final_newline(runs: &mut Vec<Run>) {
    if let Some(last) = runs.last_mut() {
        if last.text.ends_with('\n') {
            last.text.pop();
        }
        if last.text.is_empty() {
            runs.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docweave_types::{ImageInfo, NamedStyle, ParagraphElement, TableCell, TableRow, TextStyle};

    fn run(start: usize, content: &str, style: TextStyle) -> ParagraphElement {
        ParagraphElement {
            start_index: start,
            end_index: start + utf16_len(content),
            kind: ParagraphElementKind::TextRun { content: content.to_string(), style },
        }
    }

    fn para(start: usize, elements: Vec<ParagraphElement>) -> StructuralElement {
        let end = elements.last().map(|e| e.end_index).unwrap_or(start);
        StructuralElement {
            start_index: start,
            end_index: end,
            kind: ElementKind::Paragraph(Paragraph { elements, ..Paragraph::default() }),
        }
    }

    fn objects() -> HashMap<String, InlineObject> {
        HashMap::from([(
            "obj1".to_string(),
            InlineObject {
                object_id: "obj1".into(),
                image: ImageInfo { uri: "https://img/1.png".into(), width: Some(50.0), height: Some(20.0) },
            },
        )])
    }

    #[test]
    fn test_paragraph_extraction_normalizes_and_anchors_images() {
        let black = TextStyle { foreground_color: Some("#000000".into()), bold: Some(false), ..TextStyle::default() };
        let elements = vec![
            run(1, "Hi ", black),
            ParagraphElement {
                start_index: 4,
                end_index: 5,
                kind: ParagraphElementKind::InlineObject { object_id: "obj1".into(), style: TextStyle::default() },
            },
            run(5, "there", TextStyle::bold()),
            run(10, "\n", TextStyle::default()),
        ];
        let p = Paragraph { elements, named_style: NamedStyle::Heading2, bullet: None };
        let block = paragraph_block(&p, &objects());

        assert_eq!(block.named_style, Some(NamedStyle::Heading2));
        assert_eq!(block.runs, vec![Run::plain("Hi "), Run::styled("there", TextStyle::bold())]);
        assert_eq!(block.images.len(), 1);
        assert_eq!(block.images[0].offset, 3);
        assert_eq!(block.images[0].image.width, Some(50.0));
    }

    #[test]
    fn test_groups_split_on_tables() {
        let cell = |start: usize, text: &str| TableCell {
            start_index: start,
            end_index: start + 1 + utf16_len(text),
            content: vec![para(start + 1, vec![run(start + 1, text, TextStyle::default())])],
        };
        let table = StructuralElement {
            start_index: 7,
            end_index: 20,
            kind: ElementKind::Table(Table {
                rows: 1,
                columns: 2,
                table_rows: vec![TableRow {
                    start_index: 8,
                    end_index: 19,
                    cells: vec![cell(9, "a\n"), cell(12, "b\nc\n")],
                }],
            }),
        };
        let body = vec![
            StructuralElement { start_index: 0, end_index: 1, kind: ElementKind::SectionBreak },
            para(1, vec![run(1, "Intro\n", TextStyle::default())]),
            table,
            para(20, vec![run(20, "\n", TextStyle::default())]),
        ];

        let groups = extract_groups(&body, &HashMap::new());
        assert_eq!(groups.len(), 3);
        match &groups[1] {
            ContentGroup::Table(model) => {
                assert_eq!((model.rows, model.columns), (1, 2));
                assert_eq!(model.cells[0][0].text(), "a");
                assert_eq!(model.cells[0][1].text(), format!("b{LINE_BREAK}c"));
            }
            other => panic!("expected table group, got {:?}", other),
        }
        match &groups[2] {
            ContentGroup::Paragraphs(blocks) => {
                assert_eq!(blocks.len(), 1);
                assert!(blocks[0].is_blank());
            }
            other => panic!("expected paragraph group, got {:?}", other),
        }
    }
}
