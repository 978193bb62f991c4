//! End-to-end properties of the engine against the in-memory backend.
//!
//! # Tiers
//!
//! - **Tier 0:** planning only. Parse and build without a backend.
//! - **Tier 1:** writes through [`DocEngine`], verified by reading back.
//! - **Tier 2:** copy and snapshot replay, verified by comparing extracted
//!   content between two documents.

use std::sync::Arc;

use docweave_kernel::builder::build_markdown_batch;
use docweave_kernel::copy::table_model;
use docweave_kernel::markdown::parse_markdown;
use docweave_kernel::{
    CellEdit, CellImage, DocEngine, DocError, DocsApi, EngineConfig, MemoryDocs, WriteMode,
    render_markdown,
};
use docweave_types::{ImageInfo, Request, TextStyle};

// ============================================================================
// Shared test setup
// ============================================================================

fn engine_with(config: EngineConfig) -> (Arc<MemoryDocs>, DocEngine) {
    let docs = Arc::new(MemoryDocs::new());
    let engine = DocEngine::new(docs.clone(), config);
    (docs, engine)
}

fn engine() -> (Arc<MemoryDocs>, DocEngine) {
    engine_with(EngineConfig::default())
}

async fn new_doc(engine: &DocEngine) -> String {
    engine.create_document("props").await.unwrap().document_id
}

/// Plain text of every cell of the first table, row-major.
async fn first_table_text(docs: &MemoryDocs, id: &str) -> Vec<Vec<String>> {
    let doc = docs.get_document(id).await.unwrap();
    let table = doc.table(0).unwrap().table;
    table.table_rows.iter().map(|row| row.cells.iter().map(|c| c.text()).collect()).collect()
}

const GRID: &str = "| h1 | h2 | h3 |\n|---|---|---|\n| a | b | c |\n| d | e | f |";

// ============================================================================
// Tier 0: planning
// ============================================================================

#[test]
fn offsets_stay_inside_the_inserted_text() {
    let md = "# Head\n\nSome **bold** and *it*.\n\n- one\n- two\n\n1. first\n\nTail `code`";
    let parse = parse_markdown(md, 7).unwrap();
    let batch = build_markdown_batch(&parse);

    let Request::InsertText { index, text } = &batch.requests[0] else {
        panic!("first request must insert text: {:?}", batch.requests[0]);
    };
    assert_eq!(*index, 7);
    // The final block's terminator is the existing paragraph's newline.
    let end = index + text.encode_utf16().count() + 1;

    let mut previous_style_start = 0;
    for request in &batch.requests[1..] {
        let (start, stop) = match request {
            Request::UpdateParagraphStyle { start, end, .. }
            | Request::UpdateTextStyle { start, end, .. }
            | Request::CreateListBullets { start, end, .. } => (*start, *end),
            other => panic!("unexpected request {other:?}"),
        };
        assert!(start >= 7 && start < stop && stop <= end, "{request:?} outside [7, {end})");
        if let Request::UpdateTextStyle { .. } = request {
            assert!(start >= previous_style_start, "run styles go forward");
            previous_style_start = start;
        }
    }
}

#[test]
fn default_styles_produce_no_requests() {
    let parse = parse_markdown("plain text only\n\nand another paragraph", 1).unwrap();
    let batch = build_markdown_batch(&parse);
    assert_eq!(
        batch.requests,
        vec![Request::InsertText { index: 1, text: "plain text only\nand another paragraph".into() }]
    );
}

// ============================================================================
// Tier 1: writes
// ============================================================================

#[tokio::test]
async fn markdown_round_trip() {
    let (_docs, engine) = engine();
    let id = new_doc(&engine).await;
    let md = "# Title\n\n\
              Some **bold** and *italic* and ~~gone~~ with [a link](https://example.com).\n\n\
              ## Sub\n\n\
              - one\n- two\n\n\
              1. first\n2. second\n";
    engine.write_markdown(&id, md, WriteMode::Replace).await.unwrap();
    assert_eq!(engine.read_markdown(&id).await.unwrap(), md);
}

#[tokio::test]
async fn nested_lists_keep_levels_and_numbering() {
    let (_docs, engine) = engine();
    let id = new_doc(&engine).await;
    let md = "1. a\n   1. x\n   2. y\n2. b\n\n- top\n  - inner\n- next\n";
    engine.write_markdown(&id, md, WriteMode::Replace).await.unwrap();
    assert_eq!(engine.read_markdown(&id).await.unwrap(), md);
}

#[tokio::test]
async fn sub_list_does_not_split_its_parent_list() {
    let (docs, engine) = engine();
    let id = new_doc(&engine).await;
    engine.write_markdown(&id, "1. a\n   - x\n2. b\n", WriteMode::Replace).await.unwrap();

    let doc = docs.get_document(&id).await.unwrap();
    let bullets: Vec<_> = doc
        .body
        .iter()
        .filter_map(|e| e.as_paragraph())
        .filter_map(|p| p.bullet.clone())
        .collect();
    let levels: Vec<u32> = bullets.iter().map(|b| b.nesting_level).collect();
    assert_eq!(levels, vec![0, 1, 0]);
    assert!(bullets.iter().all(|b| b.list_id == bullets[0].list_id));
    assert_eq!(docs.plain_text(&id).unwrap(), "a\nx\nb\n");
    // One native list: numbering continues and the nested level takes the
    // kind of its top-level list.
    assert_eq!(engine.read_markdown(&id).await.unwrap(), "1. a\n   1. x\n2. b\n");
}

#[tokio::test]
async fn table_splits_the_write_into_passes() {
    let (docs, engine) = engine();
    let id = new_doc(&engine).await;
    let md = "Intro\n\n| A | B |\n|---|---|\n| 1 | 2 |\n\nOutro";
    let report = engine.write_markdown(&id, md, WriteMode::Replace).await.unwrap();
    assert_eq!(report.passes, 2);
    assert_eq!(report.tables_filled, 1);

    let doc = docs.get_document(&id).await.unwrap();
    let table = doc.table(0).unwrap();
    let header = table.table.cell(0, 0).unwrap();
    assert_eq!(header.text(), "A");
    let (_, header_para) = header.paragraphs().next().unwrap();
    assert!(header_para.elements.iter().any(|e| matches!(
        &e.kind,
        docweave_types::ParagraphElementKind::TextRun { style, .. } if style.bold == Some(true)
    )));
    assert_eq!(
        render_markdown(&doc),
        "Intro\n\n| A | B |\n|---|---|\n| 1 | 2 |\n\nOutro\n"
    );
}

#[tokio::test]
async fn chunked_writes_match_single_batch_writes() {
    let md = (0..40)
        .map(|i| format!("Paragraph {i} with **bold {i}** and *em*"))
        .collect::<Vec<_>>()
        .join("\n\n");

    let (small_docs, small) = engine_with(EngineConfig {
        batch: docweave_kernel::BatchConfig { max_requests_per_batch: 7 },
        ..EngineConfig::default()
    });
    let (big_docs, big) = engine();
    let a = new_doc(&small).await;
    let b = new_doc(&big).await;
    small.write_markdown(&a, &md, WriteMode::Replace).await.unwrap();
    big.write_markdown(&b, &md, WriteMode::Replace).await.unwrap();

    assert!(small_docs.batch_count(&a) > big_docs.batch_count(&b));
    assert_eq!(small.read_markdown(&a).await.unwrap(), big.read_markdown(&b).await.unwrap());
}

#[tokio::test]
async fn batch_cell_edits_land_in_their_cells() {
    let (docs, engine) = engine();
    let id = new_doc(&engine).await;
    engine.write_markdown(&id, GRID, WriteMode::Replace).await.unwrap();

    // Growing, shrinking and emptying cells in one batch, listed out of order.
    let edits = vec![
        CellEdit::plain(1, 0, "a much longer replacement"),
        CellEdit::plain(2, 2, ""),
        CellEdit { row: 0, col: 1, text: "H".into(), style: Some(TextStyle::italic()) },
        CellEdit::plain(2, 0, "dd"),
        CellEdit::plain(1, 2, "x"),
    ];
    engine.edit_table_cells(&id, 0, &edits).await.unwrap();

    let text = first_table_text(&docs, &id).await;
    assert_eq!(
        text,
        vec![
            vec!["h1", "H", "h3"],
            vec!["a much longer replacement", "b", "x"],
            vec!["dd", "e", ""],
        ]
    );
}

#[tokio::test]
async fn replacing_cell_text_keeps_its_image() {
    let (docs, engine) = engine();
    let id = new_doc(&engine).await;
    engine.write_markdown(&id, GRID, WriteMode::Replace).await.unwrap();
    engine
        .insert_table_images(
            &id,
            0,
            &[CellImage { row: 1, col: 1, image: ImageInfo::new("https://img/cell.png") }],
        )
        .await
        .unwrap();

    engine
        .edit_table_cells(&id, 0, &[CellEdit::plain(1, 1, "replaced")])
        .await
        .unwrap();

    let doc = docs.get_document(&id).await.unwrap();
    let cell = doc.table(0).unwrap().table.cell(1, 1).unwrap();
    assert_eq!(cell.text(), "replaced");
    assert_eq!(cell.images(&doc.inline_objects), vec![ImageInfo::new("https://img/cell.png")]);
}

#[tokio::test]
async fn out_of_range_rows_and_tables_are_reported() {
    let (docs, engine) = engine();
    let id = new_doc(&engine).await;
    engine.write_markdown(&id, GRID, WriteMode::Replace).await.unwrap();

    let err = engine.insert_table_row(&id, 0, 5, true).await.unwrap_err();
    assert_eq!(err, DocError::OutOfBounds { what: "row", index: 5, len: 3 });
    assert!(err.to_string().contains("[0, 3)"));

    let err = engine
        .edit_table_cells(&id, 0, &[CellEdit::plain(0, 7, "x")])
        .await
        .unwrap_err();
    assert_eq!(err, DocError::OutOfBounds { what: "column", index: 7, len: 3 });

    let err = engine.insert_table_row(&id, 2, 0, true).await.unwrap_err();
    assert_eq!(err, DocError::OutOfBounds { what: "table", index: 2, len: 1 });

    engine.insert_table_row(&id, 0, 2, true).await.unwrap();
    let text = first_table_text(&docs, &id).await;
    assert_eq!(text.len(), 4);
    assert_eq!(text[3], vec!["", "", ""]);
}

#[tokio::test]
async fn table_chain_is_bounded() {
    let (_docs, engine) = engine();
    let id = new_doc(&engine).await;
    let md = (0..11)
        .map(|i| format!("Section {i}\n\n| c{i} |\n|---|\n| v{i} |"))
        .collect::<Vec<_>>()
        .join("\n\n");
    let err = engine.write_markdown(&id, &md, WriteMode::Replace).await.unwrap_err();
    assert_eq!(err, DocError::RecursionLimit { depth: 10 });
    assert!(err.to_string().contains("simplify"));
}

#[tokio::test]
async fn unreachable_images_do_not_abort_the_write() {
    let (docs, engine) = engine();
    let id = new_doc(&engine).await;
    docs.mark_unreachable("https://img/expired.png");
    let md = "![](https://img/fine.png)\n\n![](https://img/expired.png)\n\nText survives";
    let report = engine.write_markdown(&id, md, WriteMode::Replace).await.unwrap();
    assert_eq!(report.images.inserted, 1);
    assert_eq!(report.images.failed.len(), 1);
    assert_eq!(report.images.failed[0].uri, "https://img/expired.png");

    let doc = docs.get_document(&id).await.unwrap();
    let (_, last) = doc.last_paragraph().unwrap();
    assert_eq!(last.text(), "Text survives\n");
}

// ============================================================================
// Tier 2: copy and snapshots
// ============================================================================

#[tokio::test]
async fn table_copy_preserves_styles_images_and_sizes() {
    let (docs, engine) = engine();
    let src = new_doc(&engine).await;
    let dst = new_doc(&engine).await;
    engine
        .write_markdown(
            &src,
            "| Name | Link |\n|---|---|\n| *soft* | [site](https://x.dev) |\n| ~~old~~ | `mono` |",
            WriteMode::Replace,
        )
        .await
        .unwrap();
    let sized = ImageInfo { uri: "https://img/logo.png".into(), width: Some(120.0), height: Some(40.0) };
    engine
        .insert_table_images(&src, 0, &[CellImage { row: 2, col: 1, image: sized }])
        .await
        .unwrap();

    let report = engine.copy_table(&src, 0, &dst).await.unwrap();
    assert_eq!(report.tables_filled, 1);
    assert!(report.images.is_clean());

    let source = docs.get_document(&src).await.unwrap();
    let target = docs.get_document(&dst).await.unwrap();
    assert_eq!(
        table_model(target.table(0).unwrap().table, &target.inline_objects),
        table_model(source.table(0).unwrap().table, &source.inline_objects),
    );
}

#[tokio::test]
async fn document_copy_reproduces_content() {
    let (_docs, engine) = engine();
    let src = new_doc(&engine).await;
    let dst = new_doc(&engine).await;
    let md = "# Doc\n\nText with **bold**.\n\n![](https://img/a.png)\n\n| h1 | h2 |\n|---|---|\n| *x* | y |\n\nEnd\n";
    engine.write_markdown(&src, md, WriteMode::Replace).await.unwrap();
    engine.write_markdown(&dst, "stale content", WriteMode::Replace).await.unwrap();

    engine.copy_document(&src, &dst, WriteMode::Replace).await.unwrap();
    let rendered = engine.read_markdown(&dst).await.unwrap();
    assert_eq!(rendered, engine.read_markdown(&src).await.unwrap());
    assert_eq!(rendered, md);
}

#[tokio::test]
async fn undo_redo_discipline() {
    let (docs, engine) = engine();
    let id = new_doc(&engine).await;

    engine.write_markdown(&id, "# v1\n\n| a |\n|---|\n| b |", WriteMode::Replace).await.unwrap();
    let v1 = engine.create_snapshot(&id, Some("v1")).await.unwrap();
    let v1_markdown = engine.read_markdown(&id).await.unwrap();

    engine.write_markdown(&id, "v2 text", WriteMode::Replace).await.unwrap();
    engine.create_snapshot(&id, Some("v2")).await.unwrap();
    engine.write_markdown(&id, "v3 text", WriteMode::Replace).await.unwrap();

    // Undo moves exactly one entry.
    let undone = engine.undo(&id).await.unwrap();
    assert_eq!(undone.restored.label, "v2");
    assert_eq!(docs.plain_text(&id).unwrap(), "v2 text\n");
    let listed = engine.list_snapshots(&id);
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, v1.id);
    assert_eq!(listed[1].label, "before undo");

    // Restoring a table goes through the same fill path.
    let undone = engine.undo(&id).await.unwrap();
    assert_eq!(undone.restored.label, "v1");
    assert_eq!(undone.write.tables_filled, 1);
    assert_eq!(engine.read_markdown(&id).await.unwrap(), v1_markdown);

    // A new snapshot truncates redo history.
    engine.create_snapshot(&id, Some("branch")).await.unwrap();
    let err = engine.redo(&id).await.unwrap_err();
    assert!(matches!(err, DocError::EmptyHistory { stack: "redo", .. }));
}

#[tokio::test]
async fn oldest_snapshot_is_evicted() {
    let (_docs, engine) = engine();
    let id = new_doc(&engine).await;
    let first = engine.create_snapshot(&id, Some("s0")).await.unwrap();
    for i in 1..=10 {
        engine.create_snapshot(&id, Some(&format!("s{i}"))).await.unwrap();
    }
    let listed = engine.list_snapshots(&id);
    assert_eq!(listed.len(), 10);
    assert!(listed.iter().all(|s| s.id != first.id));

    let err = engine.undo("never-snapshotted").await.unwrap_err();
    assert!(matches!(err, DocError::NotFound(_)));
}
