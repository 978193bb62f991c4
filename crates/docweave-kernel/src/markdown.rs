//! Markdown front end: Markdown text → run/style model.
//!
//! Walks pulldown-cmark events in a single forward pass, keeping:
//! - a formatting stack (`**`, `*`, `~~`, links) popped by nearest match,
//! - a list stack that assigns one synthetic list id per (kind, level),
//! - pending list-item records whose ranges close when the item's own
//!   content ends.
//!
//! ```text
//! "Intro\n\n| A | B |\n|---|---|\n| 1 | 2 |\n\nOutro"
//!     ↓ parse_markdown(src, 1)
//! blocks:            [ParagraphBlock "Intro"]
//! table:             PendingTableFill { data: [[A, B], [1, 2]], bold_headers }
//! post_table_content "Outro"
//! ```
//!
//! Processing stops at the first table: the offset after a freshly created
//! table is only known once the remote side has built it, so everything
//! after it is handed back for a later pass.

use std::collections::HashMap;

use docweave_types::{
    Cell, DocError, ImageInfo, MONOSPACE_FAMILY, NamedStyle, ParagraphBlock, Result, Run,
    TableModel, TextStyle, push_run,
};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, RefDefs, Tag, TagEnd};

use crate::offsets::OffsetTracker;

/// Line-break character used inside a paragraph (Markdown hard break).
pub const LINE_BREAK: char = '\u{000b}';

/// A list item awaiting its bullet request.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingListItem {
    pub ordered: bool,
    pub nesting_level: usize,
    /// Synthetic id shared by sibling items of the same kind and level.
    pub list_id: String,
    pub start: Option<usize>,
    pub end: Option<usize>,
    closed: bool,
}

impl PendingListItem {
    /// The item's absolute range, once both ends are known.
    pub fn range(&self) -> Option<(usize, usize)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if end > start => Some((start, end)),
            _ => None,
        }
    }
}

/// Deferred table population, produced alongside an `InsertTable`.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingTableFill {
    /// Where the table skeleton is inserted.
    pub insert_index: usize,
    pub model: TableModel,
    /// The source had a header row; bold it after filling.
    pub bold_headers: bool,
}

impl PendingTableFill {
    /// Cell text, row-major.
    pub fn data(&self) -> Vec<Vec<String>> {
        self.model
            .cells
            .iter()
            .map(|row| row.iter().map(Cell::text).collect())
            .collect()
    }
}

/// Result of one Markdown planning pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkdownParse {
    /// Insertion point the pass was planned against.
    pub start: usize,
    pub blocks: Vec<ParagraphBlock>,
    pub list_items: Vec<PendingListItem>,
    pub table: Option<PendingTableFill>,
    /// Unconsumed Markdown after the first table, trimmed; `None` when empty.
    pub post_table_content: Option<String>,
    /// 1-based source line on which the table ended.
    pub table_end_line: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
enum InlineFormat {
    Bold,
    Italic,
    Strikethrough,
    Link(String),
}

impl InlineFormat {
    fn same_kind(&self, other: &InlineFormat) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    fn name(&self) -> &'static str {
        match self {
            InlineFormat::Bold => "strong",
            InlineFormat::Italic => "emphasis",
            InlineFormat::Strikethrough => "strikethrough",
            InlineFormat::Link(_) => "link",
        }
    }
}

#[derive(Default)]
struct TableBuilder {
    rows: Vec<Vec<Cell>>,
    row: Vec<Cell>,
    cell: Option<Cell>,
    saw_head: bool,
}

struct Converter {
    tracker: OffsetTracker,
    start: usize,
    blocks: Vec<ParagraphBlock>,
    current: Option<ParagraphBlock>,
    formats: Vec<InlineFormat>,
    /// `true` for ordered lists.
    lists: Vec<bool>,
    list_ids: HashMap<(bool, usize), String>,
    items: Vec<PendingListItem>,
    open_items: Vec<usize>,
    in_code_block: bool,
    image_depth: usize,
    table: Option<TableBuilder>,
}

/// Parse Markdown into blocks anchored at `start`.
///
/// Fails with [`DocError::Conversion`] on structurally invalid input.
pub fn parse_markdown(src: &str, start: usize) -> Result<MarkdownParse> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut conv = Converter::new(start);
    let mut table_end: Option<usize> = None;

    let mut events = Parser::new_ext(src, options).into_offset_iter();
    for (event, range) in events.by_ref() {
        if conv.handle(event, range.start)? {
            table_end = Some(range.end);
            break;
        }
    }

    conv.finish_block(false);
    let table = conv.take_table();

    let (post_table_content, table_end_line) = match table_end {
        Some(end) => {
            // Leading indentation is significant to the next pass.
            let rest = src.get(end..).unwrap_or("").trim_start_matches('\n');
            let line = src[..end].matches('\n').count() + 1;
            let content = (!rest.trim().is_empty())
                .then(|| with_definitions(rest, src, end, events.reference_definitions()));
            (content, Some(line))
        }
        None => (None, None),
    };

    tracing::debug!(
        blocks = conv.blocks.len(),
        list_items = conv.items.len(),
        has_table = table.is_some(),
        "parsed markdown pass"
    );

    Ok(MarkdownParse {
        start: conv.start,
        blocks: conv.blocks,
        list_items: conv.items.into_iter().filter(|i| i.range().is_some()).collect(),
        table,
        post_table_content,
        table_end_line,
    })
}

impl Converter {
    fn new(start: usize) -> Self {
        Self {
            tracker: OffsetTracker::new(start),
            start,
            blocks: Vec::new(),
            current: None,
            formats: Vec::new(),
            lists: Vec::new(),
            list_ids: HashMap::new(),
            items: Vec::new(),
            open_items: Vec::new(),
            in_code_block: false,
            image_depth: 0,
            table: None,
        }
    }

    /// Handle one event. Returns `true` once a table has been completed.
    fn handle(&mut self, event: Event<'_>, at: usize) -> Result<bool> {
        match event {
            // ── Block-level tags ──
            Event::Start(Tag::Paragraph) => self.open_block(None),
            Event::End(TagEnd::Paragraph) => self.finish_block(false),

            Event::Start(Tag::Heading { level, .. }) => {
                self.open_block(Some(NamedStyle::heading(heading_level_to_u8(level))))
            }
            Event::End(TagEnd::Heading(_)) => self.finish_block(false),

            Event::Start(Tag::CodeBlock(_)) => {
                self.finish_block(false);
                self.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                self.finish_block(false);
                self.in_code_block = false;
            }

            Event::Start(Tag::List(first_number)) => {
                self.finish_block(false);
                // A nested list ends the parent item's own content.
                if let Some(&idx) = self.open_items.last() {
                    self.items[idx].closed = true;
                }
                self.lists.push(first_number.is_some());
            }
            Event::End(TagEnd::List(_)) => {
                self.lists.pop();
            }

            Event::Start(Tag::Item) => {
                self.finish_block(false);
                let ordered = *self.lists.last().ok_or_else(|| {
                    DocError::Conversion(format!("list item outside of a list at byte {at}"))
                })?;
                let nesting_level = self.lists.len() - 1;
                let next_id = self.list_ids.len();
                let list_id = self
                    .list_ids
                    .entry((ordered, nesting_level))
                    .or_insert_with(|| format!("md-list-{next_id}"))
                    .clone();
                self.items.push(PendingListItem {
                    ordered,
                    nesting_level,
                    list_id,
                    start: None,
                    end: None,
                    closed: false,
                });
                self.open_items.push(self.items.len() - 1);
            }
            Event::End(TagEnd::Item) => {
                self.finish_block(false);
                if let Some(idx) = self.open_items.pop() {
                    self.items[idx].closed = true;
                }
            }

            Event::Start(Tag::BlockQuote(_)) | Event::End(TagEnd::BlockQuote(_)) => {}

            // ── Tables ──
            Event::Start(Tag::Table(_)) => {
                self.finish_block(false);
                self.table = Some(TableBuilder::default());
            }
            Event::Start(Tag::TableHead) => {
                if let Some(t) = self.table.as_mut() {
                    t.saw_head = true;
                    t.row.clear();
                }
            }
            Event::Start(Tag::TableRow) => {
                if let Some(t) = self.table.as_mut() {
                    t.row.clear();
                }
            }
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                if let Some(t) = self.table.as_mut() {
                    let row = std::mem::take(&mut t.row);
                    t.rows.push(row);
                }
            }
            Event::Start(Tag::TableCell) => {
                if let Some(t) = self.table.as_mut() {
                    t.cell = Some(Cell::default());
                }
            }
            Event::End(TagEnd::TableCell) => {
                if let Some(t) = self.table.as_mut() {
                    let cell = t.cell.take().unwrap_or_default();
                    t.row.push(cell);
                }
            }
            Event::End(TagEnd::Table) => return Ok(true),

            // ── Inline tags ──
            Event::Start(Tag::Strong) => self.formats.push(InlineFormat::Bold),
            Event::End(TagEnd::Strong) => self.pop_format(InlineFormat::Bold, at)?,
            Event::Start(Tag::Emphasis) => self.formats.push(InlineFormat::Italic),
            Event::End(TagEnd::Emphasis) => self.pop_format(InlineFormat::Italic, at)?,
            Event::Start(Tag::Strikethrough) => self.formats.push(InlineFormat::Strikethrough),
            Event::End(TagEnd::Strikethrough) => {
                self.pop_format(InlineFormat::Strikethrough, at)?
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                self.formats.push(InlineFormat::Link(dest_url.to_string()))
            }
            Event::End(TagEnd::Link) => self.pop_format(InlineFormat::Link(String::new()), at)?,

            Event::Start(Tag::Image { dest_url, .. }) => {
                self.push_image(ImageInfo::new(dest_url.to_string()));
                self.image_depth += 1;
            }
            Event::End(TagEnd::Image) => {
                self.image_depth = self.image_depth.saturating_sub(1);
            }

            // ── Text content ──
            Event::Text(text) => {
                if self.image_depth > 0 {
                    // Alt text is not carried into the document.
                } else if self.in_code_block {
                    self.push_code_block_text(&text);
                } else {
                    self.push_text(&text, self.current_style());
                }
            }
            Event::Code(text) => {
                let mut style = self.current_style();
                style.font_family = Some(MONOSPACE_FAMILY.to_string());
                self.push_text(&text, style);
            }
            Event::SoftBreak => self.push_text(" ", self.current_style()),
            Event::HardBreak => self.push_text(&LINE_BREAK.to_string(), self.current_style()),
            Event::Rule => self.finish_block(false),

            // Raw HTML, footnotes, task markers, math: not represented.
            _ => {}
        }
        Ok(false)
    }

    fn current_style(&self) -> TextStyle {
        let mut style = TextStyle::default();
        for format in &self.formats {
            match format {
                InlineFormat::Bold => style.bold = Some(true),
                InlineFormat::Italic => style.italic = Some(true),
                InlineFormat::Strikethrough => style.strikethrough = Some(true),
                InlineFormat::Link(url) => style.link_url = Some(url.clone()),
            }
        }
        style
    }

    /// Pop the nearest matching attribute, not necessarily the top.
    fn pop_format(&mut self, kind: InlineFormat, at: usize) -> Result<()> {
        match self.formats.iter().rposition(|f| f.same_kind(&kind)) {
            Some(pos) => {
                self.formats.remove(pos);
                Ok(())
            }
            None => Err(DocError::Conversion(format!(
                "closing {} at byte {at} has no matching opening",
                kind.name()
            ))),
        }
    }

    fn open_block(&mut self, named_style: Option<NamedStyle>) {
        self.finish_block(false);
        self.current = Some(ParagraphBlock {
            named_style,
            ..ParagraphBlock::default()
        });
    }

    fn ensure_block(&mut self) -> &mut ParagraphBlock {
        self.current.get_or_insert_with(ParagraphBlock::new)
    }

    fn push_text(&mut self, text: &str, style: TextStyle) {
        if let Some(table) = self.table.as_mut() {
            if let Some(cell) = table.cell.as_mut() {
                push_run(&mut cell.runs, Run::styled(text, style));
            }
            return;
        }
        self.ensure_block().push_run(Run::styled(text, style));
    }

    fn push_image(&mut self, image: ImageInfo) {
        if let Some(table) = self.table.as_mut() {
            if let Some(cell) = table.cell.as_mut() {
                cell.images.push(image);
            }
            return;
        }
        self.ensure_block().push_image(image);
    }

    /// Code block text arrives with embedded newlines; each line is its own
    /// monospace paragraph.
    fn push_code_block_text(&mut self, text: &str) {
        let style = TextStyle {
            font_family: Some(MONOSPACE_FAMILY.to_string()),
            ..TextStyle::default()
        };
        for piece in text.split_inclusive('\n') {
            match piece.strip_suffix('\n') {
                Some(line) => {
                    self.ensure_block().push_run(Run::styled(line, style.clone()));
                    self.finish_block(true);
                }
                None => self.ensure_block().push_run(Run::styled(piece, style.clone())),
            }
        }
    }

    /// Close the current block and assign its offsets.
    fn finish_block(&mut self, keep_blank: bool) {
        let Some(block) = self.current.take() else {
            return;
        };
        if block.is_blank() && !keep_blank {
            return;
        }
        let len = block.text_len();
        let start = self.tracker.advance(&block.text());
        self.tracker.advance("\n");

        if let Some(&idx) = self.open_items.last() {
            let item = &mut self.items[idx];
            if !item.closed {
                item.start.get_or_insert(start);
                item.end = Some(start + len + 1);
            }
        }
        self.blocks.push(block);
    }

    fn take_table(&mut self) -> Option<PendingTableFill> {
        let table = self.table.take()?;
        let model = TableModel::from_rows(table.rows);
        if model.is_empty() {
            return None;
        }
        // The skeleton goes at the end of the last block's text, so the
        // newline the remote side inserts before a table terminates it.
        let insert_index = if self.blocks.is_empty() {
            self.start
        } else {
            self.tracker.current() - 1
        };
        Some(PendingTableFill {
            insert_index,
            bold_headers: table.saw_head,
            model,
        })
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Append the link reference definitions that sat before the table, so
/// reference links in the remainder still resolve on their own pass.
fn with_definitions(rest: &str, src: &str, table_end: usize, defs: &RefDefs<'_>) -> String {
    let mut spans: Vec<_> = defs
        .iter()
        .map(|(_, def)| def.span.clone())
        .filter(|span| span.end <= table_end)
        .collect();
    if spans.is_empty() {
        return rest.to_string();
    }
    spans.sort_by_key(|span| span.start);
    let carried: Vec<&str> = spans
        .into_iter()
        .filter_map(|span| src.get(span))
        .map(str::trim_end)
        .collect();
    format!("{rest}\n\n{}", carried.join("\n"))
}
