//! Read side: live document → Markdown.

use docweave_types::{
    Document, ElementKind, MONOSPACE_FAMILY, Paragraph, ParagraphElementKind, Table, TableCell,
    TextStyle,
};

use crate::markdown::LINE_BREAK;

/// Render the body as Markdown.
///
/// Covers the subset the Markdown front end writes: headings, emphasis,
/// strikethrough, links, inline code, images, native lists and tables.
/// The header row of a table is not re-emphasized since writing bolds it.
pub fn render_markdown(doc: &Document) -> String {
    let mut out = String::new();
    let mut lists = ListState::default();
    // List id of the previous block, when it was a list item.
    let mut previous_list: Option<&str> = None;

    for element in &doc.body {
        let (block, list_id) = match &element.kind {
            ElementKind::Paragraph(p) => {
                let inline = render_inline(p, doc, Context::Body);
                match &p.bullet {
                    Some(bullet) => {
                        let ordered = doc.is_ordered_list(&bullet.list_id);
                        let prefix = lists.prefix(&bullet.list_id, bullet.nesting_level as usize, ordered);
                        (format!("{prefix}{inline}"), Some(bullet.list_id.as_str()))
                    }
                    None if inline.trim().is_empty() => continue,
                    None => match p.named_style.heading_level() {
                        Some(level) => (format!("{} {inline}", "#".repeat(level as usize)), None),
                        None => (inline, None),
                    },
                }
            }
            ElementKind::Table(t) => (render_table(t, doc), None),
            ElementKind::SectionBreak | ElementKind::TableOfContents => continue,
        };

        if !out.is_empty() {
            let same_list = list_id.is_some() && list_id == previous_list;
            out.push_str(if same_list { "\n" } else { "\n\n" });
        }
        out.push_str(&block);
        previous_list = list_id;
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Per-list item numbering and the content column of each open level.
#[derive(Default)]
struct ListState {
    list_id: String,
    counters: Vec<usize>,
    /// Column where item content starts, per nesting level.
    columns: Vec<usize>,
}

impl ListState {
    /// Indent and marker for the next item of `list_id` at `level`.
    fn prefix(&mut self, list_id: &str, level: usize, ordered: bool) -> String {
        if self.list_id != list_id {
            self.list_id = list_id.to_string();
            self.counters.clear();
            self.columns.clear();
        }
        let level = level.min(self.columns.len());
        let indent = if level == 0 { 0 } else { self.columns[level - 1] };
        self.counters.resize(level + 1, 0);
        self.counters[level] += 1;
        let marker = if ordered { format!("{}.", self.counters[level]) } else { "-".to_string() };
        self.columns.truncate(level);
        self.columns.push(indent + marker.len() + 1);
        format!("{}{marker} ", " ".repeat(indent))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Context {
    Body,
    Cell,
    HeaderCell,
}

fn render_inline(paragraph: &Paragraph, doc: &Document, ctx: Context) -> String {
    let mut out = String::new();
    for element in &paragraph.elements {
        match &element.kind {
            ParagraphElementKind::TextRun { content, style } => {
                let text = content.strip_suffix('\n').unwrap_or(content);
                let text = match ctx {
                    Context::Body => text.replace(LINE_BREAK, "\\\n"),
                    Context::Cell | Context::HeaderCell => {
                        text.replace(LINE_BREAK, " ").replace('|', "\\|")
                    }
                };
                out.push_str(&wrap(&text, style, ctx == Context::HeaderCell));
            }
            ParagraphElementKind::InlineObject { object_id, .. } => {
                if let Some(image) = doc.image(object_id) {
                    out.push_str(&format!("![]({})", image.uri));
                }
            }
            ParagraphElementKind::Other => {}
        }
    }
    out
}

/// Wrap text in the markers for its style, keeping surrounding whitespace
/// outside the markers.
fn wrap(text: &str, style: &TextStyle, skip_bold: bool) -> String {
    let core = text.trim();
    if core.is_empty() {
        return text.to_string();
    }
    let lead = &text[..text.len() - text.trim_start().len()];
    let trail = &text[text.trim_end().len()..];

    let mut core = core.to_string();
    if style.font_family.as_deref() == Some(MONOSPACE_FAMILY) {
        core = format!("`{core}`");
    } else {
        if style.strikethrough == Some(true) {
            core = format!("~~{core}~~");
        }
        if style.italic == Some(true) {
            core = format!("*{core}*");
        }
        if style.bold == Some(true) && !skip_bold {
            core = format!("**{core}**");
        }
    }
    if let Some(url) = &style.link_url {
        core = format!("[{core}]({url})");
    }
    format!("{lead}{core}{trail}")
}

fn render_cell(cell: &TableCell, doc: &Document, ctx: Context) -> String {
    cell.paragraphs()
        .map(|(_, p)| render_inline(p, doc, ctx))
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_table(table: &Table, doc: &Document) -> String {
    let mut lines = Vec::with_capacity(table.table_rows.len() + 1);
    for (r, row) in table.table_rows.iter().enumerate() {
        let ctx = if r == 0 { Context::HeaderCell } else { Context::Cell };
        let cells: Vec<String> = row.cells.iter().map(|c| render_cell(c, doc, ctx)).collect();
        lines.push(format!("| {} |", cells.join(" | ")));
        if r == 0 {
            lines.push(format!("|{}|", vec!["---"; table.columns.max(1)].join("|")));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_moves_whitespace_outside() {
        let style = TextStyle { italic: Some(true), ..TextStyle::bold() };
        assert_eq!(wrap(" both ", &style, false), " ***both*** ");
        assert_eq!(wrap("   ", &style, false), "   ");
        assert_eq!(wrap("b", &TextStyle::bold(), true), "b");
    }

    #[test]
    fn test_wrap_link_and_code() {
        let link = TextStyle { link_url: Some("https://x.dev".into()), ..TextStyle::default() };
        assert_eq!(wrap("site", &link, false), "[site](https://x.dev)");
        let code = TextStyle { font_family: Some(MONOSPACE_FAMILY.into()), ..TextStyle::bold() };
        assert_eq!(wrap("x", &code, false), "`x`");
    }

    #[test]
    fn test_list_prefixes_follow_parent_content_column() {
        let mut lists = ListState::default();
        assert_eq!(lists.prefix("l1", 0, true), "1. ");
        assert_eq!(lists.prefix("l1", 1, true), "   1. ");
        assert_eq!(lists.prefix("l1", 1, true), "   2. ");
        assert_eq!(lists.prefix("l1", 0, true), "2. ");
        assert_eq!(lists.prefix("l1", 1, true), "   1. ");
        // A level deeper than any open one attaches to the last open level.
        assert_eq!(lists.prefix("l2", 3, false), "- ");
        assert_eq!(lists.prefix("l2", 1, false), "  - ");
    }
}
