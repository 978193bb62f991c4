//! Batch-request builder: run/style model → ordered requests.
//!
//! For a list of paragraph blocks and a known insertion point the output is,
//! in order:
//!
//! 1. one combined `InsertText` for all block text,
//! 2. paragraph-style updates for non-default named styles,
//! 3. run-style updates for runs with non-empty style,
//! 4. list-bullet creation, one request per native list, highest first,
//!
//! plus image placements returned separately, in descending offset order,
//! to be inserted one by one after the batch has committed.
//!
//! List paragraphs are inserted with one leading tab per nesting level. The
//! bullet request turns the tabs into the nesting level and removes them, so
//! stages 2 and 3 address the tabbed text while images and anything after
//! the batch see the tab-free offsets the parser computed.

use docweave_types::{BulletPreset, ImageInfo, ParagraphBlock, Request};

use crate::markdown::{MarkdownParse, PendingListItem};
use crate::offsets::OffsetTracker;

/// An image to insert after the text batch has committed.
#[derive(Clone, Debug, PartialEq)]
pub struct ImagePlacement {
    pub index: usize,
    pub image: ImageInfo,
}

/// Requests for one batch plus the images that follow it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlannedBatch {
    pub requests: Vec<Request>,
    /// Sorted by descending index.
    pub images: Vec<ImagePlacement>,
}

/// Requests that must stay together, tagged with the offset they target.
#[derive(Clone, Debug, PartialEq)]
pub struct EditGroup {
    pub sort_index: usize,
    pub requests: Vec<Request>,
}

/// Build the batch for a list of paragraph blocks inserted at `start`.
///
/// `start` must be the beginning of an empty paragraph: the final block's
/// terminator is that paragraph's existing newline, so it is not inserted.
pub fn build_paragraph_batch(
    blocks: &[ParagraphBlock],
    start: usize,
    list_items: &[PendingListItem],
) -> PlannedBatch {
    let mut tracker = OffsetTracker::new(start);
    let block_starts: Vec<usize> = blocks
        .iter()
        .map(|block| {
            let at = tracker.advance(&block.text());
            tracker.advance("\n");
            at
        })
        .collect();
    let items: Vec<Option<&PendingListItem>> =
        block_starts.iter().map(|&at| item_at(list_items, at)).collect();

    // Tabbed layout: where each paragraph starts and where its text starts.
    let mut text = String::new();
    let mut para_starts = Vec::with_capacity(blocks.len());
    let mut text_starts = Vec::with_capacity(blocks.len());
    let mut tracker = OffsetTracker::new(start);
    for (block, item) in blocks.iter().zip(&items) {
        let tabs = "\t".repeat(item.map_or(0, |i| i.nesting_level));
        para_starts.push(tracker.advance(&tabs));
        text_starts.push(tracker.current());
        let block_text = block.text();
        tracker.advance(&block_text);
        tracker.advance("\n");
        text.push_str(&tabs);
        text.push_str(&block_text);
        text.push('\n');
    }
    text.pop();

    let mut requests = Vec::new();
    if !text.is_empty() {
        requests.push(Request::InsertText { index: start, text });
    }

    for (k, block) in blocks.iter().enumerate() {
        if let Some(named_style) = block.named_style.filter(|s| !s.is_default()) {
            requests.push(Request::UpdateParagraphStyle {
                start: para_starts[k],
                end: text_starts[k] + block.text_len() + 1,
                named_style,
            });
        }
    }

    for (block, &text_start) in blocks.iter().zip(&text_starts) {
        let mut run_start = text_start;
        for run in &block.runs {
            let len = run.len();
            if !run.style.is_empty() && len > 0 {
                requests.push(Request::UpdateTextStyle {
                    start: run_start,
                    end: run_start + len,
                    style: run.style.clone(),
                });
            }
            run_start += len;
        }
    }

    for (first, last, ordered) in list_groups(&items).into_iter().rev() {
        requests.push(Request::CreateListBullets {
            start: para_starts[first],
            end: text_starts[last] + blocks[last].text_len() + 1,
            preset: BulletPreset::for_ordered(ordered),
        });
    }

    let mut images: Vec<ImagePlacement> = blocks
        .iter()
        .zip(&block_starts)
        .flat_map(|(block, &block_start)| {
            block.images.iter().map(move |positioned| ImagePlacement {
                index: block_start + positioned.offset,
                image: positioned.image.clone(),
            })
        })
        .collect();
    sort_images_descending(&mut images);

    PlannedBatch { requests, images }
}

/// The closed list item whose range holds the block starting at `at`.
fn item_at(items: &[PendingListItem], at: usize) -> Option<&PendingListItem> {
    items
        .iter()
        .find(|item| item.range().is_some_and(|(start, end)| start <= at && at < end))
}

/// Runs of adjacent list blocks forming one native list, as
/// `(first_block, last_block, ordered)`.
///
/// A run continues through nested items and breaks at a non-list block or
/// at a top-level item of a different list. The top-level kind decides the
/// preset.
fn list_groups(items: &[Option<&PendingListItem>]) -> Vec<(usize, usize, bool)> {
    let mut groups: Vec<(usize, usize, bool)> = Vec::new();
    let mut root: Option<&str> = None;
    for (k, item) in items.iter().enumerate() {
        let Some(item) = item else {
            root = None;
            continue;
        };
        let continues = match root {
            Some(id) => item.nesting_level > 0 || item.list_id == id,
            None => false,
        };
        match groups.last_mut() {
            Some(group) if continues => group.1 = k,
            _ => {
                groups.push((k, k, item.ordered));
                root = Some(item.list_id.as_str());
            }
        }
    }
    groups
}

/// Build the batch for one Markdown pass, ending with the table skeleton.
pub fn build_markdown_batch(parse: &MarkdownParse) -> PlannedBatch {
    let mut batch = build_paragraph_batch(&parse.blocks, parse.start, &parse.list_items);
    if let Some(fill) = &parse.table {
        batch.requests.push(Request::InsertTable {
            index: fill.insert_index,
            rows: fill.model.rows,
            columns: fill.model.columns,
        });
    }
    batch
}

/// Descending by index; images sharing an index keep their relative order
/// once inserted, so the later one goes in first.
pub fn sort_images_descending(images: &mut [ImagePlacement]) {
    images.reverse();
    images.sort_by(|a, b| b.index.cmp(&a.index));
}

/// Flatten edit groups in descending `sort_index` order.
///
/// Edits at higher offsets run first, so the offsets precomputed for lower
/// groups are never shifted.
pub fn order_descending(mut groups: Vec<EditGroup>) -> Vec<Request> {
    groups.sort_by(|a, b| b.sort_index.cmp(&a.sort_index));
    groups.into_iter().flat_map(|g| g.requests).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parse_markdown;
    use docweave_types::{NamedStyle, Run, TextStyle};

    fn block(text: &str) -> ParagraphBlock {
        let mut b = ParagraphBlock::new();
        b.push_run(Run::plain(text));
        b
    }

    #[test]
    fn test_block_offsets_accumulate() {
        let mut heading = ParagraphBlock::with_style(NamedStyle::Heading1);
        heading.push_run(Run::plain("Title"));
        let mut styled = ParagraphBlock::new();
        styled.push_run(Run::plain("a "));
        styled.push_run(Run::styled("b", TextStyle::bold()));

        let batch = build_paragraph_batch(&[heading, block("plain"), styled], 4, &[]);
        assert_eq!(
            batch.requests,
            vec![
                Request::InsertText { index: 4, text: "Title\nplain\na b".into() },
                Request::UpdateParagraphStyle { start: 4, end: 10, named_style: NamedStyle::Heading1 },
                // "Title\n" 4..10, "plain\n" 10..16, "a b\n" 16..20
                Request::UpdateTextStyle { start: 18, end: 19, style: TextStyle::bold() },
            ]
        );
    }

    #[test]
    fn test_default_styles_are_elided() {
        let mut b = ParagraphBlock::with_style(NamedStyle::NormalText);
        b.push_run(Run::styled("x", TextStyle::default()));
        let batch = build_paragraph_batch(&[b], 1, &[]);
        assert_eq!(batch.requests.len(), 1);
        assert!(matches!(batch.requests[0], Request::InsertText { .. }));
    }

    #[test]
    fn test_images_sorted_descending_with_ties_reversed() {
        let mut first = block("ab");
        first.push_image(ImageInfo::new("one"));
        first.push_image(ImageInfo::new("two"));
        let mut second = ParagraphBlock::new();
        second.push_image(ImageInfo::new("three"));

        let batch = build_paragraph_batch(&[first, second], 1, &[]);
        let order: Vec<(usize, &str)> = batch
            .images
            .iter()
            .map(|p| (p.index, p.image.uri.as_str()))
            .collect();
        assert_eq!(order, vec![(4, "three"), (3, "two"), (3, "one")]);
        assert_eq!(batch.requests[0], Request::InsertText { index: 1, text: "ab\n".into() });
    }

    #[test]
    fn test_markdown_batch_order() {
        let parse = parse_markdown("## Head\n\n- item\n\n| a |\n|---|\n| b |", 1).unwrap();
        let batch = build_markdown_batch(&parse);
        let kinds: Vec<&str> = batch.requests.iter().map(Request::kind).collect();
        assert_eq!(
            kinds,
            vec!["insertText", "updateParagraphStyle", "createParagraphBullets", "insertTable"]
        );
        assert_eq!(
            batch.requests[3],
            Request::InsertTable { index: 10, rows: 2, columns: 1 }
        );
    }

    #[test]
    fn test_nested_items_share_one_list_and_carry_tabs() {
        let parse = parse_markdown("- a\n  - x\n- b", 1).unwrap();
        let batch = build_markdown_batch(&parse);
        assert_eq!(
            batch.requests,
            vec![
                Request::InsertText { index: 1, text: "a\n\tx\nb".into() },
                Request::CreateListBullets { start: 1, end: 8, preset: BulletPreset::Disc },
            ]
        );
    }

    #[test]
    fn test_separate_lists_go_highest_first() {
        let parse = parse_markdown("- a\n\n1. b", 1).unwrap();
        let batch = build_markdown_batch(&parse);
        assert_eq!(
            batch.requests[1..],
            [
                Request::CreateListBullets { start: 3, end: 5, preset: BulletPreset::Decimal },
                Request::CreateListBullets { start: 1, end: 3, preset: BulletPreset::Disc },
            ]
        );
    }

    #[test]
    fn test_styles_address_tabbed_text_and_images_do_not() {
        let parse = parse_markdown("- a\n  - **x** ![](https://img/i.png)", 1).unwrap();
        let batch = build_markdown_batch(&parse);
        // "a\n" 1..3, then "\t" at 3 and "x " from 4
        assert!(batch.requests.contains(&Request::UpdateTextStyle {
            start: 4,
            end: 5,
            style: TextStyle::bold(),
        }));
        // Tab-free: "x " starts at 3, the image follows it.
        assert_eq!(batch.images[0].index, 5);
    }

    #[test]
    fn test_order_descending() {
        let groups = vec![
            EditGroup { sort_index: 5, requests: vec![Request::DeleteRange { start: 5, end: 6 }] },
            EditGroup { sort_index: 20, requests: vec![Request::DeleteRange { start: 20, end: 22 }] },
            EditGroup { sort_index: 9, requests: vec![Request::DeleteRange { start: 9, end: 10 }] },
        ];
        let anchors: Vec<usize> = order_descending(groups).iter().map(Request::anchor).collect();
        assert_eq!(anchors, vec![20, 9, 5]);
    }
}
