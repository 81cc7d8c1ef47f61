//! Merge positioned runs into logical lines.
//!
//! Runs on a page are sorted top-to-bottom, grouped into rows by vertical
//! overlap, and each row is split at wide horizontal gaps so that side by
//! side columns do not fuse into one line.

use crate::cleanup::cleanup_text;
use crate::types::{BBox, Line, PageRuns, TextRun};

/// Two runs share a row when their vertical ranges overlap by at least this
/// fraction of the smaller height.
pub const LINE_OVERLAP_RATIO: f32 = 0.5;

/// Minimum gap (in points) between adjacent runs before a space is inserted.
pub const MIN_WORD_GAP: f32 = 1.5;

/// A horizontal gap wider than this multiple of the font size starts a new
/// line within the same row.
pub const MAX_GAP_FACTOR: f32 = 3.0;

/// Rows of zero-height runs are matched by baseline within this tolerance.
const Y_TOLERANCE: f32 = 1.0;

/// Returns `true` if `c` belongs to a script written without inter-word
/// spaces (CJK, kana, Hangul, Thai and neighbours).
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(
        c as u32,
        0x3000..=0x30FF      // CJK punctuation, Hiragana, Katakana
        | 0x31F0..=0x31FF
        | 0x3130..=0x318F    // Hangul compatibility jamo
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7AF
        | 0x1100..=0x11FF
        | 0xF900..=0xFAFF
        | 0xFF00..=0xFFEF
        | 0x20000..=0x2A6DF
        | 0x0E00..=0x0EFF    // Thai, Lao
        | 0x0F00..=0x0FFF
        | 0x1000..=0x109F
        | 0x1780..=0x17FF
    )
}

/// Merge the runs of every page into lines, in page order.
pub fn merge_pages(pages: &[PageRuns]) -> Vec<Line> {
    pages.iter().flat_map(|p| merge_runs(&p.runs)).collect()
}

/// Merge the runs of a single page.
///
/// The output is ordered top-to-bottom, then left-to-right, and depends only
/// on the runs' content and positions (ties keep input order).
pub fn merge_runs(runs: &[TextRun]) -> Vec<Line> {
    let mut order: Vec<&TextRun> = runs.iter().collect();
    order.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut rows: Vec<(BBox, Vec<&TextRun>)> = Vec::new();
    for run in order {
        match rows.last_mut() {
            Some((row_box, members)) if same_row(&*row_box, &run.bbox) => {
                *row_box = row_box.union(&run.bbox);
                members.push(run);
            }
            _ => rows.push((run.bbox, vec![run])),
        }
    }

    rows.into_iter()
        .flat_map(|(_, members)| split_row(members))
        .filter_map(assemble_line)
        .collect()
}

fn same_row(row: &BBox, run: &BBox) -> bool {
    let min_height = row.height().min(run.height());
    if min_height <= 0.0 {
        return (row.y1 - run.y1).abs() <= Y_TOLERANCE;
    }
    row.vertical_overlap(run) >= LINE_OVERLAP_RATIO * min_height
}

/// Split a row left-to-right wherever the gap exceeds [`MAX_GAP_FACTOR`].
fn split_row(mut members: Vec<&TextRun>) -> Vec<Vec<&TextRun>> {
    members.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));

    let mut segments: Vec<Vec<&TextRun>> = Vec::new();
    let mut right_edge = f32::NEG_INFINITY;
    let mut size = 0.0_f32;

    for run in members {
        let gap = run.bbox.x0 - right_edge;
        let limit = MAX_GAP_FACTOR * size.max(run.font_size);
        match segments.last_mut() {
            Some(segment) if gap <= limit => {
                segment.push(run);
                right_edge = right_edge.max(run.bbox.x1);
                size = size.max(run.font_size);
            }
            _ => {
                segments.push(vec![run]);
                right_edge = run.bbox.x1;
                size = run.font_size;
            }
        }
    }

    segments
}

/// Build a [`Line`] from runs already sorted left-to-right.
///
/// Returns `None` when the cleaned text is empty.
fn assemble_line(runs: Vec<&TextRun>) -> Option<Line> {
    let first = *runs.first()?;
    let mut text = String::new();
    let mut bbox = first.bbox;
    let mut font_size = 0.0_f32;
    let mut is_bold = false;
    let mut is_italic = false;
    let mut seen: Vec<&TextRun> = Vec::with_capacity(runs.len());

    for run in runs {
        // Overprinted copies (fake bold) contribute once.
        if seen
            .iter()
            .any(|s| s.text == run.text && s.bbox.key() == run.bbox.key())
        {
            continue;
        }

        if let Some(prev) = seen.last() {
            let gap = run.bbox.x0 - prev.bbox.x1;
            if gap >= MIN_WORD_GAP && !boundary_is_spaceless(&prev.text, &run.text) {
                text.push(' ');
            }
        }
        text.push_str(&run.text);

        bbox = bbox.union(&run.bbox);
        font_size = font_size.max(run.font_size);
        is_bold |= run.is_bold;
        is_italic |= run.is_italic;
        seen.push(run);
    }

    let text = cleanup_text(&text);
    if text.is_empty() {
        return None;
    }

    Some(Line {
        text,
        font_size,
        is_bold,
        is_italic,
        bbox,
        page_index: first.page_index,
        run_count: seen.len(),
    })
}

fn boundary_is_spaceless(prev: &str, next: &str) -> bool {
    match (prev.chars().next_back(), next.chars().next()) {
        (Some(l), Some(f)) => is_spaceless_script_char(l) && is_spaceless_script_char(f),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A run at `(x, top)` whose width follows the extractor's estimate.
    fn run(text: &str, x: f32, top: f32, size: f32) -> TextRun {
        TextRun {
            text: text.to_string(),
            font_size: size,
            is_bold: false,
            is_italic: false,
            bbox: BBox::new(x, top, x + text.chars().count() as f32 * size * 0.5, top + size),
            page_index: 0,
        }
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_runs(&[]).is_empty());
    }

    #[test]
    fn test_same_row_merges_with_space() {
        let lines = merge_runs(&[run("Hello", 72.0, 100.0, 12.0), run("World", 110.0, 100.5, 12.0)]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Hello World");
        assert_eq!(lines[0].run_count, 2);
        assert_eq!(lines[0].bbox.x0, 72.0);
        assert_eq!(lines[0].bbox.x1, 140.0);
    }

    #[test]
    fn test_adjacent_runs_concatenate_directly() {
        // "Intro" ends at 102; "duction" starts right there.
        let lines = merge_runs(&[run("Intro", 72.0, 100.0, 12.0), run("duction", 102.0, 100.0, 12.0)]);
        assert_eq!(lines[0].text, "Introduction");
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let a = merge_runs(&[run("World", 110.0, 100.0, 12.0), run("Hello", 72.0, 100.0, 12.0)]);
        let b = merge_runs(&[run("Hello", 72.0, 100.0, 12.0), run("World", 110.0, 100.0, 12.0)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_rows_ordered_top_to_bottom() {
        let lines = merge_runs(&[
            run("Bottom line", 72.0, 300.0, 12.0),
            run("Top line", 72.0, 100.0, 12.0),
            run("Middle line", 72.0, 200.0, 12.0),
        ]);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Top line", "Middle line", "Bottom line"]);
    }

    #[test]
    fn test_non_overlapping_rows_stay_apart() {
        let lines = merge_runs(&[run("One", 72.0, 100.0, 12.0), run("Two", 72.0, 114.0, 12.0)]);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_wide_gap_splits_columns() {
        let lines = merge_runs(&[
            run("Left column", 72.0, 100.0, 10.0),
            run("Right column", 320.0, 100.0, 10.0),
        ]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Left column");
        assert_eq!(lines[1].text, "Right column");
    }

    #[test]
    fn test_mixed_sizes_take_max_and_or_styles() {
        let mut big = run("Chapter", 72.0, 100.0, 18.0);
        big.is_bold = true;
        let mut small = run("one", 140.0, 106.0, 12.0);
        small.is_italic = true;
        let lines = merge_runs(&[big, small]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].font_size, 18.0);
        assert!(lines[0].is_bold);
        assert!(lines[0].is_italic);
        assert_eq!(lines[0].bbox.y0, 100.0);
        assert_eq!(lines[0].bbox.y1, 118.0);
    }

    #[test]
    fn test_overprinted_duplicate_counted_once() {
        let lines = merge_runs(&[run("Summary", 72.0, 100.0, 14.0), run("Summary", 72.0, 100.0, 14.0)]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Summary");
        assert_eq!(lines[0].run_count, 1);
    }

    #[test]
    fn test_spaceless_scripts_join_without_space() {
        let lines = merge_runs(&[run("\u{6982}\u{8981}", 72.0, 100.0, 12.0), run("\u{8AAC}\u{660E}", 90.0, 100.0, 12.0)]);
        assert_eq!(lines[0].text, "\u{6982}\u{8981}\u{8AAC}\u{660E}");
    }

    #[test]
    fn test_text_is_cleaned() {
        let lines = merge_runs(&[run("  \u{FB01}nal   report ", 72.0, 100.0, 12.0)]);
        assert_eq!(lines[0].text, "final report");
    }

    #[test]
    fn test_merge_pages_keeps_page_order() {
        let mut second = run("Second page", 72.0, 50.0, 12.0);
        second.page_index = 1;
        let pages = vec![
            PageRuns {
                page_index: 0,
                width: 612.0,
                height: 792.0,
                runs: vec![run("First page", 72.0, 500.0, 12.0)],
            },
            PageRuns {
                page_index: 1,
                width: 612.0,
                height: 792.0,
                runs: vec![second],
            },
        ];
        let lines = merge_pages(&pages);
        assert_eq!(lines[0].page_index, 0);
        assert_eq!(lines[1].page_index, 1);
    }

    #[test]
    fn test_spaceless_classification() {
        assert!(is_spaceless_script_char('\u{4E00}'));
        assert!(is_spaceless_script_char('\u{3042}'));
        assert!(is_spaceless_script_char('\u{AC00}'));
        assert!(!is_spaceless_script_char('A'));
        assert!(!is_spaceless_script_char(' '));
    }
}
