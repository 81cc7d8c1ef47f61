//! Document-wide font and layout baselines.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{DocumentStats, Line, PageExtent, PageSize};

/// Font sizes are bucketed to this granularity when looking for the mode.
pub const FONT_SIZE_BUCKET: f32 = 0.5;

fn bucket_key(size: f32) -> i32 {
    (size / FONT_SIZE_BUCKET).round() as i32
}

/// Most frequent key, ties resolved towards the smallest key.
fn mode_of(keys: impl IntoIterator<Item = i32>) -> Option<i32> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for k in keys {
        *counts.entry(k).or_insert(0) += 1;
    }
    let mut best: Option<(i32, usize)> = None;
    for (k, c) in counts {
        if best.is_none_or(|(_, bc)| c > bc) {
            best = Some((k, c));
        }
    }
    best.map(|(k, _)| k)
}

/// Compute the baselines for a document.
///
/// Each line contributes its font size once, however many runs it was built
/// from. Lines with a non-positive size are ignored. With no usable lines
/// the font statistics stay at their zero sentinels.
pub fn document_stats(lines: &[Line], page_sizes: &[PageSize]) -> DocumentStats {
    let mut sizes: Vec<f32> = lines
        .iter()
        .map(|l| l.font_size)
        .filter(|s| s.is_finite() && *s > 0.0)
        .collect();
    sizes.sort_by(|a, b| a.total_cmp(b));

    let page_count = page_sizes
        .len()
        .max(lines.iter().map(|l| l.page_index + 1).max().unwrap_or(0));
    let pages = page_extents(lines, page_sizes);

    if sizes.is_empty() {
        return DocumentStats {
            page_count,
            pages,
            ..DocumentStats::default()
        };
    }

    let n = sizes.len();
    let mean = (sizes.iter().map(|&s| s as f64).sum::<f64>() / n as f64) as f32;
    let median = if n % 2 == 1 {
        sizes[n / 2]
    } else {
        (sizes[n / 2 - 1] + sizes[n / 2]) / 2.0
    };
    let mode = mode_of(sizes.iter().map(|&s| bucket_key(s)))
        .map(|k| k as f32 * FONT_SIZE_BUCKET)
        .unwrap_or(0.0);

    DocumentStats {
        font_size_mean: mean,
        font_size_median: median,
        font_size_mode: mode,
        font_size_max: sizes[n - 1],
        page_count,
        line_count: n,
        pages,
    }
}

/// One extent per page that is either declared in `page_sizes` or has lines.
fn page_extents(lines: &[Line], page_sizes: &[PageSize]) -> Vec<PageExtent> {
    let indices: BTreeSet<usize> = page_sizes
        .iter()
        .map(|p| p.page_index)
        .chain(lines.iter().map(|l| l.page_index))
        .collect();

    indices
        .into_iter()
        .map(|page_index| {
            let on_page: Vec<&Line> = lines.iter().filter(|l| l.page_index == page_index).collect();
            let declared = page_sizes.iter().find(|p| p.page_index == page_index);

            let left = mode_of(on_page.iter().map(|l| l.bbox.x0.round() as i32))
                .map(|k| k as f32)
                .unwrap_or(0.0);
            let width = declared
                .map(|p| p.width)
                .filter(|w| *w > 0.0)
                .unwrap_or_else(|| on_page.iter().map(|l| l.bbox.x1).fold(0.0, f32::max));
            let height = declared
                .map(|p| p.height)
                .filter(|h| *h > 0.0)
                .unwrap_or_else(|| on_page.iter().map(|l| l.bbox.y1).fold(0.0, f32::max));

            PageExtent {
                page_index,
                width,
                height,
                left,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BBox;

    fn line(size: f32, page: usize, x: f32, top: f32) -> Line {
        Line {
            text: "text".to_string(),
            font_size: size,
            is_bold: false,
            is_italic: false,
            bbox: BBox::new(x, top, x + 100.0, top + size),
            page_index: page,
            run_count: 1,
        }
    }

    fn letter(page_index: usize) -> PageSize {
        PageSize {
            page_index,
            width: 612.0,
            height: 792.0,
        }
    }

    #[test]
    fn test_empty_document_uses_sentinels() {
        let stats = document_stats(&[], &[letter(0)]);
        assert!(stats.is_empty());
        assert_eq!(stats.font_size_median, 0.0);
        assert_eq!(stats.font_size_max, 0.0);
        assert_eq!(stats.page_count, 1);
        assert_eq!(stats.pages.len(), 1);
    }

    #[test]
    fn test_basic_statistics() {
        let lines = vec![
            line(10.0, 0, 72.0, 100.0),
            line(10.0, 0, 72.0, 120.0),
            line(12.0, 0, 72.0, 140.0),
            line(24.0, 0, 72.0, 50.0),
        ];
        let stats = document_stats(&lines, &[letter(0)]);
        assert_eq!(stats.line_count, 4);
        assert!((stats.font_size_mean - 14.0).abs() < 1e-5);
        assert_eq!(stats.font_size_median, 11.0);
        assert_eq!(stats.font_size_mode, 10.0);
        assert_eq!(stats.font_size_max, 24.0);
    }

    #[test]
    fn test_odd_count_median() {
        let lines = vec![line(9.0, 0, 0.0, 0.0), line(30.0, 0, 0.0, 20.0), line(11.0, 0, 0.0, 40.0)];
        assert_eq!(document_stats(&lines, &[]).font_size_median, 11.0);
    }

    #[test]
    fn test_mode_tie_breaks_to_smallest() {
        let lines = vec![
            line(14.0, 0, 0.0, 0.0),
            line(14.0, 0, 0.0, 20.0),
            line(10.0, 0, 0.0, 40.0),
            line(10.0, 0, 0.0, 60.0),
        ];
        assert_eq!(document_stats(&lines, &[]).font_size_mode, 10.0);
    }

    #[test]
    fn test_mode_uses_rounded_sizes() {
        let lines = vec![
            line(9.96, 0, 0.0, 0.0),
            line(10.02, 0, 0.0, 20.0),
            line(12.0, 0, 0.0, 40.0),
        ];
        assert_eq!(document_stats(&lines, &[]).font_size_mode, 10.0);
    }

    #[test]
    fn test_zero_sizes_ignored() {
        let lines = vec![line(0.0, 0, 0.0, 0.0), line(12.0, 0, 0.0, 20.0)];
        let stats = document_stats(&lines, &[]);
        assert_eq!(stats.line_count, 1);
        assert_eq!(stats.font_size_median, 12.0);
    }

    #[test]
    fn test_page_extents() {
        let lines = vec![
            line(10.0, 0, 72.2, 300.0),
            line(10.0, 0, 71.8, 320.0),
            line(10.0, 0, 90.0, 90.0),
            line(10.0, 1, 50.0, 60.0),
        ];
        let stats = document_stats(&lines, &[letter(0)]);
        assert_eq!(stats.page_count, 2);

        let first = stats.page(0).unwrap();
        assert_eq!(first.left, 72.0);
        assert_eq!(first.height, 792.0);

        // Page 1 has no declared size; fall back to the line extents.
        let second = stats.page(1).unwrap();
        assert_eq!(second.height, 70.0);
        assert_eq!(second.width, 150.0);
    }

    #[test]
    fn test_stats_independent_of_line_order() {
        let mut lines = vec![
            line(10.0, 0, 72.0, 100.0),
            line(18.0, 0, 72.0, 50.0),
            line(11.0, 1, 72.0, 70.0),
        ];
        let a = document_stats(&lines, &[]);
        lines.reverse();
        assert_eq!(a, document_stats(&lines, &[]));
    }
}
