//! Title selection and H1/H2/H3 tiering.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use log::debug;

use crate::cleanup::{cleanup_text, comparison_key};
use crate::config::{Thresholds, EPSILON};
use crate::types::{BBoxKey, Candidate, HeadingLevel, HeadingRecord, Line};

/// Two lines of one title may differ in size by at most this many points.
const TITLE_SIZE_TOLERANCE: f32 = 0.5;

const GENERIC_TITLES: &[&str] = &[
    "untitled",
    "untitled document",
    "document",
    "new document",
    "title",
    "no title",
    "presentation",
    "slide 1",
];

const GENERIC_PREFIXES: &[&str] = &[
    "microsoft word - ",
    "microsoft powerpoint - ",
    "microsoft excel - ",
];

const GENERIC_SUFFIXES: &[&str] = &[
    ".doc", ".docx", ".pdf", ".tex", ".dvi", ".rtf", ".txt", ".ppt", ".pptx", ".odt", ".indd",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSource {
    Metadata,
    Position,
    FileName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleChoice {
    pub text: String,
    pub source: TitleSource,
    /// Indices of the candidates the title was built from.
    pub consumed: Vec<usize>,
}

/// Metadata titles that authoring tools fill in on their own.
pub fn is_generic_title(title: &str) -> bool {
    let lower = title.trim().to_lowercase();
    if lower.chars().filter(|c| c.is_alphanumeric()).count() < 2 {
        return true;
    }
    GENERIC_TITLES.contains(&lower.as_str())
        || GENERIC_PREFIXES.iter().any(|p| lower.starts_with(p))
        || GENERIC_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// The file name without directory and extension, never empty.
pub fn file_stem(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .unwrap_or_default();
    if !stem.is_empty() {
        stem
    } else if !file_name.trim().is_empty() {
        file_name.trim().to_string()
    } else {
        "untitled".to_string()
    }
}

/// Document order: page, then top edge, then left edge.
pub fn position_cmp(a: &Line, b: &Line) -> Ordering {
    a.page_index
        .cmp(&b.page_index)
        .then(a.top().total_cmp(&b.top()))
        .then(a.left().total_cmp(&b.left()))
}

/// Pick exactly one non-empty title.
///
/// A usable metadata title wins. Otherwise the largest line in the title zone
/// of the first page is used, extended by the lines directly below it that
/// share its size. The file stem is the last resort.
pub fn select_title(
    candidates: &[Candidate],
    metadata_title: Option<&str>,
    file_name: &str,
    thresholds: &Thresholds,
) -> TitleChoice {
    if let Some(meta) = metadata_title.map(cleanup_text) {
        if !is_generic_title(&meta) {
            debug!("title from metadata: {meta:?}");
            return TitleChoice {
                text: meta,
                source: TitleSource::Metadata,
                consumed: Vec::new(),
            };
        } else if !meta.is_empty() {
            debug!("ignoring generic metadata title {meta:?}");
        }
    }

    if let Some(consumed) = positional_title(candidates, thresholds) {
        let text = consumed
            .iter()
            .map(|&i| candidates[i].line.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        debug!("title from first page: {text:?} ({} line(s))", consumed.len());
        return TitleChoice {
            text,
            source: TitleSource::Position,
            consumed,
        };
    }

    TitleChoice {
        text: file_stem(file_name),
        source: TitleSource::FileName,
        consumed: Vec::new(),
    }
}

fn positional_title(candidates: &[Candidate], thresholds: &Thresholds) -> Option<Vec<usize>> {
    // The title must be the largest text of the first page, not merely the
    // largest text inside the title zone.
    let max_ratio = candidates
        .iter()
        .filter(|c| c.line.page_index == 0)
        .map(|c| c.size_ratio)
        .fold(f32::NEG_INFINITY, f32::max);

    let mut zone: Vec<usize> = (0..candidates.len())
        .filter(|&i| candidates[i].is_title_candidate)
        .collect();
    zone.sort_by(|&a, &b| position_cmp(&candidates[a].line, &candidates[b].line));

    // `zone` is in position order, so keeping the first of equal scores
    // resolves ties towards the top of the page.
    let mut best: Option<usize> = None;
    for &i in &zone {
        if (candidates[i].size_ratio - max_ratio).abs() > EPSILON {
            continue;
        }
        if best.is_none_or(|b| candidates[i].heading_score > candidates[b].heading_score) {
            best = Some(i);
        }
    }
    if best.is_none() && !zone.is_empty() {
        debug!("largest first-page line lies outside the title zone");
    }
    let first = best?;

    let mut consumed = vec![first];
    let mut prev = &candidates[first].line;
    let start = zone.iter().position(|&i| i == first).unwrap_or(zone.len());
    for &i in &zone[start + 1..] {
        let line = &candidates[i].line;
        let same_size = (line.font_size - prev.font_size).abs() <= TITLE_SIZE_TOLERANCE;
        let gap = line.top() - prev.top();
        if !same_size || gap <= 0.0 || gap > thresholds.title_merge_gap * prev.font_size {
            break;
        }
        consumed.push(i);
        prev = line;
    }
    Some(consumed)
}

/// Tier for a size ratio, or `None` below the H3 threshold.
pub fn tier(size_ratio: f32, thresholds: &Thresholds) -> Option<HeadingLevel> {
    if size_ratio >= thresholds.h1 {
        Some(HeadingLevel::H1)
    } else if size_ratio >= thresholds.h2 {
        Some(HeadingLevel::H2)
    } else if size_ratio >= thresholds.h3 {
        Some(HeadingLevel::H3)
    } else {
        None
    }
}

/// Turn the non-title candidates into leveled headings in document order.
pub fn assign_levels(
    candidates: &[Candidate],
    title: &TitleChoice,
    thresholds: &Thresholds,
) -> Vec<HeadingRecord> {
    let title_key = comparison_key(&title.text);

    let mut order: Vec<usize> = (0..candidates.len())
        .filter(|i| !title.consumed.contains(i))
        .collect();
    order.sort_by(|&a, &b| position_cmp(&candidates[a].line, &candidates[b].line));

    let mut seen: HashSet<(usize, String, BBoxKey)> = HashSet::new();
    let mut kept: Vec<(usize, HeadingLevel)> = Vec::new();
    for i in order {
        let c = &candidates[i];
        let Some(level) = tier(c.size_ratio, thresholds) else {
            continue;
        };
        if c.heading_score < thresholds.min_heading_score {
            debug!("{:?} tiered {level} but scored {:.3}", c.line.text, c.heading_score);
            continue;
        }
        let key = comparison_key(&c.line.text);
        if key == title_key {
            continue;
        }
        if !seen.insert((c.line.page_index, key, c.line.bbox.key())) {
            continue;
        }
        kept.push((i, level));
    }

    if let Some(limit) = thresholds.max_headings {
        if kept.len() > limit {
            // `kept` is in document order, so a stable sort leaves ties in
            // position order.
            kept.sort_by(|&(a, _), &(b, _)| {
                let (a, b) = (&candidates[a], &candidates[b]);
                b.size_ratio
                    .total_cmp(&a.size_ratio)
                    .then(b.heading_score.total_cmp(&a.heading_score))
            });
            kept.truncate(limit);
            kept.sort_by(|&(a, _), &(b, _)| position_cmp(&candidates[a].line, &candidates[b].line));
        }
    }

    kept.into_iter()
        .map(|(i, level)| {
            let line = &candidates[i].line;
            HeadingRecord {
                text: line.text.clone(),
                level,
                page_index: line.page_index,
                top: line.top(),
            }
        })
        .collect()
}
