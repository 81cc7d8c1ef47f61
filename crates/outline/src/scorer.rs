//! Candidate scoring: noise filtering plus a weighted heading-likelihood
//! score for every surviving line.
//!
//! The scorer is a pure function of the lines, the document baselines, the
//! per-document [`RecurrenceMap`] and the [`Thresholds`]; identical input
//! always produces bit-identical scores.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::cleanup::comparison_key;
use crate::config::{Thresholds, EPSILON};
use crate::types::{BBoxKey, Candidate, DocumentStats, Line, PageExtent};

/// Why a line can never be a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooShort,
    TooLong,
    Numeric,
    Punctuation,
    PageNumber,
    Recurring,
}

/// Pages on which each (text, position) pair occurs.
///
/// Built once per document and handed to the scorer explicitly so that
/// running-header detection carries no hidden state.
#[derive(Debug, Clone, Default)]
pub struct RecurrenceMap {
    pages: HashMap<(String, BBoxKey), BTreeSet<usize>>,
}

impl RecurrenceMap {
    pub fn from_lines(lines: &[Line]) -> Self {
        let mut pages: HashMap<(String, BBoxKey), BTreeSet<usize>> = HashMap::new();
        for line in lines {
            pages
                .entry(Self::key(line))
                .or_default()
                .insert(line.page_index);
        }
        RecurrenceMap { pages }
    }

    fn key(line: &Line) -> (String, BBoxKey) {
        (comparison_key(&line.text), line.bbox.key())
    }

    /// Number of distinct pages showing this line's text at its position.
    pub fn page_count(&self, line: &Line) -> usize {
        self.pages.get(&Self::key(line)).map_or(0, BTreeSet::len)
    }
}

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\d\s.,:/\-\u{2013}]+$").unwrap())
}

fn page_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)^(?:
                (?:page|pg\.?|p\.)\s*\d+(?:\s*(?:of|/)\s*\d+)? |
                \d+\s*(?:of|/)\s*\d+ |
                [-\u{2013}\u{2014}]\s*\d+\s*[-\u{2013}\u{2014}]
            )$",
        )
        .unwrap()
    })
}

fn lowercase_roman_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[ivxlc]{1,6}$").unwrap())
}

fn numbering_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:\d+(?:\.\d+)*[.)]?\s+\S|[IVXLC]+\.\s+\S|[A-Z][.)]\s+\S|(?i:chapter|section|part|appendix)\s+[A-Za-z0-9]+\b)",
        )
        .unwrap()
    })
}

/// Short function words that stay lowercase in title case.
const MINOR_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "by", "for", "in", "of", "on", "or", "the", "to", "with",
];

/// Check the noise filters in order of cost.
pub fn rejection(
    line: &Line,
    recurrence: &RecurrenceMap,
    thresholds: &Thresholds,
) -> Option<Rejection> {
    let text = line.text.trim();
    let len = text.chars().count();

    if len < thresholds.min_len {
        return Some(Rejection::TooShort);
    }
    if len > thresholds.max_len {
        return Some(Rejection::TooLong);
    }
    if !text.chars().any(char::is_alphanumeric) {
        return Some(Rejection::Punctuation);
    }
    if numeric_re().is_match(text) {
        return Some(Rejection::Numeric);
    }
    if page_number_re().is_match(text) || lowercase_roman_re().is_match(text) {
        return Some(Rejection::PageNumber);
    }
    if recurrence.page_count(line) >= thresholds.recurring_min_pages {
        return Some(Rejection::Recurring);
    }
    None
}

pub fn has_numbering(text: &str) -> bool {
    numbering_re().is_match(text)
}

/// All letters uppercase, at least two of them.
pub fn is_all_caps(text: &str) -> bool {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| !c.is_lowercase())
}

/// Every significant word starts with an uppercase letter.
pub fn is_title_case(text: &str) -> bool {
    let mut significant = 0;
    for (i, word) in text.split_whitespace().enumerate() {
        let Some(first) = word.chars().find(|c| c.is_alphabetic()) else {
            continue;
        };
        if i > 0 && MINOR_WORDS.contains(&word.to_lowercase().as_str()) {
            continue;
        }
        if !first.is_uppercase() {
            return false;
        }
        significant += 1;
    }
    significant > 0
}

fn ends_like_sentence(text: &str) -> bool {
    text.ends_with(['.', ',', ';']) && !text.ends_with("...")
}

/// Size ratio of a line against the document median.
pub fn size_ratio(line: &Line, stats: &DocumentStats) -> f32 {
    line.font_size / stats.font_size_median.max(EPSILON)
}

/// Whether the line sits in the title zone of the first page.
pub fn in_title_zone(line: &Line, stats: &DocumentStats, thresholds: &Thresholds) -> bool {
    if line.page_index != 0 {
        return false;
    }
    match stats.page(0) {
        Some(page) if page.height > 0.0 => {
            line.top() / page.height <= thresholds.top_zone_fraction
        }
        _ => false,
    }
}

/// Flush with the page's dominant left margin, or centred on the page.
fn is_aligned(line: &Line, page: &PageExtent, tolerance: f32) -> bool {
    let left = (line.left() - page.left).abs() <= tolerance;
    let centre = (line.bbox.x0 + line.bbox.x1) / 2.0;
    let centred = page.width > 0.0 && (centre - page.width / 2.0).abs() <= tolerance;
    left || centred
}

/// Score one line that already passed the noise filters.
pub fn score_line(line: &Line, stats: &DocumentStats, thresholds: &Thresholds) -> Candidate {
    let w = &thresholds.weights;
    let text = line.text.trim();
    let ratio = size_ratio(line, stats);
    let mut score = 0.0_f32;

    if ratio >= thresholds.size_bonus_floor {
        let deviation = ((ratio - 1.0) / thresholds.size_saturation).min(1.0);
        score += w.size * (0.5 + 0.5 * deviation);
    }

    if line.is_bold {
        score += w.bold;
    }
    if line.is_italic {
        score += w.italic;
    }

    let title_zone = in_title_zone(line, stats, thresholds);
    if title_zone {
        score += w.title_zone;
    }
    if stats
        .page(line.page_index)
        .is_some_and(|page| is_aligned(line, page, thresholds.left_align_tolerance))
    {
        score += w.left_aligned;
    }

    let short = text.split_whitespace().count() <= thresholds.short_text_words;
    if short && (is_all_caps(text) || is_title_case(text)) {
        score += w.case;
    }
    if has_numbering(text) {
        score += w.numbering;
    }
    if ends_like_sentence(text) {
        score -= w.trailing_punct;
    }

    Candidate {
        line: line.clone(),
        heading_score: score.clamp(0.0, 1.0),
        size_ratio: ratio,
        is_title_candidate: title_zone,
    }
}

/// Map lines to candidates, dropping every line a noise filter rejects.
///
/// Output order follows input order.
pub fn score_lines(
    lines: &[Line],
    stats: &DocumentStats,
    recurrence: &RecurrenceMap,
    thresholds: &Thresholds,
) -> Vec<Candidate> {
    let mut rejected = 0usize;
    let candidates: Vec<Candidate> = lines
        .iter()
        .filter(|line| match rejection(line, recurrence, thresholds) {
            Some(reason) => {
                rejected += 1;
                debug!("rejected {:?} ({:?})", line.text, reason);
                false
            }
            None => true,
        })
        .map(|line| score_line(line, stats, thresholds))
        .collect();

    debug!(
        "{} candidates, {} lines rejected as noise",
        candidates.len(),
        rejected
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::document_stats;
    use crate::types::{BBox, PageSize};

    fn line(text: &str, size: f32, page: usize, x: f32, top: f32) -> Line {
        Line {
            text: text.to_string(),
            font_size: size,
            is_bold: false,
            is_italic: false,
            bbox: BBox::new(x, top, x + 200.0, top + size),
            page_index: page,
            run_count: 1,
        }
    }

    fn stats_for(lines: &[Line]) -> DocumentStats {
        let pages: Vec<PageSize> = (0..3)
            .map(|page_index| PageSize {
                page_index,
                width: 612.0,
                height: 792.0,
            })
            .collect();
        document_stats(lines, &pages)
    }

    fn body() -> Vec<Line> {
        (0..5)
            .map(|i| line("Body text that runs along the page.", 10.0, 0, 72.0, 300.0 + i as f32 * 14.0))
            .collect()
    }

    #[test]
    fn test_rejects_numeric_and_short() {
        let t = Thresholds::default();
        let map = RecurrenceMap::default();
        assert_eq!(rejection(&line("42", 20.0, 0, 72.0, 10.0), &map, &t), Some(Rejection::TooShort));
        assert_eq!(rejection(&line("2024", 20.0, 0, 72.0, 10.0), &map, &t), Some(Rejection::Numeric));
        assert_eq!(rejection(&line("3.14.15", 20.0, 0, 72.0, 10.0), &map, &t), Some(Rejection::Numeric));
        assert_eq!(rejection(&line(" ab ", 20.0, 0, 72.0, 10.0), &map, &t), Some(Rejection::TooShort));
    }

    #[test]
    fn test_rejects_punctuation_and_page_numbers() {
        let t = Thresholds::default();
        let map = RecurrenceMap::default();
        assert_eq!(rejection(&line("* * *", 12.0, 0, 72.0, 10.0), &map, &t), Some(Rejection::Punctuation));
        assert_eq!(rejection(&line("Page 3", 12.0, 0, 72.0, 10.0), &map, &t), Some(Rejection::PageNumber));
        assert_eq!(rejection(&line("3 of 10", 12.0, 0, 72.0, 10.0), &map, &t), Some(Rejection::PageNumber));
        assert_eq!(rejection(&line("- 4 -", 12.0, 0, 72.0, 10.0), &map, &t), Some(Rejection::PageNumber));
        assert_eq!(rejection(&line("xiv", 12.0, 0, 72.0, 10.0), &map, &t), Some(Rejection::PageNumber));
        assert_eq!(rejection(&line("Pages of history", 12.0, 0, 72.0, 10.0), &map, &t), None);
    }

    #[test]
    fn test_rejects_long_lines() {
        let t = Thresholds::default();
        let long = "word ".repeat(40);
        assert_eq!(
            rejection(&line(&long, 20.0, 0, 72.0, 10.0), &RecurrenceMap::default(), &t),
            Some(Rejection::TooLong)
        );
    }

    #[test]
    fn test_recurring_header_rejected_on_three_pages() {
        let t = Thresholds::default();
        let header: Vec<Line> = (0..3)
            .map(|p| line("ACME Annual Report", 16.0, p, 72.0, 20.0))
            .collect();
        let map = RecurrenceMap::from_lines(&header);
        assert_eq!(map.page_count(&header[0]), 3);
        assert_eq!(rejection(&header[1], &map, &t), Some(Rejection::Recurring));

        // Same text elsewhere on the page is a different key.
        let moved = line("ACME Annual Report", 16.0, 1, 72.0, 400.0);
        assert_eq!(rejection(&moved, &map, &t), None);
    }

    #[test]
    fn test_two_pages_is_not_recurring() {
        let t = Thresholds::default();
        let header: Vec<Line> = (0..2)
            .map(|p| line("Draft for review", 12.0, p, 72.0, 20.0))
            .collect();
        let map = RecurrenceMap::from_lines(&header);
        assert_eq!(rejection(&header[0], &map, &t), None);
    }

    #[test]
    fn test_score_lines_drops_rejected() {
        let t = Thresholds::default();
        let mut lines = body();
        lines.push(line("12", 18.0, 0, 72.0, 200.0));
        lines.push(line("Introduction", 18.0, 0, 72.0, 250.0));
        let stats = stats_for(&lines);
        let candidates = score_lines(&lines, &stats, &RecurrenceMap::from_lines(&lines), &t);
        assert_eq!(candidates.len(), 6);
        assert!(candidates.iter().all(|c| c.line.text != "12"));
    }

    #[test]
    fn test_size_ratio_against_median() {
        let mut lines = body();
        lines.push(line("Scope", 20.0, 0, 72.0, 250.0));
        let stats = stats_for(&lines);
        let c = score_line(&lines[5], &stats, &Thresholds::default());
        assert!((c.size_ratio - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_larger_and_bolder_scores_higher() {
        let t = Thresholds::default();
        let mut lines = body();
        lines.push(line("Methods and results", 12.0, 0, 72.0, 250.0));
        lines.push(line("Methods and results", 20.0, 0, 72.0, 260.0));
        let stats = stats_for(&lines);

        let plain = score_line(&lines[5], &stats, &t);
        let large = score_line(&lines[6], &stats, &t);
        assert!(large.heading_score > plain.heading_score);

        let mut bold = lines[5].clone();
        bold.is_bold = true;
        let mut italic = lines[5].clone();
        italic.is_italic = true;
        let bold = score_line(&bold, &stats, &t);
        let italic = score_line(&italic, &stats, &t);
        assert!(bold.heading_score > italic.heading_score);
        assert!(italic.heading_score > plain.heading_score);
    }

    #[test]
    fn test_title_zone_only_on_first_page() {
        let t = Thresholds::default();
        let mut lines = body();
        lines.push(line("Annual Report", 24.0, 0, 72.0, 60.0));
        lines.push(line("Annual Report", 24.0, 1, 72.0, 60.0));
        let stats = stats_for(&lines);
        assert!(score_line(&lines[5], &stats, &t).is_title_candidate);
        assert!(!score_line(&lines[6], &stats, &t).is_title_candidate);
        // 300 / 792 is below the top fifth.
        assert!(!score_line(&lines[0], &stats, &t).is_title_candidate);
    }

    #[test]
    fn test_centred_and_left_aligned_lines_get_alignment_bonus() {
        let t = Thresholds::default();
        let mut lines = body();
        // 200pt wide, so x0 = 206 centres it on a 612pt page.
        lines.push(line("Results Overview", 12.0, 0, 206.0, 250.0));
        lines.push(line("Results Overview", 12.0, 0, 72.0, 270.0));
        lines.push(line("Results Overview", 12.0, 0, 150.0, 290.0));
        let stats = stats_for(&lines);
        let centred = score_line(&lines[5], &stats, &t).heading_score;
        let left = score_line(&lines[6], &stats, &t).heading_score;
        let neither = score_line(&lines[7], &stats, &t).heading_score;
        assert!((centred - left).abs() < 1e-6);
        assert!((left - neither - t.weights.left_aligned).abs() < 1e-6);
    }

    #[test]
    fn test_sentence_punctuation_penalised() {
        let t = Thresholds::default();
        let mut lines = body();
        lines.push(line("Results Overview", 12.0, 1, 300.0, 250.0));
        lines.push(line("Results Overview.", 12.0, 1, 300.0, 270.0));
        let stats = stats_for(&lines);
        let clean = score_line(&lines[5], &stats, &t);
        let sentence = score_line(&lines[6], &stats, &t);
        assert!(clean.heading_score > sentence.heading_score);
    }

    #[test]
    fn test_score_is_clamped() {
        let t = Thresholds::default();
        let mut lines = body();
        let mut strong = line("1. INTRODUCTION", 40.0, 0, 72.0, 30.0);
        strong.is_bold = true;
        strong.is_italic = true;
        lines.push(strong);
        let stats = stats_for(&lines);
        let c = score_line(&lines[5], &stats, &t);
        assert!(c.heading_score <= 1.0);
        assert!(c.heading_score > 0.9);
    }

    #[test]
    fn test_scores_are_deterministic() {
        let t = Thresholds::default();
        let mut lines = body();
        lines.push(line("2.1 Data Sources", 14.0, 1, 72.0, 100.0));
        let stats = stats_for(&lines);
        let map = RecurrenceMap::from_lines(&lines);
        let a = score_lines(&lines, &stats, &map, &t);
        let b = score_lines(&lines, &stats, &map, &t);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.heading_score.to_bits(), y.heading_score.to_bits());
        }
    }

    #[test]
    fn test_numbering_patterns() {
        assert!(has_numbering("1. Introduction"));
        assert!(has_numbering("1.1 Scope"));
        assert!(has_numbering("2.3.4 Edge cases"));
        assert!(has_numbering("IV. Findings"));
        assert!(has_numbering("A. Background"));
        assert!(has_numbering("Chapter 3"));
        assert!(has_numbering("appendix B: Tables"));
        assert!(!has_numbering("Introduction"));
        assert!(!has_numbering("In 1.5 seconds"));
    }

    #[test]
    fn test_case_shapes() {
        assert!(is_title_case("Summary of the Findings"));
        assert!(!is_title_case("summary of findings"));
        assert!(!is_title_case("This sentence is ordinary"));
        assert!(is_all_caps("TABLE OF CONTENTS"));
        assert!(!is_all_caps("Table of Contents"));
        assert!(!is_all_caps("A"));
    }

    #[test]
    fn test_empty_stats_do_not_divide_by_zero() {
        let stats = DocumentStats::default();
        let c = score_line(&line("Heading", 12.0, 0, 72.0, 10.0), &stats, &Thresholds::default());
        assert!(c.size_ratio.is_finite());
        assert!(!c.is_title_candidate);
    }
}
