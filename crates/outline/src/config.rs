//! Tunable constants of the classifier.
//!
//! Every numeric threshold and weight the scorer and the hierarchy
//! classifier consult lives in [`Thresholds`], so the heuristics can be tuned
//! (or loaded from a TOML file by the CLI) without touching classification
//! logic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lower bound for the median font size when computing size ratios.
pub const EPSILON: f32 = 1e-3;

#[derive(Debug, Error, PartialEq)]
#[error("Invalid thresholds: {0}")]
pub struct InvalidThresholds(pub String);

/// Size ratio tiers, zone fractions and length limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum size ratio for an H1.
    pub h1: f32,
    /// Minimum size ratio for an H2.
    pub h2: f32,
    /// Minimum size ratio for an H3; anything below is not a heading.
    pub h3: f32,
    /// Fraction of the first page's height that counts as the title zone.
    pub top_zone_fraction: f32,
    /// Lines shorter than this (in characters, after trimming) are noise.
    pub min_len: usize,
    /// Lines longer than this are body text, never headings.
    pub max_len: usize,
    /// Tiered candidates must also reach this score.
    pub min_heading_score: f32,
    /// Identical text at the same position on this many pages is a running
    /// header or footer.
    pub recurring_min_pages: usize,
    /// Size ratio from which the size bonus applies.
    pub size_bonus_floor: f32,
    /// Ratio distance above 1.0 at which the size bonus saturates.
    pub size_saturation: f32,
    /// Maximum distance (points) from the page's dominant left margin that
    /// still counts as left-aligned.
    pub left_align_tolerance: f32,
    /// Word limit for the title-case / all-caps bonus.
    pub short_text_words: usize,
    /// Maximum gap between title lines, as a multiple of the font size.
    pub title_merge_gap: f32,
    /// Keep only the best N headings; `None` keeps all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_headings: Option<usize>,
    pub weights: ScoreWeights,
}

/// Additive contributions to `heading_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub size: f32,
    pub bold: f32,
    pub italic: f32,
    pub title_zone: f32,
    pub left_aligned: f32,
    pub case: f32,
    pub numbering: f32,
    /// Subtracted for lines ending like a sentence.
    pub trailing_punct: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            h1: 1.8,
            h2: 1.4,
            h3: 1.1,
            top_zone_fraction: 0.2,
            min_len: 3,
            max_len: 150,
            min_heading_score: 0.25,
            recurring_min_pages: 3,
            size_bonus_floor: 1.15,
            size_saturation: 1.0,
            left_align_tolerance: 6.0,
            short_text_words: 12,
            title_merge_gap: 1.6,
            max_headings: None,
            weights: ScoreWeights::default(),
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            size: 0.45,
            bold: 0.2,
            italic: 0.08,
            title_zone: 0.15,
            left_aligned: 0.05,
            case: 0.1,
            numbering: 0.15,
            trailing_punct: 0.15,
        }
    }
}

impl Thresholds {
    /// Check the invariants the classifier relies on.
    pub fn validate(&self) -> Result<(), InvalidThresholds> {
        if !(self.h3 > 0.0 && self.h2 >= self.h3 && self.h1 >= self.h2) {
            return Err(InvalidThresholds(format!(
                "tiers must satisfy h1 >= h2 >= h3 > 0 (got {}, {}, {})",
                self.h1, self.h2, self.h3
            )));
        }
        if !(self.top_zone_fraction > 0.0 && self.top_zone_fraction <= 1.0) {
            return Err(InvalidThresholds(format!(
                "top_zone_fraction must be in (0, 1] (got {})",
                self.top_zone_fraction
            )));
        }
        if self.min_len > self.max_len {
            return Err(InvalidThresholds(format!(
                "min_len ({}) exceeds max_len ({})",
                self.min_len, self.max_len
            )));
        }
        if self.recurring_min_pages < 2 {
            return Err(InvalidThresholds(
                "recurring_min_pages must be at least 2".into(),
            ));
        }
        if self.size_saturation <= 0.0 {
            return Err(InvalidThresholds(
                "size_saturation must be positive".into(),
            ));
        }
        Ok(())
    }
}
