use std::fmt;

use serde::{Deserialize, Serialize};

/// Axis-aligned box in page space with a top-left origin (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// A [`BBox`] rounded to whole points so it can be compared and hashed.
pub type BBoxKey = [i32; 4];

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        BBox { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Length of the shared vertical range, 0 when the boxes do not overlap.
    pub fn vertical_overlap(&self, other: &BBox) -> f32 {
        (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0)
    }

    pub fn key(&self) -> BBoxKey {
        [
            self.x0.round() as i32,
            self.y0.round() as i32,
            self.x1.round() as i32,
            self.y1.round() as i32,
        ]
    }
}

/// A single styled text fragment as decoded from a page's content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub font_size: f32,
    pub is_bold: bool,
    pub is_italic: bool,
    pub bbox: BBox,
    /// 0-based page number.
    pub page_index: usize,
}

/// All runs decoded from one page, in extraction order.
///
/// `width` and `height` come from the page's MediaBox; they are 0 when the
/// box could not be resolved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageRuns {
    pub page_index: usize,
    pub width: f32,
    pub height: f32,
    pub runs: Vec<TextRun>,
}

impl PageRuns {
    pub fn size(&self) -> PageSize {
        PageSize {
            page_index: self.page_index,
            width: self.width,
            height: self.height,
        }
    }
}

/// Page dimensions in points; 0 when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageSize {
    pub page_index: usize,
    pub width: f32,
    pub height: f32,
}

/// One or more runs merged by positional adjacency into a logical line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    /// Largest font size among the contributing runs.
    pub font_size: f32,
    pub is_bold: bool,
    pub is_italic: bool,
    pub bbox: BBox,
    pub page_index: usize,
    pub run_count: usize,
}

impl Line {
    /// Vertical position of the line's top edge.
    pub fn top(&self) -> f32 {
        self.bbox.y0
    }

    pub fn left(&self) -> f32 {
        self.bbox.x0
    }
}

/// Geometry of a single page as seen by the classifier.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageExtent {
    pub page_index: usize,
    pub width: f32,
    pub height: f32,
    /// Dominant left margin: the most common rounded `x0` on the page.
    pub left: f32,
}

/// Document-wide baselines every scoring decision is normalised against.
///
/// The `Default` value doubles as the sentinel for documents without any
/// usable lines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentStats {
    pub font_size_mean: f32,
    pub font_size_median: f32,
    pub font_size_mode: f32,
    pub font_size_max: f32,
    pub page_count: usize,
    pub line_count: usize,
    pub pages: Vec<PageExtent>,
}

impl DocumentStats {
    pub fn is_empty(&self) -> bool {
        self.line_count == 0
    }

    pub fn page(&self, page_index: usize) -> Option<&PageExtent> {
        self.pages.iter().find(|p| p.page_index == page_index)
    }
}

/// A line that survived noise filtering, with its heading likelihood.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub line: Line,
    pub heading_score: f32,
    /// Line font size divided by the document's median font size.
    pub size_ratio: f32,
    /// First page, inside the title zone.
    pub is_title_candidate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    pub fn as_u8(&self) -> u8 {
        match self {
            HeadingLevel::H1 => 1,
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
        }
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.as_u8())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadingRecord {
    pub text: String,
    pub level: HeadingLevel,
    pub page_index: usize,
    /// Vertical position on the page; only used for ordering.
    pub top: f32,
}

/// The outline of a single input document.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineResult {
    pub file_name: String,
    pub title: String,
    pub headings: Vec<HeadingRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub page_count: usize,
}
