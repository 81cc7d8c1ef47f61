use std::path::Path;

use log::{debug, info};
use thiserror::Error;

use parser::backend::LopdfSource;

pub mod assemble;
pub mod classify;
pub mod cleanup;
pub mod config;
pub mod parser;
pub mod scorer;
pub mod stats;
pub mod types;

pub use assemble::{OutlineEntry, OutlineRecord};
pub use config::{InvalidThresholds, ScoreWeights, Thresholds};
pub use types::*;

#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    InvalidThresholds(#[from] InvalidThresholds),
}

/// Extract the outline of an in-memory PDF.
///
/// `file_name` is only used for the result and the fallback title.
pub fn extract(
    bytes: &[u8],
    file_name: &str,
    thresholds: &Thresholds,
) -> Result<OutlineResult, OutlineError> {
    thresholds.validate()?;
    let source = LopdfSource::open(bytes)?;
    let metadata = read_metadata(&source);
    let pages = parser::runs::extract_all_pages(&source)?;
    Ok(outline_from_pages(
        &pages,
        metadata.title.as_deref(),
        file_name,
        thresholds,
    ))
}

/// Read and extract a PDF from disk.
pub fn extract_file(path: &Path, thresholds: &Thresholds) -> Result<OutlineResult, OutlineError> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    extract(&bytes, &file_name, thresholds)
}

/// Get document metadata without running the outline pipeline.
pub fn info(bytes: &[u8]) -> Result<DocumentMetadata, OutlineError> {
    let source = LopdfSource::open(bytes)?;
    Ok(read_metadata(&source))
}

/// Run the pipeline from already extracted page runs.
pub fn outline_from_pages(
    pages: &[PageRuns],
    metadata_title: Option<&str>,
    file_name: &str,
    thresholds: &Thresholds,
) -> OutlineResult {
    let lines = parser::lines::merge_pages(pages);
    let sizes: Vec<PageSize> = pages.iter().map(PageRuns::size).collect();
    outline_from_lines(&lines, &sizes, metadata_title, file_name, thresholds)
}

/// Run the pipeline from merged lines.
///
/// A document without any usable line yields the file stem as title and no
/// headings.
pub fn outline_from_lines(
    lines: &[Line],
    page_sizes: &[PageSize],
    metadata_title: Option<&str>,
    file_name: &str,
    thresholds: &Thresholds,
) -> OutlineResult {
    let stats = stats::document_stats(lines, page_sizes);
    if stats.is_empty() {
        info!("{file_name}: no text found, using fallback outline");
        return OutlineResult::fallback(file_name);
    }
    debug!(
        "{file_name}: {} lines on {} pages, font size median {:.2} mode {:.2} max {:.2}",
        stats.line_count,
        stats.page_count,
        stats.font_size_median,
        stats.font_size_mode,
        stats.font_size_max
    );

    let recurrence = scorer::RecurrenceMap::from_lines(lines);
    let candidates = scorer::score_lines(lines, &stats, &recurrence, thresholds);
    let title = classify::select_title(&candidates, metadata_title, file_name, thresholds);
    let headings = classify::assign_levels(&candidates, &title, thresholds);
    debug!("{file_name}: {} headings", headings.len());

    assemble::assemble(file_name, title.text, headings)
}

fn read_metadata(source: &LopdfSource) -> DocumentMetadata {
    let mut strings = source.info_strings();
    let mut take = |key: &str| strings.remove(key).filter(|v| !v.trim().is_empty());
    DocumentMetadata {
        title: take("Title"),
        author: take("Author"),
        creator: take("Creator"),
        page_count: source.page_count(),
    }
}
