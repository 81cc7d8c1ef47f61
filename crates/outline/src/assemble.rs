//! Wrapping classifier output into [`OutlineResult`]s and their JSON form.

use serde::Serialize;

use crate::classify::file_stem;
use crate::types::{HeadingLevel, HeadingRecord, OutlineResult};

/// Build the result for one document.
///
/// Headings are kept in the order given. An empty title is replaced by the
/// file stem so every result carries one.
pub fn assemble(file_name: &str, title: String, headings: Vec<HeadingRecord>) -> OutlineResult {
    let title = if title.trim().is_empty() {
        file_stem(file_name)
    } else {
        title
    };
    OutlineResult {
        file_name: file_name.to_string(),
        title,
        headings,
    }
}

/// One document in the output array.
#[derive(Debug, Serialize)]
pub struct OutlineRecord<'a> {
    pub file_name: &'a str,
    pub title: &'a str,
    pub headings: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec<OutlineEntry<'a>>>,
}

#[derive(Debug, Serialize)]
pub struct OutlineEntry<'a> {
    pub level: HeadingLevel,
    pub text: &'a str,
    /// 1-based page number.
    pub page: usize,
}

impl OutlineResult {
    /// Degraded result for a document that could not be processed.
    pub fn fallback(file_name: &str) -> Self {
        assemble(file_name, String::new(), Vec::new())
    }

    /// Wire form; `levels` adds the leveled `outline` array.
    pub fn to_record(&self, levels: bool) -> OutlineRecord<'_> {
        OutlineRecord {
            file_name: &self.file_name,
            title: &self.title,
            headings: self.headings.iter().map(|h| h.text.as_str()).collect(),
            outline: levels.then(|| {
                self.headings
                    .iter()
                    .map(|h| OutlineEntry {
                        level: h.level,
                        text: &h.text,
                        page: h.page_index + 1,
                    })
                    .collect()
            }),
        }
    }

    pub fn to_json(&self, levels: bool) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_record(levels))
    }
}
