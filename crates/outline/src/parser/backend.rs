//! Page-object access behind the [`PageSource`] trait.
//!
//! Run extraction only needs a handful of things from a PDF: the ordered
//! page list, each page's fonts, its MediaBox and its decoded content
//! operations. [`LopdfSource`] provides them from a real file; tests provide
//! them from hand-built pages.

use std::collections::BTreeMap;

use log::debug;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object};

use crate::OutlineError;

/// An indirect object reference: (object number, generation number).
pub type ObjectRef = (u32, u16);

/// Letter-size page box used when a page has no resolvable MediaBox.
pub const LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// FontDescriptor `Flags` bit for italic faces.
const FLAG_ITALIC: i64 = 1 << 6;
/// FontDescriptor `Flags` bit for synthetic bold.
const FLAG_FORCE_BOLD: i64 = 1 << 18;

/// Page trees deeper than this are treated as cyclic.
const MAX_TREE_DEPTH: usize = 32;

const BOLD_MARKERS: &[&str] = &["BOLD", "BLACK", "HEAVY", "SEMIBOLD", "DEMI"];
const ITALIC_MARKERS: &[&str] = &["ITALIC", "OBLIQUE"];

/// A font resource of one page and the style hints it carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontResource {
    /// Resource key as used by `Tf`, e.g. `b"F1"`.
    pub key: Vec<u8>,
    pub base_font: Option<String>,
    pub descriptor_flags: Option<i64>,
    pub encoding: Option<String>,
}

impl FontResource {
    /// The name style is guessed from: the base font, else the resource key.
    fn style_name(&self) -> String {
        match &self.base_font {
            Some(name) => name.to_uppercase(),
            None => String::from_utf8_lossy(&self.key).to_uppercase(),
        }
    }

    pub fn is_bold(&self) -> bool {
        let name = self.style_name();
        BOLD_MARKERS.iter().any(|m| name.contains(m))
            || self
                .descriptor_flags
                .is_some_and(|f| f & FLAG_FORCE_BOLD != 0)
    }

    pub fn is_italic(&self) -> bool {
        let name = self.style_name();
        ITALIC_MARKERS.iter().any(|m| name.contains(m))
            || self.descriptor_flags.is_some_and(|f| f & FLAG_ITALIC != 0)
    }
}

/// A content-stream operand, reduced to what text extraction looks at.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f32),
    Name(Vec<u8>),
    Text(Vec<u8>),
    Array(Vec<Operand>),
    Other,
}

impl Operand {
    pub fn number(&self) -> Option<f32> {
        match self {
            Operand::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&Object> for Operand {
    fn from(obj: &Object) -> Self {
        match obj {
            Object::Integer(i) => Operand::Number(*i as f32),
            Object::Real(r) => Operand::Number(*r),
            Object::Name(n) => Operand::Name(n.clone()),
            Object::String(s, _) => Operand::Text(s.clone()),
            Object::Array(items) => Operand::Array(items.iter().map(Operand::from).collect()),
            _ => Operand::Other,
        }
    }
}

/// One content-stream operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
    pub operator: String,
    pub operands: Vec<Operand>,
}

impl Op {
    pub fn new(operator: &str, operands: Vec<Operand>) -> Self {
        Op {
            operator: operator.to_string(),
            operands,
        }
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, then UTF-8, then Latin-1.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => utf16_be(rest),
        _ => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            // PDFDocEncoding agrees with Latin-1 on the printable range.
            Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
        },
    }
}

fn utf16_be(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// What the run extractor needs from a document.
pub trait PageSource {
    /// Page references in page order.
    fn page_refs(&self) -> Vec<ObjectRef>;

    fn fonts(&self, page: ObjectRef) -> Result<Vec<FontResource>, OutlineError>;

    /// The page's MediaBox as `[llx, lly, urx, ury]`.
    fn media_box(&self, page: ObjectRef) -> Result<[f32; 4], OutlineError>;

    /// The page's content stream, decoded into operations.
    fn operations(&self, page: ObjectRef) -> Result<Vec<Op>, OutlineError>;

    /// Turn the bytes of a text-showing operator into text.
    ///
    /// Two-byte `Identity` encodings are tried as UTF-16BE first.
    fn decode_text(&self, font: Option<&FontResource>, bytes: &[u8]) -> String {
        let identity = font
            .and_then(|f| f.encoding.as_deref())
            .is_some_and(|e| e.starts_with("Identity"));
        if identity && !bytes.is_empty() && bytes.len() % 2 == 0 {
            let decoded = utf16_be(bytes);
            if decoded.chars().any(|c| c != '\u{FFFD}' && c != '\0') {
                return decoded;
            }
        }
        decode_pdf_string(bytes)
    }
}

/// [`PageSource`] backed by a parsed [`lopdf::Document`].
pub struct LopdfSource {
    doc: Document,
}

impl LopdfSource {
    /// Parse a PDF held in memory. Encrypted documents are refused.
    pub fn open(data: &[u8]) -> Result<Self, OutlineError> {
        let doc = Document::load_mem(data).map_err(|e| OutlineError::Parse(e.to_string()))?;
        if doc.is_encrypted() {
            return Err(OutlineError::Encrypted);
        }
        Ok(LopdfSource { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// String entries of the trailer's Info dictionary, keyed by entry name.
    pub fn info_strings(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        let Some(info) = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_dict().ok())
        else {
            return out;
        };

        for key in ["Title", "Author", "Creator", "Producer", "Subject"] {
            let Some(value) = info.get(key.as_bytes()).ok().and_then(|o| self.resolve(o)) else {
                continue;
            };
            match value {
                Object::String(bytes, _) => {
                    out.insert(key.to_string(), decode_pdf_string(bytes));
                }
                Object::Name(name) => {
                    out.insert(key.to_string(), String::from_utf8_lossy(name).into_owned());
                }
                _ => debug!("Info /{key} is not a string; ignoring"),
            }
        }
        out
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    /// Look `key` up on `dict` or the nearest ancestor in the page tree.
    fn inherited<'a>(&'a self, mut dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = dict.get(key) {
                return self.resolve(value);
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn number(&self, obj: &Object) -> Option<f32> {
        match self.resolve(obj)? {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }
}

impl PageSource for LopdfSource {
    fn page_refs(&self) -> Vec<ObjectRef> {
        self.doc.get_pages().into_values().collect()
    }

    fn fonts(&self, page: ObjectRef) -> Result<Vec<FontResource>, OutlineError> {
        let fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| OutlineError::Parse(format!("cannot read page fonts: {e}")))?;

        Ok(fonts
            .into_iter()
            .map(|(key, dict)| {
                let name_of = |field: &[u8]| {
                    dict.get(field)
                        .ok()
                        .and_then(|o| o.as_name().ok())
                        .map(|n| String::from_utf8_lossy(n).into_owned())
                };
                let descriptor_flags = dict
                    .get(b"FontDescriptor")
                    .ok()
                    .and_then(|o| self.resolve(o))
                    .and_then(|o| o.as_dict().ok())
                    .and_then(|d| d.get(b"Flags").ok())
                    .and_then(|o| o.as_i64().ok());
                FontResource {
                    key,
                    base_font: name_of(b"BaseFont"),
                    descriptor_flags,
                    encoding: name_of(b"Encoding"),
                }
            })
            .collect())
    }

    fn media_box(&self, page: ObjectRef) -> Result<[f32; 4], OutlineError> {
        let dict = self
            .doc
            .get_dictionary(page)
            .map_err(|e| OutlineError::Parse(format!("page is not a dictionary: {e}")))?;
        let values: Vec<f32> = self
            .inherited(dict, b"MediaBox")
            .and_then(|o| o.as_array().ok())
            .map(|items| items.iter().filter_map(|o| self.number(o)).collect())
            .unwrap_or_default();

        match values[..] {
            [x0, y0, x1, y1] => Ok([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]),
            _ => Err(OutlineError::Parse("no usable MediaBox".into())),
        }
    }

    fn operations(&self, page: ObjectRef) -> Result<Vec<Op>, OutlineError> {
        let raw = self
            .doc
            .get_page_content(page)
            .map_err(|e| OutlineError::Parse(format!("cannot read page content: {e}")))?;
        let content = Content::decode(&raw)
            .map_err(|e| OutlineError::Parse(format!("cannot decode content stream: {e}")))?;

        Ok(content
            .operations
            .iter()
            .map(|op| Op {
                operator: op.operator.clone(),
                operands: op.operands.iter().map(Operand::from).collect(),
            })
            .collect())
    }
}
