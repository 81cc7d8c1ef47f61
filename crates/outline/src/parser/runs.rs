//! Run extraction: a small PDF text-rendering interpreter that turns a page's
//! content operations into positioned [`TextRun`]s.
//!
//! Positions are converted from PDF user space (origin bottom-left, y up) to
//! page space with a top-left origin, so every later stage can treat a
//! smaller `y0` as "nearer the top".

use log::warn;

use super::backend::{FontResource, ObjectRef, Op, Operand, PageSource, LETTER};
use crate::types::{BBox, PageRuns, TextRun};
use crate::OutlineError;

/// Approximate glyph advance as a fraction of the font size; no glyph
/// metrics are read.
pub const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// A `TJ` adjustment wider than this fraction of a glyph reads as a space.
const TJ_SPACE_FRACTION: f32 = 0.3;

/// Affine transform `[a, b, c, d, e, f]` in PDF's row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn from_operands(operands: &[Operand]) -> Option<Matrix> {
        let values: Vec<f32> = operands.iter().filter_map(Operand::number).collect();
        match values[..] {
            [a, b, c, d, e, f] => Some(Matrix([a, b, c, d, e, f])),
            _ => None,
        }
    }

    fn translation(tx: f32, ty: f32) -> Matrix {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self` applied first, then `next`.
    fn then(&self, next: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [na, nb, nc, nd, ne, nf] = next.0;
        Matrix([
            a * na + b * nc,
            a * nb + b * nd,
            c * na + d * nc,
            c * nb + d * nd,
            e * na + f * nc + ne,
            e * nb + f * nd + nf,
        ])
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (x * a + y * c + e, x * b + y * d + f)
    }

    /// Length of the transformed unit y vector.
    fn y_scale(&self) -> f32 {
        self.0[2].hypot(self.0[3])
    }

    fn x_scale(&self) -> f32 {
        self.0[0].hypot(self.0[1])
    }
}

/// Text-state parameters that survive between `BT`/`ET` blocks.
#[derive(Debug, Clone)]
struct TextParams {
    font: Option<FontResource>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    /// `Tz` as a factor (100% = 1.0).
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextParams {
    fn default() -> Self {
        TextParams {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

impl TextParams {
    fn glyph_advance(&self) -> f32 {
        self.size * APPROX_CHAR_WIDTH_RATIO * self.horizontal_scale
    }

    fn is_bold(&self) -> bool {
        self.font.as_ref().is_some_and(FontResource::is_bold)
    }

    fn is_italic(&self) -> bool {
        self.font.as_ref().is_some_and(FontResource::is_italic)
    }
}

/// Interprets the operations of one page.
struct Interpreter<'a> {
    source: &'a dyn PageSource,
    fonts: Vec<FontResource>,
    page_index: usize,
    page_box: [f32; 4],
    ctm: Matrix,
    saved_ctm: Vec<Matrix>,
    params: TextParams,
    text_matrix: Matrix,
    line_matrix: Matrix,
    runs: Vec<TextRun>,
}

impl<'a> Interpreter<'a> {
    fn execute(&mut self, op: &Op) {
        let args = &op.operands;
        let num = |i: usize| args.get(i).and_then(Operand::number);

        match op.operator.as_str() {
            "q" => self.saved_ctm.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.saved_ctm.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(args) {
                    self.ctm = m.then(&self.ctm);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => self.set_font(args),
            "Tm" => {
                if let Some(m) = Matrix::from_operands(args) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "Td" => self.next_line(num(0).unwrap_or(0.0), num(1).unwrap_or(0.0)),
            "TD" => {
                let ty = num(1).unwrap_or(0.0);
                self.params.leading = -ty;
                self.next_line(num(0).unwrap_or(0.0), ty);
            }
            "T*" => self.next_line(0.0, -self.params.leading),
            "TL" => self.params.leading = num(0).unwrap_or(self.params.leading),
            "Tc" => self.params.char_spacing = num(0).unwrap_or(self.params.char_spacing),
            "Tw" => self.params.word_spacing = num(0).unwrap_or(self.params.word_spacing),
            "Tz" => {
                if let Some(percent) = num(0) {
                    self.params.horizontal_scale = percent / 100.0;
                }
            }
            "Ts" => self.params.rise = num(0).unwrap_or(self.params.rise),
            "Tj" => {
                if let Some(Operand::Text(bytes)) = args.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line(0.0, -self.params.leading);
                if let Some(Operand::Text(bytes)) = args.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac), Some(Operand::Text(bytes))) =
                    (num(0), num(1), args.get(2))
                {
                    self.params.word_spacing = aw;
                    self.params.char_spacing = ac;
                    self.next_line(0.0, -self.params.leading);
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Operand::Array(items)) = args.first() {
                    self.show_array(items);
                }
            }
            _ => {}
        }
    }

    fn set_font(&mut self, args: &[Operand]) {
        let (Some(Operand::Name(key)), Some(size)) = (args.first(), args.get(1).and_then(Operand::number))
        else {
            return;
        };
        let font = self
            .fonts
            .iter()
            .find(|f| &f.key == key)
            .cloned()
            .unwrap_or_else(|| FontResource {
                key: key.clone(),
                ..FontResource::default()
            });
        self.params.font = Some(font);
        self.params.size = size;
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn decode(&self, bytes: &[u8]) -> String {
        self.source.decode_text(self.params.font.as_ref(), bytes)
    }

    /// Move the text position right by `dx` unscaled text-space units.
    fn advance(&mut self, dx: f32) {
        self.text_matrix = Matrix::translation(dx, 0.0).then(&self.text_matrix);
    }

    fn advance_over(&mut self, text: &str) {
        let p = &self.params;
        let dx: f32 = text
            .chars()
            .map(|c| {
                let word = if c == ' ' { p.word_spacing } else { 0.0 };
                p.glyph_advance() + p.char_spacing + word
            })
            .sum();
        self.advance(dx);
    }

    /// Build a run for `text` starting at the current text position.
    fn run_at(&self, text: &str, text_matrix: &Matrix) -> TextRun {
        let device = text_matrix.then(&self.ctm);
        let (x, y) = device.apply(0.0, self.params.rise);
        let [llx, _, _, ury] = self.page_box;
        let size = (self.params.size * device.y_scale()).abs();
        let width = text.chars().count() as f32 * self.params.glyph_advance() * device.x_scale();
        let baseline = ury - y;
        TextRun {
            text: text.to_string(),
            font_size: size,
            is_bold: self.params.is_bold(),
            is_italic: self.params.is_italic(),
            bbox: BBox::new(x - llx, baseline - size, x - llx + width, baseline),
            page_index: self.page_index,
        }
    }

    fn show(&mut self, bytes: &[u8]) {
        let text = self.decode(bytes);
        if !text.trim().is_empty() {
            let run = self.run_at(&text, &self.text_matrix);
            self.runs.push(run);
        }
        self.advance_over(&text);
    }

    /// `TJ`: strings interleaved with adjustments in thousandths of a unit.
    /// The whole array becomes one run.
    fn show_array(&mut self, items: &[Operand]) {
        let mut text = String::new();
        let mut start: Option<Matrix> = None;

        for item in items {
            match item {
                Operand::Text(bytes) => {
                    let fragment = self.decode(bytes);
                    start.get_or_insert(self.text_matrix);
                    text.push_str(&fragment);
                    self.advance_over(&fragment);
                }
                other => {
                    let Some(adjust) = other.number() else {
                        continue;
                    };
                    // Negative adjustments move right.
                    let dx = -adjust / 1000.0 * self.params.size * self.params.horizontal_scale;
                    if dx > self.params.glyph_advance() * TJ_SPACE_FRACTION && !text.is_empty() {
                        text.push(' ');
                    }
                    self.advance(dx);
                }
            }
        }

        let text = text.trim_end();
        if let (Some(start), false) = (start, text.trim_start().is_empty()) {
            let run = self.run_at(text, &start);
            self.runs.push(run);
        }
    }
}

/// Interpret one page and collect its runs.
///
/// A page without a usable MediaBox is measured as Letter.
pub fn extract_page_runs(
    source: &dyn PageSource,
    page: ObjectRef,
    page_index: usize,
) -> Result<PageRuns, OutlineError> {
    let ops = source.operations(page)?;
    let fonts = source.fonts(page).unwrap_or_else(|e| {
        warn!("page {}: {e}; styling text as regular", page_index + 1);
        Vec::new()
    });
    let page_box = source.media_box(page).unwrap_or_else(|e| {
        warn!("page {}: {e}; assuming Letter size", page_index + 1);
        LETTER
    });

    let mut interpreter = Interpreter {
        source,
        fonts,
        page_index,
        page_box,
        ctm: Matrix::IDENTITY,
        saved_ctm: Vec::new(),
        params: TextParams::default(),
        text_matrix: Matrix::IDENTITY,
        line_matrix: Matrix::IDENTITY,
        runs: Vec::new(),
    };
    for op in &ops {
        interpreter.execute(op);
    }

    Ok(PageRuns {
        page_index,
        width: page_box[2] - page_box[0],
        height: page_box[3] - page_box[1],
        runs: interpreter.runs,
    })
}

/// Runs of every page, numbered from 0 in page order.
///
/// A page whose content cannot be read is logged and contributes no runs.
pub fn extract_all_pages(source: &dyn PageSource) -> Result<Vec<PageRuns>, OutlineError> {
    Ok(source
        .page_refs()
        .into_iter()
        .enumerate()
        .map(|(page_index, page)| {
            extract_page_runs(source, page, page_index).unwrap_or_else(|e| {
                warn!("page {}: skipping unreadable content: {e}", page_index + 1);
                PageRuns {
                    page_index,
                    ..PageRuns::default()
                }
            })
        })
        .collect())
}
