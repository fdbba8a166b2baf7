//! Text extraction with glyph positions, and literal search over it
//!
//! The content stream is interpreted just far enough to know where every
//! glyph lands: graphics state (`q`, `Q`, `cm`), text state, text
//! positioning and text showing operators, and Form XObjects. Painting is
//! ignored.
//!
//! Search is exact and works on contiguous runs of characters. A run ends
//! where the baseline moves or the pen goes backwards, so a string split
//! across lines is not found.

use crate::geometry::{Matrix, PageBox, Point, Rect};
use crate::objects::{get, get_array, get_dict, get_name, number, stream_bytes};
use crate::page_font::PageFont;
use crate::Result;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object};
use std::collections::HashMap;
use std::rc::Rc;

/// Nesting limit for Form XObjects
const MAX_FORM_DEPTH: usize = 8;

/// A character placed on the page, in page coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct TextChar {
    pub ch: char,
    pub bbox: Rect,
    /// Pen position on the baseline
    pub origin: Point,
    /// Effective font size in points
    pub size: f64,
}

#[derive(Debug, Clone)]
struct TextState {
    font: Rc<PageFont>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// `Tz` as a fraction
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Rc::new(PageFont::default()),
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Collects positioned characters while walking content streams
struct Extractor<'a> {
    doc: &'a Document,
    page_box: PageBox,
    chars: Vec<TextChar>,
}

/// Extract positioned characters from a page content stream
pub(crate) fn extract_chars(
    doc: &Document,
    content: &[u8],
    resources: Option<&Dictionary>,
    page_box: PageBox,
) -> Result<Vec<TextChar>> {
    let mut extractor = Extractor {
        doc,
        page_box,
        chars: Vec::new(),
    };
    extractor.run(content, resources, GraphicsState::default(), 0)?;
    Ok(extractor.chars)
}

impl<'a> Extractor<'a> {
    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        initial: GraphicsState,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(&strip_unparsed(content))?;
        let mut fonts: HashMap<Vec<u8>, Rc<PageFont>> = HashMap::new();
        let mut state = initial;
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;

        for op in &content.operations {
            let args = &op.operands;
            match op.operator.as_str() {
                "q" => stack.push(state.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_operand(args) {
                        state.ctm = m.multiply(&state.ctm);
                    }
                }
                "BT" => {
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "Tf" => {
                    if let Some(Object::Name(name)) = args.first() {
                        state.text.font = self.font(resources, name, &mut fonts);
                    }
                    state.text.font_size = operand(args, 1);
                }
                "Tc" => state.text.char_spacing = operand(args, 0),
                "Tw" => state.text.word_spacing = operand(args, 0),
                "Tz" => state.text.horizontal_scale = operand(args, 0) / 100.0,
                "TL" => state.text.leading = operand(args, 0),
                "Ts" => state.text.rise = operand(args, 0),
                "Td" => {
                    tlm = Matrix::translate(operand(args, 0), operand(args, 1)).multiply(&tlm);
                    tm = tlm;
                }
                "TD" => {
                    state.text.leading = -operand(args, 1);
                    tlm = Matrix::translate(operand(args, 0), operand(args, 1)).multiply(&tlm);
                    tm = tlm;
                }
                "Tm" => {
                    if let Some(m) = matrix_operand(args) {
                        tlm = m;
                        tm = m;
                    }
                }
                "T*" => next_line(&state, &mut tm, &mut tlm),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = args.first() {
                        self.show(&state, &mut tm, bytes);
                    }
                }
                "'" => {
                    next_line(&state, &mut tm, &mut tlm);
                    if let Some(Object::String(bytes, _)) = args.first() {
                        self.show(&state, &mut tm, bytes);
                    }
                }
                "\"" => {
                    state.text.word_spacing = operand(args, 0);
                    state.text.char_spacing = operand(args, 1);
                    next_line(&state, &mut tm, &mut tlm);
                    if let Some(Object::String(bytes, _)) = args.get(2) {
                        self.show(&state, &mut tm, bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = args.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show(&state, &mut tm, bytes),
                                other => {
                                    if let Some(adjust) = number(other) {
                                        let tx = -adjust / 1000.0
                                            * state.text.font_size
                                            * state.text.horizontal_scale;
                                        tm = Matrix::translate(tx, 0.0).multiply(&tm);
                                    }
                                }
                            }
                        }
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = args.first() {
                        self.form_xobject(resources, name, &state, depth);
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Resolve a font resource, caching per content stream
    fn font(
        &self,
        resources: Option<&'a Dictionary>,
        name: &[u8],
        cache: &mut HashMap<Vec<u8>, Rc<PageFont>>,
    ) -> Rc<PageFont> {
        if let Some(font) = cache.get(name) {
            return Rc::clone(font);
        }

        let font = resources
            .and_then(|res| get_dict(self.doc, res, b"Font"))
            .and_then(|fonts| get_dict(self.doc, fonts, name))
            .map(|dict| PageFont::from_dictionary(self.doc, dict))
            .unwrap_or_else(|| {
                tracing::debug!(
                    "font resource /{} not found, using default metrics",
                    String::from_utf8_lossy(name)
                );
                PageFont::default()
            });

        let font = Rc::new(font);
        cache.insert(name.to_vec(), Rc::clone(&font));
        font
    }

    /// Show a string, advancing the text matrix glyph by glyph
    fn show(&mut self, state: &GraphicsState, tm: &mut Matrix, bytes: &[u8]) {
        let text = &state.text;
        let font = &text.font;
        let th = text.horizontal_scale;

        for (code, len) in font.codes(bytes) {
            let w0 = font.advance(code);
            let trm = Matrix::new(
                text.font_size * th,
                0.0,
                0.0,
                text.font_size,
                0.0,
                text.rise,
            )
            .multiply(tm)
            .multiply(&state.ctm);

            let (ascent, descent) = (font.ascent(), font.descent());
            let corners = [(0.0, descent), (w0, descent), (0.0, ascent), (w0, ascent)]
                .map(|(x, y)| self.page_box.to_page(trm.transform(x, y)));
            let (ox, oy) = self.page_box.to_page(trm.transform(0.0, 0.0));

            self.push_glyph(
                &font.decode(code),
                Rect::from_points(&corners),
                Point::new(ox, oy),
                trm.vertical_scale(),
            );

            let mut spacing = text.char_spacing;
            if len == 1 && code == 32 {
                spacing += text.word_spacing;
            }
            let tx = (w0 * text.font_size + spacing) * th;
            *tm = Matrix::translate(tx, 0.0).multiply(tm);
        }
    }

    /// Record a glyph; ligatures share the glyph box evenly
    fn push_glyph(&mut self, text: &str, bbox: Rect, origin: Point, size: f64) {
        let count = text.chars().count();
        if count == 0 {
            return;
        }
        let step = bbox.width() / count as f64;

        for (i, ch) in text.chars().enumerate() {
            let i = i as f64;
            self.chars.push(TextChar {
                ch,
                bbox: Rect::new(
                    bbox.x0 + step * i,
                    bbox.y0,
                    bbox.x0 + step * (i + 1.0),
                    bbox.y1,
                ),
                origin: Point::new(origin.x + step * i, origin.y),
                size,
            });
        }
    }

    fn form_xobject(
        &mut self,
        resources: Option<&'a Dictionary>,
        name: &[u8],
        state: &GraphicsState,
        depth: usize,
    ) {
        if depth >= MAX_FORM_DEPTH {
            tracing::debug!(
                "form nesting limit reached, skipping /{}",
                String::from_utf8_lossy(name)
            );
            return;
        }

        let Some(object) = resources
            .and_then(|res| get_dict(self.doc, res, b"XObject"))
            .and_then(|xobjects| get(self.doc, xobjects, name))
        else {
            return;
        };
        let Object::Stream(stream) = object else {
            return;
        };
        if get_name(self.doc, &stream.dict, b"Subtype") != Some(b"Form".as_slice()) {
            return;
        }

        let form_matrix = get_array(self.doc, &stream.dict, b"Matrix")
            .and_then(|m| matrix_operand(m))
            .unwrap_or(Matrix::IDENTITY);
        let form_resources = get_dict(self.doc, &stream.dict, b"Resources").or(resources);
        let Some(content) = stream_bytes(object) else {
            return;
        };

        let mut initial = state.clone();
        initial.ctm = form_matrix.multiply(&state.ctm);

        if let Err(e) = self.run(&content, form_resources, initial, depth + 1) {
            tracing::debug!(
                "skipping unreadable form /{}: {e}",
                String::from_utf8_lossy(name)
            );
        }
    }
}

fn next_line(state: &GraphicsState, tm: &mut Matrix, tlm: &mut Matrix) {
    *tlm = Matrix::translate(0.0, -state.text.leading).multiply(tlm);
    *tm = *tlm;
}

fn operand(args: &[Object], index: usize) -> f64 {
    args.get(index).and_then(number).unwrap_or(0.0)
}

fn matrix_operand(args: &[Object]) -> Option<Matrix> {
    if args.len() < 6 {
        return None;
    }
    let v: Vec<f64> = args[..6].iter().map(number).collect::<Option<_>>()?;
    Some(Matrix::new(v[0], v[1], v[2], v[3], v[4], v[5]))
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c' | b'\0')
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Remove comments and inline images from a content stream
///
/// `Content::decode` stops at the first token it cannot parse and returns
/// what it has so far, so either of these would hide every later operator.
/// Strings are copied untouched; a `%` or `ID` inside them is text.
fn strip_unparsed(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut inline_image_start: Option<usize> = None;
    let mut i = 0;

    while i < content.len() {
        match content[i] {
            b'%' => {
                while i < content.len() && !matches!(content[i], b'\r' | b'\n') {
                    i += 1;
                }
                out.push(b'\n');
            }
            b'(' => {
                let mut depth = 0usize;
                while i < content.len() {
                    let b = content[i];
                    out.push(b);
                    i += 1;
                    match b {
                        b'\\' => {
                            if let Some(&escaped) = content.get(i) {
                                out.push(escaped);
                                i += 1;
                            }
                        }
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            b'<' if content.get(i + 1) != Some(&b'<') => {
                while i < content.len() {
                    out.push(content[i]);
                    i += 1;
                    if out.last() == Some(&b'>') {
                        break;
                    }
                }
            }
            b'/' => {
                out.push(b'/');
                i += 1;
                while i < content.len() && is_regular(content[i]) {
                    out.push(content[i]);
                    i += 1;
                }
            }
            b'<' => {
                out.extend_from_slice(b"<<");
                i += 2;
            }
            b if is_regular(b) => {
                let start = i;
                while i < content.len() && is_regular(content[i]) {
                    i += 1;
                }
                match &content[start..i] {
                    b"BI" => {
                        inline_image_start = Some(out.len());
                        out.extend_from_slice(b"BI");
                    }
                    b"ID" => {
                        i = inline_image_end(content, i + 1);
                        let start = inline_image_start.take().unwrap_or(out.len());
                        out.truncate(start);
                        out.push(b'\n');
                    }
                    word => out.extend_from_slice(word),
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    out
}

/// Position just past the `EI` that closes inline image data starting at `from`
fn inline_image_end(content: &[u8], from: usize) -> usize {
    let mut i = from;
    while i + 2 <= content.len() {
        let preceded = i == from || is_whitespace(content[i - 1]);
        let followed = !matches!(content.get(i + 2), Some(&b) if is_regular(b));
        if preceded && followed && &content[i..i + 2] == b"EI" {
            return i + 2;
        }
        i += 1;
    }
    content.len()
}

/// A character of a run, including spaces inferred from gaps
#[derive(Debug, Clone)]
struct RunChar {
    ch: char,
    bbox: Rect,
}

/// Group characters into contiguous runs
fn group_runs(chars: &[TextChar]) -> Vec<Vec<RunChar>> {
    let mut runs = Vec::new();
    let mut current: Vec<RunChar> = Vec::new();
    let mut prev: Option<&TextChar> = None;

    for c in chars {
        if let Some(p) = prev {
            let size = p.size.max(c.size);
            let same_baseline = (c.origin.y - p.origin.y).abs() <= size * 0.5;
            let gap = c.bbox.x0 - p.bbox.x1;

            if !same_baseline || gap < -size * 0.5 {
                runs.push(std::mem::take(&mut current));
            } else if gap > size * 0.25 && !p.ch.is_whitespace() && !c.ch.is_whitespace() {
                current.push(RunChar {
                    ch: ' ',
                    bbox: Rect::new(
                        p.bbox.x1,
                        p.bbox.y0.min(c.bbox.y0),
                        c.bbox.x0,
                        p.bbox.y1.max(c.bbox.y1),
                    ),
                });
            }
        }

        current.push(RunChar {
            ch: c.ch,
            bbox: c.bbox,
        });
        prev = Some(c);
    }

    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

/// Find every non-overlapping occurrence of `needle`, in content order
pub(crate) fn search(chars: &[TextChar], needle: &str) -> Vec<Rect> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    for run in group_runs(chars) {
        let mut i = 0;
        while i + needle.len() <= run.len() {
            let window = &run[i..i + needle.len()];
            if window.iter().map(|c| c.ch).eq(needle.iter().copied()) {
                let bbox = window[1..]
                    .iter()
                    .fold(window[0].bbox, |acc, c| acc.union(&c.bbox));
                matches.push(bbox);
                i += needle.len();
            } else {
                i += 1;
            }
        }
    }

    matches
}
