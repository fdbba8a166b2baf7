//! Metrics and decoding for fonts already present in a document
//!
//! The locator needs two things from every font a page uses: how a byte
//! string splits into character codes (with their Unicode text) and how far
//! each code advances the pen. Both come from the font dictionary, with
//! fallbacks for the pieces real-world templates tend to omit.

use crate::encoding::{glyph_name_to_char, BaseEncoding, ToUnicodeMap};
use crate::objects::{get, get_array, get_dict, get_name, get_number, number, stream_bytes};
use crate::StandardFont;
use lopdf::{Dictionary, Document, Object};
use std::collections::HashMap;

/// Advance used when nothing better is known (1/1000 em)
const DEFAULT_WIDTH: f64 = 500.0;
const DEFAULT_ASCENT: f64 = 0.8;
const DEFAULT_DESCENT: f64 = -0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FontKind {
    /// Single-byte codes (Type1, TrueType, Type3)
    Simple,
    /// Multi-byte codes (Type0)
    Composite,
}

/// A font as seen by the text extractor
#[derive(Debug, Clone)]
pub(crate) struct PageFont {
    kind: FontKind,
    /// Bytes per character code
    code_len: usize,
    /// Advance widths in glyph units, indexed by code
    widths: HashMap<u32, f64>,
    default_width: f64,
    /// Type3 glyph-to-text scale; other fonts use 1/1000
    font_matrix_scale: Option<f64>,
    encoding: [Option<char>; 256],
    to_unicode: Option<ToUnicodeMap>,
    /// Ascent and descent as fractions of the em
    ascent: f64,
    descent: f64,
}

impl Default for PageFont {
    /// Stand-in for a font missing from the resources
    fn default() -> Self {
        Self {
            kind: FontKind::Simple,
            code_len: 1,
            widths: HashMap::new(),
            default_width: DEFAULT_WIDTH,
            font_matrix_scale: None,
            encoding: BaseEncoding::WinAnsi.table(),
            to_unicode: None,
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
        }
    }
}

impl PageFont {
    /// Build from a font dictionary
    pub fn from_dictionary(doc: &Document, font: &Dictionary) -> Self {
        let subtype = get_name(doc, font, b"Subtype").unwrap_or(b"Type1".as_slice());
        let to_unicode = get(doc, font, b"ToUnicode")
            .and_then(stream_bytes)
            .map(|data| ToUnicodeMap::parse(&data));

        if subtype == b"Type0" {
            Self::composite(doc, font, to_unicode)
        } else {
            Self::simple(doc, font, subtype == b"Type3", to_unicode)
        }
    }

    fn simple(
        doc: &Document,
        font: &Dictionary,
        is_type3: bool,
        to_unicode: Option<ToUnicodeMap>,
    ) -> Self {
        let standard = get_name(doc, font, b"BaseFont").and_then(StandardFont::from_base_font);
        let descriptor = get_dict(doc, font, b"FontDescriptor");
        let encoding = simple_encoding(doc, font);

        let mut widths = HashMap::new();
        if let Some(array) = get_array(doc, font, b"Widths") {
            let first = get_number(doc, font, b"FirstChar").unwrap_or(0.0) as u32;
            for (code, w) in (first..=u32::MAX).zip(array) {
                if let Some(w) = number(crate::objects::resolve(doc, w)) {
                    widths.insert(code, w);
                }
            }
        } else if let Some(standard) = standard {
            for code in 0..=255u8 {
                if let Some(w) = standard.glyph_width(code) {
                    widths.insert(code as u32, w as f64);
                }
            }
        }

        let embedded = descriptor.and_then(|d| EmbeddedMetrics::load(doc, d, &encoding));
        if widths.is_empty() {
            if let Some(metrics) = &embedded {
                widths.extend(metrics.widths.iter().map(|(&k, &v)| (k, v)));
            }
        }

        let default_width = descriptor
            .and_then(|d| get_number(doc, d, b"MissingWidth"))
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_WIDTH);

        let font_matrix_scale = if is_type3 {
            get_array(doc, font, b"FontMatrix")
                .and_then(|m| m.first())
                .and_then(number)
        } else {
            None
        };

        let (ascent, descent) = vertical_metrics(doc, descriptor, embedded.as_ref(), standard);

        Self {
            kind: FontKind::Simple,
            code_len: 1,
            widths,
            default_width,
            font_matrix_scale,
            encoding,
            to_unicode,
            ascent,
            descent,
        }
    }

    fn composite(doc: &Document, font: &Dictionary, to_unicode: Option<ToUnicodeMap>) -> Self {
        let descendant = get_array(doc, font, b"DescendantFonts")
            .and_then(|fonts| fonts.first())
            .map(|obj| crate::objects::resolve(doc, obj))
            .and_then(|obj| obj.as_dict().ok());

        let mut widths = HashMap::new();
        let mut default_width = 1000.0;
        let mut descriptor = None;

        if let Some(cid_font) = descendant {
            default_width = get_number(doc, cid_font, b"DW").unwrap_or(1000.0);
            descriptor = get_dict(doc, cid_font, b"FontDescriptor");
            if let Some(w) = get_array(doc, cid_font, b"W") {
                parse_cid_widths(doc, w, &mut widths);
            }
        }

        let code_len = to_unicode
            .as_ref()
            .and_then(ToUnicodeMap::code_len)
            .filter(|len| (1..=4).contains(len))
            .unwrap_or(2);
        let (ascent, descent) = vertical_metrics(doc, descriptor, None, None);

        Self {
            kind: FontKind::Composite,
            code_len,
            widths,
            default_width,
            font_matrix_scale: None,
            encoding: [None; 256],
            to_unicode,
            ascent,
            descent,
        }
    }

    /// Split a shown string into character codes, with their byte length
    pub fn codes(&self, bytes: &[u8]) -> Vec<(u32, usize)> {
        bytes
            .chunks(self.code_len)
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);
                (code, chunk.len())
            })
            .collect()
    }

    /// Horizontal advance of a code in text space units (before font size)
    pub fn advance(&self, code: u32) -> f64 {
        let width = self.widths.get(&code).copied().unwrap_or(self.default_width);
        match self.font_matrix_scale {
            Some(scale) => width * scale,
            None => width / 1000.0,
        }
    }

    /// Unicode text for a code
    pub fn decode(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|m| m.get(code)) {
            return text.to_string();
        }
        match self.kind {
            FontKind::Simple => self.encoding[(code & 0xFF) as usize]
                .map(String::from)
                .unwrap_or_else(|| '\u{FFFD}'.to_string()),
            FontKind::Composite => '\u{FFFD}'.to_string(),
        }
    }

    pub fn ascent(&self) -> f64 {
        self.ascent
    }

    pub fn descent(&self) -> f64 {
        self.descent
    }
}

/// Code-to-character table of a simple font: base encoding plus
/// `/Differences`
fn simple_encoding(doc: &Document, font: &Dictionary) -> [Option<char>; 256] {
    match get(doc, font, b"Encoding") {
        Some(Object::Name(name)) => BaseEncoding::from_name(name)
            .unwrap_or(BaseEncoding::Standard)
            .table(),
        Some(Object::Dictionary(dict)) => {
            let mut table = get_name(doc, dict, b"BaseEncoding")
                .and_then(BaseEncoding::from_name)
                .unwrap_or(BaseEncoding::Standard)
                .table();
            if let Some(differences) = get_array(doc, dict, b"Differences") {
                apply_differences(differences, &mut table);
            }
            table
        }
        _ => BaseEncoding::Standard.table(),
    }
}

fn apply_differences(differences: &[Object], table: &mut [Option<char>; 256]) {
    let mut code = 0usize;
    for item in differences {
        match item {
            Object::Integer(start) => code = (*start).clamp(0, 255) as usize,
            Object::Name(name) => {
                if code < 256 {
                    let name = String::from_utf8_lossy(name);
                    table[code] = glyph_name_to_char(&name);
                }
                code += 1;
            }
            _ => {}
        }
    }
}

/// Parse a CIDFont `/W` array: `c [w1 w2 ...]` or `c_first c_last w`
fn parse_cid_widths(doc: &Document, array: &[Object], widths: &mut HashMap<u32, f64>) {
    let items: Vec<&Object> = array
        .iter()
        .map(|obj| crate::objects::resolve(doc, obj))
        .collect();
    let mut i = 0;

    while i < items.len() {
        let Some(first) = number(items[i]) else {
            i += 1;
            continue;
        };
        let first = first as u32;
        match items.get(i + 1) {
            Some(Object::Array(list)) => {
                for (code, w) in (first..=u32::MAX).zip(list) {
                    if let Some(w) = number(crate::objects::resolve(doc, w)) {
                        widths.insert(code, w);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let w = items.get(i + 2).and_then(|o| number(o));
                let (Some(last), Some(w)) = (number(last), w) else {
                    break;
                };
                let last = (last as u32).min(first.saturating_add(0xFFFF));
                for code in first..=last {
                    widths.insert(code, w);
                }
                i += 3;
            }
            None => break,
        }
    }
}

/// Ascent/descent as fractions of the em, in priority order: font
/// descriptor, embedded TrueType program, standard-font metrics, defaults
fn vertical_metrics(
    doc: &Document,
    descriptor: Option<&Dictionary>,
    embedded: Option<&EmbeddedMetrics>,
    standard: Option<StandardFont>,
) -> (f64, f64) {
    let from_descriptor = descriptor.and_then(|d| {
        let ascent = get_number(doc, d, b"Ascent")?;
        let descent = get_number(doc, d, b"Descent")?;
        (ascent != 0.0 || descent != 0.0).then_some((ascent / 1000.0, descent / 1000.0))
    });

    from_descriptor
        .or_else(|| embedded.map(|m| (m.ascent, m.descent)))
        .or_else(|| standard.map(|s| (s.ascent() / 1000.0, s.descent() / 1000.0)))
        .unwrap_or((DEFAULT_ASCENT, DEFAULT_DESCENT))
}

/// Metrics read from an embedded TrueType program (`/FontFile2`)
#[derive(Debug)]
struct EmbeddedMetrics {
    /// Advance widths (1/1000 em) per single-byte code
    widths: HashMap<u32, f64>,
    ascent: f64,
    descent: f64,
}

impl EmbeddedMetrics {
    fn load(
        doc: &Document,
        descriptor: &Dictionary,
        encoding: &[Option<char>; 256],
    ) -> Option<Self> {
        let data = get(doc, descriptor, b"FontFile2").and_then(stream_bytes)?;
        let face = match ttf_parser::Face::parse(&data, 0) {
            Ok(face) => face,
            Err(e) => {
                tracing::debug!("ignoring unparsable embedded font: {e:?}");
                return None;
            }
        };

        let units_per_em = face.units_per_em() as f64;
        let mut widths = HashMap::new();
        for (code, c) in encoding.iter().enumerate() {
            let Some(c) = c else { continue };
            if let Some(advance) = face
                .glyph_index(*c)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
            {
                widths.insert(code as u32, advance as f64 * 1000.0 / units_per_em);
            }
        }

        Some(Self {
            widths,
            ascent: face.ascender() as f64 / units_per_em,
            descent: face.descender() as f64 / units_per_em,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn simple_font(doc: &mut Document) -> Dictionary {
        let descriptor = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "Ascent" => 700,
            "Descent" => -300,
            "MissingWidth" => 250,
        });
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 65,
            "Widths" => vec![600.into(), 700.into()],
            "Encoding" => "WinAnsiEncoding",
            "FontDescriptor" => descriptor,
        }
    }

    #[test]
    fn test_simple_widths_and_missing_width() {
        let mut doc = Document::with_version("1.5");
        let dict = simple_font(&mut doc);
        let font = PageFont::from_dictionary(&doc, &dict);

        assert_eq!(font.advance(65), 0.6);
        assert_eq!(font.advance(66), 0.7);
        assert_eq!(font.advance(67), 0.25);
        assert_eq!(font.ascent(), 0.7);
        assert_eq!(font.descent(), -0.3);
    }

    #[test]
    fn test_simple_decode() {
        let mut doc = Document::with_version("1.5");
        let dict = simple_font(&mut doc);
        let font = PageFont::from_dictionary(&doc, &dict);

        assert_eq!(font.codes(b"AB"), vec![(65, 1), (66, 1)]);
        assert_eq!(font.decode(65), "A");
        assert_eq!(font.decode(0x92), "’");
    }

    #[test]
    fn test_standard_font_without_widths() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Italic",
        };
        let font = PageFont::from_dictionary(&doc, &dict);

        assert_eq!(font.advance(b'A' as u32), 0.611);
        assert_eq!(font.ascent(), 0.683);
        assert_eq!(font.descent(), -0.205);
    }

    #[test]
    fn test_differences() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Custom",
            "Encoding" => dictionary! {
                "Type" => "Encoding",
                "Differences" => vec![
                    1.into(),
                    Object::Name(b"N".to_vec()),
                    Object::Name(b"underscore".to_vec()),
                ],
            },
        };
        let font = PageFont::from_dictionary(&doc, &dict);

        assert_eq!(font.decode(1), "N");
        assert_eq!(font.decode(2), "_");
        assert_eq!(font.decode(b'x' as u32), "x");
    }

    #[test]
    fn test_composite_font() {
        let mut doc = Document::with_version("1.5");
        let cmap = doc.add_object(lopdf::Stream::new(
            dictionary! {},
            b"1 begincodespacerange <0000> <FFFF> endcodespacerange\n\
              1 beginbfrange <0010> <0012> <0041> endbfrange"
                .to_vec(),
        ));
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "Encoding" => "Identity-H",
            "ToUnicode" => cmap,
            "DescendantFonts" => vec![Object::Dictionary(dictionary! {
                "Type" => "Font",
                "Subtype" => "CIDFontType2",
                "DW" => 900,
                "W" => vec![
                    16.into(),
                    Object::Array(vec![400.into(), 500.into()]),
                    20.into(),
                    22.into(),
                    300.into(),
                ],
            })],
        };
        let font = PageFont::from_dictionary(&doc, &dict);

        assert_eq!(
            font.codes(&[0x00, 0x10, 0x00, 0x12]),
            vec![(0x10, 2), (0x12, 2)]
        );
        assert_eq!(font.decode(0x11), "B");
        assert_eq!(font.advance(0x10), 0.4);
        assert_eq!(font.advance(0x11), 0.5);
        assert_eq!(font.advance(21), 0.3);
        assert_eq!(font.advance(0x12), 0.9);
    }

    #[test]
    fn test_widths_at_end_of_code_space() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Broken",
            "FirstChar" => 4294967295i64,
            "Widths" => vec![500.into(), 700.into()],
        };
        let font = PageFont::from_dictionary(&doc, &dict);
        assert_eq!(font.advance(u32::MAX), 0.5);

        let mut widths = HashMap::new();
        let array = vec![
            4294967295i64.into(),
            Object::Array(vec![400.into(), 600.into()]),
        ];
        parse_cid_widths(&doc, &array, &mut widths);
        assert_eq!(widths.len(), 1);
        assert_eq!(widths.get(&u32::MAX), Some(&400.0));
    }

    #[test]
    fn test_type3_font_matrix() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type3",
            "FontMatrix" => vec![
                0.01.into(),
                0.into(),
                0.into(),
                0.01.into(),
                0.into(),
                0.into(),
            ],
            "FirstChar" => 65,
            "Widths" => vec![50.into()],
        };
        let font = PageFont::from_dictionary(&doc, &dict);

        assert!((font.advance(65) - 0.5).abs() < 1e-6);
    }
}
