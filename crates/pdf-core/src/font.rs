//! Font handling for inserted text
//!
//! Inserted text uses a standard PDF font, which every conforming reader
//! provides without embedding. Width measurement and glyph encoding both go
//! through [`FontSpec`], so the width used for positioning is always the
//! width of the glyphs that get drawn.

use crate::encoding::char_to_winansi;
use crate::{PdfError, Result};
use lopdf::{Dictionary, Object};

/// Standard (base 14) fonts available for inserted text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    TimesItalic,
}

impl StandardFont {
    /// Resolve a family name
    ///
    /// Accepts `Times-Italic`, `Times italic`, `times_italic` and the short
    /// alias `tiit`, ignoring case. Anything else is a resolution error:
    /// substituting another face would change widths and break centering.
    pub fn from_name(name: &str) -> Result<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "timesitalic" | "tiit" => Ok(Self::TimesItalic),
            _ => Err(PdfError::FontResolution(format!(
                "unknown font family '{name}'"
            ))),
        }
    }

    /// PostScript name used as `/BaseFont`
    pub fn base_font(&self) -> &'static str {
        match self {
            Self::TimesItalic => "Times-Italic",
        }
    }

    /// Advance width (1/1000 em) of a WinAnsi code, `None` if undefined
    pub fn glyph_width(&self, code: u8) -> Option<u16> {
        let widths = match self {
            Self::TimesItalic => &TIMES_ITALIC_WIDTHS,
        };
        match widths[code as usize] {
            0 => None,
            w => Some(w),
        }
    }

    /// Ascender (1/1000 em)
    pub fn ascent(&self) -> f64 {
        match self {
            Self::TimesItalic => 683.0,
        }
    }

    /// Descender (1/1000 em, negative)
    pub fn descent(&self) -> f64 {
        match self {
            Self::TimesItalic => -205.0,
        }
    }

    /// Look up a standard font by its `/BaseFont` name
    pub(crate) fn from_base_font(base_font: &[u8]) -> Option<Self> {
        // Subset prefixes ("ABCDEF+Times-Italic") and the TrueType style
        // spelling map to the same face
        let name = match base_font.iter().position(|&b| b == b'+') {
            Some(6) => &base_font[7..],
            _ => base_font,
        };
        match name {
            b"Times-Italic" | b"TimesNewRoman,Italic" | b"TimesNewRomanPS-ItalicMT" => {
                Some(Self::TimesItalic)
            }
            _ => None,
        }
    }

    /// Simple font dictionary for embedding a reference to this font
    pub(crate) fn to_font_dictionary(&self) -> Dictionary {
        let widths: Vec<Object> = (32u8..=255)
            .map(|code| self.glyph_width(code).unwrap_or(0) as i64)
            .map(Object::Integer)
            .collect();

        Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type1".into()),
            ("BaseFont", Object::Name(self.base_font().as_bytes().to_vec())),
            ("Encoding", "WinAnsiEncoding".into()),
            ("FirstChar", 32.into()),
            ("LastChar", 255.into()),
            ("Widths", widths.into()),
        ])
    }
}

/// Font and size used for both measuring and drawing a string
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    font: StandardFont,
    size: f32,
}

impl FontSpec {
    /// Resolve a family name and size
    ///
    /// # Example
    /// ```
    /// use pdf_core::FontSpec;
    ///
    /// let spec = FontSpec::new("Times-Italic", 37.0).unwrap();
    /// assert_eq!(spec.size(), 37.0);
    /// assert!(FontSpec::new("Comic Sans", 37.0).is_err());
    /// ```
    pub fn new(family: &str, size: f32) -> Result<Self> {
        let font = StandardFont::from_name(family)?;
        Self::with_font(font, size)
    }

    pub fn with_font(font: StandardFont, size: f32) -> Result<Self> {
        if !size.is_finite() || size <= 0.0 {
            return Err(PdfError::FontResolution(format!(
                "invalid font size {size}"
            )));
        }
        Ok(Self { font, size })
    }

    pub fn font(&self) -> StandardFont {
        self.font
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// Encode text as WinAnsi bytes
    ///
    /// Fails on characters the font has no glyph for.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        text.chars()
            .map(|c| {
                char_to_winansi(c)
                    .filter(|&code| self.font.glyph_width(code).is_some())
                    .ok_or_else(|| PdfError::UnsupportedCharacter {
                        ch: c,
                        font: self.font.base_font().to_string(),
                    })
            })
            .collect()
    }

    /// Rendered advance width of `text` in points
    pub fn measure(&self, text: &str) -> Result<f64> {
        let encoded = self.encode(text)?;
        Ok(self.width_of_encoded(&encoded))
    }

    pub(crate) fn width_of_encoded(&self, encoded: &[u8]) -> f64 {
        let units: u32 = encoded
            .iter()
            .filter_map(|&code| self.font.glyph_width(code))
            .map(u32::from)
            .sum();
        units as f64 / 1000.0 * self.size as f64
    }
}

/// Times-Italic advance widths indexed by WinAnsi code (0 = no glyph)
#[rustfmt::skip]
static TIMES_ITALIC_WIDTHS: [u16; 256] = [
    // 0x00 - 0x1F
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    // 0x20 - 0x3F
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 675, 675, 675, 500,
    // 0x40 - 0x5F
    920, 611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833, 667, 722,
    611, 722, 611, 500, 556, 722, 611, 833, 611, 556, 556, 389, 278, 389, 422, 500,
    // 0x60 - 0x7F
    333, 500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722, 500, 500,
    500, 500, 389, 389, 278, 500, 444, 667, 444, 444, 389, 400, 275, 400, 541, 0,
    // 0x80 - 0x9F
    500, 0, 333, 500, 556, 889, 500, 500, 333, 1000, 500, 333, 944, 0, 556, 0,
    0, 333, 333, 556, 556, 350, 500, 889, 333, 980, 389, 333, 667, 0, 389, 556,
    // 0xA0 - 0xBF
    250, 389, 500, 500, 500, 500, 275, 500, 333, 760, 276, 500, 675, 333, 760, 333,
    400, 675, 300, 300, 333, 500, 523, 250, 333, 300, 310, 500, 750, 750, 750, 500,
    // 0xC0 - 0xDF
    611, 611, 611, 611, 611, 611, 889, 667, 611, 611, 611, 611, 333, 333, 333, 333,
    722, 667, 722, 722, 722, 722, 722, 675, 722, 722, 722, 722, 722, 556, 611, 500,
    // 0xE0 - 0xFF
    500, 500, 500, 500, 500, 500, 667, 444, 444, 444, 444, 444, 278, 278, 278, 278,
    500, 500, 500, 500, 500, 500, 500, 675, 500, 500, 500, 500, 500, 444, 500, 444,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_aliases() {
        for name in ["Times-Italic", "Times italic", "Times-italic", "TIMES_ITALIC", "tiit"] {
            assert_eq!(
                StandardFont::from_name(name).unwrap(),
                StandardFont::TimesItalic
            );
        }
    }

    #[test]
    fn test_from_name_unknown() {
        let err = StandardFont::from_name("Helvetica").unwrap_err();
        assert!(matches!(err, PdfError::FontResolution(_)));
    }

    #[test]
    fn test_glyph_widths() {
        let font = StandardFont::TimesItalic;
        assert_eq!(font.glyph_width(b' '), Some(250));
        assert_eq!(font.glyph_width(b'A'), Some(611));
        assert_eq!(font.glyph_width(b'm'), Some(722));
        assert_eq!(font.glyph_width(0xE9), Some(444)); // é
        assert_eq!(font.glyph_width(0x81), None);
        assert_eq!(font.glyph_width(0x0A), None);
    }

    #[test]
    fn test_measure() {
        let spec = FontSpec::new("Times-Italic", 10.0).unwrap();
        // A(611) + b(500) = 1111 units
        assert!((spec.measure("Ab").unwrap() - 11.11).abs() < 1e-9);
        assert_eq!(spec.measure("").unwrap(), 0.0);
    }

    #[test]
    fn test_measure_scales_with_size() {
        let small = FontSpec::new("tiit", 10.0).unwrap();
        let large = FontSpec::new("tiit", 37.0).unwrap();
        let text = "Alice Smith";
        let ratio = large.measure(text).unwrap() / small.measure(text).unwrap();
        assert!((ratio - 3.7).abs() < 1e-9);
    }

    #[test]
    fn test_encode_unsupported_character() {
        let spec = FontSpec::new("Times-Italic", 12.0).unwrap();
        let err = spec.encode("สมชาย").unwrap_err();
        assert!(matches!(
            err,
            PdfError::UnsupportedCharacter { ch: 'ส', .. }
        ));
    }

    #[test]
    fn test_encode_latin1() {
        let spec = FontSpec::new("Times-Italic", 12.0).unwrap();
        assert_eq!(spec.encode("Zoë").unwrap(), vec![b'Z', b'o', 0xEB]);
    }

    #[test]
    fn test_invalid_size() {
        assert!(FontSpec::new("Times-Italic", 0.0).is_err());
        assert!(FontSpec::new("Times-Italic", -3.0).is_err());
        assert!(FontSpec::new("Times-Italic", f32::NAN).is_err());
    }

    #[test]
    fn test_from_base_font() {
        assert_eq!(
            StandardFont::from_base_font(b"Times-Italic"),
            Some(StandardFont::TimesItalic)
        );
        assert_eq!(
            StandardFont::from_base_font(b"ABCDEF+Times-Italic"),
            Some(StandardFont::TimesItalic)
        );
        assert_eq!(StandardFont::from_base_font(b"Helvetica"), None);
    }

    #[test]
    fn test_font_dictionary() {
        let dict = StandardFont::TimesItalic.to_font_dictionary();
        assert_eq!(
            dict.get(b"BaseFont").unwrap().as_name().unwrap(),
            b"Times-Italic"
        );
        let widths = dict.get(b"Widths").unwrap().as_array().unwrap();
        assert_eq!(widths.len(), 224);
        assert_eq!(widths[(b'A' - 32) as usize].as_i64().unwrap(), 611);
    }
}
