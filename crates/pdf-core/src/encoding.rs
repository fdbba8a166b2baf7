//! Character encodings for simple fonts and ToUnicode CMaps

use std::collections::HashMap;

/// Base encodings a simple font dictionary can name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BaseEncoding {
    Standard,
    WinAnsi,
    MacRoman,
}

impl BaseEncoding {
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"WinAnsiEncoding" => Some(Self::WinAnsi),
            b"MacRomanEncoding" => Some(Self::MacRoman),
            b"StandardEncoding" => Some(Self::Standard),
            _ => None,
        }
    }

    /// Unicode character for a single-byte code, if the encoding defines one
    pub fn decode(self, code: u8) -> Option<char> {
        match self {
            Self::WinAnsi => winansi_to_char(code),
            Self::MacRoman => macroman_to_char(code),
            Self::Standard => match code {
                0x27 => Some('\u{2019}'),
                0x60 => Some('\u{2018}'),
                0x20..=0x7E => Some(code as char),
                _ => None,
            },
        }
    }

    /// Full 256-entry decoding table
    pub fn table(self) -> [Option<char>; 256] {
        let mut table = [None; 256];
        for (code, slot) in table.iter_mut().enumerate() {
            *slot = self.decode(code as u8);
        }
        table
    }
}

/// WinAnsi code points 0x80..=0x9F that differ from Latin-1
const WINANSI_HIGH: [(u8, char); 27] = [
    (0x80, '\u{20AC}'),
    (0x82, '\u{201A}'),
    (0x83, '\u{0192}'),
    (0x84, '\u{201E}'),
    (0x85, '\u{2026}'),
    (0x86, '\u{2020}'),
    (0x87, '\u{2021}'),
    (0x88, '\u{02C6}'),
    (0x89, '\u{2030}'),
    (0x8A, '\u{0160}'),
    (0x8B, '\u{2039}'),
    (0x8C, '\u{0152}'),
    (0x8E, '\u{017D}'),
    (0x91, '\u{2018}'),
    (0x92, '\u{2019}'),
    (0x93, '\u{201C}'),
    (0x94, '\u{201D}'),
    (0x95, '\u{2022}'),
    (0x96, '\u{2013}'),
    (0x97, '\u{2014}'),
    (0x98, '\u{02DC}'),
    (0x99, '\u{2122}'),
    (0x9A, '\u{0161}'),
    (0x9B, '\u{203A}'),
    (0x9C, '\u{0153}'),
    (0x9E, '\u{017E}'),
    (0x9F, '\u{0178}'),
];

/// Decode a WinAnsi byte
pub(crate) fn winansi_to_char(code: u8) -> Option<char> {
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as char),
        0x80..=0x9F => WINANSI_HIGH
            .iter()
            .find(|(byte, _)| *byte == code)
            .map(|(_, c)| *c),
        _ => None,
    }
}

/// Encode a character as a WinAnsi byte
pub(crate) fn char_to_winansi(c: char) -> Option<u8> {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(c as u8),
        _ => WINANSI_HIGH
            .iter()
            .find(|(_, ch)| *ch == c)
            .map(|(byte, _)| *byte),
    }
}

const MACROMAN_HIGH: [char; 128] = [
    'Ä', 'Å', 'Ç', 'É', 'Ñ', 'Ö', 'Ü', 'á', 'à', 'â', 'ä', 'ã', 'å', 'ç', 'é', 'è',
    'ê', 'ë', 'í', 'ì', 'î', 'ï', 'ñ', 'ó', 'ò', 'ô', 'ö', 'õ', 'ú', 'ù', 'û', 'ü',
    '†', '°', '¢', '£', '§', '•', '¶', 'ß', '®', '©', '™', '´', '¨', '≠', 'Æ', 'Ø',
    '∞', '±', '≤', '≥', '¥', 'µ', '∂', '∑', '∏', 'π', '∫', 'ª', 'º', 'Ω', 'æ', 'ø',
    '¿', '¡', '¬', '√', 'ƒ', '≈', '∆', '«', '»', '…', '\u{A0}', 'À', 'Ã', 'Õ', 'Œ', 'œ',
    '–', '—', '“', '”', '‘', '’', '÷', '◊', 'ÿ', 'Ÿ', '⁄', '€', '‹', '›', 'ﬁ', 'ﬂ',
    '‡', '·', '‚', '„', '‰', 'Â', 'Ê', 'Á', 'Ë', 'È', 'Í', 'Î', 'Ï', 'Ì', 'Ó', 'Ô',
    '\u{F8FF}', 'Ò', 'Ú', 'Û', 'Ù', 'ı', 'ˆ', '˜', '¯', '˘', '˙', '˚', '¸', '˝', '˛', 'ˇ',
];

fn macroman_to_char(code: u8) -> Option<char> {
    match code {
        0x20..=0x7E => Some(code as char),
        0x80..=0xFF => Some(MACROMAN_HIGH[(code - 0x80) as usize]),
        _ => None,
    }
}

/// Resolve a glyph name from an `/Differences` array
///
/// Covers the Latin names templates use in practice plus the `uniXXXX` and
/// `uXXXX` conventions.
pub(crate) fn glyph_name_to_char(name: &str) -> Option<char> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return Some(c);
        }
    }

    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() == 4 {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            if let Ok(value) = u32::from_str_radix(hex, 16) {
                return char::from_u32(value);
            }
        }
    }

    let c = match name {
        "space" | "nbspace" => ' ',
        "exclam" => '!',
        "quotedbl" => '"',
        "numbersign" => '#',
        "dollar" => '$',
        "percent" => '%',
        "ampersand" => '&',
        "quotesingle" => '\'',
        "parenleft" => '(',
        "parenright" => ')',
        "asterisk" => '*',
        "plus" => '+',
        "comma" => ',',
        "hyphen" | "minus" => '-',
        "period" => '.',
        "slash" => '/',
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        "colon" => ':',
        "semicolon" => ';',
        "less" => '<',
        "equal" => '=',
        "greater" => '>',
        "question" => '?',
        "at" => '@',
        "bracketleft" => '[',
        "backslash" => '\\',
        "bracketright" => ']',
        "asciicircum" => '^',
        "underscore" => '_',
        "grave" => '`',
        "braceleft" => '{',
        "bar" => '|',
        "braceright" => '}',
        "asciitilde" => '~',
        "quoteleft" => '\u{2018}',
        "quoteright" => '\u{2019}',
        "quotedblleft" => '\u{201C}',
        "quotedblright" => '\u{201D}',
        "endash" => '\u{2013}',
        "emdash" => '\u{2014}',
        "bullet" => '\u{2022}',
        "ellipsis" => '\u{2026}',
        "fi" => '\u{FB01}',
        "fl" => '\u{FB02}',
        _ => return None,
    };
    Some(c)
}

/// Parsed `/ToUnicode` CMap: character code to Unicode text
#[derive(Debug, Clone, Default)]
pub(crate) struct ToUnicodeMap {
    map: HashMap<u32, String>,
    /// Code length in bytes declared by the codespace range
    code_len: Option<usize>,
}

/// Tokens of the PostScript subset CMaps are written in
#[derive(Debug, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    Name(String),
    Keyword(String),
    ArrayStart,
    ArrayEnd,
}

impl ToUnicodeMap {
    pub fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(data);
        let mut cmap = Self::default();
        let mut i = 0;

        while i < tokens.len() {
            match &tokens[i] {
                Token::Keyword(k) if k == "begincodespacerange" => {
                    i += 1;
                    while i + 1 < tokens.len() {
                        match (&tokens[i], &tokens[i + 1]) {
                            (Token::Hex(lo), Token::Hex(_)) => {
                                cmap.code_len.get_or_insert(lo.len().max(1));
                                i += 2;
                            }
                            _ => break,
                        }
                    }
                }
                Token::Keyword(k) if k == "beginbfchar" => {
                    i += 1;
                    while i + 1 < tokens.len() {
                        match (&tokens[i], &tokens[i + 1]) {
                            (Token::Hex(src), Token::Hex(dst)) => {
                                cmap.insert(be_value(src), utf16_to_string(dst));
                                i += 2;
                            }
                            (Token::Hex(src), Token::Name(name)) => {
                                if let Some(c) = glyph_name_to_char(name) {
                                    cmap.insert(be_value(src), c.to_string());
                                }
                                i += 2;
                            }
                            _ => break,
                        }
                    }
                }
                Token::Keyword(k) if k == "beginbfrange" => {
                    i += 1;
                    while i + 2 < tokens.len() {
                        let (Token::Hex(lo), Token::Hex(hi)) = (&tokens[i], &tokens[i + 1]) else {
                            break;
                        };
                        let (lo, hi) = (be_value(lo), be_value(hi));
                        match &tokens[i + 2] {
                            Token::Hex(dst) => {
                                cmap.insert_range(lo, hi, dst);
                                i += 3;
                            }
                            Token::ArrayStart => {
                                i += 3;
                                let mut code = Some(lo);
                                while let Some(Token::Hex(dst)) = tokens.get(i) {
                                    if let Some(c) = code.filter(|c| *c <= hi) {
                                        cmap.insert(c, utf16_to_string(dst));
                                    }
                                    code = code.and_then(|c| c.checked_add(1));
                                    i += 1;
                                }
                                if tokens.get(i) == Some(&Token::ArrayEnd) {
                                    i += 1;
                                }
                            }
                            _ => break,
                        }
                    }
                }
                _ => i += 1,
            }
        }

        cmap
    }

    pub fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub fn code_len(&self) -> Option<usize> {
        self.code_len
    }

    fn insert(&mut self, code: u32, text: String) {
        self.map.insert(code, text);
    }

    fn insert_range(&mut self, lo: u32, hi: u32, dst: &[u8]) {
        let units: Vec<u16> = dst
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]))
            .collect();
        let Some((&last, prefix)) = units.split_last() else {
            return;
        };
        // Guard against absurd ranges in broken files
        let hi = hi.min(lo.saturating_add(0xFFFF));
        for (offset, code) in (lo..=hi).enumerate() {
            let mut text = prefix.to_vec();
            text.push(last.wrapping_add(offset as u16));
            self.insert(code, String::from_utf16_lossy(&text));
        }
    }
}

fn be_value(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

fn utf16_to_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        match b {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                i += 1;
                let mut digits = Vec::new();
                while i < data.len() && data[i] != b'>' {
                    if data[i].is_ascii_hexdigit() {
                        digits.push(data[i]);
                    }
                    i += 1;
                }
                i += 1;
                if digits.len() % 2 == 1 {
                    digits.push(b'0');
                }
                let bytes = digits
                    .chunks(2)
                    .filter_map(|pair| {
                        std::str::from_utf8(pair)
                            .ok()
                            .and_then(|s| u8::from_str_radix(s, 16).ok())
                    })
                    .collect();
                tokens.push(Token::Hex(bytes));
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                i += 1;
            }
            b'(' => {
                // Literal strings only appear in CIDSystemInfo; skip them
                let mut depth = 0;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                i += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
            }
            _ if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                let is_name = b == b'/';
                if is_name {
                    i += 1;
                }
                while i < data.len() && !is_delimiter(data[i]) {
                    i += 1;
                }
                if i == start {
                    i += 1;
                    continue;
                }
                let word = String::from_utf8_lossy(&data[start..i]).into_owned();
                if is_name {
                    tokens.push(Token::Name(word[1..].to_string()));
                } else {
                    tokens.push(Token::Keyword(word));
                }
            }
        }
    }

    tokens
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'<' | b'>' | b'[' | b']' | b'(' | b')' | b'/' | b'%')
}
