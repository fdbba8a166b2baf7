//! PDF Core - Low-level PDF text search and stamping
//!
//! This crate provides functionality for:
//! - Opening and saving PDF documents
//! - Locating literal text on a page, with its bounding box
//! - Inserting text in a standard font, optionally centered on a point
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{FontSpec, PdfDocument};
//!
//! let mut doc = PdfDocument::open("template.pdf")?;
//! let placeholder = doc.search_text(1, "NAME_PLACEHOLDER")?[0];
//! let font = FontSpec::new("Times-Italic", 37.0)?;
//! doc.insert_text_centered(1, placeholder.center(), "Alice Smith", &font)?;
//! doc.save("certificate.pdf")?;
//! ```

mod document;
mod encoding;
mod font;
mod geometry;
mod locate;
mod objects;
mod page_font;
mod text;

pub use document::PdfDocument;
pub use font::{FontSpec, StandardFont};
pub use geometry::{Point, Rect};
pub use locate::TextChar;
pub use text::{generate_text_operators, hex_string, start_x, TextRenderContext};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Font resolution failed: {0}")]
    FontResolution(String),

    #[error("Character {ch:?} cannot be drawn with {font}")]
    UnsupportedCharacter { ch: char, font: String },

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_default() {
        assert_eq!(Align::default(), Align::Left);
    }

    #[test]
    fn test_error_messages() {
        let err = PdfError::UnsupportedCharacter {
            ch: 'ส',
            font: "Times-Italic".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Character 'ส' cannot be drawn with Times-Italic"
        );

        let err = PdfError::InvalidPage(3, 1);
        assert_eq!(
            err.to_string(),
            "Invalid page number: 3 (document has 1 pages)"
        );
    }
}
