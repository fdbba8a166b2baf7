//! Integration tests for pdf-core
//!
//! These tests verify end-to-end functionality with real PDF operations.

use lopdf::{dictionary, Document, Object, Stream};
use pdf_core::{Align, FontSpec, PdfDocument, PdfError, Point, Rect};
use pretty_assertions::assert_eq;

const PLACEHOLDER: &str = "NAME_PLACEHOLDER";

/// Create a one-page letter-size template with `NAME_PLACEHOLDER` drawn in a
/// font whose glyphs are all 625 units wide, at 20pt from (100, 582)
///
/// In page coordinates the placeholder occupies (100, 200)-(300, 220).
fn create_template_pdf() -> Vec<u8> {
    create_pdf_with_content(b"BT /F1 20 Tf 100 582 Td (NAME_PLACEHOLDER) Tj ET")
}

fn create_pdf_with_content(content: &[u8]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => "Fixed",
        "Flags" => 32,
        "Ascent" => 500,
        "Descent" => -500,
    });
    let widths: Vec<Object> = (32..=126).map(|_| Object::Integer(625)).collect();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Fixed",
        "FirstChar" => 32,
        "LastChar" => 126,
        "Widths" => widths,
        "Encoding" => "WinAnsiEncoding",
        "FontDescriptor" => descriptor_id,
    });

    let contents_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
        "Contents" => contents_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn times_italic() -> FontSpec {
    FontSpec::new("Times-Italic", 37.0).unwrap()
}

#[test]
fn test_open_save_roundtrip() {
    let mut doc = PdfDocument::open_from_bytes(&create_template_pdf()).unwrap();
    assert_eq!(doc.page_count(), 1);

    let bytes = doc.to_bytes().unwrap();
    let reopened = PdfDocument::open_from_bytes(&bytes).unwrap();
    assert_eq!(reopened.page_count(), 1);
}

#[test]
fn test_open_garbage() {
    let result = PdfDocument::open_from_bytes(b"not a pdf");
    assert!(matches!(result, Err(PdfError::OpenError(_))));
}

#[test]
fn test_locate_placeholder() {
    let doc = PdfDocument::open_from_bytes(&create_template_pdf()).unwrap();
    let matches = doc.search_text(1, PLACEHOLDER).unwrap();

    assert_eq!(matches, vec![Rect::new(100.0, 200.0, 300.0, 220.0)]);
    assert_eq!(matches[0].center(), Point::new(200.0, 210.0));
}

#[test]
fn test_locate_is_idempotent() {
    let doc = PdfDocument::open_from_bytes(&create_template_pdf()).unwrap();
    let first = doc.search_text(1, PLACEHOLDER).unwrap();
    let second = doc.search_text(1, PLACEHOLDER).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_locate_missing_placeholder() {
    let pdf = create_pdf_with_content(b"BT /F1 20 Tf 100 582 Td (Certificate of Completion) Tj ET");
    let doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    assert!(doc.search_text(1, PLACEHOLDER).unwrap().is_empty());
}

#[test]
fn test_locate_placeholder_split_by_kerning() {
    let pdf = create_pdf_with_content(
        b"BT /F1 20 Tf 100 582 Td [(NAME) 0 (_PLACE) 0 (HOLDER)] TJ ET",
    );
    let doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    assert_eq!(
        doc.search_text(1, PLACEHOLDER).unwrap(),
        vec![Rect::new(100.0, 200.0, 300.0, 220.0)]
    );
}

#[test]
fn test_locate_after_comment() {
    let pdf = create_pdf_with_content(
        b"% Page 1 layout\nBT /F1 20 Tf 100 582 Td (NAME_PLACEHOLDER) Tj ET % end\n",
    );
    let doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    assert_eq!(
        doc.search_text(1, PLACEHOLDER).unwrap(),
        vec![Rect::new(100.0, 200.0, 300.0, 220.0)]
    );
}

#[test]
fn test_locate_after_binary_inline_image() {
    let content = [
        b"q 20 0 0 20 50 50 cm BI /W 2 /H 1 /BPC 8 /CS /G ID ".as_slice(),
        [0x00, 0xff, b'E', b'I', 0x80].as_slice(),
        b"\nEI Q\nBT /F1 20 Tf 100 582 Td (NAME_PLACEHOLDER) Tj ET".as_slice(),
    ]
    .concat();
    let pdf = create_pdf_with_content(&content);
    let doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    assert_eq!(
        doc.search_text(1, PLACEHOLDER).unwrap(),
        vec![Rect::new(100.0, 200.0, 300.0, 220.0)]
    );
}

#[test]
fn test_insert_centered_round_trip() {
    let mut doc = PdfDocument::open_from_bytes(&create_template_pdf()).unwrap();
    let center = doc.search_text(1, PLACEHOLDER).unwrap()[0].center();
    let font = times_italic();

    doc.insert_text_centered(1, center, "Alice Smith", &font)
        .unwrap();
    let bytes = doc.to_bytes().unwrap();

    let rendered = PdfDocument::open_from_bytes(&bytes).unwrap();
    let found = rendered.search_text(1, "Alice Smith").unwrap();
    assert_eq!(found.len(), 1);

    let name_box = found[0];
    let width = font.measure("Alice Smith").unwrap();
    assert!((name_box.width() - width).abs() < 1e-3);
    assert!(((name_box.x0 + name_box.x1) / 2.0 - 200.0).abs() < 1e-3);
    // Baseline sits at y=210; Times-Italic descends 0.205 em below it
    assert!((name_box.y1 - (210.0 + 0.205 * 37.0)).abs() < 1e-3);
    assert!((name_box.y0 - (210.0 - 0.683 * 37.0)).abs() < 1e-3);

    // The placeholder is left where it was
    assert_eq!(
        rendered.search_text(1, PLACEHOLDER).unwrap(),
        vec![Rect::new(100.0, 200.0, 300.0, 220.0)]
    );
}

#[test]
fn test_clone_leaves_template_untouched() {
    let template = PdfDocument::open_from_bytes(&create_template_pdf()).unwrap();
    let center = template.search_text(1, PLACEHOLDER).unwrap()[0].center();

    let mut copy = template.clone();
    copy.insert_text_centered(1, center, "Bob Jones", &times_italic())
        .unwrap();
    copy.to_bytes().unwrap();

    let mut template = template;
    let reopened = PdfDocument::open_from_bytes(&template.to_bytes().unwrap()).unwrap();
    assert!(reopened.search_text(1, "Bob Jones").unwrap().is_empty());
    assert_eq!(reopened.search_text(1, PLACEHOLDER).unwrap().len(), 1);
}

#[test]
fn test_insert_text_alignment() {
    let font = FontSpec::new("Times-Italic", 12.0).unwrap();
    let width = font.measure("Test").unwrap();

    for (align, expected_x0) in [
        (Align::Left, 300.0),
        (Align::Center, 300.0 - width / 2.0),
        (Align::Right, 300.0 - width),
    ] {
        let mut doc = PdfDocument::open_from_bytes(&create_template_pdf()).unwrap();
        doc.insert_text("Test", 1, 300.0, 500.0, align, &font).unwrap();
        let rendered = PdfDocument::open_from_bytes(&doc.to_bytes().unwrap()).unwrap();

        let found = rendered.search_text(1, "Test").unwrap();
        assert_eq!(found.len(), 1);
        assert!((found[0].x0 - expected_x0).abs() < 1e-3, "{align:?}");
    }
}

#[test]
fn test_empty_text() {
    let mut doc = PdfDocument::open_from_bytes(&create_template_pdf()).unwrap();
    doc.insert_text("", 1, 100.0, 100.0, Align::Left, &times_italic())
        .unwrap();
    let rendered = PdfDocument::open_from_bytes(&doc.to_bytes().unwrap()).unwrap();
    assert_eq!(rendered.search_text(1, PLACEHOLDER).unwrap().len(), 1);
}

#[test]
fn test_invalid_page_number() {
    let mut doc = PdfDocument::open_from_bytes(&create_template_pdf()).unwrap();

    let result = doc.insert_text_centered(2, Point::new(10.0, 10.0), "Alice", &times_italic());
    assert!(matches!(result, Err(PdfError::InvalidPage(2, 1))));

    let result = doc.search_text(0, PLACEHOLDER);
    assert!(matches!(result, Err(PdfError::InvalidPage(0, 1))));
}

#[test]
fn test_unknown_font() {
    let result = FontSpec::new("Helvetica", 37.0);
    assert!(matches!(result, Err(PdfError::FontResolution(_))));
}

#[test]
fn test_unsupported_character() {
    let mut doc = PdfDocument::open_from_bytes(&create_template_pdf()).unwrap();
    let result = doc.insert_text_centered(1, Point::new(200.0, 210.0), "Łukasz", &times_italic());
    assert!(matches!(
        result,
        Err(PdfError::UnsupportedCharacter { ch: 'Ł', .. })
    ));
}

#[test]
fn test_latin1_name_round_trip() {
    let mut doc = PdfDocument::open_from_bytes(&create_template_pdf()).unwrap();
    doc.insert_text_centered(1, Point::new(200.0, 210.0), "Zoë Müller", &times_italic())
        .unwrap();
    let rendered = PdfDocument::open_from_bytes(&doc.to_bytes().unwrap()).unwrap();
    assert_eq!(rendered.search_text(1, "Zoë Müller").unwrap().len(), 1);
}

#[test]
fn test_extract_chars_order() {
    let doc = PdfDocument::open_from_bytes(&create_template_pdf()).unwrap();
    let text: String = doc.extract_chars(1).unwrap().iter().map(|c| c.ch).collect();
    assert_eq!(text, PLACEHOLDER);
}

#[test]
fn test_page_size() {
    let doc = PdfDocument::open_from_bytes(&create_template_pdf()).unwrap();
    assert_eq!(doc.page_size(1).unwrap(), (612.0, 792.0));
}
