//! PDF Document wrapper

use crate::font::{FontSpec, StandardFont};
use crate::geometry::{PageBox, Point, Rect};
use crate::locate::{self, TextChar};
use crate::objects::{get_dict, inherited, number, page_content, resolve};
use crate::text::{generate_text_operators, hex_string, TextRenderContext};
use crate::{Align, PdfError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::Path;

/// Page size assumed when a page has neither CropBox nor MediaBox (A4)
const FALLBACK_PAGE_BOX: PageBox = PageBox {
    left: 0.0,
    bottom: 0.0,
    right: 595.28,
    top: 841.89,
};

const PAGE_BOX_KEYS: [&[u8]; 2] = [b"CropBox", b"MediaBox"];

/// PDF Document wrapper providing high-level operations
///
/// Positions are page coordinates: points from the top-left corner of the
/// page's crop box, y growing downwards. Inserted text is buffered and
/// written on [`save`](Self::save) or [`to_bytes`](Self::to_bytes), so
/// searches see the document as it was loaded until then.
#[derive(Clone)]
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Font objects added for inserted text
    embedded_fonts: HashMap<StandardFont, ObjectId>,
    /// Page font resources (page number -> font -> resource name)
    page_font_resources: BTreeMap<usize, HashMap<StandardFont, String>>,
    /// Buffered content operators per page (page number -> operators)
    page_content_buffer: BTreeMap<usize, Vec<u8>>,
}

impl PdfDocument {
    /// Open a PDF document from a file path
    ///
    /// # Example
    /// ```ignore
    /// let doc = PdfDocument::open("template.pdf")?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = Document::load(path).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Self::from_document(inner)
    }

    /// Open a PDF document from bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Self::from_document(inner)
    }

    fn from_document(inner: Document) -> Result<Self> {
        if inner.get_pages().is_empty() {
            return Err(PdfError::OpenError("document has no pages".to_string()));
        }

        Ok(Self {
            inner,
            embedded_fonts: HashMap::new(),
            page_font_resources: BTreeMap::new(),
            page_content_buffer: BTreeMap::new(),
        })
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Width and height of a page's visible area in points
    pub fn page_size(&self, page: usize) -> Result<(f64, f64)> {
        let page_box = self.page_box(self.page_id(page)?);
        Ok((page_box.width(), page_box.height()))
    }

    /// Characters on a page with their positions, in content order
    pub fn extract_chars(&self, page: usize) -> Result<Vec<TextChar>> {
        let page_id = self.page_id(page)?;
        let page_dict = self.inner.get_dictionary(page_id)?;
        let content = page_content(&self.inner, page_dict);
        let resources = match inherited(&self.inner, page_id, b"Resources") {
            Some(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        };

        locate::extract_chars(&self.inner, &content, resources, self.page_box(page_id))
    }

    /// Find every occurrence of `needle` on a page
    ///
    /// Matching is exact and case-sensitive. Each match is the union of its
    /// character boxes; matches come back in content order and never
    /// overlap. Returns an empty list when the text is absent.
    pub fn search_text(&self, page: usize, needle: &str) -> Result<Vec<Rect>> {
        let chars = self.extract_chars(page)?;
        let matches = locate::search(&chars, needle);
        tracing::debug!(page, needle, matches = matches.len(), "searched page text");
        Ok(matches)
    }

    /// Insert text at a specific position
    ///
    /// # Arguments
    /// * `text` - Text to insert
    /// * `page` - Page number (1-indexed)
    /// * `x` - X coordinate in points
    /// * `y` - Baseline Y coordinate in points (from top)
    /// * `align` - Text alignment
    /// * `font` - Font and size to draw with
    pub fn insert_text(
        &mut self,
        text: &str,
        page: usize,
        x: f64,
        y: f64,
        align: Align,
        font: &FontSpec,
    ) -> Result<()> {
        let page_id = self.page_id(page)?;

        // Skip empty text - nothing to render
        if text.is_empty() {
            return Ok(());
        }

        let encoded = font.encode(text)?;
        let text_width = font.width_of_encoded(&encoded);
        let (pdf_x, pdf_y) = self.page_box(page_id).to_user(Point::new(x, y));
        let font_name = self.get_or_create_font_ref(font.font(), page)?;

        let ctx = TextRenderContext {
            font_name,
            font_size: font.size(),
            text_width,
        };
        let ops = generate_text_operators(&hex_string(&encoded), pdf_x, pdf_y, align, &ctx);
        self.buffer_content(page, &ops);

        Ok(())
    }

    /// Insert text horizontally centered on `center`, with its baseline at
    /// `center.y`
    pub fn insert_text_centered(
        &mut self,
        page: usize,
        center: Point,
        text: &str,
        font: &FontSpec,
    ) -> Result<()> {
        self.insert_text(text, page, center.x, center.y, Align::Center, font)
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.flush_content_buffers()?;

        self.inner
            .save(path)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush_content_buffers()?;

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        u32::try_from(page)
            .ok()
            .and_then(|number| pages.get(&number).copied())
            .ok_or(PdfError::InvalidPage(page, pages.len()))
    }

    /// Visible area of a page: CropBox, else MediaBox, inherited through
    /// the page tree
    fn page_box(&self, page_id: ObjectId) -> PageBox {
        PAGE_BOX_KEYS
            .iter()
            .find_map(|key| {
                inherited(&self.inner, page_id, key)
                    .and_then(|value| page_box_from_object(&self.inner, value))
            })
            .unwrap_or(FALLBACK_PAGE_BOX)
    }

    /// Get or create a font resource name for a specific page
    ///
    /// Names already used by the page's own fonts are never reused.
    fn get_or_create_font_ref(&mut self, font: StandardFont, page: usize) -> Result<String> {
        if let Some(name) = self
            .page_font_resources
            .get(&page)
            .and_then(|fonts| fonts.get(&font))
        {
            return Ok(name.clone());
        }

        let page_id = self.page_id(page)?;
        let existing = self.existing_font_names(page_id);
        let assigned = self.page_font_resources.entry(page).or_default();

        let mut n = 1;
        let name = loop {
            let candidate = format!("F{n}");
            if !existing.contains(candidate.as_bytes())
                && !assigned.values().any(|name| *name == candidate)
            {
                break candidate;
            }
            n += 1;
        };

        assigned.insert(font, name.clone());
        Ok(name)
    }

    fn existing_font_names(&self, page_id: ObjectId) -> HashSet<Vec<u8>> {
        let Some(Object::Dictionary(resources)) = inherited(&self.inner, page_id, b"Resources")
        else {
            return HashSet::new();
        };

        get_dict(&self.inner, resources, b"Font")
            .map(|fonts| fonts.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    /// Buffer content operators for a page (written at save time)
    fn buffer_content(&mut self, page: usize, content: &[u8]) {
        self.page_content_buffer
            .entry(page)
            .or_default()
            .extend_from_slice(content);
    }

    /// Flush all buffered content and font resources to the pages
    fn flush_content_buffers(&mut self) -> Result<()> {
        let buffers = std::mem::take(&mut self.page_content_buffer);
        let resources = std::mem::take(&mut self.page_font_resources);

        for (page, fonts) in resources {
            if !fonts.is_empty() {
                self.add_fonts_to_page_resources(page, &fonts)?;
            }
        }

        for (page, content) in buffers {
            if !content.is_empty() {
                self.append_to_content_stream(page, &content)?;
            }
        }

        Ok(())
    }

    fn embed_font(&mut self, font: StandardFont) -> ObjectId {
        if let Some(id) = self.embedded_fonts.get(&font) {
            return *id;
        }
        let id = self.inner.add_object(font.to_font_dictionary());
        self.embedded_fonts.insert(font, id);
        id
    }

    /// Add fonts to a page's Resources dictionary
    ///
    /// The effective (possibly inherited or shared) resources are copied
    /// into the page itself, so other pages keep theirs unchanged.
    fn add_fonts_to_page_resources(
        &mut self,
        page: usize,
        fonts: &HashMap<StandardFont, String>,
    ) -> Result<()> {
        let page_id = self.page_id(page)?;

        let mut resources_dict = match inherited(&self.inner, page_id, b"Resources") {
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        let mut font_dict = get_dict(&self.inner, &resources_dict, b"Font")
            .cloned()
            .unwrap_or_default();

        for (font, resource_name) in fonts {
            let font_id = self.embed_font(*font);
            font_dict.set(resource_name.as_bytes(), Object::Reference(font_id));
        }
        resources_dict.set("Font", Object::Dictionary(font_dict));

        let mut page_dict = self.inner.get_dictionary(page_id)?.clone();
        page_dict.set("Resources", Object::Dictionary(resources_dict));
        self.inner.objects.insert(page_id, page_dict.into());

        Ok(())
    }

    /// Append content to a page's content stream
    ///
    /// Existing content is left byte-for-byte intact and bracketed by
    /// `q`/`Q`, so its graphics state cannot leak into the appended
    /// operators.
    fn append_to_content_stream(&mut self, page: usize, content: &[u8]) -> Result<()> {
        let page_id = self.page_id(page)?;
        let mut page_dict = self.inner.get_dictionary(page_id)?.clone();

        let mut parts: Vec<Object> = match page_dict.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.inner.get_object(*id) {
                Ok(Object::Array(array)) => array.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(array)) => array.clone(),
            Ok(Object::Stream(stream)) => {
                vec![Object::Reference(self.inner.add_object(stream.clone()))]
            }
            _ => Vec::new(),
        };

        let mut appended = Vec::new();
        if !parts.is_empty() {
            let open_id = self
                .inner
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            parts.insert(0, Object::Reference(open_id));
            appended.extend_from_slice(b"\nQ\n");
        }
        appended.extend_from_slice(content);

        let stream_id = self.inner.add_object(compressed_stream(&appended)?);
        parts.push(Object::Reference(stream_id));

        page_dict.set("Contents", Object::Array(parts));
        self.inner.objects.insert(page_id, page_dict.into());

        Ok(())
    }
}

fn page_box_from_object(doc: &Document, value: &Object) -> Option<PageBox> {
    let Object::Array(values) = value else {
        return None;
    };
    if values.len() < 4 {
        return None;
    }
    let v: Vec<f64> = values[..4]
        .iter()
        .map(|obj| number(resolve(doc, obj)))
        .collect::<Option<_>>()?;
    let page_box = PageBox::from_corners(v[0], v[1], v[2], v[3]);
    (page_box.width() > 0.0 && page_box.height() > 0.0).then_some(page_box)
}

/// Flate-compressed content stream
fn compressed_stream(content: &[u8]) -> Result<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content)?;
    let compressed = encoder.finish()?;

    Ok(Stream::new(
        dictionary! { "Filter" => "FlateDecode" },
        compressed,
    ))
}
