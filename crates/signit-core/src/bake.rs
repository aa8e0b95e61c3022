//! Bake overlays into a PDF's page content
//!
//! Every export parses a fresh copy of the original bytes, appends drawing
//! operators to the pages that carry overlays and serializes the result.
//! Nothing is written as annotations: the text and images become part of the
//! page content itself.

use crate::config::TextConfig;
use crate::coords::{screen_to_pdf, screen_to_pdf_length, PdfRect};
use crate::document::{page_size, PageSize};
use crate::error::SignitError;
use crate::fonts::{encode_line, sanitize, FontCache, StandardFont};
use crate::image::{decode_signature, embed_image};
use crate::overlay::{Overlay, OverlayKind, SignatureData, TextData};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Text layout parameters, in screen pixels where applicable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextLayout {
    pub line_height: f64,
    pub inset_left_px: f64,
    pub inset_top_px: f64,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self::from(&TextConfig::default())
    }
}

impl From<&TextConfig> for TextLayout {
    fn from(config: &TextConfig) -> Self {
        Self {
            line_height: config.line_height,
            inset_left_px: config.inset_left_px,
            inset_top_px: config.inset_top_px,
        }
    }
}

/// Parse a hex color ("#RRGGBB" or "RRGGBB") to RGB floats in 0..=1.
/// Anything else is black.
pub fn parse_hex_color(color: &str) -> (f32, f32, f32) {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        let channel =
            |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0) as f32 / 255.0;
        (channel(0), channel(2), channel(4))
    } else {
        tracing::debug!(color, "Malformed color, using black");
        (0.0, 0.0, 0.0)
    }
}

/// Bake `overlays` into a copy of the PDF in `source` and return the new
/// document bytes.
///
/// Overlays whose page does not exist are skipped. Any other failure aborts
/// the whole export with `SignitError::ExportFailure`.
pub fn bake(
    source: &[u8],
    overlays: &[Overlay],
    scale: f64,
    layout: &TextLayout,
) -> Result<Vec<u8>, SignitError> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(SignitError::ExportFailure(format!(
            "Invalid render scale: {}",
            scale
        )));
    }

    let mut doc = Document::load_mem(source)
        .map_err(|e| SignitError::ExportFailure(format!("Failed to load PDF: {}", e)))?;

    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let mut baker = Baker::new(scale, layout);

    for overlay in overlays {
        let page_index = match usize::try_from(overlay.page)
            .ok()
            .and_then(|p| p.checked_sub(1))
            .filter(|&i| i < page_ids.len())
        {
            Some(index) => index,
            None => {
                tracing::debug!(
                    id = %overlay.id,
                    page = overlay.page,
                    page_count = page_ids.len(),
                    "Skipping overlay on missing page"
                );
                continue;
            }
        };
        let page_id = page_ids[page_index];
        baker.bake_overlay(&mut doc, page_index, page_id, overlay)?;
    }

    let pages_written = baker.pages.len();
    let fonts_embedded = baker.fonts.len();
    for writer in baker.pages.into_values() {
        writer.finish(&mut doc)?;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| SignitError::ExportFailure(format!("Failed to save PDF: {}", e)))?;

    tracing::info!(
        overlays = overlays.len(),
        pages_written,
        fonts_embedded,
        bytes = output.len(),
        "Export baked"
    );
    Ok(output)
}

/// Per-export state: font and image caches plus one writer per touched page
struct Baker<'a> {
    scale: f64,
    layout: &'a TextLayout,
    fonts: FontCache,
    images: HashMap<String, ObjectId>,
    pages: BTreeMap<usize, PageWriter>,
}

impl<'a> Baker<'a> {
    fn new(scale: f64, layout: &'a TextLayout) -> Self {
        Self {
            scale,
            layout,
            fonts: FontCache::new(),
            images: HashMap::new(),
            pages: BTreeMap::new(),
        }
    }

    fn bake_overlay(
        &mut self,
        doc: &mut Document,
        page_index: usize,
        page_id: ObjectId,
        overlay: &Overlay,
    ) -> Result<(), SignitError> {
        // Text that cannot be drawn must not touch the page at all
        if let OverlayKind::Text(data) = &overlay.kind {
            if data.text.trim().is_empty() {
                tracing::debug!(id = %overlay.id, "Skipping empty text overlay");
                return Ok(());
            }
            if !(data.font_size.is_finite() && data.font_size > 0.0) {
                tracing::warn!(
                    id = %overlay.id,
                    font_size = data.font_size,
                    "Skipping text overlay with invalid font size"
                );
                return Ok(());
            }
        }

        let writer = self
            .pages
            .entry(page_index)
            .or_insert_with(|| PageWriter::new(&*doc, page_id));

        let size = writer.size;
        let rect = screen_to_pdf(&overlay.rect(), self.scale, size.height)
            .offset(size.origin_x, size.origin_y);

        match &overlay.kind {
            OverlayKind::Text(data) => {
                let font = StandardFont::resolve(data.font_family, data.bold, data.italic);
                let font_id = self.fonts.get_or_embed(doc, font);
                let font_name = writer.font_name(font_id);
                writer.draw_text(&rect, data, &font_name, self.scale, self.layout);
            }
            OverlayKind::Signature(data) => {
                let image_id = signature_image(&mut self.images, doc, data)?;
                let image_name = writer.image_name(image_id);
                writer.draw_image(&rect, &image_name);
            }
        }
        Ok(())
    }
}

/// Image XObject for a signature, decoded once per distinct data URL
fn signature_image(
    images: &mut HashMap<String, ObjectId>,
    doc: &mut Document,
    data: &SignatureData,
) -> Result<ObjectId, SignitError> {
    if let Some(&id) = images.get(&data.data_url) {
        return Ok(id);
    }
    let image = decode_signature(&data.data_url)?;
    let id = embed_image(doc, &image)?;
    images.insert(data.data_url.clone(), id);
    Ok(id)
}

/// Drawing operations and resources destined for one page
struct PageWriter {
    page_id: ObjectId,
    size: PageSize,
    taken: HashSet<Vec<u8>>,
    fonts: Vec<(String, ObjectId)>,
    images: Vec<(String, ObjectId)>,
    operations: Vec<Operation>,
}

impl PageWriter {
    fn new(doc: &Document, page_id: ObjectId) -> Self {
        let mut taken = HashSet::new();
        if let Some(resources) = effective_resources(doc, page_id) {
            for category in [b"Font".as_slice(), b"XObject".as_slice()] {
                if let Some(dict) = resolve_dict(doc, resources.get(category).ok()) {
                    taken.extend(dict.iter().map(|(key, _)| key.clone()));
                }
            }
        }

        Self {
            page_id,
            size: page_size(doc, page_id),
            taken,
            fonts: Vec::new(),
            images: Vec::new(),
            operations: Vec::new(),
        }
    }

    fn font_name(&mut self, font_id: ObjectId) -> String {
        if let Some((name, _)) = self.fonts.iter().find(|(_, id)| *id == font_id) {
            return name.clone();
        }
        let name = self.unused_name("SgF");
        self.fonts.push((name.clone(), font_id));
        name
    }

    fn image_name(&mut self, image_id: ObjectId) -> String {
        if let Some((name, _)) = self.images.iter().find(|(_, id)| *id == image_id) {
            return name.clone();
        }
        let name = self.unused_name("SgIm");
        self.images.push((name.clone(), image_id));
        name
    }

    fn unused_name(&mut self, prefix: &str) -> String {
        let mut n = 1;
        loop {
            let candidate = format!("{}{}", prefix, n);
            if self.taken.insert(candidate.clone().into_bytes()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Lay out text as successive single-line runs from the top of the box
    fn draw_text(
        &mut self,
        rect: &PdfRect,
        data: &TextData,
        font_name: &str,
        scale: f64,
        layout: &TextLayout,
    ) {
        let font_size = screen_to_pdf_length(data.font_size, scale);
        let line_step = font_size * layout.line_height;
        let x = rect.x + screen_to_pdf_length(layout.inset_left_px, scale);
        let mut baseline = rect.top() - font_size - screen_to_pdf_length(layout.inset_top_px, scale);
        let (r, g, b) = parse_hex_color(&data.color);

        let normalized = data.text.replace("\r\n", "\n").replace('\r', "\n");
        let text = sanitize(&normalized);

        self.operations.push(Operation::new("q", vec![]));
        for line in text.split('\n') {
            // Lines that would start below the page bottom are dropped
            if baseline < self.size.origin_y {
                break;
            }
            if !line.is_empty() {
                self.operations.extend([
                    Operation::new("BT", vec![]),
                    Operation::new(
                        "Tf",
                        vec![
                            Object::Name(font_name.as_bytes().to_vec()),
                            Object::Real(font_size as f32),
                        ],
                    ),
                    Operation::new(
                        "rg",
                        vec![Object::Real(r), Object::Real(g), Object::Real(b)],
                    ),
                    Operation::new(
                        "Td",
                        vec![Object::Real(x as f32), Object::Real(baseline as f32)],
                    ),
                    Operation::new(
                        "Tj",
                        vec![Object::String(encode_line(line), StringFormat::Literal)],
                    ),
                    Operation::new("ET", vec![]),
                ]);
            }
            baseline -= line_step;
        }
        self.operations.push(Operation::new("Q", vec![]));
    }

    /// Stretch the image over the whole box
    fn draw_image(&mut self, rect: &PdfRect, image_name: &str) {
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(rect.width as f32),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(rect.height as f32),
                    Object::Real(rect.x as f32),
                    Object::Real(rect.y as f32),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image_name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// Register resources on the page and append the drawing operators
    fn finish(self, doc: &mut Document) -> Result<(), SignitError> {
        if self.operations.is_empty() {
            return Ok(());
        }
        install_resources(doc, self.page_id, &self.fonts, &self.images)?;

        let existing = existing_contents(doc, self.page_id)?;
        let mut operations = self.operations;
        let mut contents = Vec::with_capacity(existing.len() + 2);

        if !existing.is_empty() {
            // Isolate the original content's graphics state from ours
            let prefix = encode(vec![Operation::new("q", vec![])])?;
            contents.push(Object::Reference(
                doc.add_object(Stream::new(Dictionary::new(), prefix)),
            ));
            contents.extend(existing);
            operations.insert(0, Operation::new("Q", vec![]));
        }

        let body = encode(operations)?;
        contents.push(Object::Reference(
            doc.add_object(Stream::new(Dictionary::new(), body)),
        ));

        let page = doc
            .get_dictionary_mut(self.page_id)
            .map_err(|e| SignitError::ExportFailure(format!("Page is not a dictionary: {}", e)))?;
        page.set("Contents", Object::Array(contents));
        Ok(())
    }
}

fn encode(operations: Vec<Operation>) -> Result<Vec<u8>, SignitError> {
    Content { operations }
        .encode()
        .map_err(|e| SignitError::ExportFailure(format!("Failed to encode content: {}", e)))
}

/// Current `/Contents` of a page flattened to a list of stream references
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, SignitError> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| SignitError::ExportFailure(format!("Page is not a dictionary: {}", e)))?;

    let contents = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    Ok(contents)
}

/// Resources the page actually uses, following inheritance through Parent
fn effective_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut current = Some(page_id);
    let mut depth = 0;
    while let Some(id) = current {
        if depth > 64 {
            return None;
        }
        depth += 1;

        let dict = doc.get_dictionary(id).ok()?;
        if let Some(resources) = resolve_dict(doc, dict.get(b"Resources").ok()) {
            return Some(resources);
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    None
}

fn resolve_dict(doc: &Document, obj: Option<&Object>) -> Option<Dictionary> {
    match obj? {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    }
}

/// Add font and image entries to the page's resource dictionary.
///
/// The merged dictionary is always stored directly on the page. Resources
/// reached by reference or through Parent may be shared with other pages,
/// so they are copied rather than updated where they live.
fn install_resources(
    doc: &mut Document,
    page_id: ObjectId,
    fonts: &[(String, ObjectId)],
    images: &[(String, ObjectId)],
) -> Result<(), SignitError> {
    let mut resources = effective_resources(doc, page_id).unwrap_or_default();

    merge_category(doc, &mut resources, b"Font", fonts);
    merge_category(doc, &mut resources, b"XObject", images);

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| SignitError::ExportFailure(format!("Page is not a dictionary: {}", e)))?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn merge_category(
    doc: &Document,
    resources: &mut Dictionary,
    category: &[u8],
    entries: &[(String, ObjectId)],
) {
    if entries.is_empty() {
        return;
    }
    let mut dict = resolve_dict(doc, resources.get(category).ok()).unwrap_or_default();
    for (name, id) in entries {
        dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
    }
    resources.set(category.to_vec(), Object::Dictionary(dict));
}
