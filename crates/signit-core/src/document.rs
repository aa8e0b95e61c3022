//! Loaded document handle
//!
//! Holds the original bytes of the PDF under edit together with the page
//! geometry the transform math needs. The parsed structure is only used to
//! read that geometry; every export re-parses the original bytes so the
//! source is never mutated.

use crate::error::SignitError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::sync::Arc;

/// US Letter, used when a page tree carries no MediaBox at all
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// User-space size of a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
    /// Lower-left corner of the MediaBox
    pub origin_x: f64,
    pub origin_y: f64,
}

/// A validated, parsed PDF ready for editing
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    bytes: Arc<[u8]>,
    pages: Vec<PageSize>,
}

impl LoadedDocument {
    /// Validate and parse raw PDF bytes.
    ///
    /// Input without a `%PDF-` header is `UnsupportedInput`; anything lopdf
    /// cannot parse, or a document without pages, is `InvalidDocument`.
    pub fn load(bytes: &[u8]) -> Result<Self, SignitError> {
        check_pdf_header(bytes)?;

        let doc = Document::load_mem(bytes)
            .map_err(|e| SignitError::InvalidDocument(format!("Failed to parse PDF: {}", e)))?;

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(SignitError::InvalidDocument("PDF has no pages".to_string()));
        }

        let pages = page_ids
            .iter()
            .map(|&page_id| page_size(&doc, page_id))
            .collect();

        Ok(Self {
            bytes: Arc::from(bytes),
            pages,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Size of the page at 0-based `page_index`
    pub fn page_size(&self, page_index: usize) -> Option<PageSize> {
        self.pages.get(page_index).copied()
    }

    pub fn page_sizes(&self) -> &[PageSize] {
        &self.pages
    }

    /// Original, unmodified bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }
}

/// Reject anything that does not look like a PDF before parsing it
pub fn check_pdf_header(bytes: &[u8]) -> Result<(), SignitError> {
    if bytes.len() < 8 {
        return Err(SignitError::UnsupportedInput(
            "File too small to be a valid PDF".to_string(),
        ));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(SignitError::UnsupportedInput(
            "Not a PDF file (missing %PDF- header)".to_string(),
        ));
    }
    Ok(())
}

/// Page size from the MediaBox, inherited through the page tree if needed
pub(crate) fn page_size(doc: &Document, page_id: ObjectId) -> PageSize {
    let [llx, lly, urx, ury] = find_media_box(doc, page_id).unwrap_or(DEFAULT_MEDIA_BOX);
    PageSize {
        width: (urx - llx).abs(),
        height: (ury - lly).abs(),
        origin_x: llx.min(urx),
        origin_y: lly.min(ury),
    }
}

fn find_media_box(doc: &Document, page_id: ObjectId) -> Option<[f64; 4]> {
    let mut current = Some(page_id);
    // Guard against cyclic Parent chains in damaged files
    let mut depth = 0;
    while let Some(id) = current {
        if depth > 64 {
            return None;
        }
        depth += 1;

        let dict = doc.get_dictionary(id).ok()?;
        if let Some(media_box) = media_box_of(doc, dict) {
            return Some(media_box);
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    None
}

fn media_box_of(doc: &Document, dict: &Dictionary) -> Option<[f64; 4]> {
    let raw = dict.get(b"MediaBox").ok()?;
    let resolved = match raw {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    Some([
        obj_to_f64(&arr[0])?,
        obj_to_f64(&arr[1])?,
        obj_to_f64(&arr[2])?,
        obj_to_f64(&arr[3])?,
    ])
}

pub(crate) fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}
