//! Overlay records and the in-memory overlay store
//!
//! An overlay is a text box or a signature image anchored to one page. Its
//! geometry lives in screen space (pixels at the session render scale); the
//! baker converts it to PDF user space at export time.

use crate::coords::ScreenRect;
use crate::fonts::FontFamily;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque overlay identifier, unique for the lifetime of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayId(pub u64);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay-{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextData {
    pub text: String,
    /// Font size in screen pixels
    pub font_size: f64,
    /// Hex RGB, e.g. "#1e293b"
    pub color: String,
    #[serde(default)]
    pub font_family: FontFamily,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignatureData {
    /// Self-contained encoded image, e.g. `data:image/png;base64,...`
    pub data_url: String,
}

/// Per-type overlay payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum OverlayKind {
    Text(TextData),
    Signature(SignatureData),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayType {
    Text,
    Signature,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Overlay {
    pub id: OverlayId,
    /// 1-based page index
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(flatten)]
    pub kind: OverlayKind,
}

impl Overlay {
    pub fn rect(&self) -> ScreenRect {
        ScreenRect::new(self.x, self.y, self.w, self.h)
    }

    pub fn overlay_type(&self) -> OverlayType {
        match self.kind {
            OverlayKind::Text(_) => OverlayType::Text,
            OverlayKind::Signature(_) => OverlayType::Signature,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, OverlayKind::Text(_))
    }

    pub fn text_data_mut(&mut self) -> Option<&mut TextData> {
        match &mut self.kind {
            OverlayKind::Text(data) => Some(data),
            OverlayKind::Signature(_) => None,
        }
    }
}

/// Flat, insertion-ordered collection of overlays
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlayStore {
    next_id: u64,
    overlays: Vec<Overlay>,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh identifier, skipping ids held by imported overlays
    pub fn next_id(&mut self) -> OverlayId {
        while self.find(OverlayId(self.next_id)).is_some() {
            self.next_id = self.next_id.wrapping_add(1);
        }
        let id = OverlayId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Append an overlay and return the id it is stored under.
    ///
    /// Imported overlays keep their own id unless another overlay already
    /// holds it, in which case they get a fresh one. The id counter is moved
    /// past any kept id.
    pub fn add(&mut self, mut overlay: Overlay) -> OverlayId {
        if self.find(overlay.id).is_some() {
            let fresh = self.next_id();
            tracing::debug!(
                from = %overlay.id,
                to = %fresh,
                "Re-keyed overlay with duplicate id"
            );
            overlay.id = fresh;
        } else if overlay.id.0 >= self.next_id {
            self.next_id = overlay.id.0.saturating_add(1);
        }
        let id = overlay.id;
        self.overlays.push(overlay);
        id
    }

    /// Remove by id. Returns the removed overlay, or `None` if it was absent.
    pub fn remove(&mut self, id: OverlayId) -> Option<Overlay> {
        let pos = self.overlays.iter().position(|o| o.id == id)?;
        Some(self.overlays.remove(pos))
    }

    /// Mutate an overlay in place. Returns false if the id is unknown.
    pub fn update<F>(&mut self, id: OverlayId, mutator: F) -> bool
    where
        F: FnOnce(&mut Overlay),
    {
        match self.overlays.iter_mut().find(|o| o.id == id) {
            Some(overlay) => {
                mutator(overlay);
                true
            }
            None => false,
        }
    }

    pub fn find(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id == id)
    }

    /// Overlays anchored to `page`, in store order
    pub fn by_page(&self, page: u32) -> Vec<&Overlay> {
        self.overlays.iter().filter(|o| o.page == page).collect()
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Drop every overlay. Ids keep counting so stale references never
    /// alias a new overlay.
    pub fn clear(&mut self) {
        self.overlays.clear();
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.overlays)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let overlays: Vec<Overlay> = serde_json::from_str(json)?;
        let mut store = Self::new();
        for overlay in overlays {
            store.add(overlay);
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_overlay(store: &mut OverlayStore, page: u32, text: &str) -> Overlay {
        Overlay {
            id: store.next_id(),
            page,
            x: 80.0,
            y: 80.0,
            w: 180.0,
            h: 36.0,
            kind: OverlayKind::Text(TextData {
                text: text.to_string(),
                font_size: 16.0,
                color: "#000000".to_string(),
                font_family: FontFamily::Helvetica,
                bold: false,
                italic: false,
            }),
        }
    }

    #[test]
    fn test_store_new_is_empty() {
        let store = OverlayStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut store = OverlayStore::new();
        let a = text_overlay(&mut store, 1, "a");
        let b = text_overlay(&mut store, 1, "b");
        let id_a = store.add(a);
        let id_b = store.add(b);
        assert_ne!(id_a, id_b);
    }

    #[test]
    fn test_remove_then_find_reports_not_found() {
        let mut store = OverlayStore::new();
        let overlay = text_overlay(&mut store, 1, "gone");
        let id = store.add(overlay);

        assert!(store.remove(id).is_some());
        assert!(store.find(id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut store = OverlayStore::new();
        let overlay = text_overlay(&mut store, 1, "stay");
        store.add(overlay);

        assert!(store.remove(OverlayId(999)).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_mutates_in_place() {
        let mut store = OverlayStore::new();
        let overlay = text_overlay(&mut store, 1, "before");
        let id = store.add(overlay);

        let updated = store.update(id, |o| {
            o.x = 10.0;
            if let Some(data) = o.text_data_mut() {
                data.text = "after".to_string();
            }
        });
        assert!(updated);

        let overlay = store.find(id).unwrap();
        assert_eq!(overlay.x, 10.0);
        match &overlay.kind {
            OverlayKind::Text(data) => assert_eq!(data.text, "after"),
            OverlayKind::Signature(_) => panic!("Expected text overlay"),
        }
    }

    #[test]
    fn test_update_unknown_id_returns_false() {
        let mut store = OverlayStore::new();
        assert!(!store.update(OverlayId(7), |o| o.x = 1.0));
    }

    #[test]
    fn test_by_page_keeps_store_order() {
        let mut store = OverlayStore::new();
        for (page, text) in [(1, "one"), (2, "two"), (1, "three"), (3, "four")] {
            let overlay = text_overlay(&mut store, page, text);
            store.add(overlay);
        }

        let texts: Vec<String> = store
            .by_page(1)
            .into_iter()
            .map(|o| match &o.kind {
                OverlayKind::Text(data) => data.text.clone(),
                OverlayKind::Signature(_) => String::new(),
            })
            .collect();
        assert_eq!(texts, vec!["one".to_string(), "three".to_string()]);
        assert_eq!(store.by_page(2).len(), 1);
        assert!(store.by_page(9).is_empty());
    }

    #[test]
    fn test_add_with_foreign_id_advances_counter() {
        let mut store = OverlayStore::new();
        let mut overlay = text_overlay(&mut store, 1, "imported");
        overlay.id = OverlayId(41);
        store.add(overlay);
        assert_eq!(store.next_id(), OverlayId(42));
    }

    #[test]
    fn test_duplicate_id_is_rekeyed() {
        let mut store = OverlayStore::new();
        let first = text_overlay(&mut store, 1, "first");
        let first_id = store.add(first);

        let mut clash = text_overlay(&mut store, 1, "clash");
        clash.id = first_id;
        let clash_id = store.add(clash);

        assert_ne!(clash_id, first_id);
        assert_eq!(store.len(), 2);
        assert_eq!(store.overlays().iter().filter(|o| o.id == first_id).count(), 1);

        store.remove(first_id);
        assert!(store.find(first_id).is_none());
        assert!(store.find(clash_id).is_some());
    }

    #[test]
    fn test_max_id_does_not_overflow_counter() {
        let mut store = OverlayStore::new();
        let mut overlay = text_overlay(&mut store, 1, "last");
        overlay.id = OverlayId(u64::MAX);
        store.add(overlay);

        let fresh = store.next_id();
        assert_ne!(fresh, OverlayId(u64::MAX));
        assert!(store.find(fresh).is_none());
    }

    #[test]
    fn test_from_json_keeps_ids_unique() {
        let json = r##"[
            {"id":1,"type":"signature","page":1,"x":0,"y":0,"w":10,"h":10,
             "data":{"dataUrl":"data:image/png;base64,AAAA"}},
            {"id":1,"type":"signature","page":2,"x":0,"y":0,"w":10,"h":10,
             "data":{"dataUrl":"data:image/png;base64,AAAA"}}
        ]"##;
        let store = OverlayStore::from_json(json).unwrap();

        let ids: Vec<OverlayId> = store.overlays().iter().map(|o| o.id).collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(ids[0], OverlayId(1));
    }

    #[test]
    fn test_json_wire_shape() {
        let json = r##"[
            {"id":3,"type":"text","page":1,"x":80,"y":80,"w":180,"h":36,
             "data":{"text":"Texte","fontSize":16,"color":"#000000",
                     "fontFamily":"Times-Roman","bold":true,"italic":false}},
            {"id":4,"type":"signature","page":2,"x":60,"y":120,"w":220,"h":80,
             "data":{"dataUrl":"data:image/png;base64,AAAA"}}
        ]"##;
        let store = OverlayStore::from_json(json).unwrap();
        assert_eq!(store.len(), 2);

        let text = store.find(OverlayId(3)).unwrap();
        assert_eq!(text.overlay_type(), OverlayType::Text);
        assert_eq!(text.rect(), ScreenRect::new(80.0, 80.0, 180.0, 36.0));
        match &text.kind {
            OverlayKind::Text(data) => {
                assert_eq!(data.font_family, FontFamily::TimesRoman);
                assert!(data.bold);
                assert_eq!(data.font_size, 16.0);
            }
            OverlayKind::Signature(_) => panic!("Expected text overlay"),
        }

        let sig = store.find(OverlayId(4)).unwrap();
        assert_eq!(sig.overlay_type(), OverlayType::Signature);
        assert_eq!(sig.page, 2);

        let restored = OverlayStore::from_json(&store.to_json().unwrap()).unwrap();
        assert_eq!(restored.overlays(), store.overlays());
    }

    #[test]
    fn test_clear_keeps_id_counter() {
        let mut store = OverlayStore::new();
        let overlay = text_overlay(&mut store, 1, "x");
        let id = store.add(overlay);
        store.clear();
        assert!(store.is_empty());
        assert!(store.next_id() > id);
    }
}
