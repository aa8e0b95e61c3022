//! Editing session context
//!
//! [`EditorSession`] owns everything one editing session touches: the loaded
//! document, the render scale, the overlay store, the selection, the current
//! page and the pointer state. Every operation goes through it, and
//! listeners learn about changes through [`SessionEvent`]s.

use crate::bake::{bake, TextLayout};
use crate::config::EditorConfig;
use crate::document::LoadedDocument;
use crate::error::SignitError;
use crate::events::{EventBus, SessionEvent};
use crate::fonts::FontFamily;
use crate::interaction::{InteractionController, Point, PointerState, SurfaceSize};
use crate::overlay::{Overlay, OverlayId, OverlayKind, OverlayStore, SignatureData, TextData};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Keyboard input the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Delete,
    Escape,
}

#[derive(Debug)]
pub struct EditorSession {
    config: EditorConfig,
    scale: f64,
    document: Option<LoadedDocument>,
    store: OverlayStore,
    selection: Option<OverlayId>,
    current_page: u32,
    controller: InteractionController,
    events: EventBus,
    export_slot: Arc<AtomicBool>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            scale: config.render.scale,
            controller: InteractionController::new(config.limits.clone()),
            config,
            document: None,
            store: OverlayStore::new(),
            selection: None,
            current_page: 1,
            events: EventBus::new(),
            export_slot: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.document.as_ref()
    }

    pub fn store(&self) -> &OverlayStore {
        &self.store
    }

    pub fn find(&self, id: OverlayId) -> Option<&Overlay> {
        self.store.find(id)
    }

    pub fn selection(&self) -> Option<OverlayId> {
        self.selection
    }

    /// 1-based current page
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map_or(0, LoadedDocument::page_count)
    }

    pub fn pointer_state(&self) -> PointerState {
        self.controller.state()
    }

    // ---- Document ----

    /// Replace the document under edit, using the configured render scale
    pub fn load_document(&mut self, bytes: &[u8]) -> Result<u32, SignitError> {
        let scale = self.config.render.scale;
        self.load_document_at_scale(bytes, scale)
    }

    /// Replace the document under edit.
    ///
    /// The input is fully validated first; on failure the session keeps its
    /// previous document, overlays and selection. On success the overlay
    /// store is emptied, the selection cleared and page 1 shown.
    pub fn load_document_at_scale(
        &mut self,
        bytes: &[u8],
        scale: f64,
    ) -> Result<u32, SignitError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(SignitError::Config(format!(
                "Render scale must be positive, got {}",
                scale
            )));
        }
        let document = LoadedDocument::load(bytes).map_err(|e| {
            tracing::warn!(error = %e, "Document rejected");
            e
        })?;
        let total = document.page_count();

        self.document = Some(document);
        self.scale = scale;
        self.store.clear();
        self.controller.end();
        if self.selection.take().is_some() {
            self.events.emit(SessionEvent::PanelHidden);
        }
        self.current_page = 1;

        tracing::info!(pages = total, scale, bytes = bytes.len(), "Document loaded");
        self.events.emit(SessionEvent::PageChanged { page: 1, total });
        self.events.emit(SessionEvent::Rerender { page: 1 });
        Ok(total)
    }

    /// Rendered size of the current page at the session scale
    pub fn surface_size(&self) -> Option<SurfaceSize> {
        let index = self.current_page.checked_sub(1)? as usize;
        let size = self.document.as_ref()?.page_size(index)?;
        Some(SurfaceSize {
            width: size.width * self.scale,
            height: size.height * self.scale,
        })
    }

    // ---- Overlays ----

    /// Append an overlay and select it
    pub fn add_overlay(&mut self, overlay: Overlay) -> OverlayId {
        let id = self.store.add(overlay);
        self.events.emit(SessionEvent::Rerender {
            page: self.current_page,
        });
        self.select(id);
        id
    }

    /// New text overlay on the current page with the configured defaults
    pub fn add_text_overlay(&mut self) -> OverlayId {
        let defaults = &self.config.text;
        let rect = defaults.default_rect;
        let overlay = Overlay {
            id: self.store.next_id(),
            page: self.current_page,
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            kind: OverlayKind::Text(TextData {
                text: defaults.default_text.clone(),
                font_size: defaults.default_font_size,
                color: defaults.default_color.clone(),
                font_family: defaults.default_font_family,
                bold: false,
                italic: false,
            }),
        };
        self.add_overlay(overlay)
    }

    /// New signature overlay on the current page. An empty capture is
    /// rejected.
    pub fn add_signature_overlay(&mut self, data_url: &str) -> Option<OverlayId> {
        if data_url.trim().is_empty() {
            tracing::warn!("Ignoring empty signature");
            return None;
        }
        let rect = self.config.signature.default_rect;
        let overlay = Overlay {
            id: self.store.next_id(),
            page: self.current_page,
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            kind: OverlayKind::Signature(SignatureData {
                data_url: data_url.to_string(),
            }),
        };
        Some(self.add_overlay(overlay))
    }

    /// Add previously saved overlays without touching the selection. An
    /// overlay whose id is already in use is stored under a fresh id.
    pub fn import_overlays<I>(&mut self, overlays: I) -> usize
    where
        I: IntoIterator<Item = Overlay>,
    {
        let mut count = 0;
        for overlay in overlays {
            self.store.add(overlay);
            count += 1;
        }
        tracing::debug!(count, "Overlays imported");
        self.events.emit(SessionEvent::Rerender {
            page: self.current_page,
        });
        count
    }

    /// Remove an overlay. Unknown ids are a no-op and return false.
    pub fn remove(&mut self, id: OverlayId) -> bool {
        if self.store.remove(id).is_none() {
            return false;
        }
        if self.controller.active_overlay() == Some(id) {
            self.controller.end();
        }
        if self.selection == Some(id) {
            self.selection = None;
            self.events.emit(SessionEvent::PanelHidden);
        }
        self.events.emit(SessionEvent::Rerender {
            page: self.current_page,
        });
        true
    }

    /// Overlays on the current page, in store order
    pub fn visible_overlays(&self) -> Vec<&Overlay> {
        self.store.by_page(self.current_page)
    }

    // ---- Selection ----

    /// Select an overlay. The style panel follows the overlay type.
    pub fn select(&mut self, id: OverlayId) -> bool {
        let Some(overlay) = self.store.find(id) else {
            return false;
        };
        let event = if overlay.is_text() {
            SessionEvent::PanelShown(id)
        } else {
            SessionEvent::PanelHidden
        };
        self.selection = Some(id);
        self.events.emit(event);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.events.emit(SessionEvent::PanelHidden);
    }

    /// Closing the style panel drops the selection with it
    pub fn close_panel(&mut self) {
        self.clear_selection();
    }

    /// Returns true if the key did something
    pub fn handle_key(&mut self, key: Key) -> bool {
        match key {
            Key::ArrowLeft => self.previous_page(),
            Key::ArrowRight => self.next_page(),
            Key::Delete => match self.selection {
                Some(id) => self.remove(id),
                None => false,
            },
            Key::Escape => {
                self.clear_selection();
                true
            }
        }
    }

    // ---- Pointer ----

    /// Pointer press on empty canvas
    pub fn press_canvas(&mut self) {
        self.clear_selection();
    }

    /// Pointer press on an overlay body: select it and start dragging
    pub fn press_overlay(&mut self, id: OverlayId, pointer: Point) -> bool {
        if !self.select(id) {
            return false;
        }
        self.controller.begin_drag(&self.store, id, pointer)
    }

    /// Pointer press on an overlay's resize handle
    pub fn press_resize_handle(&mut self, id: OverlayId, pointer: Point) -> bool {
        self.controller.begin_resize(&self.store, id, pointer)
    }

    /// Forward a pointer move to the active drag or resize
    pub fn pointer_move(&mut self, pointer: Point) -> bool {
        match self.controller.state() {
            PointerState::Idle => false,
            PointerState::Dragging { .. } => match self.surface_size() {
                Some(surface) => self.controller.drag_to(&mut self.store, pointer, surface),
                None => false,
            },
            PointerState::Resizing { .. } => self.controller.resize_to(&mut self.store, pointer),
        }
    }

    pub fn pointer_up(&mut self) -> Option<OverlayId> {
        self.controller.end()
    }

    // ---- Text properties ----

    fn edit_text<F>(&mut self, id: OverlayId, edit: F) -> bool
    where
        F: FnOnce(&mut TextData),
    {
        let mut applied = false;
        self.store.update(id, |overlay| {
            if let Some(data) = overlay.text_data_mut() {
                edit(data);
                applied = true;
            }
        });
        if applied {
            self.events.emit(SessionEvent::Rerender {
                page: self.current_page,
            });
        }
        applied
    }

    pub fn set_text(&mut self, id: OverlayId, text: &str) -> bool {
        self.edit_text(id, |data| data.text = text.to_string())
    }

    pub fn set_font_family(&mut self, id: OverlayId, family: FontFamily) -> bool {
        self.edit_text(id, |data| data.font_family = family)
    }

    /// Non-positive or non-finite sizes are ignored
    pub fn set_font_size(&mut self, id: OverlayId, font_size: f64) -> bool {
        if !(font_size.is_finite() && font_size > 0.0) {
            tracing::debug!(%id, font_size, "Ignoring invalid font size");
            return false;
        }
        self.edit_text(id, |data| data.font_size = font_size)
    }

    pub fn set_color(&mut self, id: OverlayId, color: &str) -> bool {
        self.edit_text(id, |data| data.color = color.to_string())
    }

    pub fn toggle_bold(&mut self, id: OverlayId) -> bool {
        self.edit_text(id, |data| data.bold = !data.bold)
    }

    pub fn toggle_italic(&mut self, id: OverlayId) -> bool {
        self.edit_text(id, |data| data.italic = !data.italic)
    }

    // ---- Navigation ----

    /// Show `page` (1-based). Out-of-range requests are ignored.
    pub fn go_to_page(&mut self, page: u32) -> bool {
        let total = self.page_count();
        if page < 1 || page > total {
            return false;
        }
        self.controller.end();
        self.current_page = page;
        self.events.emit(SessionEvent::PageChanged { page, total });
        self.events.emit(SessionEvent::Rerender { page });
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> bool {
        self.go_to_page(self.current_page.saturating_sub(1))
    }

    // ---- Export ----

    pub fn is_exporting(&self) -> bool {
        self.export_slot.load(Ordering::Acquire)
    }

    /// Snapshot the session for export.
    ///
    /// Only one job may exist at a time; the slot is released when the job
    /// is dropped, whether it ran or not.
    pub fn begin_export(&self) -> Result<ExportJob, SignitError> {
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| SignitError::ExportFailure("No document loaded".to_string()))?;

        if self
            .export_slot
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Export requested while another is running");
            return Err(SignitError::ExportInProgress);
        }

        Ok(ExportJob {
            source: document.shared_bytes(),
            overlays: self.store.overlays().to_vec(),
            scale: self.scale,
            layout: TextLayout::from(&self.config.text),
            events: self.events.clone(),
            _guard: ExportGuard {
                slot: Arc::clone(&self.export_slot),
            },
        })
    }

    /// Bake the current overlays into a new copy of the document
    pub fn export(&self) -> Result<Vec<u8>, SignitError> {
        self.begin_export()?.run()
    }
}

/// Releases the export slot on drop
#[derive(Debug)]
struct ExportGuard {
    slot: Arc<AtomicBool>,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::Release);
    }
}

/// Self-contained export snapshot, independent of the session that made it
#[derive(Debug)]
pub struct ExportJob {
    source: Arc<[u8]>,
    overlays: Vec<Overlay>,
    scale: f64,
    layout: TextLayout,
    events: EventBus,
    _guard: ExportGuard,
}

impl ExportJob {
    /// Bake the snapshot. Consumes the job, freeing the export slot.
    pub fn run(mut self) -> Result<Vec<u8>, SignitError> {
        let result = bake(&self.source, &self.overlays, self.scale, &self.layout);
        match &result {
            Ok(bytes) => self.events.emit(SessionEvent::Exported { bytes: bytes.len() }),
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                self.events.emit(SessionEvent::ExportFailed {
                    reason: e.to_string(),
                });
            }
        }
        result
    }
}
