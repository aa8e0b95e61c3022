//! PDF text and signature overlay editing
//!
//! Overlays (text boxes and signature images) are placed on a rendered page
//! in screen pixels and baked permanently into the page content on export.
//!
//! - [`session::EditorSession`] is the entry point: document loading,
//!   overlay creation and editing, selection, pointer handling, page
//!   navigation and export.
//! - [`bake::bake`] is the export algorithm on its own, for callers that
//!   manage overlays themselves.

pub mod bake;
pub mod config;
pub mod coords;
pub mod document;
pub mod error;
pub mod events;
pub mod fonts;
pub mod image;
pub mod interaction;
pub mod overlay;
pub mod session;

pub use bake::{bake, TextLayout};
pub use config::EditorConfig;
pub use coords::{PdfRect, ScreenRect};
pub use document::{LoadedDocument, PageSize};
pub use error::SignitError;
pub use events::SessionEvent;
pub use fonts::FontFamily;
pub use interaction::{Point, SurfaceSize};
pub use overlay::{Overlay, OverlayId, OverlayKind, OverlayStore, SignatureData, TextData};
pub use session::{EditorSession, ExportJob, Key};
