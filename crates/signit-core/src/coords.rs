//! Coordinate transformation between the preview surface and PDF user space
//!
//! Screen space has its origin at the top-left of the rendered page with y
//! growing downward, measured in pixels at the session render scale. PDF user
//! space has its origin at the bottom-left with y growing upward.

use serde::{Deserialize, Serialize};

/// Rectangle on the rendered preview, top-left anchored, in pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl ScreenRect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }
}

/// Rectangle in PDF user space, bottom-left anchored, in points
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PdfRect {
    /// Top edge in user space
    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// Shift by a page's MediaBox origin
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }
}

/// Convert a screen-space rectangle to PDF user space for a page of the
/// given user-space height.
pub fn screen_to_pdf(rect: &ScreenRect, scale: f64, page_height: f64) -> PdfRect {
    let width = rect.w / scale;
    let height = rect.h / scale;
    PdfRect {
        x: rect.x / scale,
        y: page_height - (rect.y / scale) - height,
        width,
        height,
    }
}

/// Algebraic inverse of [`screen_to_pdf`]
pub fn pdf_to_screen(rect: &PdfRect, scale: f64, page_height: f64) -> ScreenRect {
    ScreenRect {
        x: rect.x * scale,
        y: (page_height - rect.y - rect.height) * scale,
        w: rect.width * scale,
        h: rect.height * scale,
    }
}

/// Convert a screen-space length (font size, inset) to user-space units
pub fn screen_to_pdf_length(px: f64, scale: f64) -> f64 {
    px / scale
}
