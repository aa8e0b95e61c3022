//! Standard font resolution and text encoding
//!
//! Text overlays are drawn with the twelve non-symbolic standard Type 1
//! fonts (Helvetica, Times and Courier in four faces each). These need no
//! embedded font program; a small font dictionary with `WinAnsiEncoding` is
//! enough, which limits drawable text to the single-byte western repertoire.

use lopdf::{dictionary, Document, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Font family selectable on a text overlay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FontFamily {
    #[default]
    Helvetica,
    TimesRoman,
    Courier,
}

impl FontFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontFamily::Helvetica => "Helvetica",
            FontFamily::TimesRoman => "Times-Roman",
            FontFamily::Courier => "Courier",
        }
    }

    /// Parse a family name. Anything outside the three standard families
    /// falls back to Helvetica.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Helvetica" => FontFamily::Helvetica,
            "Times-Roman" => FontFamily::TimesRoman,
            "Courier" => FontFamily::Courier,
            other => {
                tracing::debug!(family = other, "Unknown font family, using Helvetica");
                FontFamily::Helvetica
            }
        }
    }
}

impl From<String> for FontFamily {
    fn from(name: String) -> Self {
        FontFamily::from_name(&name)
    }
}

impl From<FontFamily> for String {
    fn from(family: FontFamily) -> Self {
        family.as_str().to_string()
    }
}

/// One of the twelve standard faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// Pick the face for a family and weight/style flags
    pub fn resolve(family: FontFamily, bold: bool, italic: bool) -> Self {
        match family {
            FontFamily::TimesRoman => match (bold, italic) {
                (true, true) => StandardFont::TimesBoldItalic,
                (true, false) => StandardFont::TimesBold,
                (false, true) => StandardFont::TimesItalic,
                (false, false) => StandardFont::TimesRoman,
            },
            FontFamily::Helvetica => match (bold, italic) {
                (true, true) => StandardFont::HelveticaBoldOblique,
                (true, false) => StandardFont::HelveticaBold,
                (false, true) => StandardFont::HelveticaOblique,
                (false, false) => StandardFont::Helvetica,
            },
            FontFamily::Courier => match (bold, italic) {
                (true, true) => StandardFont::CourierBoldOblique,
                (true, false) => StandardFont::CourierBold,
                (false, true) => StandardFont::CourierOblique,
                (false, false) => StandardFont::Courier,
            },
        }
    }

    /// PostScript name written as `/BaseFont`
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
        }
    }
}

/// Font dictionaries embedded during one export.
///
/// The object ids belong to the document the cache was filled against, so a
/// cache must never outlive the export that created it.
#[derive(Debug, Default)]
pub struct FontCache {
    embedded: HashMap<StandardFont, ObjectId>,
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Object id of the font dictionary for `font`, adding it to `doc` on
    /// first use.
    pub fn get_or_embed(&mut self, doc: &mut Document, font: StandardFont) -> ObjectId {
        *self.embedded.entry(font).or_insert_with(|| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            })
        })
    }

    pub fn len(&self) -> usize {
        self.embedded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embedded.is_empty()
    }
}

/// Map a character to its WinAnsiEncoding byte, if it has one
pub fn winansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => match c {
            '\u{20AC}' => Some(0x80),
            '\u{201A}' => Some(0x82),
            '\u{0192}' => Some(0x83),
            '\u{201E}' => Some(0x84),
            '\u{2026}' => Some(0x85),
            '\u{2020}' => Some(0x86),
            '\u{2021}' => Some(0x87),
            '\u{02C6}' => Some(0x88),
            '\u{2030}' => Some(0x89),
            '\u{0160}' => Some(0x8A),
            '\u{2039}' => Some(0x8B),
            '\u{0152}' => Some(0x8C),
            '\u{017D}' => Some(0x8E),
            '\u{2018}' => Some(0x91),
            '\u{2019}' => Some(0x92),
            '\u{201C}' => Some(0x93),
            '\u{201D}' => Some(0x94),
            '\u{2022}' => Some(0x95),
            '\u{2013}' => Some(0x96),
            '\u{2014}' => Some(0x97),
            '\u{02DC}' => Some(0x98),
            '\u{2122}' => Some(0x99),
            '\u{0161}' => Some(0x9A),
            '\u{203A}' => Some(0x9B),
            '\u{0153}' => Some(0x9C),
            '\u{017E}' => Some(0x9E),
            '\u{0178}' => Some(0x9F),
            _ => None,
        },
    }
}

/// Replace every character the standard fonts cannot encode with `?`.
///
/// Line breaks pass through untouched so the caller can still split the
/// result into lines.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c == '\n' || winansi_byte(c).is_some() {
                c
            } else {
                '?'
            }
        })
        .collect()
}

/// Encode a single line as WinAnsi bytes, substituting `?` for anything
/// unencodable.
pub fn encode_line(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| winansi_byte(c).unwrap_or(b'?'))
        .collect()
}
