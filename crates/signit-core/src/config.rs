//! Editor configuration
//!
//! TOML-backed settings for the render scale, text layout and the defaults
//! applied to newly created overlays. Every field has a default, so an empty
//! file (or no file at all) yields the stock editor behaviour.

use crate::coords::ScreenRect;
use crate::error::SignitError;
use crate::fonts::FontFamily;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EditorConfig {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub text: TextConfig,
    #[serde(default)]
    pub signature: SignatureConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl EditorConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `SignitError::Config` if the file cannot be read or the TOML
    /// is malformed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SignitError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SignitError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use signit_core::config::EditorConfig;
    ///
    /// let config = EditorConfig::from_str("[render]\nscale = 2.0\n").unwrap();
    /// assert_eq!(config.render.scale, 2.0);
    /// assert_eq!(config.text.line_height, 1.2);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, SignitError> {
        let config: Self = toml::from_str(s)
            .map_err(|e| SignitError::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), SignitError> {
        if !(self.render.scale.is_finite() && self.render.scale > 0.0) {
            return Err(SignitError::Config(format!(
                "render.scale must be positive, got {}",
                self.render.scale
            )));
        }
        if !(self.text.line_height.is_finite() && self.text.line_height > 0.0) {
            return Err(SignitError::Config(format!(
                "text.line_height must be positive, got {}",
                self.text.line_height
            )));
        }
        for (name, value) in [
            ("limits.min_width", self.limits.min_width),
            ("limits.min_height", self.limits.min_height),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SignitError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Preview render settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    /// Ratio between on-screen pixels and PDF user-space units
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
        }
    }
}

fn default_scale() -> f64 {
    1.5
}

/// Text overlay defaults and baking layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextConfig {
    /// Baseline step as a multiple of the font size
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    /// Left inset of the first glyph, in screen pixels
    #[serde(default = "default_inset_left")]
    pub inset_left_px: f64,
    /// Top inset of the first baseline, in screen pixels
    #[serde(default = "default_inset_top")]
    pub inset_top_px: f64,
    #[serde(default = "default_text_rect")]
    pub default_rect: ScreenRect,
    #[serde(default = "default_text_content")]
    pub default_text: String,
    #[serde(default = "default_font_size")]
    pub default_font_size: f64,
    #[serde(default = "default_color")]
    pub default_color: String,
    #[serde(default)]
    pub default_font_family: FontFamily,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            line_height: default_line_height(),
            inset_left_px: default_inset_left(),
            inset_top_px: default_inset_top(),
            default_rect: default_text_rect(),
            default_text: default_text_content(),
            default_font_size: default_font_size(),
            default_color: default_color(),
            default_font_family: FontFamily::default(),
        }
    }
}

fn default_line_height() -> f64 {
    1.2
}

fn default_inset_left() -> f64 {
    4.0
}

fn default_inset_top() -> f64 {
    2.0
}

fn default_text_rect() -> ScreenRect {
    ScreenRect::new(80.0, 80.0, 180.0, 36.0)
}

fn default_text_content() -> String {
    "Texte".to_string()
}

fn default_font_size() -> f64 {
    16.0
}

fn default_color() -> String {
    "#000000".to_string()
}

/// Signature overlay defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignatureConfig {
    #[serde(default = "default_signature_rect")]
    pub default_rect: ScreenRect,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            default_rect: default_signature_rect(),
        }
    }
}

fn default_signature_rect() -> ScreenRect {
    ScreenRect::new(60.0, 120.0, 220.0, 80.0)
}

/// Minimum overlay size enforced while resizing, in screen pixels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitsConfig {
    #[serde(default = "default_min_width")]
    pub min_width: f64,
    #[serde(default = "default_min_height")]
    pub min_height: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_width: default_min_width(),
            min_height: default_min_height(),
        }
    }
}

fn default_min_width() -> f64 {
    40.0
}

fn default_min_height() -> f64 {
    20.0
}
