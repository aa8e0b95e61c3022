//! Signature image decoding
//!
//! Signatures arrive as `data:image/png;base64,...` URLs. They are decoded to
//! 8-bit samples and written as an image XObject whose colour channels are
//! Flate-compressed; an alpha channel becomes a soft mask.

use crate::error::SignitError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Document, ObjectId, Stream};
use std::io::{Cursor, Write};

/// Decoded raster ready for embedding
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub color: ColorChannels,
    /// One 8-bit alpha sample per pixel, if the source had transparency
    pub alpha: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColorChannels {
    Gray(Vec<u8>),
    Rgb(Vec<u8>),
}

impl ColorChannels {
    fn color_space(&self) -> &'static str {
        match self {
            ColorChannels::Gray(_) => "DeviceGray",
            ColorChannels::Rgb(_) => "DeviceRGB",
        }
    }

    fn samples(&self) -> &[u8] {
        match self {
            ColorChannels::Gray(s) | ColorChannels::Rgb(s) => s,
        }
    }
}

/// Extract the raw bytes from a base64 data URL
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, SignitError> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| SignitError::ExportFailure("Malformed image data URL".to_string()))?;

    if !header.starts_with("data:") || !header.ends_with(";base64") {
        return Err(SignitError::ExportFailure(format!(
            "Unsupported image data URL header: {}",
            header
        )));
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| SignitError::ExportFailure(format!("Invalid base64 image data: {}", e)))
}

/// Decode PNG bytes to 8-bit gray or RGB samples plus optional alpha
pub fn decode_png(bytes: &[u8]) -> Result<RasterImage, SignitError> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);

    let mut reader = decoder
        .read_info()
        .map_err(|e| SignitError::ExportFailure(format!("Invalid PNG image: {}", e)))?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buf)
        .map_err(|e| SignitError::ExportFailure(format!("Failed to decode PNG: {}", e)))?;
    let data = &buf[..frame.buffer_size()];

    let (width, height) = (frame.width, frame.height);
    let pixels = width as usize * height as usize;

    let (color, alpha) = match frame.color_type {
        png::ColorType::Grayscale => (ColorChannels::Gray(data.to_vec()), None),
        png::ColorType::Rgb => (ColorChannels::Rgb(data.to_vec()), None),
        png::ColorType::GrayscaleAlpha => {
            let mut gray = Vec::with_capacity(pixels);
            let mut alpha = Vec::with_capacity(pixels);
            for px in data.chunks_exact(2) {
                gray.push(px[0]);
                alpha.push(px[1]);
            }
            (ColorChannels::Gray(gray), Some(alpha))
        }
        png::ColorType::Rgba => {
            let mut rgb = Vec::with_capacity(pixels * 3);
            let mut alpha = Vec::with_capacity(pixels);
            for px in data.chunks_exact(4) {
                rgb.extend_from_slice(&px[..3]);
                alpha.push(px[3]);
            }
            (ColorChannels::Rgb(rgb), Some(alpha))
        }
        png::ColorType::Indexed => {
            return Err(SignitError::ExportFailure(
                "Palette PNG was not expanded".to_string(),
            ))
        }
    };

    Ok(RasterImage {
        width,
        height,
        color,
        alpha,
    })
}

/// Decode a signature data URL in one step
pub fn decode_signature(data_url: &str) -> Result<RasterImage, SignitError> {
    let bytes = decode_data_url(data_url)?;
    decode_png(&bytes)
}

/// Add the image (and its soft mask) to `doc`, returning the image XObject id
pub fn embed_image(doc: &mut Document, image: &RasterImage) -> Result<ObjectId, SignitError> {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width as i64,
        "Height" => image.height as i64,
        "ColorSpace" => image.color.color_space(),
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };

    if let Some(alpha) = &image.alpha {
        let smask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            deflate(alpha)?,
        );
        let smask_id = doc.add_object(smask);
        dict.set("SMask", smask_id);
    }

    let stream = Stream::new(dict, deflate(image.color.samples())?);
    Ok(doc.add_object(stream))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, SignitError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SignitError::ExportFailure(format!("Image compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| SignitError::ExportFailure(format!("Image compression failed: {}", e)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a small PNG and wrap it in a data URL
    pub(crate) fn png_data_url(width: u32, height: u32, color: png::ColorType) -> String {
        let channels = match color {
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            png::ColorType::Indexed => panic!("indexed test images are not supported"),
        };
        let data: Vec<u8> = (0..width * height * channels)
            .map(|i| (i % 251) as u8)
            .collect();

        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, width, height);
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&data).unwrap();
        }
        format!("data:image/png;base64,{}", STANDARD.encode(&bytes))
    }

    #[test]
    fn test_decode_rgba_splits_alpha() {
        let url = png_data_url(4, 3, png::ColorType::Rgba);
        let image = decode_signature(&url).unwrap();

        assert_eq!((image.width, image.height), (4, 3));
        match &image.color {
            ColorChannels::Rgb(rgb) => assert_eq!(rgb.len(), 4 * 3 * 3),
            ColorChannels::Gray(_) => panic!("Expected RGB channels"),
        }
        assert_eq!(image.alpha.as_ref().map(Vec::len), Some(12));
        // Fourth byte of the first pixel is its alpha
        assert_eq!(image.alpha.as_ref().unwrap()[0], 3);
    }

    #[test]
    fn test_decode_gray_has_no_alpha() {
        let url = png_data_url(2, 2, png::ColorType::Grayscale);
        let image = decode_signature(&url).unwrap();
        assert!(image.alpha.is_none());
        assert_eq!(image.color, ColorChannels::Gray(vec![0, 1, 2, 3]));
    }

    #[test]
    fn test_rejects_malformed_data_urls() {
        assert!(matches!(
            decode_data_url("no comma here"),
            Err(SignitError::ExportFailure(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/png,rawbytes"),
            Err(SignitError::ExportFailure(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,!!!"),
            Err(SignitError::ExportFailure(_))
        ));
    }

    #[test]
    fn test_rejects_non_png_payload() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(b"GIF89a...."));
        assert!(matches!(
            decode_signature(&url),
            Err(SignitError::ExportFailure(_))
        ));
    }

    #[test]
    fn test_embed_image_with_soft_mask() {
        let image = decode_signature(&png_data_url(5, 5, png::ColorType::Rgba)).unwrap();
        let mut doc = Document::with_version("1.7");

        let id = embed_image(&mut doc, &image).unwrap();
        assert_eq!(doc.objects.len(), 2);

        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(
            stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceRGB"
        );
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 5);
        assert!(stream.dict.get(b"SMask").unwrap().as_reference().is_ok());
        assert_eq!(stream.decompressed_content().unwrap().len(), 5 * 5 * 3);
    }
}
