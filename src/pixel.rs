use crate::{reader::AseReader, AsepriteError, ColorPalette, PixelFormat, Result};
use image::{Rgba, RgbaImage};
use std::io::Read;

// From Aseprite file spec:
// PIXEL: One pixel, depending on the image pixel format:
// Grayscale: BYTE[2], each pixel have 2 bytes in the order Value, Alpha.
// Indexed: BYTE, Each pixel uses 1 byte (the index).
// RGBA: BYTE[4], each pixel have 4 bytes in this order Red, Green, Blue, Alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Grayscale {
    value: u8,
    alpha: u8,
}

impl Grayscale {
    fn as_rgba(&self) -> Rgba<u8> {
        Rgba([self.value, self.value, self.value, self.alpha])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Indexed(u8);

impl Indexed {
    pub(crate) fn value(&self) -> u8 {
        self.0
    }
}

/// Everything needed to turn a palette index into a color.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexResolver<'a> {
    pub palette: Option<&'a ColorPalette>,
    pub transparent_color_index: u8,
    pub layer_is_background: bool,
}

impl<'a> IndexResolver<'a> {
    fn resolve(&self, pixel: Indexed) -> Result<Rgba<u8>> {
        let palette = self.palette.ok_or_else(|| {
            AsepriteError::InvalidInput("No palette present for indexed pixel data".into())
        })?;
        let index = pixel.value();
        if index == self.transparent_color_index && !self.layer_is_background {
            return Ok(Rgba([0, 0, 0, 0]));
        }
        palette
            .get(index as u32)
            .map(|c| Rgba(c.raw_rgba8()))
            .ok_or_else(|| {
                AsepriteError::InvalidInput(format!(
                    "Index out of range: {} (max: {})",
                    index,
                    palette.num_colors()
                ))
            })
    }
}

fn output_size(pixel_format: PixelFormat, expected_pixel_count: usize) -> usize {
    pixel_format.bytes_per_pixel() * expected_pixel_count
}

/// Pixel data in the color depth of the file, before palette resolution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Pixels {
    Rgba(Vec<Rgba<u8>>),
    Grayscale(Vec<Grayscale>),
    Indexed(Vec<Indexed>),
}

impl Pixels {
    fn from_bytes(bytes: Vec<u8>, pixel_format: PixelFormat) -> Result<Self> {
        match pixel_format {
            PixelFormat::Indexed { .. } => {
                let pixels = bytes.into_iter().map(Indexed).collect();
                Ok(Self::Indexed(pixels))
            }
            PixelFormat::Grayscale => {
                if bytes.len() % 2 != 0 {
                    return Err(AsepriteError::InvalidInput(
                        "Incorrect length of bytes for Grayscale image data".to_string(),
                    ));
                }
                let pixels = bytes
                    .chunks_exact(2)
                    .map(|c| Grayscale {
                        value: c[0],
                        alpha: c[1],
                    })
                    .collect();
                Ok(Self::Grayscale(pixels))
            }
            PixelFormat::Rgba => {
                if bytes.len() % 4 != 0 {
                    return Err(AsepriteError::InvalidInput(
                        "Incorrect length of bytes for RGBA image data".to_string(),
                    ));
                }
                let pixels = bytes
                    .chunks_exact(4)
                    .map(|c| Rgba([c[0], c[1], c[2], c[3]]))
                    .collect();
                Ok(Self::Rgba(pixels))
            }
        }
    }

    pub(crate) fn from_raw<T: Read>(
        mut reader: AseReader<T>,
        pixel_format: PixelFormat,
        expected_pixel_count: usize,
    ) -> Result<Self> {
        let expected_output_size = output_size(pixel_format, expected_pixel_count);
        reader
            .take_bytes(expected_output_size)
            .and_then(|bytes| Self::from_bytes(bytes, pixel_format))
    }

    pub(crate) fn from_compressed<T: Read>(
        reader: AseReader<T>,
        pixel_format: PixelFormat,
        expected_pixel_count: usize,
    ) -> Result<Self> {
        let expected_output_size = output_size(pixel_format, expected_pixel_count);
        reader
            .unzip(expected_output_size)
            .and_then(|bytes| Self::from_bytes(bytes, pixel_format))
    }

    pub(crate) fn pixel_count(&self) -> usize {
        match self {
            Pixels::Rgba(v) => v.len(),
            Pixels::Grayscale(v) => v.len(),
            Pixels::Indexed(v) => v.len(),
        }
    }

    pub(crate) fn byte_count(&self) -> usize {
        match self {
            Pixels::Rgba(v) => v.len() * 4,
            Pixels::Grayscale(v) => v.len() * 2,
            Pixels::Indexed(v) => v.len(),
        }
    }

    /// Resolve into 8-bit RGBA. The resolver is only consulted for indexed
    /// pixels.
    pub(crate) fn to_image(
        &self,
        width: u32,
        height: u32,
        resolver: &IndexResolver,
    ) -> Result<RgbaImage> {
        if width as usize * height as usize != self.pixel_count() {
            return Err(AsepriteError::InternalError(format!(
                "Image size {}x{} does not match pixel count {}",
                width,
                height,
                self.pixel_count()
            )));
        }
        let mut raw = Vec::with_capacity(self.pixel_count() * 4);
        match self {
            Pixels::Rgba(pixels) => {
                for px in pixels {
                    raw.extend_from_slice(&px.0);
                }
            }
            Pixels::Grayscale(pixels) => {
                for px in pixels {
                    raw.extend_from_slice(&px.as_rgba().0);
                }
            }
            Pixels::Indexed(pixels) => {
                for px in pixels {
                    raw.extend_from_slice(&resolver.resolve(*px)?.0);
                }
            }
        }
        RgbaImage::from_raw(width, height, raw).ok_or_else(|| {
            AsepriteError::InternalError("Pixel buffer does not fit image size".into())
        })
    }
}
