//! Image decoding and 2D texture objects.
//!
//! Provides [`decode_image`] for turning an image file into tightly packed
//! 8-bit pixels, [`TextureConfig`] for sampling parameters, and
//! [`Texture`], which owns a GPU texture tagged as diffuse or specular. The
//! tag only decides the sampler uniform name a vertex array gives the
//! texture (`diff_N` / `spec_N`).

use super::gpu::{Gpu, TextureFilter, TextureUpload, TextureWrap};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from decoding an image or creating a texture.
#[derive(Debug, Error)]
pub enum TextureError {
    /// The file could not be read or decoded.
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// The image has a zero extent or does not fit the GL size type.
    #[error("invalid texture dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// The pixel buffer length does not match width, height and format.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    PixelCount { expected: usize, actual: usize },

    /// The context refused to create a texture object.
    #[error("texture backend error: {0}")]
    Backend(String),
}

/// What a texture is used for in the lighting model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Specular,
}

impl TextureKind {
    /// Prefix of the sampler uniform name, before the per-kind index.
    pub fn uniform_prefix(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "diff",
            TextureKind::Specular => "spec",
        }
    }

    /// Parses `"diffuse"` or `"specular"` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "diffuse" | "diff" => Some(TextureKind::Diffuse),
            "specular" | "spec" => Some(TextureKind::Specular),
            _ => None,
        }
    }
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TextureKind::Diffuse => "diffuse",
            TextureKind::Specular => "specular",
        })
    }
}

/// Channel layout of decoded pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Three 8-bit channels, typical for JPEG.
    Rgb,
    /// Four 8-bit channels, typical for PNG.
    Rgba,
}

impl PixelFormat {
    pub fn channels(self) -> u8 {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }

    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            3 => Some(PixelFormat::Rgb),
            4 => Some(PixelFormat::Rgba),
            _ => None,
        }
    }

    /// Parses `"rgb"` or `"rgba"` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rgb" => Some(PixelFormat::Rgb),
            "rgba" => Some(PixelFormat::Rgba),
            _ => None,
        }
    }
}

/// Tightly packed 8-bit pixels, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Wraps a raw pixel buffer after checking its size.
    ///
    /// # Errors
    ///
    /// Returns `TextureError::InvalidDimensions` for a zero extent or one
    /// above `i32::MAX`, and `TextureError::PixelCount` if `pixels` is not
    /// exactly `width * height * channels` bytes.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Result<Self, TextureError> {
        let max = i32::MAX as u32;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(TextureError::InvalidDimensions { width, height });
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(usize::from(format.channels())))
            .ok_or(TextureError::InvalidDimensions { width, height })?;
        if pixels.len() != expected {
            return Err(TextureError::PixelCount {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Decodes the image at `path` into `format`, converting channels as needed.
///
/// # Errors
///
/// Returns `TextureError::Decode` if the file is missing, unreadable or not
/// a supported image. A failed decode never produces a texture.
pub fn decode_image(path: &Path, format: PixelFormat) -> Result<DecodedImage, TextureError> {
    let image = image::open(path).map_err(|e| TextureError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let (width, height, pixels) = match format {
        PixelFormat::Rgb => {
            let rgb = image.to_rgb8();
            (rgb.width(), rgb.height(), rgb.into_raw())
        }
        PixelFormat::Rgba => {
            let rgba = image.to_rgba8();
            (rgba.width(), rgba.height(), rgba.into_raw())
        }
    };

    DecodedImage::new(width, height, format, pixels)
}

/// Sampling parameters applied when a texture is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureConfig {
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
    pub generate_mipmaps: bool,
}

impl Default for TextureConfig {
    /// Nearest filtering, repeat wrapping on both axes, mipmaps generated.
    fn default() -> Self {
        Self {
            filter: TextureFilter::Nearest,
            wrap: TextureWrap::Repeat,
            generate_mipmaps: true,
        }
    }
}

/// A 2D texture object tagged with its [`TextureKind`].
///
/// Owns the texture object and deletes it on drop. Vertex arrays only
/// borrow textures, so one texture can be shared by several draws.
pub struct Texture<'gl, G: Gpu> {
    gpu: &'gl G,
    handle: G::Texture,
    width: u32,
    height: u32,
    kind: TextureKind,
}

impl<'gl, G: Gpu> Texture<'gl, G> {
    /// Decodes `path` and uploads it with the default [`TextureConfig`].
    ///
    /// # Errors
    ///
    /// Returns `TextureError::Decode` if decoding fails, or
    /// `TextureError::Backend` if the texture cannot be created.
    pub fn from_file(
        gpu: &'gl G,
        path: &Path,
        format: PixelFormat,
        kind: TextureKind,
    ) -> Result<Self, TextureError> {
        let image = decode_image(path, format)?;
        Self::from_image(gpu, &image, kind)
    }

    /// Uploads already decoded pixels with the default [`TextureConfig`].
    ///
    /// # Errors
    ///
    /// Returns `TextureError::Backend` if the texture cannot be created.
    pub fn from_image(
        gpu: &'gl G,
        image: &DecodedImage,
        kind: TextureKind,
    ) -> Result<Self, TextureError> {
        Self::with_config(gpu, image, kind, TextureConfig::default())
    }

    /// Uploads already decoded pixels with explicit sampling parameters.
    ///
    /// # Errors
    ///
    /// Returns `TextureError::Backend` if the texture cannot be created.
    pub fn with_config(
        gpu: &'gl G,
        image: &DecodedImage,
        kind: TextureKind,
        config: TextureConfig,
    ) -> Result<Self, TextureError> {
        let handle = gpu.create_texture().map_err(TextureError::Backend)?;

        gpu.upload_texture_2d(
            handle,
            TextureUpload {
                width: image.width(),
                height: image.height(),
                channels: image.format().channels(),
                pixels: image.pixels(),
            },
            config.filter,
            config.wrap,
        );
        if config.generate_mipmaps {
            gpu.generate_mipmaps(handle);
        }

        log::debug!(
            "created {kind} texture {handle:?}: {}x{} {:?}",
            image.width(),
            image.height(),
            image.format()
        );

        Ok(Self {
            gpu,
            handle,
            width: image.width(),
            height: image.height(),
            kind,
        })
    }

    /// Binds this texture to texture unit `unit`. Other units keep their
    /// bindings.
    pub fn bind(&self, unit: u32) {
        self.gpu.bind_texture_unit(unit, self.handle);
    }

    pub fn handle(&self) -> G::Texture {
        self.handle
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl<G: Gpu> Drop for Texture<'_, G> {
    fn drop(&mut self) {
        log::trace!("deleting {} texture {:?}", self.kind, self.handle);
        self.gpu.delete_texture(self.handle);
    }
}
