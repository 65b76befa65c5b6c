//! Fog-of-war mask: one alpha byte per world pixel.
//!
//! `255` is fully hidden, `0` fully revealed. The mask is always the size of
//! the canvas; a canvas resize stretches the existing content rather than
//! cropping it, so revealed regions survive approximately.
//!
//! The portable form is a `data:image/png;base64,...` URL of a black image
//! whose alpha channel is the mask. The same string is persisted and pushed to
//! player views.

#[cfg(test)]
#[path = "fog_test.rs"]
mod fog_test;

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{GrayImage, ImageFormat, LumaA};
use serde::{Deserialize, Serialize};

use crate::camera::Point;

/// Prefix of the portable encoding.
pub const PORTABLE_PREFIX: &str = "data:image/png;base64,";

const HIDDEN: u8 = 255;
const REVEALED: u8 = 0;

/// Error returned by the portable encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum FogError {
    #[error("fog mask is empty")]
    Empty,
    #[error("failed to encode fog mask: {0}")]
    Encode(image::ImageError),
    #[error("failed to decode fog image: {0}")]
    Decode(image::ImageError),
    #[error("fog data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Brush mode for [`FogMask::paint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FogMode {
    Reveal,
    Hide,
}

/// Dense `width × height` alpha buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FogMask {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

impl Default for FogMask {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl FogMask {
    /// A fully hidden mask.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, alpha: vec![HIDDEN; pixel_count(width, height)] }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alpha.is_empty()
    }

    /// Raw alpha bytes, row-major.
    #[must_use]
    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }

    /// Alpha at a pixel; out-of-range pixels read as hidden.
    #[must_use]
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return HIDDEN;
        }
        self.alpha[self.index(x, y)]
    }

    /// Whether any pixel is less than fully hidden.
    #[must_use]
    pub fn has_reveals(&self) -> bool {
        self.alpha.iter().any(|&a| a < HIDDEN)
    }

    /// Stretch the current content into new dimensions.
    ///
    /// A mask with no prior content starts fully hidden at the new size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        if self.is_empty() || width == 0 || height == 0 {
            *self = Self::new(width, height);
            return;
        }
        let Some(source) = GrayImage::from_raw(self.width, self.height, std::mem::take(&mut self.alpha)) else {
            *self = Self::new(width, height);
            return;
        };
        let scaled = image::imageops::resize(&source, width, height, FilterType::Triangle);
        self.width = width;
        self.height = height;
        self.alpha = scaled.into_raw();
    }

    /// Paint a circular brush dab centred on a world point.
    ///
    /// Edges are antialiased over one pixel. Non-finite or non-positive input
    /// is ignored.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn paint(&mut self, center: Point, radius: f64, mode: FogMode) {
        if self.is_empty() || !center.is_finite() || !radius.is_finite() || radius <= 0.0 {
            return;
        }
        let reach = radius + 1.0;
        let x0 = (center.x - reach).floor().max(0.0);
        let y0 = (center.y - reach).floor().max(0.0);
        let x1 = (center.x + reach).ceil().min(f64::from(self.width));
        let y1 = (center.y + reach).ceil().min(f64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        for y in (y0 as u32)..(y1 as u32) {
            let dy = f64::from(y) + 0.5 - center.y;
            for x in (x0 as u32)..(x1 as u32) {
                let dx = f64::from(x) + 0.5 - center.x;
                let coverage = (radius + 0.5 - dx.hypot(dy)).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let idx = self.index(x, y);
                let current = f64::from(self.alpha[idx]);
                let next = match mode {
                    FogMode::Reveal => current * (1.0 - coverage),
                    FogMode::Hide => current + (f64::from(HIDDEN) - current) * coverage,
                };
                self.alpha[idx] = next.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    pub fn reveal_all(&mut self) {
        self.alpha.fill(REVEALED);
    }

    pub fn hide_all(&mut self) {
        self.alpha.fill(HIDDEN);
    }

    /// Encode as a PNG data URL.
    ///
    /// # Errors
    ///
    /// [`FogError::Empty`] for a zero-sized mask, [`FogError::Encode`] if the
    /// PNG encoder fails.
    pub fn to_portable(&self) -> Result<String, FogError> {
        if self.is_empty() {
            return Err(FogError::Empty);
        }
        let image = image::ImageBuffer::from_fn(self.width, self.height, |x, y| LumaA([0u8, self.alpha_at(x, y)]));
        let mut png = Vec::new();
        image::DynamicImage::ImageLumaA8(image)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(FogError::Encode)?;
        Ok(format!("{PORTABLE_PREFIX}{}", STANDARD.encode(png)))
    }

    /// Decode a portable string and stretch it over the current dimensions.
    ///
    /// Accepts a data URL or bare base64. On error the mask is left unchanged.
    ///
    /// # Errors
    ///
    /// [`FogError::Base64`] or [`FogError::Decode`] for malformed input.
    pub fn from_portable(&mut self, data: &str) -> Result<(), FogError> {
        let encoded = match data.split_once(',') {
            Some((header, body)) if header.starts_with("data:") => body,
            _ => data,
        };
        let bytes = STANDARD.decode(encoded.trim())?;
        let decoded = image::load_from_memory(&bytes).map_err(FogError::Decode)?.to_luma_alpha8();

        let (src_w, src_h) = decoded.dimensions();
        let alpha: Vec<u8> = decoded.pixels().map(|p| p.0[1]).collect();
        if self.is_empty() {
            self.width = src_w;
            self.height = src_h;
            self.alpha = alpha;
            return Ok(());
        }
        if (src_w, src_h) == (self.width, self.height) {
            self.alpha = alpha;
            return Ok(());
        }
        let Some(source) = GrayImage::from_raw(src_w, src_h, alpha) else {
            return Err(FogError::Empty);
        };
        self.alpha = image::imageops::resize(&source, self.width, self.height, FilterType::Triangle).into_raw();
        Ok(())
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}
