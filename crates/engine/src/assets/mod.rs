mod keys;
mod store;

use std::sync::Arc;

pub use keys::{AssetKey, AssetKeyError};
pub use store::{AssetError, AssetStore, SpriteSheet};

/// Decoded RGBA8 raster. Shared between entities through [`ImageHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

pub type ImageHandle = Arc<Image>;

impl Image {
    /// Returns `None` when the buffer does not hold exactly `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (rgba.len() == expected).then_some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            rgba.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            rgba,
        }
    }

    /// Flat-colored stand-in for a missing sprite. The color is derived from
    /// `seed` so different keys stay distinguishable on screen.
    pub fn placeholder(width: u32, height: u32, seed: &str) -> Self {
        let hash = seed.bytes().fold(0x811c_9dc5u32, |acc, byte| {
            (acc ^ byte as u32).wrapping_mul(0x0100_0193)
        });
        let fill = [
            64 + (hash & 0x7f) as u8,
            64 + ((hash >> 8) & 0x7f) as u8,
            64 + ((hash >> 16) & 0x7f) as u8,
            255,
        ];
        let edge = [fill[0] / 2, fill[1] / 2, fill[2] / 2, 255];
        let mut image = Self::solid(width, height, fill);
        for y in 0..height {
            for x in 0..width {
                if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                    image.set_pixel(x, y, edge);
                }
            }
        }
        image
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(out)
    }

    fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        self.rgba[offset..offset + 4].copy_from_slice(&color);
    }

    /// Copies a sub-region, clipped to the image bounds.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Image {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        let out_w = x_end.saturating_sub(x);
        let out_h = y_end.saturating_sub(y);
        if out_w == 0 || out_h == 0 {
            return Image {
                width: 0,
                height: 0,
                rgba: Vec::new(),
            };
        }
        let mut rgba = Vec::with_capacity(out_w as usize * out_h as usize * 4);
        for row in y..y.saturating_add(out_h) {
            let start = (row as usize * self.width as usize + x as usize) * 4;
            rgba.extend_from_slice(&self.rgba[start..start + out_w as usize * 4]);
        }
        Image {
            width: out_w,
            height: out_h,
            rgba,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_rejects_wrong_length() {
        assert!(Image::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(Image::from_rgba(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn crop_clips_to_bounds() {
        let mut image = Image::solid(4, 4, [10, 20, 30, 255]);
        image.set_pixel(3, 3, [1, 2, 3, 4]);
        let cropped = image.crop(2, 2, 8, 8);
        assert_eq!((cropped.width(), cropped.height()), (2, 2));
        assert_eq!(cropped.pixel(1, 1), Some([1, 2, 3, 4]));
        assert_eq!(cropped.pixel(2, 0), None);
    }

    #[test]
    fn placeholder_is_deterministic_per_seed() {
        let a = Image::placeholder(8, 8, "characters/player");
        let b = Image::placeholder(8, 8, "characters/player");
        let c = Image::placeholder(8, 8, "characters/straw");
        assert_eq!(a, b);
        assert_ne!(a.pixel(4, 4), c.pixel(4, 4));
        assert_eq!(a.pixel(4, 4).map(|p| p[3]), Some(255));
    }
}
