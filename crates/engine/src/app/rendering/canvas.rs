use crate::assets::Image;

/// Pixel sink the world and overlays paint into.
pub trait DrawTarget {
    fn size(&self) -> (u32, u32);

    /// Copies `image` with its top-left at `(x, y)`. Transparent pixels are
    /// skipped and translucent ones blended.
    fn blit(&mut self, image: &Image, x: i32, y: i32);

    /// Alpha-blended solid rectangle.
    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: [u8; 4]);
}

/// RGBA8 frame buffer view, `width * height * 4` bytes, row-major.
pub struct FrameCanvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> FrameCanvas<'a> {
    /// Returns `None` if the buffer is too small for the given size.
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Option<Self> {
        let needed = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if frame.len() < needed {
            return None;
        }
        Some(Self {
            frame,
            width,
            height,
        })
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Visible span of `[start, start + len)` on an axis of `limit` pixels.
    fn clip(start: i32, len: u32, limit: u32) -> Option<(u32, u32)> {
        let begin = i64::from(start).max(0);
        let end = (i64::from(start) + i64::from(len)).min(i64::from(limit));
        (begin < end).then_some((begin as u32, end as u32))
    }
}

impl DrawTarget for FrameCanvas<'_> {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn blit(&mut self, image: &Image, x: i32, y: i32) {
        let Some((x0, x1)) = Self::clip(x, image.width(), self.width) else {
            return;
        };
        let Some((y0, y1)) = Self::clip(y, image.height(), self.height) else {
            return;
        };
        let src = image.rgba();
        let src_stride = image.width() as usize * 4;
        for dst_y in y0..y1 {
            let src_y = (i64::from(dst_y) - i64::from(y)) as usize;
            for dst_x in x0..x1 {
                let src_x = (i64::from(dst_x) - i64::from(x)) as usize;
                let src_offset = src_y * src_stride + src_x * 4;
                let mut color = [0u8; 4];
                color.copy_from_slice(&src[src_offset..src_offset + 4]);
                let dst_offset = self.offset(dst_x, dst_y);
                blend_into(&mut self.frame[dst_offset..dst_offset + 4], color);
            }
        }
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: [u8; 4]) {
        let Some((x0, x1)) = Self::clip(x, width, self.width) else {
            return;
        };
        let Some((y0, y1)) = Self::clip(y, height, self.height) else {
            return;
        };
        for dst_y in y0..y1 {
            for dst_x in x0..x1 {
                let dst_offset = self.offset(dst_x, dst_y);
                blend_into(&mut self.frame[dst_offset..dst_offset + 4], color);
            }
        }
    }
}

fn blend_into(dst: &mut [u8], color: [u8; 4]) {
    match color[3] {
        0 => {}
        255 => dst.copy_from_slice(&color),
        alpha => {
            let alpha = u16::from(alpha);
            let inverse = 255 - alpha;
            for channel in 0..3 {
                let mixed = u16::from(color[channel]) * alpha + u16::from(dst[channel]) * inverse;
                dst[channel] = ((mixed + 127) / 255) as u8;
            }
            dst[3] = 255;
        }
    }
}
