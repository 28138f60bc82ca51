use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::Scene;

use super::FrameCanvas;

const CLEAR_COLOR: [u8; 4] = [16, 18, 24, 255];

/// Software renderer: the scene paints into the `pixels` frame buffer, which
/// is then presented to the window.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            width: size.width,
            height: size.height,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width.max(1), height.max(1), window);
        Pixels::new(width.max(1), height.max(1), surface)
    }

    pub fn render_scene(&mut self, scene: &mut dyn Scene) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }
        let (width, height) = (self.width, self.height);
        match FrameCanvas::new(self.pixels.frame_mut(), width, height) {
            Some(mut canvas) => {
                canvas.clear(CLEAR_COLOR);
                scene.render(&mut canvas);
            }
            None => {
                warn!(width, height, "renderer_frame_size_mismatch");
                return Ok(());
            }
        }
        self.pixels.render()
    }
}
