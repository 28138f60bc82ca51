mod canvas;
mod renderer;
mod text;

pub use canvas::{DrawTarget, FrameCanvas};
pub use renderer::Renderer;
pub use text::{draw_text, line_height, text_width, wrap_text, GLYPH_HEIGHT, GLYPH_WIDTH};
