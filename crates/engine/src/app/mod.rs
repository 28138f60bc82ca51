mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::LoopStatsSnapshot;
pub use rendering::{
    draw_text, line_height, text_width, wrap_text, DrawTarget, FrameCanvas, Renderer,
    GLYPH_HEIGHT, GLYPH_WIDTH,
};
pub use scene::{InputSnapshot, Scene, SceneCommand, SceneError};
