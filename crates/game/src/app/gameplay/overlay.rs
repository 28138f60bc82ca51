use tilewalk_engine::{draw_text, line_height, text_width, wrap_text, DrawTarget, Rect, Vec2};

use super::transition::TintOverlay;

const TEXT_SCALE: u32 = 2;
const BUBBLE_MAX_CHARS: usize = 28;
const BUBBLE_PADDING_PX: u32 = 10;
const BUBBLE_GAP_PX: i32 = 8;
const BUBBLE_FILL: [u8; 4] = [245, 245, 235, 235];
const BUBBLE_BORDER: [u8; 4] = [30, 30, 40, 255];
const TEXT_COLOR: [u8; 4] = [20, 20, 28, 255];
const PROMPT_FILL: [u8; 4] = [0, 0, 0, 170];
const PROMPT_TEXT: [u8; 4] = [250, 250, 250, 255];
const PROMPT_MARGIN_PX: i32 = 24;
pub(crate) const TRANSITION_PROMPT: &str = "Y: ENTER   ARROWS: STAY";

/// Speech bubble centered above `speaker` (world space), shifted by the
/// camera `offset`.
pub(crate) fn draw_dialog_bubble(
    target: &mut dyn DrawTarget,
    speaker: Rect,
    offset: Vec2,
    text: &str,
) {
    let lines = wrap_text(text, BUBBLE_MAX_CHARS);
    if lines.is_empty() {
        return;
    }
    let text_w = lines
        .iter()
        .map(|line| text_width(line, TEXT_SCALE))
        .max()
        .unwrap_or(0);
    let text_h = line_height(TEXT_SCALE) * lines.len() as u32;
    let width = text_w + BUBBLE_PADDING_PX * 2;
    let height = text_h + BUBBLE_PADDING_PX * 2;

    let anchor_x = (speaker.center().x - offset.x).round() as i32;
    let anchor_y = (speaker.top() - offset.y).round() as i32;
    let x = anchor_x - (width / 2) as i32;
    let y = anchor_y - height as i32 - BUBBLE_GAP_PX;

    draw_frame(target, x, y, width, height, BUBBLE_FILL);
    let mut pen_y = y + BUBBLE_PADDING_PX as i32;
    for line in &lines {
        draw_text(target, x + BUBBLE_PADDING_PX as i32, pen_y, line, TEXT_SCALE, TEXT_COLOR);
        pen_y += line_height(TEXT_SCALE) as i32;
    }
}

/// Confirmation banner along the bottom of the screen.
pub(crate) fn draw_transition_prompt(target: &mut dyn DrawTarget) {
    let (screen_w, screen_h) = target.size();
    let width = text_width(TRANSITION_PROMPT, TEXT_SCALE) + BUBBLE_PADDING_PX * 2;
    let height = line_height(TEXT_SCALE) + BUBBLE_PADDING_PX * 2;
    let x = (screen_w as i32 - width as i32) / 2;
    let y = screen_h as i32 - height as i32 - PROMPT_MARGIN_PX;
    target.fill_rect(x, y, width, height, PROMPT_FILL);
    draw_text(
        target,
        x + BUBBLE_PADDING_PX as i32,
        y + BUBBLE_PADDING_PX as i32,
        TRANSITION_PROMPT,
        TEXT_SCALE,
        PROMPT_TEXT,
    );
}

pub(crate) fn draw_tint(target: &mut dyn DrawTarget, tint: &TintOverlay) {
    let alpha = tint.alpha();
    if alpha == 0 {
        return;
    }
    let (width, height) = target.size();
    target.fill_rect(0, 0, width, height, [0, 0, 0, alpha]);
}

fn draw_frame(target: &mut dyn DrawTarget, x: i32, y: i32, width: u32, height: u32, fill: [u8; 4]) {
    target.fill_rect(x, y, width, height, BUBBLE_BORDER);
    if width > 4 && height > 4 {
        target.fill_rect(x + 2, y + 2, width - 4, height - 4, fill);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilewalk_engine::Image;

    #[derive(Default)]
    struct RecordingTarget {
        fills: Vec<(i32, i32, u32, u32, [u8; 4])>,
    }

    impl DrawTarget for RecordingTarget {
        fn size(&self) -> (u32, u32) {
            (640, 360)
        }

        fn blit(&mut self, _image: &Image, _x: i32, _y: i32) {}

        fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: [u8; 4]) {
            self.fills.push((x, y, width, height, color));
        }
    }

    #[test]
    fn clear_tint_draws_nothing() {
        let mut target = RecordingTarget::default();
        draw_tint(&mut target, &TintOverlay::new(600.0));
        assert!(target.fills.is_empty());
    }

    #[test]
    fn bubble_sits_above_speaker() {
        let mut target = RecordingTarget::default();
        let speaker = Rect::new(400.0, 300.0, 64.0, 68.0);
        draw_dialog_bubble(&mut target, speaker, Vec2::new(100.0, 100.0), "HI");

        let (x, y, width, height, color) = target.fills[0];
        assert_eq!(color, BUBBLE_BORDER);
        assert_eq!(width, text_width("HI", TEXT_SCALE) + BUBBLE_PADDING_PX * 2);
        assert_eq!(x + width as i32 / 2, 332);
        assert_eq!(y + height as i32 + BUBBLE_GAP_PX, 200);
    }

    #[test]
    fn prompt_is_centered_at_the_bottom() {
        let mut target = RecordingTarget::default();
        draw_transition_prompt(&mut target);
        let (x, y, width, height, _) = target.fills[0];
        assert!((x + width as i32 / 2 - 320).abs() <= 1);
        assert_eq!(y + height as i32 + PROMPT_MARGIN_PX, 360);
    }
}
