use std::sync::Arc;

use crate::assets::ImageHandle;

use super::geometry::{Rect, Vec2};

/// Cursor distance from the wrap point that is treated as the wrap itself.
const FRAME_WRAP_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Paint-order bucket. Lower layers are painted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DepthLayer {
    Water,
    Background,
    Main,
    Top,
}

/// How the collision hitbox is carved out of the visual bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum HitboxShape {
    #[default]
    Full,
    /// Total shrink per axis, removed evenly from both sides.
    Inset { horizontal: f32, vertical: f32 },
}

impl HitboxShape {
    fn apply(self, bounds: Rect) -> Rect {
        match self {
            HitboxShape::Full => bounds,
            HitboxShape::Inset {
                horizontal,
                vertical,
            } => bounds.inset(horizontal, vertical),
        }
    }
}

/// Looping frame sequence with a fractional cursor.
#[derive(Debug, Clone)]
pub struct Animation {
    frames: Vec<ImageHandle>,
    cursor: f32,
}

impl Animation {
    /// Returns `None` for an empty sequence.
    pub fn new(frames: Vec<ImageHandle>) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }
        Some(Self { frames, cursor: 0.0 })
    }

    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_index(&self) -> usize {
        (self.cursor as usize).min(self.frames.len() - 1)
    }

    pub fn current(&self) -> &ImageHandle {
        &self.frames[self.frame_index()]
    }

    /// Advances by `frames` (fractional) and wraps into `[0, len)`.
    pub fn advance(&mut self, frames: f32) {
        if !frames.is_finite() {
            return;
        }
        self.cursor = wrap_cursor(self.cursor + frames, self.frames.len());
    }

    /// Swaps the sequence, keeping the cursor. Empty sequences are ignored.
    pub fn set_frames(&mut self, frames: &[ImageHandle]) {
        if frames.is_empty() {
            return;
        }
        let unchanged = frames.len() == self.frames.len()
            && frames
                .iter()
                .zip(&self.frames)
                .all(|(new, old)| Arc::ptr_eq(new, old));
        if unchanged {
            return;
        }
        self.frames = frames.to_vec();
        self.cursor = wrap_cursor(self.cursor, self.frames.len());
    }
}

fn wrap_cursor(cursor: f32, len: usize) -> f32 {
    let len = len as f32;
    let wrapped = cursor.rem_euclid(len);
    if len - wrapped < FRAME_WRAP_EPSILON || wrapped >= len {
        0.0
    } else {
        wrapped
    }
}

/// A positioned drawable. `position` is the top-left of the visual box; the
/// hitbox and y-sort key are derived from it and kept in sync by every
/// position mutator.
#[derive(Debug, Clone)]
pub struct Entity {
    position: Vec2,
    size: Vec2,
    image: ImageHandle,
    layer: DepthLayer,
    hitbox_shape: HitboxShape,
    hitbox: Rect,
    y_sort_key: f32,
    animation: Option<Animation>,
}

impl Entity {
    pub fn new(position: Vec2, image: ImageHandle, layer: DepthLayer) -> Self {
        let size = Vec2::new(image.width() as f32, image.height() as f32);
        let mut entity = Self {
            position,
            size,
            image,
            layer,
            hitbox_shape: HitboxShape::Full,
            hitbox: Rect::default(),
            y_sort_key: 0.0,
            animation: None,
        };
        entity.refresh_derived();
        entity
    }

    /// Animated entity showing `frames[0]` first. `None` if `frames` is empty.
    pub fn animated(position: Vec2, frames: Vec<ImageHandle>, layer: DepthLayer) -> Option<Self> {
        let animation = Animation::new(frames)?;
        let mut entity = Self::new(position, Arc::clone(animation.current()), layer);
        entity.animation = Some(animation);
        Some(entity)
    }

    pub fn with_hitbox(mut self, shape: HitboxShape) -> Self {
        self.hitbox_shape = shape;
        self.refresh_derived();
        self
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn image(&self) -> &ImageHandle {
        &self.image
    }

    pub fn layer(&self) -> DepthLayer {
        self.layer
    }

    pub fn bounding_rect(&self) -> Rect {
        Rect::from_position(self.position, self.size.x, self.size.y)
    }

    pub fn hitbox(&self) -> Rect {
        self.hitbox
    }

    pub fn y_sort_key(&self) -> f32 {
        self.y_sort_key
    }

    pub fn animation(&self) -> Option<&Animation> {
        self.animation.as_ref()
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.refresh_derived();
    }

    /// Moves the entity so that its hitbox lands at `hitbox.top_left()`.
    pub fn place_hitbox_at(&mut self, hitbox_top_left: Vec2) {
        let offset = self.hitbox.top_left() - self.position;
        self.set_position(hitbox_top_left - offset);
    }

    /// Advances the animation, if any, by `rate * dt` frames.
    pub fn animate(&mut self, dt: f32, rate: f32) {
        if let Some(animation) = self.animation.as_mut() {
            animation.advance(rate * dt);
            self.image = Arc::clone(animation.current());
        }
    }

    /// Replaces the frame sequence of an animated entity; a plain entity
    /// becomes animated.
    pub fn set_frames(&mut self, frames: &[ImageHandle]) {
        match self.animation.as_mut() {
            Some(animation) => animation.set_frames(frames),
            None => self.animation = Animation::new(frames.to_vec()),
        }
        if let Some(animation) = &self.animation {
            self.image = Arc::clone(animation.current());
        }
    }

    fn refresh_derived(&mut self) {
        self.hitbox = self.hitbox_shape.apply(self.bounding_rect());
        self.y_sort_key = self.hitbox.center_y();
    }
}
