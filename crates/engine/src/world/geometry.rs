use std::ops::{Add, AddAssign, Mul, Sub};

/// Pixel-space vector. `y` grows downward, matching screen rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn normalize_or_zero(self) -> Vec2 {
        let len_sq = self.x * self.x + self.y * self.y;
        if len_sq > 0.0 && len_sq.is_finite() {
            let inv_len = len_sq.sqrt().recip();
            Vec2::new(self.x * inv_len, self.y * inv_len)
        } else {
            Vec2::ZERO
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned box anchored at its top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_position(position: Vec2, width: f32, height: f32) -> Self {
        Self::new(position.x, position.y, width, height)
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn top_left(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height * 0.5
    }

    pub fn translated(&self, delta: Vec2) -> Rect {
        Rect::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }

    /// Shrinks the box around its center. Insets larger than the box collapse
    /// it to a zero-sized box at the center instead of inverting it.
    pub fn inset(&self, horizontal: f32, vertical: f32) -> Rect {
        let horizontal = horizontal.clamp(0.0, self.width);
        let vertical = vertical.clamp(0.0, self.height);
        Rect::new(
            self.x + horizontal * 0.5,
            self.y + vertical * 0.5,
            self.width - horizontal,
            self.height - vertical,
        )
    }

    /// Strict overlap test: boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&b.translated(Vec2::new(-0.5, 0.0))));
    }

    #[test]
    fn inset_stays_inside_and_keeps_center() {
        let outer = Rect::new(5.0, 5.0, 64.0, 128.0);
        let inner = outer.inset(32.0, 60.0);
        assert!(outer.contains_rect(&inner));
        assert_eq!(inner.center(), outer.center());
        assert_eq!(inner.width, 32.0);
        assert_eq!(inner.height, 68.0);
    }

    #[test]
    fn oversized_inset_collapses_to_center() {
        let outer = Rect::new(0.0, 0.0, 10.0, 10.0);
        let inner = outer.inset(40.0, 40.0);
        assert_eq!(inner.width, 0.0);
        assert_eq!(inner.height, 0.0);
        assert_eq!(inner.center(), outer.center());
        assert!(outer.contains_rect(&inner));
    }

    #[test]
    fn normalize_handles_zero_and_diagonal() {
        assert_eq!(Vec2::ZERO.normalize_or_zero(), Vec2::ZERO);
        let diagonal = Vec2::new(1.0, 1.0).normalize_or_zero();
        assert!((diagonal.length() - 1.0).abs() < 1e-6);
    }
}
