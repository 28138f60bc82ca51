use super::entity::{Entity, EntityId};
use super::geometry::{Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderId(pub usize);

/// Destination of a transition zone: map name plus spawn point name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransitionTarget {
    pub map: String,
    pub spawn: String,
}

impl TransitionTarget {
    pub fn new(map: impl Into<String>, spawn: impl Into<String>) -> Self {
        Self {
            map: map.into(),
            spawn: spawn.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionZone {
    pub area: Rect,
    pub target: TransitionTarget,
}

#[derive(Debug, Clone, Copy)]
struct Solid {
    hitbox: Rect,
    owner: Option<EntityId>,
}

/// Outcome of [`CollisionIndex::resolve_movement`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Movement {
    pub hitbox: Rect,
    pub blocked_x: bool,
    pub blocked_y: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Solid boxes that block movement and trigger zones that fire behavior.
/// The two sets never mix: a zone is not solid and a solid never triggers.
#[derive(Debug, Default, Clone)]
pub struct CollisionIndex {
    solids: Vec<Solid>,
    transition_zones: Vec<TransitionZone>,
}

impl CollisionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_solid(&mut self, hitbox: Rect, owner: Option<EntityId>) -> ColliderId {
        self.solids.push(Solid { hitbox, owner });
        ColliderId(self.solids.len() - 1)
    }

    /// Updates a dynamic solid after its owner moved.
    pub fn set_solid(&mut self, id: ColliderId, hitbox: Rect) -> bool {
        match self.solids.get_mut(id.0) {
            Some(solid) => {
                solid.hitbox = hitbox;
                true
            }
            None => false,
        }
    }

    pub fn solid_count(&self) -> usize {
        self.solids.len()
    }

    pub fn solid_owner(&self, id: ColliderId) -> Option<EntityId> {
        self.solids.get(id.0).and_then(|solid| solid.owner)
    }

    pub fn overlaps_solid(&self, hitbox: &Rect) -> bool {
        self.solids.iter().any(|solid| solid.hitbox.intersects(hitbox))
    }

    pub fn add_transition_zone(&mut self, zone: TransitionZone) {
        self.transition_zones.push(zone);
    }

    pub fn transition_zones(&self) -> &[TransitionZone] {
        &self.transition_zones
    }

    /// First registered zone overlapping `hitbox`.
    pub fn transition_zone_at(&self, hitbox: &Rect) -> Option<&TransitionZone> {
        self.transition_zones
            .iter()
            .find(|zone| zone.area.intersects(hitbox))
    }

    /// Moves `hitbox` by `velocity * dt`, horizontal axis first, then
    /// vertical. Each axis is clamped against solids independently so the
    /// mover can slide along walls.
    pub fn resolve_movement(&self, hitbox: Rect, velocity: Vec2, dt: f32) -> Movement {
        let delta = velocity * dt;
        let (after_x, blocked_x) = self.resolve_axis(hitbox, delta.x, Axis::Horizontal);
        let (after_y, blocked_y) = self.resolve_axis(after_x, delta.y, Axis::Vertical);
        Movement {
            hitbox: after_y,
            blocked_x,
            blocked_y,
        }
    }

    fn resolve_axis(&self, start: Rect, amount: f32, axis: Axis) -> (Rect, bool) {
        if amount == 0.0 || !amount.is_finite() {
            return (start, false);
        }
        let step = match axis {
            Axis::Horizontal => Vec2::new(amount, 0.0),
            Axis::Vertical => Vec2::new(0.0, amount),
        };
        let moved = start.translated(step);
        // Testing the swept span keeps fast movers from skipping thin walls.
        let swept = start.union(&moved);

        let mut resolved = moved;
        let mut blocked = false;
        for solid in &self.solids {
            let wall = solid.hitbox;
            if !wall.intersects(&swept) {
                continue;
            }
            if wall.intersects(&start) {
                // Already embedded: no displacement on this axis.
                return (start, true);
            }
            blocked = true;
            match (axis, amount > 0.0) {
                (Axis::Horizontal, true) => resolved.x = resolved.x.min(wall.left() - start.width),
                (Axis::Horizontal, false) => resolved.x = resolved.x.max(wall.right()),
                (Axis::Vertical, true) => resolved.y = resolved.y.min(wall.top() - start.height),
                (Axis::Vertical, false) => resolved.y = resolved.y.max(wall.bottom()),
            }
        }
        (resolved, blocked)
    }
}

/// True when the hitbox centers of `a` and `b` are at most `radius` apart.
pub fn check_connection(radius: f32, a: &Entity, b: &Entity) -> bool {
    hitboxes_within(radius, &a.hitbox(), &b.hitbox())
}

pub fn hitboxes_within(radius: f32, a: &Rect, b: &Rect) -> bool {
    a.center().distance(b.center()) <= radius
}
