use tilewalk_engine::{
    CollisionIndex, DepthLayer, Entity, EntityId, HitboxShape, ImageHandle, InputAction,
    InputSnapshot, RenderAggregate, Vec2,
};

/// Vertical shrink of an actor hitbox, leaving a band around the feet.
pub(crate) const ACTOR_HITBOX_VERTICAL_INSET: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Facing {
    Down,
    Left,
    Right,
    Up,
}

impl Facing {
    pub(crate) const ALL: [Facing; 4] = [Facing::Down, Facing::Left, Facing::Right, Facing::Up];

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "down" => Some(Facing::Down),
            "left" => Some(Facing::Left),
            "right" => Some(Facing::Right),
            "up" => Some(Facing::Up),
            _ => None,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Facing::Down => "down",
            Facing::Left => "left",
            Facing::Right => "right",
            Facing::Up => "up",
        }
    }

    /// Row of the direction in a character sheet.
    pub(crate) fn sheet_row(self) -> u32 {
        match self {
            Facing::Down => 0,
            Facing::Left => 1,
            Facing::Right => 2,
            Facing::Up => 3,
        }
    }

    /// Cardinal direction closest to `to - from`. The vertical axis wins
    /// ties, and a zero vector faces down.
    pub(crate) fn toward(from: Vec2, to: Vec2) -> Self {
        let delta = to - from;
        if delta.x.abs() > delta.y.abs() {
            if delta.x > 0.0 {
                Facing::Right
            } else {
                Facing::Left
            }
        } else if delta.y < 0.0 {
            Facing::Up
        } else {
            Facing::Down
        }
    }

    fn index(self) -> usize {
        self.sheet_row() as usize
    }
}

/// Walk cycle and idle frame for each facing of one character sheet.
#[derive(Debug, Clone)]
pub(crate) struct CharacterFrames {
    walk: [Vec<ImageHandle>; 4],
    idle: [Vec<ImageHandle>; 4],
}

impl CharacterFrames {
    /// `None` when any facing is missing frames.
    pub(crate) fn new(walk: [Vec<ImageHandle>; 4]) -> Option<Self> {
        if walk.iter().any(Vec::is_empty) {
            return None;
        }
        let idle = [
            vec![walk[0][0].clone()],
            vec![walk[1][0].clone()],
            vec![walk[2][0].clone()],
            vec![walk[3][0].clone()],
        ];
        Some(Self { walk, idle })
    }

    pub(crate) fn walk(&self, facing: Facing) -> &[ImageHandle] {
        &self.walk[facing.index()]
    }

    pub(crate) fn idle(&self, facing: Facing) -> &[ImageHandle] {
        &self.idle[facing.index()]
    }
}

/// Drawable for an actor whose sprite is centered on `center`. The hitbox
/// keeps the middle half of the sprite width and drops a fixed band of its
/// height.
pub(crate) fn actor_entity(
    center: Vec2,
    frames: &CharacterFrames,
    facing: Facing,
) -> Option<Entity> {
    let idle = frames.idle(facing).to_vec();
    let first = idle.first()?;
    let (width, height) = (first.width() as f32, first.height() as f32);
    let top_left = Vec2::new(center.x - width * 0.5, center.y - height * 0.5);
    let entity = Entity::animated(top_left, idle, DepthLayer::Main)?;
    Some(entity.with_hitbox(HitboxShape::Inset {
        horizontal: width * 0.5,
        vertical: ACTOR_HITBOX_VERTICAL_INSET.min(height),
    }))
}

#[derive(Debug, Clone)]
pub(crate) struct Player {
    pub(crate) entity: EntityId,
    facing: Facing,
    blocked: bool,
    moving: bool,
    speed: f32,
    frames: CharacterFrames,
}

impl Player {
    pub(crate) fn new(
        entity: EntityId,
        facing: Facing,
        speed: f32,
        frames: CharacterFrames,
    ) -> Self {
        Self {
            entity,
            facing,
            blocked: false,
            moving: false,
            speed,
            frames,
        }
    }

    pub(crate) fn facing(&self) -> Facing {
        self.facing
    }

    pub(crate) fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub(crate) fn is_moving(&self) -> bool {
        self.moving
    }

    pub(crate) fn block(&mut self) {
        self.blocked = true;
        self.moving = false;
    }

    pub(crate) fn unblock(&mut self) {
        self.blocked = false;
    }

    /// Reads held directions, resolves the step against solids and swaps
    /// between walk and idle frames. A blocked player stands still.
    pub(crate) fn update(
        &mut self,
        dt: f32,
        input: &InputSnapshot,
        sprites: &mut RenderAggregate,
        collisions: &CollisionIndex,
    ) {
        let Some(entity) = sprites.get_mut(self.entity) else {
            return;
        };
        let direction = if self.blocked {
            Vec2::ZERO
        } else {
            input_direction(input)
        };
        if let Some(facing) = facing_for_direction(direction) {
            self.facing = facing;
        }
        self.moving = direction != Vec2::ZERO;

        if self.moving {
            let movement = collisions.resolve_movement(entity.hitbox(), direction * self.speed, dt);
            entity.place_hitbox_at(movement.hitbox.top_left());
            entity.set_frames(self.frames.walk(self.facing));
        } else {
            entity.set_frames(self.frames.idle(self.facing));
        }
    }
}

/// Unit vector of the held directional actions; opposite keys cancel.
pub(crate) fn input_direction(input: &InputSnapshot) -> Vec2 {
    let mut direction = Vec2::ZERO;
    if input.is_down(InputAction::MoveLeft) {
        direction.x -= 1.0;
    }
    if input.is_down(InputAction::MoveRight) {
        direction.x += 1.0;
    }
    if input.is_down(InputAction::MoveUp) {
        direction.y -= 1.0;
    }
    if input.is_down(InputAction::MoveDown) {
        direction.y += 1.0;
    }
    direction.normalize_or_zero()
}

/// Vertical movement decides the facing on diagonals.
fn facing_for_direction(direction: Vec2) -> Option<Facing> {
    if direction.y > 0.0 {
        Some(Facing::Down)
    } else if direction.y < 0.0 {
        Some(Facing::Up)
    } else if direction.x > 0.0 {
        Some(Facing::Right)
    } else if direction.x < 0.0 {
        Some(Facing::Left)
    } else {
        None
    }
}

/// Non-player character: solid, idle, and the owner of one dialog script.
#[derive(Debug, Clone)]
pub(crate) struct Character {
    pub(crate) entity: EntityId,
    pub(crate) character_id: String,
    pub(crate) lines: Vec<String>,
    facing: Facing,
    frames: CharacterFrames,
}

impl Character {
    pub(crate) fn new(
        entity: EntityId,
        character_id: String,
        lines: Vec<String>,
        facing: Facing,
        frames: CharacterFrames,
    ) -> Self {
        Self {
            entity,
            character_id,
            lines,
            facing,
            frames,
        }
    }

    pub(crate) fn facing(&self) -> Facing {
        self.facing
    }

    pub(crate) fn face(&mut self, facing: Facing, sprites: &mut RenderAggregate) {
        self.facing = facing;
        if let Some(entity) = sprites.get_mut(self.entity) {
            entity.set_frames(self.frames.idle(facing));
        }
    }
}
