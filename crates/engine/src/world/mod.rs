mod camera;
mod collision;
mod entity;
mod geometry;

pub use camera::{camera_offset, RenderAggregate};
pub use collision::{
    check_connection, hitboxes_within, ColliderId, CollisionIndex, Movement, TransitionTarget,
    TransitionZone,
};
pub use entity::{Animation, DepthLayer, Entity, EntityId, HitboxShape};
pub use geometry::{Rect, Vec2};
