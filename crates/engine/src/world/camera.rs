use crate::app::DrawTarget;

use super::entity::{Entity, EntityId};
use super::geometry::{Rect, Vec2};

/// Screen-space margin kept around the view when culling.
const VIEW_CULL_PADDING_PX: f32 = 64.0;

/// Offset that puts `focus` at the center of a `screen`-sized view.
/// Draw positions are `world - offset`.
pub fn camera_offset(focus: Vec2, screen: (u32, u32)) -> Vec2 {
    Vec2::new(
        focus.x - screen.0 as f32 * 0.5,
        focus.y - screen.1 as f32 * 0.5,
    )
}

/// Owns every drawable of the loaded map and paints them player-centered,
/// ordered by depth layer and then by y-sort key.
#[derive(Debug, Default)]
pub struct RenderAggregate {
    entities: Vec<Entity>,
    ids: Vec<EntityId>,
    next_id: u64,
    draw_order: Vec<usize>,
}

impl RenderAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.entities.push(entity);
        self.ids.push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id).map(|index| &self.entities[index])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let index = self.index_of(id)?;
        Some(&mut self.entities[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.ids.iter().copied().zip(self.entities.iter())
    }

    /// Advances every animated entity by `rate * dt` frames.
    pub fn update(&mut self, dt: f32, rate: f32) {
        for entity in &mut self.entities {
            entity.animate(dt, rate);
        }
    }

    /// Indices in paint order. Ties keep insertion order.
    pub fn sorted_draw_indices(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.entities.len());
        collect_sorted_draw_indices(&self.entities, &mut order);
        order
    }

    /// Paints every entity whose bounds intersect the view centered on
    /// `focus`.
    pub fn draw(&mut self, focus: Vec2, target: &mut dyn DrawTarget) {
        let screen = target.size();
        let offset = camera_offset(focus, screen);
        let view = Rect::new(
            offset.x - VIEW_CULL_PADDING_PX,
            offset.y - VIEW_CULL_PADDING_PX,
            screen.0 as f32 + VIEW_CULL_PADDING_PX * 2.0,
            screen.1 as f32 + VIEW_CULL_PADDING_PX * 2.0,
        );

        collect_sorted_draw_indices(&self.entities, &mut self.draw_order);
        for index in self.draw_order.iter().copied() {
            let entity = &self.entities[index];
            let bounds = entity.bounding_rect();
            if !bounds.intersects(&view) {
                continue;
            }
            let screen_pos = entity.position() - offset;
            target.blit(
                entity.image(),
                screen_pos.x.round() as i32,
                screen_pos.y.round() as i32,
            );
        }
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        // Ids are handed out in insertion order and never removed.
        self.ids.binary_search(&id).ok()
    }
}

fn collect_sorted_draw_indices(entities: &[Entity], out: &mut Vec<usize>) {
    out.clear();
    out.extend(0..entities.len());
    out.sort_by(|&a, &b| {
        let left = &entities[a];
        let right = &entities[b];
        left.layer()
            .cmp(&right.layer())
            .then_with(|| left.y_sort_key().total_cmp(&right.y_sort_key()))
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::assets::{Image, ImageHandle};
    use crate::world::{DepthLayer, HitboxShape};

    struct RecordingTarget {
        size: (u32, u32),
        blits: Vec<(u8, i32, i32)>,
    }

    impl DrawTarget for RecordingTarget {
        fn size(&self) -> (u32, u32) {
            self.size
        }

        fn blit(&mut self, image: &Image, x: i32, y: i32) {
            let tag = image.pixel(0, 0).map(|pixel| pixel[0]).unwrap_or(0);
            self.blits.push((tag, x, y));
        }

        fn fill_rect(&mut self, _x: i32, _y: i32, _width: u32, _height: u32, _color: [u8; 4]) {}
    }

    fn tagged(tag: u8) -> ImageHandle {
        Arc::new(Image::solid(10, 10, [tag, 0, 0, 255]))
    }

    fn entity(tag: u8, x: f32, y: f32, layer: DepthLayer) -> Entity {
        Entity::new(Vec2::new(x, y), tagged(tag), layer)
    }

    #[test]
    fn camera_offset_centers_focus() {
        let offset = camera_offset(Vec2::new(500.0, 300.0), (800, 600));
        assert_eq!(offset, Vec2::new(100.0, 0.0));
    }

    #[test]
    fn draw_order_is_layer_then_y() {
        let mut aggregate = RenderAggregate::new();
        aggregate.insert(entity(1, 0.0, 10.0, DepthLayer::Main));
        aggregate.insert(entity(2, 0.0, 50.0, DepthLayer::Background));
        aggregate.insert(entity(3, 0.0, 20.0, DepthLayer::Main));
        aggregate.insert(entity(4, 0.0, 0.0, DepthLayer::Top));
        aggregate.insert(entity(5, 0.0, 90.0, DepthLayer::Water));

        assert_eq!(aggregate.sorted_draw_indices(), vec![4, 1, 0, 2, 3]);
    }

    #[test]
    fn lower_hitbox_paints_over_upper_hitbox_in_main_layer() {
        let mut aggregate = RenderAggregate::new();
        let shape = HitboxShape::Inset {
            horizontal: 0.0,
            vertical: 4.0,
        };
        let lower = aggregate.insert(entity(7, 0.0, 30.0, DepthLayer::Main).with_hitbox(shape));
        let upper = aggregate.insert(entity(8, 0.0, 5.0, DepthLayer::Main).with_hitbox(shape));

        let mut target = RecordingTarget {
            size: (100, 100),
            blits: Vec::new(),
        };
        aggregate.draw(Vec2::new(50.0, 50.0), &mut target);
        assert_eq!(
            target.blits.iter().map(|blit| blit.0).collect::<Vec<_>>(),
            vec![8, 7]
        );
        assert!(aggregate.get(lower).is_some() && aggregate.get(upper).is_some());
    }

    #[test]
    fn equal_keys_keep_insertion_order_across_frames() {
        let mut aggregate = RenderAggregate::new();
        for tag in 0..6 {
            aggregate.insert(entity(tag, tag as f32, 0.0, DepthLayer::Main));
        }
        let first = aggregate.sorted_draw_indices();
        let second = aggregate.sorted_draw_indices();
        assert_eq!(first, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(first, second);
    }

    #[test]
    fn draw_translates_by_camera_offset_and_culls_far_entities() {
        let mut aggregate = RenderAggregate::new();
        aggregate.insert(entity(1, 100.0, 100.0, DepthLayer::Main));
        aggregate.insert(entity(2, 5000.0, 5000.0, DepthLayer::Main));

        let mut target = RecordingTarget {
            size: (200, 100),
            blits: Vec::new(),
        };
        aggregate.draw(Vec2::new(100.0, 100.0), &mut target);
        assert_eq!(target.blits, vec![(1, 100, 50)]);
    }

    #[test]
    fn get_mut_moves_entity_and_updates_sort_key() {
        let mut aggregate = RenderAggregate::new();
        let a = aggregate.insert(entity(1, 0.0, 0.0, DepthLayer::Main));
        aggregate.insert(entity(2, 0.0, 40.0, DepthLayer::Main));
        aggregate
            .get_mut(a)
            .expect("entity")
            .set_position(Vec2::new(0.0, 80.0));
        assert_eq!(aggregate.sorted_draw_indices(), vec![1, 0]);
        assert!(aggregate.get(EntityId(99)).is_none());
    }

    #[test]
    fn update_advances_animated_entities_only() {
        let mut aggregate = RenderAggregate::new();
        let animated = aggregate.insert(
            Entity::animated(Vec2::ZERO, vec![tagged(1), tagged(2)], DepthLayer::Water)
                .expect("frames"),
        );
        let still = aggregate.insert(entity(9, 0.0, 0.0, DepthLayer::Main));
        aggregate.update(0.25, 4.0);
        let animated = aggregate.get(animated).expect("animated");
        assert_eq!(animated.image().pixel(0, 0).map(|p| p[0]), Some(2));
        let still = aggregate.get(still).expect("still");
        assert_eq!(still.image().pixel(0, 0).map(|p| p[0]), Some(9));
    }
}
