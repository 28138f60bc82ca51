use std::sync::Arc;

use thiserror::Error;
use tilewalk_engine::{
    CharacterRoster, CollisionIndex, DepthLayer, Entity, HitboxShape, MapData, MapObject,
    ObjectLayer, Rect, RenderAggregate, TransitionTarget, TransitionZone, Vec2,
};
use tracing::debug;

use super::actors::{actor_entity, Character, CharacterFrames, Facing, Player};
use super::frames::OverworldFrames;

const LAYER_TERRAIN: &str = "Terrain";
const LAYER_TERRAIN_TOP: &str = "Terrain Top";
const LAYER_WATER: &str = "Water";
const LAYER_COAST: &str = "Coast";
const LAYER_OBJECTS: &str = "Objects";
const LAYER_TRANSITION: &str = "Transition";
const LAYER_COLLISIONS: &str = "Collisions";
const LAYER_ENTITIES: &str = "Entities";

const OBJECT_TOP: &str = "top";
const OBJECT_PLAYER: &str = "Player";
const OBJECT_CHARACTER: &str = "Character";
const PLAYER_GRAPHIC: &str = "player";

/// Solid map objects only collide along the lower part of their sprite.
const OBJECT_HITBOX_VERTICAL_SHRINK: f32 = 0.6;

#[derive(Debug, Error)]
pub(crate) enum WorldSetupError {
    #[error("map '{map}' does not exist")]
    UnknownMap { map: String },
    #[error("map '{map}' is missing the '{layer}' layer")]
    MissingLayer { map: String, layer: &'static str },
    #[error("map '{map}': object '{object}' in '{layer}' is missing '{property}'")]
    MissingProperty {
        map: String,
        layer: &'static str,
        object: String,
        property: &'static str,
    },
    #[error("map '{map}': '{value}' is not a valid {property} on '{object}'")]
    InvalidProperty {
        map: String,
        object: String,
        property: &'static str,
        value: String,
    },
    #[error("map '{map}': no coast frames for terrain '{terrain}' side '{side}'")]
    UnknownCoast {
        map: String,
        terrain: String,
        side: String,
    },
    #[error("map '{map}': no character sheet named '{graphic}'")]
    UnknownGraphic { map: String, graphic: String },
    #[error("map '{map}': character '{character_id}' has no dialog")]
    UnknownCharacter { map: String, character_id: String },
    #[error("map '{map}' has no player spawn '{spawn}'")]
    MissingSpawn { map: String, spawn: String },
}

/// Live state of one loaded map. Built whole by [`build_world`] and replaced
/// whole on a transition.
#[derive(Debug)]
pub(crate) struct World {
    pub(crate) map_name: String,
    pub(crate) sprites: RenderAggregate,
    pub(crate) collisions: CollisionIndex,
    pub(crate) characters: Vec<Character>,
    pub(crate) player: Player,
}

impl World {
    pub(crate) fn player_entity(&self) -> Option<&Entity> {
        self.sprites.get(self.player.entity)
    }

    pub(crate) fn player_hitbox(&self) -> Option<Rect> {
        self.player_entity().map(Entity::hitbox)
    }

    /// Point the camera follows.
    pub(crate) fn focus(&self) -> Vec2 {
        self.player_hitbox()
            .map(|hitbox| hitbox.center())
            .unwrap_or(Vec2::ZERO)
    }
}

/// Tunables the setup needs from the game settings.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SetupParams {
    pub(crate) player_speed: f32,
}

/// Populates a fresh world from `map`, placing the player at the `Player`
/// object whose `pos` equals `spawn`.
pub(crate) fn build_world(
    map: &MapData,
    spawn: &str,
    frames: &OverworldFrames,
    roster: &CharacterRoster,
    params: SetupParams,
) -> Result<World, WorldSetupError> {
    let mut builder = WorldBuilder {
        map,
        frames,
        sprites: RenderAggregate::new(),
        collisions: CollisionIndex::new(),
        characters: Vec::new(),
    };

    builder.place_tiles()?;
    builder.place_water();
    builder.place_coast()?;
    builder.place_objects()?;
    builder.place_transitions()?;
    builder.place_collisions();
    builder.place_characters(roster)?;
    let player = builder.place_player(spawn, params)?;

    debug!(
        map = %map.name,
        spawn,
        sprites = builder.sprites.len(),
        solids = builder.collisions.solid_count(),
        transition_zones = builder.collisions.transition_zones().len(),
        characters = builder.characters.len(),
        "world_built"
    );
    Ok(World {
        map_name: map.name.clone(),
        sprites: builder.sprites,
        collisions: builder.collisions,
        characters: builder.characters,
        player,
    })
}

struct WorldBuilder<'a> {
    map: &'a MapData,
    frames: &'a OverworldFrames,
    sprites: RenderAggregate,
    collisions: CollisionIndex,
    characters: Vec<Character>,
}

impl<'a> WorldBuilder<'a> {
    fn place_tiles(&mut self) -> Result<(), WorldSetupError> {
        let terrain = self
            .map
            .tile_layer(LAYER_TERRAIN)
            .ok_or_else(|| self.missing_layer(LAYER_TERRAIN))?;
        let tile = self.map.tile_size as f32;
        let layers = [Some(terrain), self.map.tile_layer(LAYER_TERRAIN_TOP)];
        for layer in layers.into_iter().flatten() {
            for placed in &layer.tiles {
                let position = Vec2::new(placed.x as f32 * tile, placed.y as f32 * tile);
                self.sprites.insert(Entity::new(
                    position,
                    Arc::clone(&placed.image),
                    DepthLayer::Background,
                ));
            }
        }
        Ok(())
    }

    /// Water objects are filled with animated tiles on the tile grid.
    fn place_water(&mut self) {
        let Some(layer) = self.map.object_layer(LAYER_WATER) else {
            return;
        };
        let tile = self.map.tile_size as f32;
        for object in &layer.objects {
            let columns = (object.width / tile).ceil().max(0.0) as u32;
            let rows = (object.height / tile).ceil().max(0.0) as u32;
            for row in 0..rows {
                for column in 0..columns {
                    let position =
                        Vec2::new(object.x + column as f32 * tile, object.y + row as f32 * tile);
                    if let Some(entity) =
                        Entity::animated(position, self.frames.water().to_vec(), DepthLayer::Water)
                    {
                        self.sprites.insert(entity);
                    }
                }
            }
        }
    }

    fn place_coast(&mut self) -> Result<(), WorldSetupError> {
        let Some(layer) = self.map.object_layer(LAYER_COAST) else {
            return Ok(());
        };
        for object in &layer.objects {
            let terrain = self.property(LAYER_COAST, object, "terrain")?;
            let side = self.property(LAYER_COAST, object, "side")?;
            let frames = self.frames.coast(terrain, side).ok_or_else(|| {
                WorldSetupError::UnknownCoast {
                    map: self.map.name.clone(),
                    terrain: terrain.to_string(),
                    side: side.to_string(),
                }
            })?;
            if let Some(entity) = Entity::animated(
                Vec2::new(object.x, object.y),
                frames.to_vec(),
                DepthLayer::Background,
            ) {
                self.sprites.insert(entity);
            }
        }
        Ok(())
    }

    /// Objects named `top` paint over actors and never collide; every other
    /// object is a solid with a trimmed hitbox.
    fn place_objects(&mut self) -> Result<(), WorldSetupError> {
        let Some(layer) = self.map.object_layer(LAYER_OBJECTS) else {
            return Ok(());
        };
        for object in &layer.objects {
            let image = object.image.clone().ok_or_else(|| WorldSetupError::MissingProperty {
                map: self.map.name.clone(),
                layer: LAYER_OBJECTS,
                object: object.name.clone(),
                property: "sprite",
            })?;
            let position = Vec2::new(object.x, object.y);
            if object.name == OBJECT_TOP {
                self.sprites.insert(Entity::new(position, image, DepthLayer::Top));
                continue;
            }
            let vertical = image.height() as f32 * OBJECT_HITBOX_VERTICAL_SHRINK;
            let entity = Entity::new(position, image, DepthLayer::Main).with_hitbox(
                HitboxShape::Inset {
                    horizontal: 0.0,
                    vertical,
                },
            );
            let hitbox = entity.hitbox();
            let id = self.sprites.insert(entity);
            self.collisions.add_solid(hitbox, Some(id));
        }
        Ok(())
    }

    fn place_transitions(&mut self) -> Result<(), WorldSetupError> {
        let Some(layer) = self.map.object_layer(LAYER_TRANSITION) else {
            return Ok(());
        };
        for object in &layer.objects {
            let target = self.property(LAYER_TRANSITION, object, "target")?;
            let spawn = self.property(LAYER_TRANSITION, object, "pos")?;
            self.collisions.add_transition_zone(TransitionZone {
                area: object_rect(object),
                target: TransitionTarget::new(target, spawn),
            });
        }
        Ok(())
    }

    fn place_collisions(&mut self) {
        let Some(layer) = self.map.object_layer(LAYER_COLLISIONS) else {
            return;
        };
        for object in &layer.objects {
            self.collisions.add_solid(object_rect(object), None);
        }
    }

    fn place_characters(&mut self, roster: &CharacterRoster) -> Result<(), WorldSetupError> {
        let entities = self.entities_layer()?;
        for object in entities.objects.iter().filter(|object| object.name == OBJECT_CHARACTER) {
            let graphic = self.property(LAYER_ENTITIES, object, "graphic")?;
            let facing = self.facing(object)?;
            let character_id = self.property(LAYER_ENTITIES, object, "character_id")?;
            let def = roster
                .get(character_id)
                .ok_or_else(|| WorldSetupError::UnknownCharacter {
                    map: self.map.name.clone(),
                    character_id: character_id.to_string(),
                })?;
            let frames = self.character_frames(graphic)?;
            let Some(entity) = actor_entity(Vec2::new(object.x, object.y), frames, facing) else {
                return Err(self.unknown_graphic(graphic));
            };
            let hitbox = entity.hitbox();
            let id = self.sprites.insert(entity);
            self.collisions.add_solid(hitbox, Some(id));
            self.characters.push(Character::new(
                id,
                def.id.clone(),
                def.lines.clone(),
                facing,
                frames.clone(),
            ));
        }
        Ok(())
    }

    fn place_player(
        &mut self,
        spawn: &str,
        params: SetupParams,
    ) -> Result<Player, WorldSetupError> {
        let entities = self.entities_layer()?;
        let mut spawn_object = None;
        for object in entities.objects.iter().filter(|object| object.name == OBJECT_PLAYER) {
            if self.property(LAYER_ENTITIES, object, "pos")? == spawn {
                spawn_object = Some(object);
                break;
            }
        }
        let object = spawn_object.ok_or_else(|| WorldSetupError::MissingSpawn {
            map: self.map.name.clone(),
            spawn: spawn.to_string(),
        })?;

        let facing = self.facing(object)?;
        let frames = self.character_frames(PLAYER_GRAPHIC)?;
        let entity = actor_entity(Vec2::new(object.x, object.y), frames, facing)
            .ok_or_else(|| self.unknown_graphic(PLAYER_GRAPHIC))?;
        let id = self.sprites.insert(entity);
        Ok(Player::new(id, facing, params.player_speed, frames.clone()))
    }

    fn entities_layer(&self) -> Result<&'a ObjectLayer, WorldSetupError> {
        self.map
            .object_layer(LAYER_ENTITIES)
            .ok_or_else(|| self.missing_layer(LAYER_ENTITIES))
    }

    fn character_frames(
        &self,
        graphic: &str,
    ) -> Result<&'a CharacterFrames, WorldSetupError> {
        self.frames
            .character(graphic)
            .ok_or_else(|| self.unknown_graphic(graphic))
    }

    fn facing(&self, object: &MapObject) -> Result<Facing, WorldSetupError> {
        let raw = self.property(LAYER_ENTITIES, object, "direction")?;
        Facing::parse(raw).ok_or_else(|| WorldSetupError::InvalidProperty {
            map: self.map.name.clone(),
            object: object.name.clone(),
            property: "direction",
            value: raw.to_string(),
        })
    }

    fn property<'o>(
        &self,
        layer: &'static str,
        object: &'o MapObject,
        property: &'static str,
    ) -> Result<&'o str, WorldSetupError> {
        object
            .property(property)
            .ok_or_else(|| WorldSetupError::MissingProperty {
                map: self.map.name.clone(),
                layer,
                object: object.name.clone(),
                property,
            })
    }

    fn missing_layer(&self, layer: &'static str) -> WorldSetupError {
        WorldSetupError::MissingLayer {
            map: self.map.name.clone(),
            layer,
        }
    }

    fn unknown_graphic(&self, graphic: &str) -> WorldSetupError {
        WorldSetupError::UnknownGraphic {
            map: self.map.name.clone(),
            graphic: graphic.to_string(),
        }
    }
}

fn object_rect(object: &MapObject) -> Rect {
    Rect::new(object.x, object.y, object.width, object.height)
}

/// Character sheet names a set of maps refers to, the player's included.
pub(crate) fn referenced_graphics<'m>(maps: impl IntoIterator<Item = &'m MapData>) -> Vec<String> {
    let mut graphics = vec![PLAYER_GRAPHIC.to_string()];
    for map in maps {
        let Some(layer) = map.object_layer(LAYER_ENTITIES) else {
            continue;
        };
        for object in &layer.objects {
            if let Some(graphic) = object.property("graphic") {
                if !graphics.iter().any(|known| known == graphic) {
                    graphics.push(graphic.to_string());
                }
            }
        }
    }
    graphics
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use tilewalk_engine::{AssetStore, CharacterDef, Image, PlacedTile, TileLayer};
    use tempfile::TempDir;

    fn object(name: &str, rect: (f32, f32, f32, f32), properties: &[(&str, &str)]) -> MapObject {
        MapObject {
            name: name.to_string(),
            x: rect.0,
            y: rect.1,
            width: rect.2,
            height: rect.3,
            image: None,
            properties: properties
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn layer(name: &str, objects: Vec<MapObject>) -> ObjectLayer {
        ObjectLayer {
            name: name.to_string(),
            objects,
        }
    }

    fn base_map() -> MapData {
        let grass = Arc::new(Image::solid(64, 64, [20, 120, 20, 255]));
        let mut tree = object("tree", (300.0, 0.0, 64.0, 128.0), &[]);
        tree.image = Some(Arc::new(Image::solid(64, 128, [0, 80, 0, 255])));
        MapData {
            name: "world".to_string(),
            tile_size: 64,
            tile_layers: vec![TileLayer {
                name: LAYER_TERRAIN.to_string(),
                tiles: vec![
                    PlacedTile { x: 0, y: 0, image: Arc::clone(&grass) },
                    PlacedTile { x: 1, y: 0, image: grass },
                ],
            }],
            object_layers: vec![
                layer(LAYER_WATER, vec![object("water", (0.0, 640.0, 128.0, 64.0), &[])]),
                layer(
                    LAYER_COAST,
                    vec![object(
                        "coast",
                        (0.0, 576.0, 64.0, 64.0),
                        &[("terrain", "sand"), ("side", "top")],
                    )],
                ),
                layer(LAYER_OBJECTS, vec![tree]),
                layer(
                    LAYER_TRANSITION,
                    vec![object(
                        "door",
                        (500.0, 500.0, 64.0, 64.0),
                        &[("target", "cave"), ("pos", "entrance")],
                    )],
                ),
                layer(LAYER_COLLISIONS, vec![object("wall", (-64.0, 0.0, 64.0, 640.0), &[])]),
                layer(
                    LAYER_ENTITIES,
                    vec![
                        object(
                            "Player",
                            (100.0, 100.0, 0.0, 0.0),
                            &[("pos", "house"), ("direction", "down")],
                        ),
                        object(
                            "Player",
                            (800.0, 800.0, 0.0, 0.0),
                            &[("pos", "cave"), ("direction", "up")],
                        ),
                        object(
                            "Character",
                            (400.0, 400.0, 0.0, 0.0),
                            &[("graphic", "o1"), ("direction", "left"), ("character_id", "o1")],
                        ),
                    ],
                ),
            ],
        }
    }

    fn roster() -> CharacterRoster {
        let mut roster = CharacterRoster::new();
        roster.insert(CharacterDef {
            id: "o1".to_string(),
            lines: vec!["Hello.".to_string()],
        });
        roster
    }

    fn frames() -> (TempDir, OverworldFrames) {
        let temp = TempDir::new().expect("temp dir");
        let mut assets = AssetStore::new(temp.path().to_path_buf());
        let frames = OverworldFrames::import(&mut assets, 64, ["player", "o1"]);
        (temp, frames)
    }

    fn params() -> SetupParams {
        SetupParams { player_speed: 250.0 }
    }

    #[test]
    fn populates_every_layer() {
        let (_temp, frames) = frames();
        let world = build_world(&base_map(), "house", &frames, &roster(), params()).expect("world");

        // 2 tiles + 2 water + 1 coast + 1 tree + 1 character + 1 player.
        assert_eq!(world.sprites.len(), 8);
        // tree, wall and character.
        assert_eq!(world.collisions.solid_count(), 3);
        assert_eq!(world.collisions.transition_zones().len(), 1);
        assert_eq!(
            world.collisions.transition_zones()[0].target,
            TransitionTarget::new("cave", "entrance")
        );
        assert_eq!(world.characters.len(), 1);
        assert_eq!(world.characters[0].facing(), Facing::Left);
        assert_eq!(world.map_name, "world");
    }

    #[test]
    fn player_spawns_centered_on_matching_object() {
        let (_temp, frames) = frames();
        let world = build_world(&base_map(), "cave", &frames, &roster(), params()).expect("world");
        let player = world.player_entity().expect("player");
        assert_eq!(player.bounding_rect().center(), Vec2::new(800.0, 800.0));
        assert_eq!(world.player.facing(), Facing::Up);
        assert!(!world.player.is_blocked());
    }

    #[test]
    fn tree_hitbox_keeps_lower_part() {
        let (_temp, frames) = frames();
        let world = build_world(&base_map(), "house", &frames, &roster(), params()).expect("world");
        let tree = world
            .sprites
            .iter()
            .find(|(_, entity)| {
                entity.layer() == DepthLayer::Main && entity.position() == Vec2::new(300.0, 0.0)
            })
            .map(|(_, entity)| entity.hitbox())
            .expect("tree");
        assert_eq!((tree.x, tree.width), (300.0, 64.0));
        assert!((tree.y - 38.4).abs() < 1e-3);
        assert!((tree.height - 51.2).abs() < 1e-3);
        assert!((tree.bottom() - 89.6).abs() < 1e-3);
    }

    #[test]
    fn top_objects_do_not_collide() {
        let (_temp, frames) = frames();
        let mut map = base_map();
        let objects = map
            .object_layers
            .iter_mut()
            .find(|layer| layer.name == LAYER_OBJECTS)
            .expect("objects");
        objects.objects[0].name = OBJECT_TOP.to_string();

        let world = build_world(&map, "house", &frames, &roster(), params()).expect("world");
        assert_eq!(world.collisions.solid_count(), 2);
        assert!(world.sprites.iter().any(|(_, entity)| entity.layer() == DepthLayer::Top));
    }

    #[test]
    fn unknown_spawn_is_fatal() {
        let (_temp, frames) = frames();
        let err = build_world(&base_map(), "garden", &frames, &roster(), params())
            .expect_err("must fail");
        assert!(matches!(err, WorldSetupError::MissingSpawn { spawn, .. } if spawn == "garden"));
    }

    #[test]
    fn missing_entities_layer_is_fatal() {
        let (_temp, frames) = frames();
        let mut map = base_map();
        map.object_layers.retain(|layer| layer.name != LAYER_ENTITIES);
        let err = build_world(&map, "house", &frames, &roster(), params()).expect_err("must fail");
        assert!(matches!(err, WorldSetupError::MissingLayer { layer: LAYER_ENTITIES, .. }));
    }

    #[test]
    fn transition_without_target_is_fatal() {
        let (_temp, frames) = frames();
        let mut map = base_map();
        let transitions = map
            .object_layers
            .iter_mut()
            .find(|layer| layer.name == LAYER_TRANSITION)
            .expect("transition");
        transitions.objects[0].properties.remove("target");
        let err = build_world(&map, "house", &frames, &roster(), params()).expect_err("must fail");
        assert!(matches!(
            err,
            WorldSetupError::MissingProperty { property: "target", .. }
        ));
    }

    #[test]
    fn unknown_character_and_coast_are_fatal() {
        let (_temp, frames) = frames();
        let err = build_world(&base_map(), "house", &frames, &CharacterRoster::new(), params())
            .expect_err("must fail");
        assert!(matches!(err, WorldSetupError::UnknownCharacter { .. }));

        let mut map = base_map();
        let coast = map
            .object_layers
            .iter_mut()
            .find(|layer| layer.name == LAYER_COAST)
            .expect("coast");
        coast.objects[0].properties.insert("terrain".to_string(), "lava".to_string());
        let err = build_world(&map, "house", &frames, &roster(), params()).expect_err("must fail");
        assert!(matches!(err, WorldSetupError::UnknownCoast { .. }));
    }

    #[test]
    fn invalid_direction_is_reported() {
        let (_temp, frames) = frames();
        let mut map = base_map();
        let entities = map
            .object_layers
            .iter_mut()
            .find(|layer| layer.name == LAYER_ENTITIES)
            .expect("entities");
        entities.objects[0].properties.insert("direction".to_string(), "north".to_string());
        let err = build_world(&map, "house", &frames, &roster(), params()).expect_err("must fail");
        assert!(matches!(err, WorldSetupError::InvalidProperty { property: "direction", .. }));
    }

    #[test]
    fn referenced_graphics_lists_player_first_without_duplicates() {
        let map = base_map();
        let graphics = referenced_graphics([&map, &map]);
        assert_eq!(graphics, vec!["player".to_string(), "o1".to_string()]);
    }
}
