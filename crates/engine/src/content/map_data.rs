use std::collections::BTreeMap;

use crate::assets::ImageHandle;

/// One tile of a tile layer, in grid coordinates.
#[derive(Debug, Clone)]
pub struct PlacedTile {
    pub x: u32,
    pub y: u32,
    pub image: ImageHandle,
}

#[derive(Debug, Clone, Default)]
pub struct TileLayer {
    pub name: String,
    pub tiles: Vec<PlacedTile>,
}

/// A free-placed object in pixel coordinates (top-left origin) with string
/// properties.
#[derive(Debug, Clone)]
pub struct MapObject {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub image: Option<ImageHandle>,
    pub properties: BTreeMap<String, String>,
}

impl MapObject {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectLayer {
    pub name: String,
    pub objects: Vec<MapObject>,
}

/// Decoded map: named tile layers and named object layers in document order.
#[derive(Debug, Clone)]
pub struct MapData {
    pub name: String,
    pub tile_size: u32,
    pub tile_layers: Vec<TileLayer>,
    pub object_layers: Vec<ObjectLayer>,
}

impl MapData {
    pub fn tile_layer(&self, name: &str) -> Option<&TileLayer> {
        self.tile_layers.iter().find(|layer| layer.name == name)
    }

    pub fn object_layer(&self, name: &str) -> Option<&ObjectLayer> {
        self.object_layers.iter().find(|layer| layer.name == name)
    }
}
