use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use roxmltree::{Document, Node};

use crate::assets::{AssetKey, AssetStore, ImageHandle};

use super::error::{
    error_at_node, parse_document, parse_number_attribute, read_error, required_attribute,
    ContentError, ContentErrorCode,
};
use super::map_data::{MapData, MapObject, ObjectLayer, PlacedTile, TileLayer};

pub const DEFAULT_TILE_SIZE: u32 = 64;
pub const MAX_TILE_SIZE: u32 = 1024;
/// Largest accepted object width or height, in pixels.
pub const MAX_OBJECT_EXTENT: f32 = 16_384.0;

/// Reads `<name>.xml`; the map is named after the file stem.
pub fn load_map_document(
    file_path: &Path,
    assets: &mut AssetStore,
) -> Result<MapData, ContentError> {
    let raw = fs::read_to_string(file_path).map_err(|source| read_error(file_path, source))?;
    let name = file_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string();
    parse_map_document(&name, file_path, &raw, assets)
}

/// Decodes a `<Map>` document, resolving every sprite key through `assets`.
pub fn parse_map_document(
    name: &str,
    file_path: &Path,
    raw: &str,
    assets: &mut AssetStore,
) -> Result<MapData, ContentError> {
    let doc = parse_document(file_path, raw)?;
    let root = doc.root_element();
    if root.tag_name().name() != "Map" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <Map>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let tile_size = parse_number_attribute::<u32>(file_path, &doc, root, "tileSize")?
        .unwrap_or(DEFAULT_TILE_SIZE);
    if tile_size == 0 || tile_size > MAX_TILE_SIZE {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!("tileSize must be between 1 and {MAX_TILE_SIZE}"),
            file_path,
            &doc,
            root,
        ));
    }

    let mut context = DocumentContext {
        file_path,
        doc: &doc,
        assets,
        tile_size,
    };
    let mut tile_layers = Vec::new();
    let mut object_layers = Vec::new();
    let mut layer_names = HashSet::new();
    for child in root.children().filter(Node::is_element) {
        let tag = child.tag_name().name();
        if !matches!(tag, "TileLayer" | "ObjectLayer") {
            return Err(error_at_node(
                ContentErrorCode::UnknownElement,
                format!("unsupported map element <{tag}>"),
                file_path,
                &doc,
                child,
            ));
        }
        let layer_name = required_attribute(file_path, &doc, child, "name")?;
        if !layer_names.insert(layer_name.to_string()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateName,
                format!("layer '{layer_name}' is defined more than once"),
                file_path,
                &doc,
                child,
            ));
        }
        if tag == "TileLayer" {
            tile_layers.push(context.tile_layer(child, layer_name)?);
        } else {
            object_layers.push(context.object_layer(child, layer_name)?);
        }
    }

    Ok(MapData {
        name: name.to_string(),
        tile_size,
        tile_layers,
        object_layers,
    })
}

struct DocumentContext<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
    assets: &'a mut AssetStore,
    tile_size: u32,
}

impl DocumentContext<'_, '_> {
    fn tile_layer(&mut self, node: Node<'_, '_>, name: &str) -> Result<TileLayer, ContentError> {
        let mut tiles = Vec::new();
        for row in node.children().filter(Node::is_element) {
            if row.tag_name().name() != "Row" {
                return Err(self.unknown_child(row, "TileLayer"));
            }
            let y = parse_number_attribute::<u32>(self.file_path, self.doc, row, "y")?
                .ok_or_else(|| self.missing(row, "y"))?;
            let cells = row.text().unwrap_or_default();
            for (x, cell) in cells.split(',').enumerate() {
                let key = cell.trim();
                if key.is_empty() {
                    continue;
                }
                let image = self.sprite(row, key, (self.tile_size, self.tile_size))?;
                tiles.push(PlacedTile {
                    x: x as u32,
                    y,
                    image,
                });
            }
        }
        Ok(TileLayer {
            name: name.to_string(),
            tiles,
        })
    }

    fn object_layer(
        &mut self,
        node: Node<'_, '_>,
        name: &str,
    ) -> Result<ObjectLayer, ContentError> {
        let mut objects = Vec::new();
        for object in node.children().filter(Node::is_element) {
            if object.tag_name().name() != "Object" {
                return Err(self.unknown_child(object, "ObjectLayer"));
            }
            objects.push(self.object(object)?);
        }
        Ok(ObjectLayer {
            name: name.to_string(),
            objects,
        })
    }

    fn object(&mut self, node: Node<'_, '_>) -> Result<MapObject, ContentError> {
        let x = parse_number_attribute::<f32>(self.file_path, self.doc, node, "x")?
            .ok_or_else(|| self.missing(node, "x"))?;
        let y = parse_number_attribute::<f32>(self.file_path, self.doc, node, "y")?
            .ok_or_else(|| self.missing(node, "y"))?;
        let width = parse_number_attribute::<f32>(self.file_path, self.doc, node, "width")?
            .unwrap_or(0.0);
        let height = parse_number_attribute::<f32>(self.file_path, self.doc, node, "height")?
            .unwrap_or(0.0);
        let extent = 0.0..=MAX_OBJECT_EXTENT;
        if !(x.is_finite() && y.is_finite() && extent.contains(&width) && extent.contains(&height))
        {
            return Err(error_at_node(
                ContentErrorCode::InvalidValue,
                format!(
                    "object position must be finite and its size within 0..={MAX_OBJECT_EXTENT}"
                ),
                self.file_path,
                self.doc,
                node,
            ));
        }

        let image = match node.attribute("sprite").map(str::trim) {
            Some(key) if !key.is_empty() => {
                let fallback = (width.round().max(1.0) as u32, height.round().max(1.0) as u32);
                Some(self.sprite(node, key, fallback)?)
            }
            _ => None,
        };

        let mut properties = BTreeMap::new();
        for property in node.children().filter(Node::is_element) {
            if property.tag_name().name() != "Property" {
                return Err(self.unknown_child(property, "Object"));
            }
            let key = required_attribute(self.file_path, self.doc, property, "name")?;
            let value = property.attribute("value").unwrap_or_default().trim();
            if properties.insert(key.to_string(), value.to_string()).is_some() {
                return Err(error_at_node(
                    ContentErrorCode::DuplicateName,
                    format!("property '{key}' is defined more than once"),
                    self.file_path,
                    self.doc,
                    property,
                ));
            }
        }

        Ok(MapObject {
            name: node.attribute("name").unwrap_or_default().trim().to_string(),
            x,
            y,
            width,
            height,
            image,
            properties,
        })
    }

    fn sprite(
        &mut self,
        node: Node<'_, '_>,
        key: &str,
        fallback_size: (u32, u32),
    ) -> Result<ImageHandle, ContentError> {
        if let Err(error) = AssetKey::parse(key) {
            return Err(error_at_node(
                ContentErrorCode::InvalidValue,
                format!("invalid sprite key '{key}': {error}"),
                self.file_path,
                self.doc,
                node,
            ));
        }
        Ok(self.assets.image(key, fallback_size))
    }

    fn missing(&self, node: Node<'_, '_>, attribute: &str) -> ContentError {
        error_at_node(
            ContentErrorCode::MissingAttribute,
            format!(
                "<{}> requires a '{}' attribute",
                node.tag_name().name(),
                attribute
            ),
            self.file_path,
            self.doc,
            node,
        )
    }

    fn unknown_child(&self, node: Node<'_, '_>, parent: &str) -> ContentError {
        error_at_node(
            ContentErrorCode::UnknownElement,
            format!(
                "unsupported element <{}> inside <{}>",
                node.tag_name().name(),
                parent
            ),
            self.file_path,
            self.doc,
            node,
        )
    }
}
