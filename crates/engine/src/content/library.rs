use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::assets::AssetStore;

use super::error::{read_error, ContentError};
use super::map_data::MapData;
use super::map_document::load_map_document;

/// Every decoded map of the content directory, keyed by map name.
#[derive(Debug, Default)]
pub struct MapLibrary {
    maps: BTreeMap<String, MapData>,
}

impl MapLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes every `*.xml` file directly inside `dir`, in file name order.
    pub fn load_dir(dir: &Path, assets: &mut AssetStore) -> Result<Self, ContentError> {
        let mut library = Self::new();
        for path in list_map_files(dir)? {
            let map = load_map_document(&path, assets)?;
            info!(
                map = %map.name,
                tile_layers = map.tile_layers.len(),
                object_layers = map.object_layers.len(),
                "map_loaded"
            );
            library.insert(map);
        }
        Ok(library)
    }

    pub fn insert(&mut self, map: MapData) {
        self.maps.insert(map.name.clone(), map);
    }

    pub fn get(&self, name: &str) -> Option<&MapData> {
        self.maps.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

fn list_map_files(dir: &Path) -> Result<Vec<PathBuf>, ContentError> {
    let entries = fs::read_dir(dir).map_err(|source| read_error(dir, source))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|source| read_error(dir, source))?.path();
        let is_xml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        if path.is_file() && is_xml {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
