use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, warn};

use super::{AssetKey, AssetKeyError, Image, ImageHandle};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid asset key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: AssetKeyError,
    },
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Grid of equally sized cells cut out of one sheet image, addressed by
/// `(column, row)`.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    columns: u32,
    rows: u32,
    cells: Vec<ImageHandle>,
}

impl SpriteSheet {
    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell(&self, column: u32, row: u32) -> Option<&ImageHandle> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.cells.get((row * self.columns + column) as usize)
    }
}

/// Loads sprites from `<root>/<key>.png`, caching decoded images. Missing or
/// broken files are replaced by placeholders and reported once per key.
#[derive(Debug)]
pub struct AssetStore {
    root: PathBuf,
    decoded: HashMap<String, Option<ImageHandle>>,
    placeholders: HashMap<(String, u32, u32), ImageHandle>,
    warned_keys: HashSet<String>,
}

impl AssetStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            decoded: HashMap::new(),
            placeholders: HashMap::new(),
            warned_keys: HashSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn try_image(&mut self, key: &str) -> Result<ImageHandle, AssetError> {
        let asset_key = AssetKey::parse(key).map_err(|source| AssetError::InvalidKey {
            key: key.to_string(),
            source,
        })?;
        let path = asset_key.png_path(&self.root);
        let image = load_png(&path)?;
        Ok(Arc::new(image))
    }

    /// Returns the decoded sprite, or a `fallback_size` placeholder.
    pub fn image(&mut self, key: &str, fallback_size: (u32, u32)) -> ImageHandle {
        match self.decoded.get(key) {
            Some(Some(image)) => return Arc::clone(image),
            Some(None) => return self.placeholder(key, fallback_size),
            None => {}
        }

        match self.try_image(key) {
            Ok(image) => {
                debug!(
                    sprite_key = key,
                    width = image.width(),
                    height = image.height(),
                    "sprite_loaded"
                );
                self.decoded.insert(key.to_string(), Some(Arc::clone(&image)));
                image
            }
            Err(error) => {
                self.warn_once(key, &error);
                self.decoded.insert(key.to_string(), None);
                self.placeholder(key, fallback_size)
            }
        }
    }

    /// Cuts `<key>.png` into a `columns x rows` grid. A missing sheet yields
    /// placeholder cells of `fallback_cell` size.
    pub fn sheet(
        &mut self,
        key: &str,
        columns: u32,
        rows: u32,
        fallback_cell: (u32, u32),
    ) -> SpriteSheet {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let fallback_sheet = (fallback_cell.0 * columns, fallback_cell.1 * rows);
        let sheet = self.image(key, fallback_sheet);
        let cell_w = (sheet.width() / columns).max(1);
        let cell_h = (sheet.height() / rows).max(1);
        let mut cells = Vec::with_capacity((columns * rows) as usize);
        for row in 0..rows {
            for column in 0..columns {
                cells.push(Arc::new(sheet.crop(
                    column * cell_w,
                    row * cell_h,
                    cell_w,
                    cell_h,
                )));
            }
        }
        SpriteSheet {
            columns,
            rows,
            cells,
        }
    }

    /// Loads every `*.png` inside the `key` directory, ordered by numeric file
    /// stem (`0.png`, `1.png`, ..., `10.png`). Falls back to one placeholder
    /// frame when the directory is missing or empty.
    pub fn frame_sequence(&mut self, key: &str, fallback_size: (u32, u32)) -> Vec<ImageHandle> {
        let frame_keys = match AssetKey::parse(key) {
            Ok(asset_key) => list_frame_keys(&asset_key.dir_path(&self.root), key),
            Err(_) => Vec::new(),
        };
        if frame_keys.is_empty() {
            if self.warned_keys.insert(key.to_string()) {
                warn!(
                    sprite_key = key,
                    root = %self.root.display(),
                    "frame_sequence_empty_using_placeholder"
                );
            }
            return vec![self.placeholder(key, fallback_size)];
        }
        frame_keys
            .iter()
            .map(|frame_key| self.image(frame_key, fallback_size))
            .collect()
    }

    fn placeholder(&mut self, key: &str, size: (u32, u32)) -> ImageHandle {
        let size = (size.0.max(1), size.1.max(1));
        let cache_key = (key.to_string(), size.0, size.1);
        Arc::clone(
            self.placeholders
                .entry(cache_key)
                .or_insert_with(|| Arc::new(Image::placeholder(size.0, size.1, key))),
        )
    }

    fn warn_once(&mut self, key: &str, error: &AssetError) {
        if !self.warned_keys.insert(key.to_string()) {
            return;
        }
        warn!(
            sprite_key = key,
            error = %error,
            "renderer_sprite_load_failed_using_placeholder"
        );
    }
}

fn load_png(path: &Path) -> Result<Image, AssetError> {
    let reader = ImageReader::open(path).map_err(|source| AssetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader.decode().map_err(|source| AssetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());
    // The decoder always hands back a tightly packed buffer.
    Ok(Image::from_rgba(width, height, rgba.into_raw())
        .unwrap_or_else(|| Image::placeholder(width, height, "decode_mismatch")))
}

fn list_frame_keys(dir: &Path, key: &str) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut stems = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .filter_map(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .map(ToString::to_string)
        })
        .filter(|stem| AssetKey::parse(stem).is_ok())
        .collect::<Vec<_>>();
    stems.sort_by(|left, right| {
        match (left.parse::<u32>(), right.parse::<u32>()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            _ => left.cmp(right),
        }
    });
    stems
        .into_iter()
        .map(|stem| format!("{key}/{stem}"))
        .collect()
}
