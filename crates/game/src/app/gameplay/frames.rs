use std::collections::HashMap;

use tilewalk_engine::{AssetStore, ImageHandle};
use tracing::{debug, warn};

use super::actors::{CharacterFrames, Facing};

const WATER_KEY: &str = "tilesets/water";
const COAST_KEY: &str = "tilesets/coast";
const CHARACTER_KEY_PREFIX: &str = "characters";

/// The coast sheet holds one 3x3 block per terrain, side by side, repeated
/// every third row for each animation frame.
const COAST_COLUMNS: u32 = 24;
const COAST_ROWS: u32 = 12;
const COAST_BLOCK: u32 = 3;
pub(crate) const COAST_TERRAINS: [&str; 8] = [
    "grass", "grass_i", "sand_i", "sand", "rock", "rock_i", "ice", "ice_i",
];
pub(crate) const COAST_SIDES: [(&str, (u32, u32)); 8] = [
    ("topleft", (0, 0)),
    ("top", (1, 0)),
    ("topright", (2, 0)),
    ("left", (0, 1)),
    ("right", (2, 1)),
    ("bottomleft", (0, 2)),
    ("bottom", (1, 2)),
    ("bottomright", (2, 2)),
];

const CHARACTER_COLUMNS: u32 = 4;
const CHARACTER_ROWS: u32 = 4;
/// Character cells are two tiles on each side.
const CHARACTER_CELL_TILES: u32 = 2;

/// Pre-cut animation frames for everything the world setup places.
#[derive(Debug, Clone, Default)]
pub(crate) struct OverworldFrames {
    water: Vec<ImageHandle>,
    coast: HashMap<(String, String), Vec<ImageHandle>>,
    characters: HashMap<String, CharacterFrames>,
}

impl OverworldFrames {
    /// Cuts the water, coast and character sheets. `graphics` names the
    /// character sheets to load; missing files become placeholders.
    pub(crate) fn import<'a>(
        assets: &mut AssetStore,
        tile_size: u32,
        graphics: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let tile = (tile_size, tile_size);
        let water = assets.frame_sequence(WATER_KEY, tile);

        let sheet = assets.sheet(COAST_KEY, COAST_COLUMNS, COAST_ROWS, tile);
        let mut coast = HashMap::new();
        for (terrain_index, terrain) in COAST_TERRAINS.iter().enumerate() {
            let block_column = terrain_index as u32 * COAST_BLOCK;
            for (side, (column, row)) in COAST_SIDES {
                let frames = (row..COAST_ROWS)
                    .step_by(COAST_BLOCK as usize)
                    .filter_map(|frame_row| sheet.cell(block_column + column, frame_row).cloned())
                    .collect::<Vec<_>>();
                coast.insert((terrain.to_string(), side.to_string()), frames);
            }
        }

        let cell = tile_size * CHARACTER_CELL_TILES;
        let mut characters = HashMap::new();
        for graphic in graphics {
            if characters.contains_key(graphic) {
                continue;
            }
            let key = format!("{CHARACTER_KEY_PREFIX}/{graphic}");
            let sheet = assets.sheet(&key, CHARACTER_COLUMNS, CHARACTER_ROWS, (cell, cell));
            let walk = Facing::ALL.map(|facing| {
                (0..CHARACTER_COLUMNS)
                    .filter_map(|column| sheet.cell(column, facing.sheet_row()).cloned())
                    .collect::<Vec<_>>()
            });
            match CharacterFrames::new(walk) {
                Some(frames) => {
                    characters.insert(graphic.to_string(), frames);
                }
                None => warn!(graphic, "character_sheet_incomplete"),
            }
        }

        debug!(
            water_frames = water.len(),
            coast_sets = coast.len(),
            character_sheets = characters.len(),
            "overworld_frames_imported"
        );
        Self {
            water,
            coast,
            characters,
        }
    }

    pub(crate) fn water(&self) -> &[ImageHandle] {
        &self.water
    }

    pub(crate) fn coast(&self, terrain: &str, side: &str) -> Option<&[ImageHandle]> {
        self.coast
            .get(&(terrain.to_string(), side.to_string()))
            .map(Vec::as_slice)
            .filter(|frames| !frames.is_empty())
    }

    pub(crate) fn character(&self, graphic: &str) -> Option<&CharacterFrames> {
        self.characters.get(graphic)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    #[test]
    fn missing_sheets_fall_back_to_tile_sized_placeholders() {
        let temp = TempDir::new().expect("temp dir");
        let mut assets = AssetStore::new(temp.path().to_path_buf());
        let frames = OverworldFrames::import(&mut assets, 64, ["player", "player"]);

        assert_eq!(frames.water().len(), 1);
        assert_eq!(frames.water()[0].width(), 64);
        let coast = frames.coast("sand", "topleft").expect("coast");
        assert_eq!(coast.len(), 4);
        assert_eq!((coast[0].width(), coast[0].height()), (64, 64));
        let player = frames.character("player").expect("player");
        assert_eq!(player.walk(Facing::Up).len(), 4);
        assert_eq!(player.idle(Facing::Up)[0].width(), 128);
        assert!(frames.character("blob").is_none());
        assert!(frames.coast("lava", "top").is_none());
    }

    fn write_sheet(path: &Path, columns: u32, rows: u32, cell: u32) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dir");
        }
        let image = RgbaImage::from_fn(columns * cell, rows * cell, |x, y| {
            Rgba([(x / cell) as u8, (y / cell) as u8, 0, 255])
        });
        image.save(path).expect("write png");
    }

    #[test]
    fn coast_frames_step_down_the_sheet() {
        let temp = TempDir::new().expect("temp dir");
        write_sheet(&temp.path().join("tilesets").join("coast.png"), 24, 12, 2);
        let mut assets = AssetStore::new(temp.path().to_path_buf());
        let frames = OverworldFrames::import(&mut assets, 2, Vec::<&str>::new());

        let bottom = frames.coast("sand", "bottom").expect("coast");
        let cells = bottom
            .iter()
            .map(|frame| {
                let pixel = frame.pixel(0, 0).expect("pixel");
                (pixel[0], pixel[1])
            })
            .collect::<Vec<_>>();
        // sand is the fourth terrain: block column 9, side column 1.
        assert_eq!(cells, vec![(10, 2), (10, 5), (10, 8), (10, 11)]);
    }

    #[test]
    fn character_rows_follow_facing_order() {
        let temp = TempDir::new().expect("temp dir");
        write_sheet(&temp.path().join("characters").join("o1.png"), 4, 4, 4);
        let mut assets = AssetStore::new(temp.path().to_path_buf());
        let frames = OverworldFrames::import(&mut assets, 2, ["o1"]);

        let sheet = frames.character("o1").expect("o1");
        let first_row = |facing| sheet.walk(facing)[0].pixel(0, 0).expect("pixel")[1];
        assert_eq!(first_row(Facing::Down), 0);
        assert_eq!(first_row(Facing::Left), 1);
        assert_eq!(first_row(Facing::Right), 2);
        assert_eq!(first_row(Facing::Up), 3);
    }
}
