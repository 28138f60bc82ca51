mod character_defs;
mod error;
mod library;
mod map_data;
mod map_document;

pub use character_defs::{
    load_character_roster, parse_character_roster, CharacterDef, CharacterRoster,
};
pub use error::{ContentError, ContentErrorCode, SourceLocation};
pub use library::MapLibrary;
pub use map_data::{MapData, MapObject, ObjectLayer, PlacedTile, TileLayer};
pub use map_document::{load_map_document, parse_map_document, DEFAULT_TILE_SIZE};
