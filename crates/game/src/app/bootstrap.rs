use thiserror::Error;
use tilewalk_engine::{
    load_character_roster, resolve_app_paths, AssetStore, ContentError, LoopConfig, MapLibrary,
    Scene, StartupError,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{GameSettings, SettingsError};
use super::gameplay;

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("no maps found in {0}")]
    NoMaps(String),
    #[error("map '{map}' uses tileSize {map_tile_size} but sheets are cut at {tile_size}")]
    TileSizeMismatch {
        map: String,
        map_tile_size: u32,
        tile_size: u32,
    },
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Tilewalk Startup ===");

    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), "project_root_resolved");
    let settings = GameSettings::load(&paths.settings_file)?;

    let mut assets = AssetStore::new(paths.sprites_dir.clone());
    let library = MapLibrary::load_dir(&paths.maps_dir, &mut assets)?;
    if library.is_empty() {
        return Err(BootstrapError::NoMaps(paths.maps_dir.display().to_string()));
    }
    check_tile_sizes(&library, settings.tile_size)?;
    let roster = load_character_roster(&paths.characters_file)?;
    info!(
        maps = library.len(),
        characters = roster.len(),
        start_map = %settings.start_map,
        start_spawn = %settings.start_spawn,
        "content_loaded"
    );

    let scene = gameplay::build_overworld_scene(&settings, library, roster, &mut assets);
    Ok(AppWiring {
        config: loop_config(&settings),
        scene,
    })
}

fn loop_config(settings: &GameSettings) -> LoopConfig {
    LoopConfig {
        window_width: settings.window_width,
        window_height: settings.window_height,
        target_tps: settings.target_tps,
        max_render_fps: settings.max_render_fps,
        ..LoopConfig::default()
    }
}

/// Frames are cut once at `tile_size`, so every map has to share it.
fn check_tile_sizes(library: &MapLibrary, tile_size: u32) -> Result<(), BootstrapError> {
    let mismatch = library
        .names()
        .filter_map(|name| library.get(name))
        .find(|map| map.tile_size != tile_size);
    match mismatch {
        Some(map) => Err(BootstrapError::TileSizeMismatch {
            map: map.name.clone(),
            map_tile_size: map.tile_size,
            tile_size,
        }),
        None => Ok(()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use tilewalk_engine::MapData;

    use super::*;

    fn map(name: &str, tile_size: u32) -> MapData {
        MapData {
            name: name.to_string(),
            tile_size,
            tile_layers: Vec::new(),
            object_layers: Vec::new(),
        }
    }

    #[test]
    fn maps_with_a_different_tile_size_are_rejected() {
        let mut library = MapLibrary::new();
        library.insert(map("world", 64));
        assert!(check_tile_sizes(&library, 64).is_ok());

        library.insert(map("cave", 32));
        let err = check_tile_sizes(&library, 64).expect_err("must fail");
        match err {
            BootstrapError::TileSizeMismatch {
                map,
                map_tile_size,
                tile_size,
            } => {
                assert_eq!(map, "cave");
                assert_eq!((map_tile_size, tile_size), (32, 64));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn loop_config_follows_settings() {
        let settings = GameSettings {
            window_width: 640,
            window_height: 360,
            target_tps: 30,
            max_render_fps: Some(60),
            ..GameSettings::default()
        };
        let config = loop_config(&settings);
        assert_eq!((config.window_width, config.window_height), (640, 360));
        assert_eq!(config.target_tps, 30);
        assert_eq!(config.max_render_fps, Some(60));
        assert_eq!(config.window_title, LoopConfig::default().window_title);
    }
}
