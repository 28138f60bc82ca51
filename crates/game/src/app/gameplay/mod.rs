mod actors;
mod dialog;
mod frames;
mod overlay;
mod scene_impl;
mod setup;
mod transition;

use tilewalk_engine::{AssetStore, CharacterRoster, MapLibrary, Scene};

use super::config::GameSettings;

use frames::OverworldFrames;
use scene_impl::{LibraryWorldSource, OverworldScene, SceneParams};
use setup::SetupParams;

/// Cuts every sheet the library refers to and wraps the content in the
/// overworld scene.
pub(crate) fn build_overworld_scene(
    settings: &GameSettings,
    library: MapLibrary,
    roster: CharacterRoster,
    assets: &mut AssetStore,
) -> Box<dyn Scene> {
    let graphics = setup::referenced_graphics(library.names().filter_map(|name| library.get(name)));
    let frames = OverworldFrames::import(
        assets,
        settings.tile_size,
        graphics.iter().map(String::as_str),
    );
    let source = LibraryWorldSource::new(
        library,
        frames,
        roster,
        SetupParams {
            player_speed: settings.player_speed,
        },
    );
    Box::new(OverworldScene::new(source, scene_params(settings)))
}

fn scene_params(settings: &GameSettings) -> SceneParams {
    SceneParams {
        start_map: settings.start_map.clone(),
        start_spawn: settings.start_spawn.clone(),
        animation_speed: settings.animation_speed,
        interaction_radius: settings.interaction_radius,
        tint_speed: settings.tint_speed,
    }
}
