use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod assets;
pub mod content;
pub mod world;

pub use app::{
    draw_text, line_height, run_app, text_width, wrap_text, AppError, DrawTarget, FrameCanvas,
    InputAction, InputSnapshot, LoopConfig, LoopStatsSnapshot, Renderer, Scene, SceneCommand,
    SceneError, SLOW_FRAME_ENV_VAR,
};
pub use assets::{AssetError, AssetKey, AssetKeyError, AssetStore, Image, ImageHandle, SpriteSheet};
pub use content::{
    load_character_roster, parse_character_roster, parse_map_document, CharacterDef,
    CharacterRoster, ContentError, ContentErrorCode, MapData, MapLibrary, MapObject, ObjectLayer,
    PlacedTile, SourceLocation, TileLayer,
};
pub use world::{
    camera_offset, check_connection, Animation, ColliderId, CollisionIndex, DepthLayer, Entity,
    EntityId, HitboxShape, Movement, Rect, RenderAggregate, TransitionTarget, TransitionZone, Vec2,
};

pub const ROOT_ENV_VAR: &str = "TILEWALK_ROOT";

/// Filesystem layout of the game content under the project root.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub base_content_dir: PathBuf,
    pub sprites_dir: PathBuf,
    pub maps_dir: PathBuf,
    pub characters_file: PathBuf,
    pub settings_file: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: PathBuf) -> Self {
        let base_content_dir = root.join("assets").join("base");
        Self {
            sprites_dir: base_content_dir.join("sprites"),
            maps_dir: base_content_dir.join("maps"),
            characters_file: base_content_dir.join("characters.xml"),
            settings_file: base_content_dir.join("game.json"),
            base_content_dir,
            root,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "{env_var} is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot {
        path: PathBuf,
        env_var: &'static str,
    },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/tilewalk\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    Ok(AppPaths::from_root(resolve_root()?))
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot {
                    path: normalized,
                    env_var: ROOT_ENV_VAR,
                })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            find_root_above(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let temp = TempDir::new().expect("temp dir");
        fs::create_dir_all(temp.path().join("assets")).expect("assets");
        assert!(!is_repo_marker(temp.path()));
        fs::write(temp.path().join("Cargo.toml"), "[workspace]").expect("manifest");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn root_is_found_from_nested_directory() {
        let temp = TempDir::new().expect("temp dir");
        fs::create_dir_all(temp.path().join("crates")).expect("crates");
        fs::write(temp.path().join("Cargo.toml"), "[workspace]").expect("manifest");
        let nested = temp.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested");

        let found = find_root_above(&nested).expect("root");
        assert_eq!(found, normalize_path(temp.path()));
    }

    #[test]
    fn app_paths_follow_content_layout() {
        let paths = AppPaths::from_root(PathBuf::from("root"));
        assert_eq!(
            paths.maps_dir,
            Path::new("root").join("assets").join("base").join("maps")
        );
        assert_eq!(
            paths.settings_file,
            Path::new("root").join("assets").join("base").join("game.json")
        );
    }
}
