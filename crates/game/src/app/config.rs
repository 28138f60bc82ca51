use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

pub(crate) const START_MAP_ENV_VAR: &str = "TILEWALK_START_MAP";
pub(crate) const START_SPAWN_ENV_VAR: &str = "TILEWALK_START_SPAWN";

#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings in {path} at '{field}': {message}")]
    Parse {
        path: PathBuf,
        field: String,
        message: String,
    },
    #[error("invalid settings in {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// Tunables read from `assets/base/game.json`. Every field is optional in
/// the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameSettings {
    pub(crate) start_map: String,
    pub(crate) start_spawn: String,
    pub(crate) tile_size: u32,
    pub(crate) animation_speed: f32,
    pub(crate) player_speed: f32,
    pub(crate) tint_speed: f32,
    pub(crate) interaction_radius: f32,
    pub(crate) window_width: u32,
    pub(crate) window_height: u32,
    pub(crate) target_tps: u32,
    pub(crate) max_render_fps: Option<u32>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            start_map: "world".to_string(),
            start_spawn: "house".to_string(),
            tile_size: 64,
            animation_speed: 6.0,
            player_speed: 250.0,
            tint_speed: 600.0,
            interaction_radius: 100.0,
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_render_fps: None,
        }
    }
}

impl GameSettings {
    /// Loads the settings file, falling back to defaults when it does not
    /// exist, then applies the start point environment overrides.
    pub(crate) fn load(path: &Path) -> Result<Self, SettingsError> {
        let mut settings = match fs::read_to_string(path) {
            Ok(raw) => Self::parse(path, &raw)?,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "settings_missing_using_defaults");
                Self::default()
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        settings.apply_overrides(
            read_override(START_MAP_ENV_VAR),
            read_override(START_SPAWN_ENV_VAR),
        );
        Ok(settings)
    }

    pub(crate) fn parse(path: &Path, raw: &str) -> Result<Self, SettingsError> {
        let deserializer = &mut serde_json::Deserializer::from_str(raw);
        let settings: Self =
            serde_path_to_error::deserialize(deserializer).map_err(|error| SettingsError::Parse {
                path: path.to_path_buf(),
                field: error.path().to_string(),
                message: error.inner().to_string(),
            })?;
        settings.validate(path)?;
        Ok(settings)
    }

    fn validate(&self, path: &Path) -> Result<(), SettingsError> {
        let invalid = |message: &str| SettingsError::Invalid {
            path: path.to_path_buf(),
            message: message.to_string(),
        };
        if self.start_map.trim().is_empty() || self.start_spawn.trim().is_empty() {
            return Err(invalid("start_map and start_spawn must not be empty"));
        }
        if self.tile_size == 0 {
            return Err(invalid("tile_size must be greater than zero"));
        }
        let rates = [
            self.animation_speed,
            self.player_speed,
            self.tint_speed,
            self.interaction_radius,
        ];
        if rates.iter().any(|value| !value.is_finite() || *value < 0.0) {
            return Err(invalid("speeds and radius must be finite and non-negative"));
        }
        if self.tint_speed == 0.0 {
            return Err(invalid("tint_speed must be greater than zero"));
        }
        if self.window_width == 0 || self.window_height == 0 || self.target_tps == 0 {
            return Err(invalid("window size and target_tps must be greater than zero"));
        }
        Ok(())
    }

    pub(crate) fn apply_overrides(
        &mut self,
        start_map: Option<String>,
        start_spawn: Option<String>,
    ) {
        if let Some(map) = start_map {
            info!(start_map = %map, "start_map_overridden");
            self.start_map = map;
        }
        if let Some(spawn) = start_spawn {
            info!(start_spawn = %spawn, "start_spawn_overridden");
            self.start_spawn = spawn;
        }
    }
}

fn read_override(var: &'static str) -> Option<String> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        Ok(_) | Err(env::VarError::NotPresent) => None,
        Err(error) => {
            warn!(env_var = var, error = %error, "env_override_unreadable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_object_yields_defaults() {
        let settings = GameSettings::parse(Path::new("game.json"), "{}").expect("settings");
        assert_eq!(settings, GameSettings::default());
        assert_eq!(settings.tint_speed, 600.0);
        assert_eq!(settings.interaction_radius, 100.0);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let settings = GameSettings::parse(
            Path::new("game.json"),
            r#"{ "start_map": "cave", "player_speed": 300 }"#,
        )
        .expect("settings");
        assert_eq!(settings.start_map, "cave");
        assert_eq!(settings.player_speed, 300.0);
        assert_eq!(settings.start_spawn, "house");
    }

    #[test]
    fn type_errors_report_field_path() {
        let err = GameSettings::parse(Path::new("game.json"), r#"{ "tile_size": "big" }"#)
            .expect_err("must fail");
        match err {
            SettingsError::Parse { field, .. } => assert_eq!(field, "tile_size"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = GameSettings::parse(Path::new("game.json"), r#"{ "tile_sise": 32 }"#)
            .expect_err("must fail");
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn zero_tint_speed_is_invalid() {
        let err = GameSettings::parse(Path::new("game.json"), r#"{ "tint_speed": 0 }"#)
            .expect_err("must fail");
        assert!(matches!(err, SettingsError::Invalid { .. }));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let temp = TempDir::new().expect("temp dir");
        let settings = GameSettings::load(&temp.path().join("game.json")).expect("settings");
        assert_eq!(settings.tile_size, 64);
    }

    #[test]
    fn overrides_replace_start_point() {
        let mut settings = GameSettings::default();
        settings.apply_overrides(Some("cave".to_string()), None);
        assert_eq!(settings.start_map, "cave");
        assert_eq!(settings.start_spawn, "house");
    }
}
