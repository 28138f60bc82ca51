use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetKeyError {
    #[error("asset key must not be empty")]
    Empty,
    #[error("asset key segment {index} is empty")]
    EmptySegment { index: usize },
    #[error("asset key must not contain '..'")]
    ParentTraversal,
    #[error("asset key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Slash-separated, lowercase asset path without extension,
/// e.g. `tilesets/water/0` or `characters/player`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn parse(raw: &str) -> Result<Self, AssetKeyError> {
        if raw.is_empty() {
            return Err(AssetKeyError::Empty);
        }
        if raw.contains("..") {
            return Err(AssetKeyError::ParentTraversal);
        }
        for (index, segment) in raw.split('/').enumerate() {
            if segment.is_empty() {
                return Err(AssetKeyError::EmptySegment { index });
            }
            if let Some(character) = segment.chars().find(|ch| !is_key_char(*ch)) {
                return Err(AssetKeyError::InvalidCharacter { character });
            }
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn png_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in self.0.split('/') {
            path.push(segment);
        }
        path.set_extension("png");
        path
    }

    pub fn dir_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in self.0.split('/') {
            path.push(segment);
        }
        path
    }
}

fn is_key_char(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '-'
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
