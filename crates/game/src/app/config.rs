use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tile_engine::{MapDimensions, TileTexture};

/// Scene description read from `assets/scene2d.json`.
///
/// Level files, the save path and textures are relative to the asset dir.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SceneConfig {
    pub(crate) num_levels: usize,
    pub(crate) num_rows: usize,
    pub(crate) num_cols: usize,
    #[serde(default = "default_shader")]
    pub(crate) shader: String,
    #[serde(default)]
    pub(crate) levels: Vec<PathBuf>,
    pub(crate) save_path: PathBuf,
    #[serde(default)]
    pub(crate) tiles: Vec<TileTexture>,
}

fn default_shader() -> String {
    "Shader2D".to_string()
}

impl SceneConfig {
    pub(crate) fn dimensions(&self) -> MapDimensions {
        MapDimensions {
            num_levels: self.num_levels,
            num_rows: self.num_rows,
            num_cols: self.num_cols,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read scene config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scene config {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid scene config {path}: {field}: {message}")]
    Validation {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
}

pub(crate) fn load_scene_config(path: &Path) -> Result<SceneConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_scene_config(&raw).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    validate_scene_config(&config).map_err(|(field, message)| ConfigError::Validation {
        path: path.to_path_buf(),
        field,
        message,
    })?;
    Ok(config)
}

fn parse_scene_config(raw: &str) -> Result<SceneConfig, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, SceneConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse json: {source}"))
            } else {
                Err(format!("parse json at {path}: {source}"))
            }
        }
    }
}

fn validate_scene_config(config: &SceneConfig) -> Result<(), (&'static str, String)> {
    for (field, value) in [
        ("num_levels", config.num_levels),
        ("num_rows", config.num_rows),
        ("num_cols", config.num_cols),
    ] {
        if value == 0 {
            return Err((field, "must be greater than zero".to_string()));
        }
    }
    if config.levels.len() > config.num_levels {
        return Err((
            "levels",
            format!(
                "expected at most {} level files, got {}",
                config.num_levels,
                config.levels.len()
            ),
        ));
    }
    if config.shader.trim().is_empty() {
        return Err(("shader", "must not be empty".to_string()));
    }
    Ok(())
}
