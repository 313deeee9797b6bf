use std::path::PathBuf;

use thiserror::Error;
use tile_engine::{LoopConfig, Scene};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{load_scene_config, ConfigError};
use super::paths::{resolve_app_paths, StartupError};
use super::scene2d::Scene2D;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
    pub(crate) asset_root: PathBuf,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Scene2D Startup ===");

    let paths = resolve_app_paths()?;
    let scene_config = load_scene_config(&paths.scene_config)?;
    info!(
        root = %paths.root.display(),
        scene_config = %paths.scene_config.display(),
        num_levels = scene_config.num_levels,
        num_rows = scene_config.num_rows,
        num_cols = scene_config.num_cols,
        "scene_config_loaded"
    );

    let scene = Scene2D::new(scene_config, paths.asset_dir.clone());
    Ok(AppWiring {
        config: LoopConfig::default(),
        scene: Box::new(scene),
        asset_root: paths.asset_dir,
    })
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
