use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::grid::is_renderable_value;
use super::MapError;

/// Opaque handle to a texture owned by an [`ImageLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

pub trait ImageLoader {
    /// Loads (or returns the cached) texture at `path`.
    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, MapError>;
}

/// One `(tile type, texture file)` pair of a tile set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TileTexture {
    pub tile_type: i32,
    pub texture: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct TextureRegistry {
    by_tile_type: HashMap<i32, TextureHandle>,
}

impl TextureRegistry {
    /// Loads every texture in order and stops at the first failure.
    pub fn load(loader: &mut dyn ImageLoader, tiles: &[TileTexture]) -> Result<Self, MapError> {
        let mut registry = Self::default();
        for tile in tiles {
            let handle = loader.load_texture(&tile.texture)?;
            registry.register(tile.tile_type, handle)?;
            debug!(
                tile_type = tile.tile_type,
                texture = %tile.texture.display(),
                handle = handle.0,
                "tile_texture_registered"
            );
        }
        Ok(registry)
    }

    /// A tile type that is already registered keeps its first handle.
    pub fn register(&mut self, tile_type: i32, handle: TextureHandle) -> Result<(), MapError> {
        if !is_renderable_value(tile_type) {
            return Err(MapError::InvalidArgument(format!(
                "tile type {tile_type} is not in the renderable range"
            )));
        }
        if let Some(existing) = self.by_tile_type.get(&tile_type) {
            warn!(
                tile_type,
                existing = existing.0,
                ignored = handle.0,
                "tile_texture_already_registered"
            );
            return Ok(());
        }
        self.by_tile_type.insert(tile_type, handle);
        Ok(())
    }

    pub fn lookup(&self, tile_type: i32) -> Result<TextureHandle, MapError> {
        self.by_tile_type
            .get(&tile_type)
            .copied()
            .ok_or(MapError::UnknownTileType { tile_type })
    }

    #[cfg(test)]
    fn contains(&self, tile_type: i32) -> bool {
        self.by_tile_type.contains_key(&tile_type)
    }

    pub fn len(&self) -> usize {
        self.by_tile_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tile_type.is_empty()
    }
}
