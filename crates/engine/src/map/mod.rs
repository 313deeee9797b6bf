mod atomic_io;
mod error;
pub mod grid;
pub mod persistence;
pub mod render;
pub mod settings;
pub mod texture;

use std::path::Path;

use glam::Vec4;
use tracing::info;

pub use error::MapError;
pub use grid::{Cell, MapDimensions, TileGrid, MARKER_MIN, RENDERABLE_MIN};
pub use render::{QuadMesh, RenderBackend, RenderStats, TilePlacement, TileRenderer};
pub use settings::{Axis, Settings};
pub use texture::{ImageLoader, TextureHandle, TextureRegistry, TileTexture};

/// A multi-level tile map with its textures and renderer.
///
/// Built by [`Map2D::init`]; dropping the value releases the grid and the
/// shared quad. Re-initializing means building a new `Map2D`.
#[derive(Debug)]
pub struct Map2D {
    grid: TileGrid,
    textures: TextureRegistry,
    renderer: TileRenderer,
}

impl Map2D {
    /// Allocates a zero-filled grid, publishes its size to `settings` and
    /// loads every tile texture through `loader`.
    ///
    /// Fails on the first texture that cannot be loaded. No map is returned
    /// in that case, but `settings` keep the published tile counts and the
    /// loader keeps whatever it already decoded.
    pub fn init(
        settings: &mut Settings,
        loader: &mut dyn ImageLoader,
        dimensions: MapDimensions,
        shader_name: &str,
        tiles: &[TileTexture],
    ) -> Result<Self, MapError> {
        let grid = TileGrid::new(dimensions)?;
        settings.set_num_tiles(Axis::X, to_tile_count(dimensions.num_cols)?)?;
        settings.set_num_tiles(Axis::Y, to_tile_count(dimensions.num_rows)?)?;

        let quad = QuadMesh::new(Vec4::ONE, settings.tile_width(), settings.tile_height());
        let textures = TextureRegistry::load(loader, tiles)?;
        info!(
            num_levels = dimensions.num_levels,
            num_rows = dimensions.num_rows,
            num_cols = dimensions.num_cols,
            texture_count = textures.len(),
            shader = shader_name,
            "map_initialized"
        );
        Ok(Self {
            grid,
            textures,
            renderer: TileRenderer::new(shader_name, quad),
        })
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    pub fn set_map_info(
        &mut self,
        row: usize,
        col: usize,
        value: i32,
        invert: bool,
    ) -> Result<(), MapError> {
        self.grid.set_map_info(row, col, value, invert)
    }

    pub fn get_map_info(&self, row: usize, col: usize, invert: bool) -> Result<i32, MapError> {
        self.grid.get_map_info(row, col, invert)
    }

    pub fn find_value(&self, value: i32, invert: bool) -> Option<(usize, usize)> {
        self.grid.find_value(value, invert)
    }

    pub fn set_current_level(&mut self, level: usize) {
        self.grid.set_current_level(level);
    }

    pub fn current_level(&self) -> usize {
        self.grid.current_level()
    }

    /// `level` defaults to the current level.
    pub fn load_map(&mut self, path: &Path, level: Option<usize>) -> Result<(), MapError> {
        persistence::load_map(&mut self.grid, path, level)
    }

    /// `level` defaults to the current level.
    pub fn save_map(&self, path: &Path, level: Option<usize>) -> Result<(), MapError> {
        persistence::save_map(&self.grid, path, level)
    }

    /// Tiles are static; nothing advances per frame yet.
    pub fn update(&mut self, _dt_seconds: f64) {}

    pub fn pre_render(&mut self, backend: &mut dyn RenderBackend) -> Result<(), MapError> {
        self.renderer.pre_render(backend)
    }

    pub fn render(
        &mut self,
        backend: &mut dyn RenderBackend,
        settings: &Settings,
    ) -> Result<RenderStats, MapError> {
        self.renderer
            .render(backend, &self.grid, settings, &self.textures)
    }

    pub fn post_render(&mut self, backend: &mut dyn RenderBackend) -> Result<(), MapError> {
        self.renderer.post_render(backend)
    }
}

fn to_tile_count(count: usize) -> Result<u32, MapError> {
    u32::try_from(count)
        .map_err(|_| MapError::InvalidArgument(format!("tile count {count} does not fit in u32")))
}
