use std::collections::HashSet;

use glam::{Mat4, Vec3, Vec4};
use tracing::warn;

use super::grid::TileGrid;
use super::settings::{Axis, Settings};
use super::texture::{TextureHandle, TextureRegistry};
use super::MapError;

/// Uniform the tile shader reads the per-tile transform from.
pub const TRANSFORM_UNIFORM: &str = "transform";

/// Drawing capabilities the tile renderer needs from a graphics backend.
pub trait RenderBackend {
    /// Source-alpha / one-minus-source-alpha blending.
    fn enable_alpha_blending(&mut self);
    fn disable_blending(&mut self);
    fn use_shader(&mut self, name: &str);
    fn set_transform(&mut self, uniform: &str, transform: &Mat4);
    fn bind_texture(&mut self, handle: TextureHandle);
    fn draw_quad(&mut self, quad: &QuadMesh);
}

/// Quad centered on the origin, sized to one tile in render space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadMesh {
    pub width: f32,
    pub height: f32,
    pub color: Vec4,
}

impl QuadMesh {
    pub fn new(color: Vec4, width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            color,
        }
    }

    /// Corners in counter-clockwise order starting bottom-left.
    pub fn corners(&self) -> [Vec3; 4] {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        [
            Vec3::new(-half_w, -half_h, 0.0),
            Vec3::new(half_w, -half_h, 0.0),
            Vec3::new(half_w, half_h, 0.0),
            Vec3::new(-half_w, half_h, 0.0),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub row: usize,
    pub col: usize,
    pub value: i32,
    pub transform: Mat4,
    pub renderable: bool,
}

/// Placement of every cell of the current level, rows top to bottom and
/// columns left to right.
pub fn tile_placements<'a>(
    grid: &'a TileGrid,
    settings: &'a Settings,
) -> impl Iterator<Item = TilePlacement> + 'a {
    let num_cols = grid.num_cols();
    grid.level_cells(grid.current_level())
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(move |(index, cell)| {
            let row = index / num_cols;
            let col = index % num_cols;
            let translation = Vec3::new(
                settings.convert_index_to_uv_space(Axis::X, col, false, 0.0),
                settings.convert_index_to_uv_space(Axis::Y, row, true, 0.0),
                0.0,
            );
            TilePlacement {
                row,
                col,
                value: cell.value,
                transform: Mat4::from_translation(translation),
                renderable: cell.is_renderable(),
            }
        })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub tiles_visited: usize,
    pub tiles_drawn: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramePhase {
    Idle,
    Prepared,
    Rendered,
}

impl FramePhase {
    fn describe(self) -> &'static str {
        match self {
            FramePhase::Idle => "no frame is open",
            FramePhase::Prepared => "the frame is prepared",
            FramePhase::Rendered => "the frame is already rendered",
        }
    }
}

/// Draws the current level of a grid with one shared quad.
///
/// Each frame is the matched triple `pre_render`, `render`, `post_render`.
#[derive(Debug)]
pub struct TileRenderer {
    shader_name: String,
    quad: QuadMesh,
    phase: FramePhase,
    warned_unknown_tile_types: HashSet<i32>,
}

impl TileRenderer {
    pub fn new(shader_name: impl Into<String>, quad: QuadMesh) -> Self {
        Self {
            shader_name: shader_name.into(),
            quad,
            phase: FramePhase::Idle,
            warned_unknown_tile_types: HashSet::new(),
        }
    }

    pub fn shader_name(&self) -> &str {
        &self.shader_name
    }

    pub fn quad(&self) -> &QuadMesh {
        &self.quad
    }

    pub fn pre_render(&mut self, backend: &mut dyn RenderBackend) -> Result<(), MapError> {
        self.expect_phase(FramePhase::Idle, "pre_render")?;
        backend.enable_alpha_blending();
        backend.use_shader(&self.shader_name);
        self.phase = FramePhase::Prepared;
        Ok(())
    }

    /// Draws every renderable cell. Cells whose tile type has no texture are
    /// skipped and the first such miss is returned after the rest of the
    /// frame has been drawn.
    pub fn render(
        &mut self,
        backend: &mut dyn RenderBackend,
        grid: &TileGrid,
        settings: &Settings,
        textures: &TextureRegistry,
    ) -> Result<RenderStats, MapError> {
        self.expect_phase(FramePhase::Prepared, "render")?;
        self.phase = FramePhase::Rendered;

        let mut stats = RenderStats::default();
        let mut first_miss = None;
        for placement in tile_placements(grid, settings) {
            stats.tiles_visited += 1;
            backend.set_transform(TRANSFORM_UNIFORM, &placement.transform);
            if !placement.renderable {
                continue;
            }
            match textures.lookup(placement.value) {
                Ok(handle) => {
                    backend.bind_texture(handle);
                    backend.draw_quad(&self.quad);
                    stats.tiles_drawn += 1;
                }
                Err(error) => {
                    if self.warned_unknown_tile_types.insert(placement.value) {
                        warn!(
                            tile_type = placement.value,
                            row = placement.row,
                            col = placement.col,
                            "texture_lookup_failed_skipping_tile"
                        );
                    }
                    if first_miss.is_none() {
                        first_miss = Some(error);
                    }
                }
            }
        }

        match first_miss {
            Some(error) => Err(error),
            None => Ok(stats),
        }
    }

    pub fn post_render(&mut self, backend: &mut dyn RenderBackend) -> Result<(), MapError> {
        if self.phase == FramePhase::Idle {
            return Err(MapError::FrameOrder {
                call: "post_render",
                phase: self.phase.describe(),
            });
        }
        backend.disable_blending();
        self.phase = FramePhase::Idle;
        Ok(())
    }

    fn expect_phase(&self, expected: FramePhase, call: &'static str) -> Result<(), MapError> {
        if self.phase != expected {
            return Err(MapError::FrameOrder {
                call,
                phase: self.phase.describe(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::map::grid::MapDimensions;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum BackendCall {
        EnableBlending,
        DisableBlending,
        UseShader(String),
        SetTransform(String, Mat4),
        BindTexture(TextureHandle),
        DrawQuad,
    }

    #[derive(Debug, Default)]
    pub(crate) struct RecordingBackend {
        pub(crate) calls: Vec<BackendCall>,
    }

    impl RecordingBackend {
        pub(crate) fn draw_count(&self) -> usize {
            self.calls
                .iter()
                .filter(|call| matches!(call, BackendCall::DrawQuad))
                .count()
        }

        pub(crate) fn bound_textures(&self) -> Vec<TextureHandle> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    BackendCall::BindTexture(handle) => Some(*handle),
                    _ => None,
                })
                .collect()
        }
    }

    impl RenderBackend for RecordingBackend {
        fn enable_alpha_blending(&mut self) {
            self.calls.push(BackendCall::EnableBlending);
        }

        fn disable_blending(&mut self) {
            self.calls.push(BackendCall::DisableBlending);
        }

        fn use_shader(&mut self, name: &str) {
            self.calls.push(BackendCall::UseShader(name.to_string()));
        }

        fn set_transform(&mut self, uniform: &str, transform: &Mat4) {
            self.calls
                .push(BackendCall::SetTransform(uniform.to_string(), *transform));
        }

        fn bind_texture(&mut self, handle: TextureHandle) {
            self.calls.push(BackendCall::BindTexture(handle));
        }

        fn draw_quad(&mut self, _quad: &QuadMesh) {
            self.calls.push(BackendCall::DrawQuad);
        }
    }

    fn small_grid() -> (TileGrid, Settings) {
        let grid = TileGrid::new(MapDimensions {
            num_levels: 1,
            num_rows: 2,
            num_cols: 4,
        })
        .expect("grid");
        let mut settings = Settings::default();
        settings.set_num_tiles(Axis::X, 4).expect("x");
        settings.set_num_tiles(Axis::Y, 2).expect("y");
        (grid, settings)
    }

    fn renderer() -> TileRenderer {
        TileRenderer::new("Shader2D", QuadMesh::new(Vec4::ONE, 0.5, 1.0))
    }

    fn run_frame(
        renderer: &mut TileRenderer,
        backend: &mut RecordingBackend,
        grid: &TileGrid,
        settings: &Settings,
        textures: &TextureRegistry,
    ) -> Result<RenderStats, MapError> {
        renderer.pre_render(backend).expect("pre");
        let result = renderer.render(backend, grid, settings, textures);
        renderer.post_render(backend).expect("post");
        result
    }

    #[test]
    fn only_values_in_renderable_range_are_drawn() {
        let (mut grid, settings) = small_grid();
        for (col, value) in [0, 1, 199, 200].into_iter().enumerate() {
            grid.set_map_info(0, col, value, false).expect("set");
        }
        grid.set_map_info(1, 0, -1, false).expect("set");
        let mut textures = TextureRegistry::default();
        textures.register(1, TextureHandle(11)).expect("register");
        textures.register(199, TextureHandle(12)).expect("register");

        let mut backend = RecordingBackend::default();
        let stats = run_frame(&mut renderer(), &mut backend, &grid, &settings, &textures)
            .expect("frame");

        assert_eq!(stats.tiles_visited, 8);
        assert_eq!(stats.tiles_drawn, 2);
        assert_eq!(backend.draw_count(), 2);
        assert_eq!(
            backend.bound_textures(),
            vec![TextureHandle(11), TextureHandle(12)]
        );
    }

    #[test]
    fn frame_brackets_blending_and_shader() {
        let (grid, settings) = small_grid();
        let mut backend = RecordingBackend::default();
        run_frame(
            &mut renderer(),
            &mut backend,
            &grid,
            &settings,
            &TextureRegistry::default(),
        )
        .expect("frame");

        assert_eq!(backend.calls[0], BackendCall::EnableBlending);
        assert_eq!(backend.calls[1], BackendCall::UseShader("Shader2D".to_string()));
        assert_eq!(backend.calls.last(), Some(&BackendCall::DisableBlending));
        let transforms = backend
            .calls
            .iter()
            .filter(|call| matches!(call, BackendCall::SetTransform(name, _) if name == TRANSFORM_UNIFORM))
            .count();
        assert_eq!(transforms, 8);
    }

    #[test]
    fn unknown_tile_type_is_skipped_and_reported() {
        let (mut grid, settings) = small_grid();
        grid.set_map_info(0, 0, 5, false).expect("set");
        grid.set_map_info(1, 3, 6, false).expect("set");
        let mut textures = TextureRegistry::default();
        textures.register(6, TextureHandle(2)).expect("register");

        let mut backend = RecordingBackend::default();
        let mut renderer = renderer();
        let result = run_frame(&mut renderer, &mut backend, &grid, &settings, &textures);

        assert!(matches!(
            result,
            Err(MapError::UnknownTileType { tile_type: 5 })
        ));
        assert_eq!(backend.draw_count(), 1);
        assert_eq!(backend.bound_textures(), vec![TextureHandle(2)]);

        // The next frame still runs.
        let result = run_frame(&mut renderer, &mut backend, &grid, &settings, &textures);
        assert!(result.is_err());
        assert_eq!(backend.draw_count(), 2);
    }

    #[test]
    fn out_of_order_calls_are_rejected_without_backend_calls() {
        let (grid, settings) = small_grid();
        let textures = TextureRegistry::default();
        let mut backend = RecordingBackend::default();
        let mut renderer = renderer();

        assert!(matches!(
            renderer.render(&mut backend, &grid, &settings, &textures),
            Err(MapError::FrameOrder { call: "render", .. })
        ));
        assert!(matches!(
            renderer.post_render(&mut backend),
            Err(MapError::FrameOrder { .. })
        ));
        assert!(backend.calls.is_empty());

        renderer.pre_render(&mut backend).expect("pre");
        assert!(renderer.pre_render(&mut backend).is_err());
        renderer
            .render(&mut backend, &grid, &settings, &textures)
            .expect("render");
        assert!(renderer
            .render(&mut backend, &grid, &settings, &textures)
            .is_err());
        renderer.post_render(&mut backend).expect("post");
    }

    #[test]
    fn placements_put_row_zero_at_the_top_left() {
        let (grid, settings) = small_grid();
        let placements: Vec<TilePlacement> = tile_placements(&grid, &settings).collect();
        assert_eq!(placements.len(), 8);
        assert_eq!((placements[0].row, placements[0].col), (0, 0));
        assert_eq!((placements[5].row, placements[5].col), (1, 1));

        let top_left = placements[0].transform.w_axis;
        assert!((top_left.x - -0.75).abs() < 0.0001);
        assert!((top_left.y - 0.5).abs() < 0.0001);
        let below = placements[4].transform.w_axis;
        assert!(below.y < top_left.y);
        let right = placements[1].transform.w_axis;
        assert!(right.x > top_left.x);
    }

    #[test]
    fn quad_corners_span_one_tile() {
        let quad = QuadMesh::new(Vec4::ONE, 0.5, 0.25);
        let corners = quad.corners();
        assert_eq!(corners[0], Vec3::new(-0.25, -0.125, 0.0));
        assert_eq!(corners[2], Vec3::new(0.25, 0.125, 0.0));
    }
}
