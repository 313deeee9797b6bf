use std::path::{Path, PathBuf};

use tile_engine::{
    ImageLoader, InputSnapshot, Map2D, MapError, RenderBackend, RenderStats, Scene, SceneCommand,
    Settings, MARKER_MIN,
};
use tracing::{debug, error, info, warn};

use super::config::SceneConfig;

/// Marker cell that places the player when a level loads.
pub(crate) const PLAYER_SPAWN_MARKER: i32 = MARKER_MIN;

/// Win/lose flags raised by gameplay and consumed once per update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct GameManager {
    pub(crate) level_completed: bool,
    pub(crate) player_won: bool,
    pub(crate) player_lost: bool,
}

pub(crate) struct Scene2D {
    config: SceneConfig,
    asset_dir: PathBuf,
    settings: Settings,
    map: Option<Map2D>,
    game_manager: GameManager,
    player_spawn: Option<(usize, usize)>,
    win_logged: bool,
    last_render_error: Option<String>,
}

impl Scene2D {
    pub(crate) fn new(config: SceneConfig, asset_dir: PathBuf) -> Self {
        Self {
            config,
            asset_dir,
            settings: Settings::default(),
            map: None,
            game_manager: GameManager::default(),
            player_spawn: None,
            win_logged: false,
            last_render_error: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn map(&self) -> Option<&Map2D> {
        self.map.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn settings(&self) -> &Settings {
        &self.settings
    }

    #[cfg(test)]
    pub(crate) fn player_spawn(&self) -> Option<(usize, usize)> {
        self.player_spawn
    }

    #[cfg(test)]
    pub(crate) fn game_manager_mut(&mut self) -> &mut GameManager {
        &mut self.game_manager
    }

    fn asset_path(&self, relative: &Path) -> PathBuf {
        self.asset_dir.join(relative)
    }

    fn level_path(&self, level: usize) -> Option<PathBuf> {
        self.config.levels.get(level).map(|path| self.asset_path(path))
    }

    fn save_current_level(&self) -> Result<(), MapError> {
        let Some(map) = self.map.as_ref() else {
            return Ok(());
        };
        let path = self.asset_path(&self.config.save_path);
        if let Err(error) = map.save_map(&path, None) {
            error!(error = %error, path = %path.display(), "map_save_failed");
            return Err(error);
        }
        Ok(())
    }

    /// Warns once per distinct failure; repeats of the previous frame's
    /// failure drop to debug. Returns whether it warned.
    fn note_render_error(&mut self, error: &MapError) -> bool {
        let message = error.to_string();
        if self.last_render_error.as_deref() == Some(message.as_str()) {
            debug!(error = %message, "map_render_incomplete");
            return false;
        }
        warn!(error = %message, "map_render_incomplete");
        self.last_render_error = Some(message);
        true
    }

    fn reload_current_level(&mut self) {
        let Some(map) = self.map.as_mut() else {
            return;
        };
        let level = map.current_level();
        let Some(path) = self.config.levels.get(level).map(|p| self.asset_dir.join(p)) else {
            warn!(level, "map_reload_skipped_no_level_file");
            return;
        };
        if let Err(error) = map.load_map(&path, Some(level)) {
            error!(error = %error, path = %path.display(), "map_reload_failed");
        }
    }

    fn advance_level(&mut self) {
        let Some(map) = self.map.as_mut() else {
            return;
        };
        let previous = map.current_level();
        map.set_current_level(previous + 1);
        let current = map.current_level();
        if current == previous {
            self.game_manager.player_won = true;
        } else {
            info!(previous, current, "level_changed");
        }
    }
}

impl Scene for Scene2D {
    fn load(&mut self, loader: &mut dyn ImageLoader) -> Result<(), MapError> {
        let mut map = Map2D::init(
            &mut self.settings,
            loader,
            self.config.dimensions(),
            &self.config.shader,
            &self.config.tiles,
        )?;
        for level in 0..self.config.levels.len() {
            if let Some(path) = self.level_path(level) {
                map.load_map(&path, Some(level))?;
            }
        }

        self.player_spawn = map.find_value(PLAYER_SPAWN_MARKER, true);
        match self.player_spawn {
            Some((row, col)) => {
                map.set_map_info(row, col, 0, true)?;
                info!(row, col, "player_spawn_found");
            }
            None => warn!(marker = PLAYER_SPAWN_MARKER, "player_spawn_missing"),
        }

        self.map = Some(map);
        self.game_manager = GameManager::default();
        self.win_logged = false;
        Ok(())
    }

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        let Some(map) = self.map.as_mut() else {
            return SceneCommand::None;
        };
        map.update(f64::from(fixed_dt_seconds));

        if input.save_pressed() && self.save_current_level().is_err() {
            info!(reason = "map_save_failed", "scene_quit");
            return SceneCommand::Quit;
        }
        if input.reload_pressed() {
            self.reload_current_level();
        }
        if input.complete_level_pressed() {
            self.game_manager.level_completed = true;
        }

        if self.game_manager.level_completed {
            self.game_manager.level_completed = false;
            self.advance_level();
        }
        if self.game_manager.player_won && !self.win_logged {
            self.win_logged = true;
            info!("player_won");
        }
        if self.game_manager.player_lost {
            info!("player_lost");
            return SceneCommand::Quit;
        }
        SceneCommand::None
    }

    fn render(&mut self, backend: &mut dyn RenderBackend) -> Option<RenderStats> {
        let map = self.map.as_mut()?;
        if let Err(error) = map.pre_render(backend) {
            error!(error = %error, "map_pre_render_failed");
            return None;
        }
        let rendered = map.render(backend, &self.settings);
        if let Err(error) = map.post_render(backend) {
            error!(error = %error, "map_post_render_failed");
        }
        match rendered {
            Ok(stats) => {
                self.last_render_error = None;
                Some(stats)
            }
            Err(error) => {
                self.note_render_error(&error);
                None
            }
        }
    }

    fn unload(&mut self) {
        self.map = None;
        self.player_spawn = None;
        self.last_render_error = None;
        info!("scene_unloaded");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use tile_engine::{Axis, InputAction, Mat4, QuadMesh, TextureHandle, TileTexture};

    use super::*;

    #[derive(Debug, Default)]
    struct CountingLoader {
        loaded: Vec<PathBuf>,
    }

    impl ImageLoader for CountingLoader {
        fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, MapError> {
            self.loaded.push(path.to_path_buf());
            Ok(TextureHandle(self.loaded.len() as u32))
        }
    }

    #[derive(Debug, Default)]
    struct CountingBackend {
        draws: usize,
        transforms: usize,
        blending: bool,
    }

    impl RenderBackend for CountingBackend {
        fn enable_alpha_blending(&mut self) {
            self.blending = true;
        }

        fn disable_blending(&mut self) {
            self.blending = false;
        }

        fn use_shader(&mut self, _name: &str) {}

        fn set_transform(&mut self, _uniform: &str, _transform: &Mat4) {
            self.transforms += 1;
        }

        fn bind_texture(&mut self, _handle: TextureHandle) {}

        fn draw_quad(&mut self, _quad: &QuadMesh) {
            self.draws += 1;
        }
    }

    fn level_text(rows: usize, cols: usize, cells: &[(usize, usize, i32)]) -> String {
        let mut grid = vec![vec![0; cols]; rows];
        for (row, col, value) in cells {
            grid[*row][*col] = *value;
        }
        grid.iter()
            .map(|row| {
                row.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn fixture(dir: &Path) -> SceneConfig {
        fs::create_dir_all(dir.join("maps")).expect("mkdir");
        // Level 0: ground along the bottom row, spawn marker above it.
        fs::write(
            dir.join("maps/level_01.csv"),
            level_text(4, 5, &[(3, 0, 100), (3, 1, 100), (2, 1, 200), (0, 4, 2)]),
        )
        .expect("write");
        fs::write(
            dir.join("maps/level_02.csv"),
            level_text(4, 5, &[(3, 4, 100)]),
        )
        .expect("write");
        SceneConfig {
            num_levels: 2,
            num_rows: 4,
            num_cols: 5,
            shader: "Shader2D".to_string(),
            levels: vec![
                PathBuf::from("maps/level_01.csv"),
                PathBuf::from("maps/level_02.csv"),
            ],
            save_path: PathBuf::from("maps/saved.csv"),
            tiles: vec![
                TileTexture {
                    tile_type: 100,
                    texture: PathBuf::from("images/ground.png"),
                },
                TileTexture {
                    tile_type: 2,
                    texture: PathBuf::from("images/tree.png"),
                },
            ],
        }
    }

    fn loaded_scene(dir: &TempDir) -> Scene2D {
        let mut scene = Scene2D::new(fixture(dir.path()), dir.path().to_path_buf());
        scene
            .load(&mut CountingLoader::default())
            .expect("scene load");
        scene
    }

    #[test]
    fn load_reads_every_level_and_consumes_spawn_marker() {
        let dir = TempDir::new().expect("tempdir");
        let scene = loaded_scene(&dir);
        let map = scene.map().expect("map");

        // Row 2 from the top is row 1 from the bottom.
        assert_eq!(scene.player_spawn(), Some((1, 1)));
        assert_eq!(map.get_map_info(1, 1, true).expect("get"), 0);
        assert_eq!(map.get_map_info(0, 0, true).expect("get"), 100);
        assert_eq!(scene.settings().num_tiles(Axis::X), 5);
        assert_eq!(scene.settings().num_tiles(Axis::Y), 4);
        assert_eq!(map.grid().level_cells(1).expect("level")[19].value, 100);
    }

    #[test]
    fn load_fails_when_a_level_file_is_missing() {
        let dir = TempDir::new().expect("tempdir");
        let mut config = fixture(dir.path());
        config.levels[1] = PathBuf::from("maps/missing.csv");
        let mut scene = Scene2D::new(config, dir.path().to_path_buf());
        assert!(matches!(
            scene.load(&mut CountingLoader::default()),
            Err(MapError::AssetLoad { .. })
        ));
        assert!(scene.map().is_none());
    }

    #[test]
    fn render_draws_only_tiles_of_current_level() {
        let dir = TempDir::new().expect("tempdir");
        let mut scene = loaded_scene(&dir);
        let mut backend = CountingBackend::default();

        assert_eq!(
            scene.render(&mut backend),
            Some(RenderStats {
                tiles_visited: 20,
                tiles_drawn: 3
            })
        );
        assert_eq!(backend.draws, 3);
        assert_eq!(backend.transforms, 20);
        assert!(!backend.blending);

        scene.update(0.016, &InputSnapshot::with_pressed(&[InputAction::CompleteLevel]));
        let mut backend = CountingBackend::default();
        scene.render(&mut backend);
        assert_eq!(backend.draws, 1);
    }

    #[test]
    fn completing_the_last_level_marks_the_player_as_winner() {
        let dir = TempDir::new().expect("tempdir");
        let mut scene = loaded_scene(&dir);

        scene.game_manager_mut().level_completed = true;
        assert_eq!(
            scene.update(0.016, &InputSnapshot::default()),
            SceneCommand::None
        );
        assert_eq!(scene.map().expect("map").current_level(), 1);
        assert!(!scene.game_manager_mut().level_completed);

        scene.game_manager_mut().level_completed = true;
        scene.update(0.016, &InputSnapshot::default());
        assert_eq!(scene.map().expect("map").current_level(), 1);
        assert!(scene.game_manager_mut().player_won);
    }

    #[test]
    fn player_lost_quits() {
        let dir = TempDir::new().expect("tempdir");
        let mut scene = loaded_scene(&dir);
        scene.game_manager_mut().player_lost = true;
        assert_eq!(
            scene.update(0.016, &InputSnapshot::default()),
            SceneCommand::Quit
        );
    }

    #[test]
    fn save_key_writes_current_level_and_reload_restores_file() {
        let dir = TempDir::new().expect("tempdir");
        let mut scene = loaded_scene(&dir);

        scene.update(0.016, &InputSnapshot::with_pressed(&[InputAction::SaveMap]));
        let saved = fs::read_to_string(dir.path().join("maps/saved.csv")).expect("saved");
        assert_eq!(
            saved,
            "0,0,0,0,2\n0,0,0,0,0\n0,0,0,0,0\n100,100,0,0,0\n"
        );

        scene.update(0.016, &InputSnapshot::with_pressed(&[InputAction::ReloadMap]));
        let map = scene.map().expect("map");
        // Reload brings back the spawn marker that load consumed.
        assert_eq!(map.get_map_info(1, 1, true).expect("get"), 200);
    }

    #[test]
    fn unload_releases_the_map() {
        let dir = TempDir::new().expect("tempdir");
        let mut scene = loaded_scene(&dir);
        scene.unload();
        assert!(scene.map().is_none());
        let mut backend = CountingBackend::default();
        assert_eq!(scene.render(&mut backend), None);
        assert_eq!(backend.draws, 0);
        assert_eq!(
            scene.update(0.016, &InputSnapshot::default()),
            SceneCommand::None
        );
    }

    #[test]
    fn failed_save_quits() {
        let dir = TempDir::new().expect("tempdir");
        let mut config = fixture(dir.path());
        // The parent is a file, so the save cannot be written.
        config.save_path = PathBuf::from("maps/level_01.csv/saved.csv");
        let mut scene = Scene2D::new(config, dir.path().to_path_buf());
        scene
            .load(&mut CountingLoader::default())
            .expect("scene load");

        assert_eq!(
            scene.update(0.016, &InputSnapshot::with_pressed(&[InputAction::SaveMap])),
            SceneCommand::Quit
        );
    }

    #[test]
    fn repeated_render_failure_warns_once() {
        let dir = TempDir::new().expect("tempdir");
        let config = fixture(dir.path());
        // 150 has no texture registered.
        fs::write(
            dir.path().join("maps/level_01.csv"),
            level_text(4, 5, &[(3, 0, 100), (0, 0, 150)]),
        )
        .expect("write");
        let mut scene = Scene2D::new(config, dir.path().to_path_buf());
        scene
            .load(&mut CountingLoader::default())
            .expect("scene load");

        let mut backend = CountingBackend::default();
        assert_eq!(scene.render(&mut backend), None);
        assert_eq!(backend.draws, 1);
        let first = scene.last_render_error.clone();
        assert!(first.is_some());

        assert_eq!(scene.render(&mut CountingBackend::default()), None);
        assert_eq!(scene.last_render_error, first);
        assert!(!scene.note_render_error(&MapError::UnknownTileType { tile_type: 150 }));
        assert!(scene.note_render_error(&MapError::UnknownTileType { tile_type: 151 }));

        scene.update(0.016, &InputSnapshot::with_pressed(&[InputAction::CompleteLevel]));
        assert!(scene.render(&mut CountingBackend::default()).is_some());
        assert!(scene.last_render_error.is_none());
    }
}
