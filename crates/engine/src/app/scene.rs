use crate::map::{ImageLoader, MapError, RenderBackend, RenderStats};

use super::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// A scene driven by the app loop: loaded once, stepped at a fixed rate,
/// rendered once per redraw and unloaded on shutdown.
///
/// `render` reports what it drew, or `None` when nothing was attempted.
pub trait Scene {
    fn load(&mut self, loader: &mut dyn ImageLoader) -> Result<(), MapError>;
    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand;
    fn render(&mut self, backend: &mut dyn RenderBackend) -> Option<RenderStats>;
    fn unload(&mut self);
}
