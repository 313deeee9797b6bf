mod frame_stats;
mod input;
mod loop_runner;
mod rendering;
mod scene;

pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use rendering::{LoadedTexture, Renderer, SoftwareBackend, TextureStore};
pub use scene::{Scene, SceneCommand};
