mod renderer;
mod software;
mod texture_store;

pub use renderer::Renderer;
pub use software::SoftwareBackend;
pub use texture_store::{LoadedTexture, TextureStore};
