pub mod app;
pub mod map;

pub use glam::{Mat4, Vec3, Vec4};

pub use app::{
    run_app, AppError, InputAction, InputSnapshot, LoadedTexture, LoopConfig, Renderer, Scene,
    SceneCommand, SoftwareBackend, TextureStore,
};
pub use map::{
    Axis, Cell, ImageLoader, Map2D, MapDimensions, MapError, QuadMesh, RenderBackend,
    RenderStats, Settings, TextureHandle, TextureRegistry, TileGrid, TilePlacement,
    TileRenderer, TileTexture, MARKER_MIN, RENDERABLE_MIN,
};
