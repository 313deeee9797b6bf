use std::path::PathBuf;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::Scene;
use crate::map::RenderStats;

use super::software::SoftwareBackend;
use super::texture_store::TextureStore;

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Viewport {
    width: u32,
    height: u32,
}

/// Presents scene frames through `pixels`.
///
/// The scene draws into the pixel buffer via a [`SoftwareBackend`]; textures
/// it loads go into the renderer's [`TextureStore`].
pub struct Renderer {
    window: &'static Window,
    pixels: Pixels<'static>,
    viewport: Viewport,
    textures: TextureStore,
}

impl Renderer {
    pub fn new(window: &'static Window, asset_root: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(window, size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            textures: TextureStore::new(asset_root),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(self.window, width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: &'static Window,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn textures_mut(&mut self) -> &mut TextureStore {
        &mut self.textures
    }

    /// Draws and presents one frame. A minimized window presents nothing.
    pub(crate) fn render_scene(
        &mut self,
        scene: &mut dyn Scene,
    ) -> Result<Option<RenderStats>, Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(None);
        }
        let frame = self.pixels.frame_mut();
        let mut backend = SoftwareBackend::new(
            frame,
            self.viewport.width,
            self.viewport.height,
            &self.textures,
        );
        backend.clear(CLEAR_COLOR);
        let stats = scene.render(&mut backend);
        self.pixels.render()?;
        Ok(stats)
    }
}
