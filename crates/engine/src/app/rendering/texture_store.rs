use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::ImageReader;
use tracing::debug;

use crate::map::{ImageLoader, MapError, TextureHandle};

#[derive(Debug)]
pub struct LoadedTexture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl LoadedTexture {
    /// Nearest texel for normalized `u`, `v` (row 0 of the image is `v = 0`).
    pub fn sample(&self, u: f32, v: f32) -> [u8; 4] {
        if self.width == 0 || self.height == 0 {
            return [0, 0, 0, 0];
        }
        let x = ((u.clamp(0.0, 1.0) * self.width as f32) as u32).min(self.width - 1);
        let y = ((v.clamp(0.0, 1.0) * self.height as f32) as u32).min(self.height - 1);
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        match self.rgba.get(offset..offset + 4) {
            Some(texel) => [texel[0], texel[1], texel[2], texel[3]],
            None => [0, 0, 0, 0],
        }
    }
}

/// Decoded RGBA textures, keyed by the handles handed out to the map.
///
/// Relative paths resolve against `asset_root`; every path is decoded once.
#[derive(Debug)]
pub struct TextureStore {
    asset_root: PathBuf,
    textures: Vec<LoadedTexture>,
    handles_by_path: HashMap<PathBuf, TextureHandle>,
}

impl TextureStore {
    pub fn new(asset_root: PathBuf) -> Self {
        Self {
            asset_root,
            textures: Vec::new(),
            handles_by_path: HashMap::new(),
        }
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&LoadedTexture> {
        let index = (handle.0 as usize).checked_sub(1)?;
        self.textures.get(index)
    }

    pub(crate) fn insert(&mut self, texture: LoadedTexture) -> TextureHandle {
        self.textures.push(texture);
        // Handle 0 stays free to mean "no texture".
        TextureHandle(self.textures.len() as u32)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl ImageLoader for TextureStore {
    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, MapError> {
        let resolved = self.asset_root.join(path);
        if let Some(handle) = self.handles_by_path.get(&resolved) {
            return Ok(*handle);
        }
        let texture = load_texture_rgba(&resolved).map_err(|reason| MapError::AssetLoad {
            path: resolved.clone(),
            reason,
        })?;
        debug!(
            path = %resolved.display(),
            width = texture.width,
            height = texture.height,
            "texture_loaded"
        );
        let handle = self.insert(texture);
        self.handles_by_path.insert(resolved, handle);
        Ok(handle)
    }
}

fn load_texture_rgba(path: &Path) -> Result<LoadedTexture, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedTexture {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}
