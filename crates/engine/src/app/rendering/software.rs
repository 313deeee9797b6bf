use glam::{Mat4, Vec4};
use tracing::{debug, warn};

use crate::map::render::TRANSFORM_UNIFORM;
use crate::map::{QuadMesh, RenderBackend, TextureHandle};

use super::texture_store::TextureStore;

/// Rasterizes map quads into an RGBA8 frame.
///
/// Render space is `-1..1` on both axes with `+y` up; the frame is row-major
/// with row 0 at the top. Quads are drawn as their screen-aligned bounds, so
/// rotation in the transform is not represented.
pub struct SoftwareBackend<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
    textures: &'a TextureStore,
    blending: bool,
    active_shader: Option<String>,
    transform: Mat4,
    bound_texture: Option<TextureHandle>,
    warned_missing_texture: bool,
}

impl<'a> SoftwareBackend<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32, textures: &'a TextureStore) -> Self {
        Self {
            frame,
            width,
            height,
            textures,
            blending: false,
            active_shader: None,
            transform: Mat4::IDENTITY,
            bound_texture: None,
            warned_missing_texture: false,
        }
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    #[cfg(test)]
    fn active_shader(&self) -> Option<&str> {
        self.active_shader.as_deref()
    }

    #[cfg(test)]
    fn blending_enabled(&self) -> bool {
        self.blending
    }

    fn texel(&mut self, u: f32, v: f32) -> [u8; 4] {
        let Some(handle) = self.bound_texture else {
            return [255, 255, 255, 255];
        };
        match self.textures.get(handle) {
            Some(texture) => texture.sample(u, v),
            None => {
                if !self.warned_missing_texture {
                    self.warned_missing_texture = true;
                    warn!(handle = handle.0, "software_backend_texture_missing");
                }
                [255, 0, 255, 255]
            }
        }
    }
}

impl RenderBackend for SoftwareBackend<'_> {
    fn enable_alpha_blending(&mut self) {
        self.blending = true;
    }

    fn disable_blending(&mut self) {
        self.blending = false;
    }

    fn use_shader(&mut self, name: &str) {
        if self.active_shader.as_deref() == Some(name) {
            return;
        }
        debug!(shader = name, "software_backend_shader_bound");
        self.active_shader = Some(name.to_string());
    }

    fn set_transform(&mut self, uniform: &str, transform: &Mat4) {
        if uniform == TRANSFORM_UNIFORM {
            self.transform = *transform;
        }
    }

    fn bind_texture(&mut self, handle: TextureHandle) {
        self.bound_texture = Some(handle);
    }

    fn draw_quad(&mut self, quad: &QuadMesh) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
        for corner in quad.corners() {
            let point = self.transform.transform_point3(corner);
            min_x = min_x.min(point.x);
            max_x = max_x.max(point.x);
            min_y = min_y.min(point.y);
            max_y = max_y.max(point.y);
        }

        let left = ndc_to_pixel_x(min_x, self.width);
        let right = ndc_to_pixel_x(max_x, self.width);
        let top = ndc_to_pixel_y(max_y, self.height);
        let bottom = ndc_to_pixel_y(min_y, self.height);
        let span_x = right - left;
        let span_y = bottom - top;
        if span_x <= f32::EPSILON || span_y <= f32::EPSILON {
            return;
        }

        let x_start = (left.round() as i32).max(0);
        let x_end = (right.round() as i32).min(self.width as i32);
        let y_start = (top.round() as i32).max(0);
        let y_end = (bottom.round() as i32).min(self.height as i32);

        for y in y_start..y_end {
            let v = (y as f32 + 0.5 - top) / span_y;
            for x in x_start..x_end {
                let u = (x as f32 + 0.5 - left) / span_x;
                let color = modulate(self.texel(u, v), quad.color);
                let blending = self.blending;
                write_pixel_rgba_clipped(self.frame, self.width as usize, x, y, color, blending);
            }
        }
    }
}

fn ndc_to_pixel_x(x: f32, width: u32) -> f32 {
    (x + 1.0) * 0.5 * width as f32
}

fn ndc_to_pixel_y(y: f32, height: u32) -> f32 {
    (1.0 - y) * 0.5 * height as f32
}

fn modulate(texel: [u8; 4], color: Vec4) -> [u8; 4] {
    let channel = |value: u8, factor: f32| (value as f32 * factor.clamp(0.0, 1.0)).round() as u8;
    [
        channel(texel[0], color.x),
        channel(texel[1], color.y),
        channel(texel[2], color.z),
        channel(texel[3], color.w),
    ]
}

fn blend_over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let alpha = src[3] as f32 / 255.0;
    let mix = |s: u8, d: u8| (s as f32 * alpha + d as f32 * (1.0 - alpha)).round() as u8;
    [
        mix(src[0], dst[0]),
        mix(src[1], dst[1]),
        mix(src[2], dst[2]),
        (src[3] as f32 + dst[3] as f32 * (1.0 - alpha)).round().min(255.0) as u8,
    ]
}

fn write_pixel_rgba_clipped(
    frame: &mut [u8],
    width: usize,
    x: i32,
    y: i32,
    color: [u8; 4],
    blending: bool,
) {
    if x < 0 || y < 0 {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    let pixel = &mut frame[byte_offset..end];
    let out = if blending {
        blend_over(color, [pixel[0], pixel[1], pixel[2], pixel[3]])
    } else {
        color
    };
    pixel.copy_from_slice(&out);
}
