use tracing::warn;

use super::MapError;

/// Width and height of normalized render space (`-1..1` on each axis).
const RENDER_SPACE_EXTENT: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    /// Reserved; setters accept it as a no-op.
    Z,
}

/// Shared coordinate space of the map.
///
/// Tile sizes are expressed in normalized render units, so a map of
/// `num_tiles_x` columns always spans the full `-1..1` horizontal range.
/// Derived values are recomputed by every setter.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    num_tiles_x: u32,
    num_tiles_y: u32,
    steps_per_tile_x: f32,
    steps_per_tile_y: f32,
    tile_width: f32,
    tile_height: f32,
    micro_step_x: f32,
    micro_step_y: f32,
}

impl Default for Settings {
    fn default() -> Self {
        let mut settings = Self {
            num_tiles_x: 32,
            num_tiles_y: 24,
            steps_per_tile_x: 8.0,
            steps_per_tile_y: 8.0,
            tile_width: 0.0,
            tile_height: 0.0,
            micro_step_x: 0.0,
            micro_step_y: 0.0,
        };
        settings.recompute_tile_sizes();
        settings
    }
}

impl Settings {
    pub fn num_tiles(&self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.num_tiles_x,
            Axis::Y => self.num_tiles_y,
            Axis::Z => 1,
        }
    }

    pub fn steps_per_tile(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.steps_per_tile_x,
            Axis::Y => self.steps_per_tile_y,
            Axis::Z => 1.0,
        }
    }

    pub fn tile_width(&self) -> f32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> f32 {
        self.tile_height
    }

    pub fn micro_step(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.micro_step_x,
            Axis::Y => self.micro_step_y,
            Axis::Z => 0.0,
        }
    }

    pub fn set_num_tiles(&mut self, axis: Axis, value: u32) -> Result<(), MapError> {
        if value == 0 {
            warn!(axis = ?axis, value, "settings_num_tiles_rejected");
            return Err(MapError::InvalidArgument(format!(
                "number of tiles on {axis:?} must be more than 0"
            )));
        }
        match axis {
            Axis::X => self.num_tiles_x = value,
            Axis::Y => self.num_tiles_y = value,
            Axis::Z => return Ok(()),
        }
        self.recompute_tile_sizes();
        Ok(())
    }

    pub fn set_num_steps(&mut self, axis: Axis, value: u32) -> Result<(), MapError> {
        if value == 0 {
            warn!(axis = ?axis, value, "settings_num_steps_rejected");
            return Err(MapError::InvalidArgument(format!(
                "number of steps per tile on {axis:?} must be more than 0"
            )));
        }
        match axis {
            Axis::X => self.steps_per_tile_x = value as f32,
            Axis::Y => self.steps_per_tile_y = value as f32,
            Axis::Z => return Ok(()),
        }
        self.recompute_tile_sizes();
        Ok(())
    }

    /// Maps a grid index to the center of that tile in render space.
    ///
    /// With `invert == false` index 0 sits at the left (x) or bottom (y)
    /// edge. With `invert == true` on the y axis index 0 sits at the top,
    /// which matches row-major storage where row 0 is the top of the map.
    pub fn convert_index_to_uv_space(
        &self,
        axis: Axis,
        index: usize,
        invert: bool,
        offset: f32,
    ) -> f32 {
        let index = index as f32;
        match axis {
            Axis::X => -1.0 + index * self.tile_width + self.tile_width / 2.0 + offset,
            Axis::Y if invert => {
                1.0 - (index + 1.0) * self.tile_height + self.tile_height / 2.0 + offset
            }
            Axis::Y => -1.0 + index * self.tile_height + self.tile_height / 2.0 + offset,
            Axis::Z => offset,
        }
    }

    fn recompute_tile_sizes(&mut self) {
        self.tile_width = RENDER_SPACE_EXTENT / self.num_tiles_x as f32;
        self.tile_height = RENDER_SPACE_EXTENT / self.num_tiles_y as f32;
        self.micro_step_x = self.tile_width / self.steps_per_tile_x;
        self.micro_step_y = self.tile_height / self.steps_per_tile_y;
    }
}
