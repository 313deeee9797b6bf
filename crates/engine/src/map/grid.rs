use super::MapError;

/// Lowest tile value that is drawn.
pub const RENDERABLE_MIN: i32 = 1;
/// Values from here up are markers (spawn points, goals) and never drawn.
pub const MARKER_MIN: i32 = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Cell {
    pub value: i32,
}

impl Cell {
    pub fn is_empty(self) -> bool {
        self.value == 0
    }

    pub fn is_renderable(self) -> bool {
        is_renderable_value(self.value)
    }

    pub fn is_marker(self) -> bool {
        self.value >= MARKER_MIN
    }
}

pub fn is_renderable_value(value: i32) -> bool {
    (RENDERABLE_MIN..MARKER_MIN).contains(&value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapDimensions {
    pub num_levels: usize,
    pub num_rows: usize,
    pub num_cols: usize,
}

impl MapDimensions {
    pub fn cells_per_level(&self) -> usize {
        self.num_rows * self.num_cols
    }
}

/// Tile values for every level, stored level-major then row-major in one
/// buffer: `(level * num_rows + row) * num_cols + col`.
///
/// Row 0 is the top of the displayed map. Accessors taking `invert` address
/// rows bottom-up instead without touching the storage layout.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    dimensions: MapDimensions,
    cells: Vec<Cell>,
    current_level: usize,
}

impl TileGrid {
    pub fn new(dimensions: MapDimensions) -> Result<Self, MapError> {
        let MapDimensions {
            num_levels,
            num_rows,
            num_cols,
        } = dimensions;
        if num_levels == 0 || num_rows == 0 || num_cols == 0 {
            return Err(MapError::InvalidArgument(format!(
                "grid dimensions must be non-zero, got {num_levels} levels x {num_rows} rows x {num_cols} columns"
            )));
        }
        let total = num_levels
            .checked_mul(dimensions.cells_per_level())
            .ok_or_else(|| MapError::InvalidArgument("grid dimensions overflow".to_string()))?;
        Ok(Self {
            dimensions,
            cells: vec![Cell::default(); total],
            current_level: 0,
        })
    }

    pub fn dimensions(&self) -> MapDimensions {
        self.dimensions
    }

    pub fn num_rows(&self) -> usize {
        self.dimensions.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.dimensions.num_cols
    }

    pub fn num_levels(&self) -> usize {
        self.dimensions.num_levels
    }

    pub fn current_level(&self) -> usize {
        self.current_level
    }

    /// Out-of-range levels are ignored and the current level is kept.
    pub fn set_current_level(&mut self, level: usize) {
        if level < self.dimensions.num_levels {
            self.current_level = level;
        }
    }

    pub fn set_map_info(
        &mut self,
        row: usize,
        col: usize,
        value: i32,
        invert: bool,
    ) -> Result<(), MapError> {
        let index = self.cell_index(self.current_level, row, col, invert)?;
        self.cells[index].value = value;
        Ok(())
    }

    pub fn get_map_info(&self, row: usize, col: usize, invert: bool) -> Result<i32, MapError> {
        let index = self.cell_index(self.current_level, row, col, invert)?;
        Ok(self.cells[index].value)
    }

    /// First cell of the current level holding `value`, scanning rows top to
    /// bottom and columns left to right. The reported row honours `invert`.
    pub fn find_value(&self, value: i32, invert: bool) -> Option<(usize, usize)> {
        let cells = self.level_cells(self.current_level)?;
        let position = cells.iter().position(|cell| cell.value == value)?;
        let row = position / self.num_cols();
        let col = position % self.num_cols();
        Some((self.apply_invert(row, invert), col))
    }

    pub fn level_cells(&self, level: usize) -> Option<&[Cell]> {
        let range = self.level_range(level)?;
        Some(&self.cells[range])
    }

    /// Swaps in a complete level. The grid is untouched unless `cells` holds
    /// exactly one level's worth of values.
    pub fn replace_level(&mut self, level: usize, cells: Vec<Cell>) -> Result<(), MapError> {
        let Some(range) = self.level_range(level) else {
            return Err(MapError::InvalidArgument(format!(
                "level {level} is outside 0..{}",
                self.dimensions.num_levels
            )));
        };
        if cells.len() != self.dimensions.cells_per_level() {
            return Err(MapError::InvalidArgument(format!(
                "level replacement holds {} cells, expected {}",
                cells.len(),
                self.dimensions.cells_per_level()
            )));
        }
        self.cells[range].copy_from_slice(&cells);
        Ok(())
    }

    fn level_range(&self, level: usize) -> Option<std::ops::Range<usize>> {
        if level >= self.dimensions.num_levels {
            return None;
        }
        let per_level = self.dimensions.cells_per_level();
        let start = level * per_level;
        Some(start..start + per_level)
    }

    fn cell_index(
        &self,
        level: usize,
        row: usize,
        col: usize,
        invert: bool,
    ) -> Result<usize, MapError> {
        let MapDimensions {
            num_rows, num_cols, ..
        } = self.dimensions;
        if row >= num_rows || col >= num_cols {
            return Err(MapError::OutOfRange {
                row,
                col,
                num_rows,
                num_cols,
            });
        }
        let row = self.apply_invert(row, invert);
        Ok((level * num_rows + row) * num_cols + col)
    }

    fn apply_invert(&self, row: usize, invert: bool) -> usize {
        if invert {
            self.dimensions.num_rows - row - 1
        } else {
            row
        }
    }
}
