//! Level files: comma-separated integers, no header, one line per map row.

use std::fs;
use std::io;
use std::path::Path;

use tracing::info;

use super::atomic_io::write_text_atomic;
use super::grid::{Cell, TileGrid};
use super::MapError;

const FIELD_DELIMITER: char = ',';
const UTF8_BOM: char = '\u{feff}';

/// Replaces one level of `grid` with the contents of the file at `path`.
///
/// `level` defaults to the current level. The file is fully parsed before
/// the grid is touched, so any error leaves the grid as it was.
pub fn load_map(grid: &mut TileGrid, path: &Path, level: Option<usize>) -> Result<(), MapError> {
    let level = resolve_level(grid, level)?;
    let text = fs::read_to_string(path).map_err(|source| read_error(path, source))?;
    let cells = parse_level(&text, grid.num_rows(), grid.num_cols())?;
    grid.replace_level(level, cells)?;
    info!(path = %path.display(), level, "map_loaded");
    Ok(())
}

/// Writes one level of `grid` to `path` in the layout [`load_map`] reads.
pub fn save_map(grid: &TileGrid, path: &Path, level: Option<usize>) -> Result<(), MapError> {
    let level = resolve_level(grid, level)?;
    let cells = grid
        .level_cells(level)
        .ok_or_else(|| level_error(level, grid.num_levels()))?;
    let text = format_level(cells, grid.num_cols());
    write_text_atomic(path, &text).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), level, "map_saved");
    Ok(())
}

pub fn parse_level(text: &str, num_rows: usize, num_cols: usize) -> Result<Vec<Cell>, MapError> {
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    let mut lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }

    let rows: Vec<Vec<&str>> = lines
        .iter()
        .map(|line| line.split(FIELD_DELIMITER).collect())
        .collect();
    let mismatch = |actual_rows: usize, actual_cols: usize| MapError::DimensionMismatch {
        expected_rows: num_rows,
        expected_cols: num_cols,
        actual_rows,
        actual_cols,
    };
    if rows.len() != num_rows {
        let first_cols = rows.first().map_or(0, Vec::len);
        return Err(mismatch(rows.len(), first_cols));
    }
    if let Some(row) = rows.iter().find(|row| row.len() != num_cols) {
        return Err(mismatch(rows.len(), row.len()));
    }

    let mut cells = Vec::with_capacity(num_rows * num_cols);
    for (row_index, row) in rows.iter().enumerate() {
        for (col_index, field) in row.iter().enumerate() {
            let field = field.trim();
            let value = field.parse::<i32>().map_err(|_| MapError::Parse {
                row: row_index,
                col: col_index,
                value: field.to_string(),
            })?;
            cells.push(Cell { value });
        }
    }
    Ok(cells)
}

pub fn format_level(cells: &[Cell], num_cols: usize) -> String {
    let mut text = String::with_capacity(cells.len() * 4);
    for row in cells.chunks(num_cols.max(1)) {
        for (col, cell) in row.iter().enumerate() {
            if col > 0 {
                text.push(FIELD_DELIMITER);
            }
            text.push_str(&cell.value.to_string());
        }
        text.push('\n');
    }
    text
}

fn resolve_level(grid: &TileGrid, level: Option<usize>) -> Result<usize, MapError> {
    let level = level.unwrap_or_else(|| grid.current_level());
    if level >= grid.num_levels() {
        return Err(level_error(level, grid.num_levels()));
    }
    Ok(level)
}

fn level_error(level: usize, num_levels: usize) -> MapError {
    MapError::InvalidArgument(format!("level {level} is outside 0..{num_levels}"))
}

fn read_error(path: &Path, source: io::Error) -> MapError {
    if source.kind() == io::ErrorKind::NotFound {
        MapError::AssetLoad {
            path: path.to_path_buf(),
            reason: "file not found".to_string(),
        }
    } else {
        MapError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
