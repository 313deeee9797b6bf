use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to load asset {path}: {reason}")]
    AssetLoad { path: PathBuf, reason: String },
    #[error(
        "map size mismatch: expected {expected_rows} rows x {expected_cols} columns, \
got {actual_rows} rows x {actual_cols} columns"
    )]
    DimensionMismatch {
        expected_rows: usize,
        expected_cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },
    #[error("invalid tile value '{value}' at row {row}, column {col}")]
    Parse {
        row: usize,
        col: usize,
        value: String,
    },
    #[error("no texture registered for tile type {tile_type}")]
    UnknownTileType { tile_type: i32 },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("cell ({row}, {col}) is outside the {num_rows}x{num_cols} grid")]
    OutOfRange {
        row: usize,
        col: usize,
        num_rows: usize,
        num_cols: usize,
    },
    #[error("render call out of order: {call} while {phase}")]
    FrameOrder {
        call: &'static str,
        phase: &'static str,
    },
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
