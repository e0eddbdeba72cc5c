use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading or writing a scalar grid.
#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed volume: {0}")]
    Format(String),
}

impl VolumeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }
}

/// Failures while reading or writing a delimited numeric table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: cannot parse `{cell}` as a number")]
    Parse { line: usize, cell: String },
    #[error("line {line}: expected {expected} columns, found {found}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("expected a {expected_rows}x{expected_cols} table, found {rows}x{cols}")]
    Shape {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },
}

impl TableError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures while assembling a dataset from its files.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("{channel} volume: {source}")]
    Volume {
        channel: &'static str,
        #[source]
        source: VolumeError,
    },
    #[error("{table} table: {source}")]
    Table {
        table: &'static str,
        #[source]
        source: TableError,
    },
    #[error("opacity grid {opacity:?} and uncertainty grid {uncertainty:?} do not share geometry")]
    GeometryMismatch {
        opacity: [usize; 3],
        uncertainty: [usize; 3],
    },
}
