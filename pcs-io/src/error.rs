use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("file {0:?} has no recognizable extension")]
    UnknownExtension(PathBuf),

    #[error("unsupported point cloud format {0:?}")]
    UnsupportedFormat(String),

    #[error("missing coordinate column {0:?}")]
    MissingCoordinateColumn(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Las(#[from] las::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Las(#[from] las::Error),
}
