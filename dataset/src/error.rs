use std::path::PathBuf;

use rand::distributions::WeightedError;
use thiserror::Error;

use crate::decoder::DecodeError;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before touching the database.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no audio file is at least {duration}s long")]
    PoolExhausted { duration: f64 },

    #[error("failed to read duration of {}: {source}", path.display())]
    Decoder {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("audio file already indexed: {0}")]
    DuplicateName(String),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to scan datasets: {0}")]
    Scan(#[from] walkdir::Error),

    #[error("invalid sampling weights: {0}")]
    Weights(#[from] WeightedError),

    #[error(transparent)]
    Database(database::Error),
}

impl From<database::Error> for Error {
    fn from(err: database::Error) -> Self {
        match err {
            database::Error::DuplicateName(name) => Self::DuplicateName(name),
            other => Self::Database(other),
        }
    }
}
