use thiserror::Error;

/// Errors produced by the sectorgrid pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The border could not be fetched or parsed. Fatal for the run.
    #[error("border source unavailable: {0}")]
    SourceUnavailable(String),

    /// Degenerate bounding box or step size.
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    /// Degenerate sector radius, span or angular step.
    #[error("invalid sector parameters: {0}")]
    InvalidSectorParams(String),

    /// A single geometric operation failed on bad input.
    #[error("geometry operation failed: {0}")]
    GeometryOp(String),

    /// Reading or writing the persistent store failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// A coordinate reference system could not be built or applied.
    #[error("projection failed: {0}")]
    Projection(String),

    /// A configuration file could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The worker pool could not be constructed.
    #[error("failed to build worker pool: {0}")]
    Executor(#[from] rayon::ThreadPoolBuildError),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self { Error::Storage(err.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
