//! Error types shared by every pipeline stage.
//!
//! Only fail-fast conditions live here: bad arguments and out-of-bound
//! accesses, plus the I/O failures of the demo tooling. Numerical degeneracy
//! and non-convergence are reported through stage status fields instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("out of bound: {0}")]
    OutOfBound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    pub(crate) fn bad_argument(msg: impl Into<String>) -> Self {
        Error::BadArgument(msg.into())
    }

    pub(crate) fn out_of_bound(msg: impl Into<String>) -> Self {
        Error::OutOfBound(msg.into())
    }

    /// `true` for the fail-fast argument class of errors.
    pub fn is_bad_argument(&self) -> bool {
        matches!(self, Error::BadArgument(_))
    }

    /// `true` for index/coordinate/vertex lookups outside the valid range.
    pub fn is_out_of_bound(&self) -> bool {
        matches!(self, Error::OutOfBound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
