//! Crate-level error taxonomy.
//!
//! Four variants, matching the four classes in the error handling design:
//! transient I/O, data validation, invariant violation, and configuration.
//! Keeping them distinct lets callers decide retry vs. skip vs. abort by
//! matching on the variant instead of inspecting message strings.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("database error: {0}")]
    Db(String),

    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<tokio_postgres::Error> for Error {
    fn from(e: tokio_postgres::Error) -> Self {
        Error::Db(e.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for Error {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        Error::Db(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
