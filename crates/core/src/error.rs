use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The backing store failed to open, query or write
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn StdError + Send + Sync>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The page input could not be read as a channel page
    #[error("page error: {0}")]
    Page(String),
}

impl CoreError {
    pub fn storage<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        CoreError::Storage(err.into())
    }
}
