//! Error types for cache-composing reads.
//!
//! Cache primitives never fail. The read strategies are generic over the
//! fetch error; this type is a ready-made choice for fetch closures.

/// Error produced by a fetch function.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The underlying data source failed.
    #[error("Fetch failed: {0}")]
    Fetch(String),
}

impl Error {
    pub fn fetch(message: impl Into<String>) -> Self {
        Error::Fetch(message.into())
    }
}

/// Result type for fetch functions.
pub type Result<T> = std::result::Result<T, Error>;
