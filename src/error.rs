//! Error types for the voice pack builder

use thiserror::Error;

/// Result type alias for builder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a voice pack
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Sound list loading error
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Clip could not be retrieved from the generation endpoint
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Clip could not be transcoded to OGG
    #[error("encode error: {0}")]
    Encode(String),

    /// Release archive could not be assembled
    #[error("packaging error: {0}")]
    Packaging(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
