//! Error types for sitepush-core

use aws_sdk_s3::error::SdkError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sitepush-core
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sitepush-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidConfig(String),

    /// Source directory missing or not a directory
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),

    /// The storage client could not be built
    #[error("Failed to initialize storage client: {0}")]
    ClientInit(String),

    /// Object storage operation errors
    #[error("Storage operation failed: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// Generic SdkError conversion for all S3 operations.
// Keeps the top-level cause only; callers log the full chain.
impl<E> From<SdkError<E>> for Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: SdkError<E>) -> Self {
        let message = match &err {
            SdkError::ServiceError(service) => service.err().to_string(),
            SdkError::TimeoutError(_) => "request timed out".to_string(),
            SdkError::DispatchFailure(failure) if failure.is_timeout() => {
                "request timed out".to_string()
            }
            SdkError::DispatchFailure(_) => "connection failed, request was not sent".to_string(),
            SdkError::ResponseError(_) => "invalid response from the storage service".to_string(),
            SdkError::ConstructionFailure(_) => "request could not be built".to_string(),
            _ => err.to_string(),
        };
        Error::Storage(message)
    }
}
