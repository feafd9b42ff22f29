//! Configuration error types

use thiserror::Error;

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating the report store configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A `REPORTSTORE_*` override could not be parsed
    #[error("Environment variable error: {0}")]
    EnvError(String),

    /// A value failed validation within its domain
    #[error("Domain configuration error in {domain}: {message}")]
    DomainError { domain: String, message: String },
}
