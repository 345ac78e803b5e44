// Error types for subfeed.
// Covers the fetch taxonomy (missing credential, backend message, expiry, transient)
// plus HTTP, config, callback and IO failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubfeedError {
    #[error("No access token available, log in first")]
    MissingCredential,

    #[error("{0}")]
    Application(String),

    #[error("Session expired, please log in again")]
    AuthExpired,

    #[error("Failed to fetch videos: {0}")]
    Transient(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Authentication cancelled or failed: {0}")]
    CallbackDenied(String),

    #[error("Redirect URL carries neither tokens nor an authorization code")]
    NoCredentials,

    #[error("Code exchange failed: {0}")]
    Exchange(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SubfeedError>;
