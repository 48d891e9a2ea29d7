use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One violated constraint inside a rejected request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationDetail {
    /// JSON pointer to the offending value ("/" for the document root)
    pub path: String,
    pub message: String,
}

/// Structured rejection returned to callers as the body of a 400 response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub message: String,
    pub details: Vec<ValidationDetail>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, path: impl Into<String>, message: impl Into<String>) -> Self {
        self.details.push(ValidationDetail {
            path: path.into(),
            message: message.into(),
        });
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for detail in &self.details {
            write!(f, "; {}: {}", detail.path, detail.message)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum RollupError {
    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl From<ValidationError> for RollupError {
    fn from(err: ValidationError) -> Self {
        RollupError::Validation(err)
    }
}

pub type Result<T> = std::result::Result<T, RollupError>;
