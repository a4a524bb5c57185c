use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Property not found: {id}")]
    PropertyNotFound { id: String },

    #[error("Storage rejected the write: {reason}")]
    Persistence { reason: String },

    #[error("Failed to decode store response: {reason}")]
    Decode { reason: String },

    #[error("Batch write incomplete: {written} of {expected} rows confirmed")]
    PartialWrite { expected: usize, written: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl CalendarError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CalendarError>;
