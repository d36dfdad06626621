use thiserror::Error;

pub type LeadgenResult<T> = Result<T, LeadgenError>;

#[derive(Error, Debug)]
pub enum LeadgenError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
