use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Text generation failed after {attempts} attempts: {kind}")]
    Generation { kind: String, attempts: u32 },

    #[error("Unknown product id {0}")]
    UnknownProduct(crate::types::ProductId),

    #[error("Degenerate statistic: {message}")]
    Degenerate { message: String },

    #[error("Run halted: iteration {iteration} was aborted and rolled back")]
    Halted { iteration: crate::types::Iteration },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::Degenerate {
            message: message.into(),
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
