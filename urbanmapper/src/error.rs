use thiserror::Error;

/// Error taxonomy for the toolkit.
///
/// `Validation` covers malformed or missing configuration, `State` covers
/// operations invoked before required setup or in violation of the
/// single-use mapping invariant. Neither is ever retried internally.
#[derive(Debug, Error)]
pub enum UrbanError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("state error: {0}")]
    State(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataframe error: {0}")]
    DataFrame(#[from] polars::prelude::PolarsError),

    #[error("geometry error: {0}")]
    Geometry(String),
}

impl UrbanError {
    pub fn validation(msg: impl Into<String>) -> Self {
        UrbanError::Validation(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        UrbanError::State(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, UrbanError::Validation(_))
    }

    pub fn is_state(&self) -> bool {
        matches!(self, UrbanError::State(_))
    }
}

pub type Result<T> = std::result::Result<T, UrbanError>;
