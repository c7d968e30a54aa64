use conversa_core::ConversaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found: {what} {id}")]
    NotFound { what: &'static str, id: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for ConversaError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { what, id } => ConversaError::NotFound(format!("{what} {id}")),
            other => ConversaError::StorageFailure(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
