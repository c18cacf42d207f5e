use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Message not found: {message_id}")]
    NotFound { message_id: String },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;
