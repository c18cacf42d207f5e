pub mod error;
pub mod sqlite_queue;

pub use error::{QueueError, Result};
pub use sqlite_queue::{PendingMessage, SqliteQueue};

use vigia_core::QueueMessage;

/// Destination for accepted hemograms.
pub trait MessageQueue: Send + Sync {
    /// Enqueue a message, returning the queue's message id.
    fn send_message(&self, message: &QueueMessage) -> Result<String>;
}
