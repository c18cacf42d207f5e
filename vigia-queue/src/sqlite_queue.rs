//! SQLite-backed FIFO outbox for accepted hemograms
//!
//! Schema:
//!   - queue_messages: one row per tracking id, oldest first by `seq`
//!
//! The tracking id is the deduplication key: sending the same message twice
//! returns the id assigned the first time.

use crate::error::{QueueError, Result};
use crate::MessageQueue;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;
use vigia_core::{ExamStatus, QueueMessage};

/// Default number of delivery attempts before a message is marked failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// A message waiting for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    pub message_id: String,
    pub tracking_id: String,
    pub message_group_id: String,
    pub correlation_id: String,
    pub body: String,
    pub attempts: u32,
}

/// SQLite-based message queue
pub struct SqliteQueue {
    conn: Mutex<Connection>,
    message_group_id: String,
    max_attempts: u32,
}

#[allow(clippy::result_large_err)]
impl SqliteQueue {
    /// Open the queue (create if not exists)
    pub fn open(path: impl AsRef<Path>, message_group_id: impl Into<String>) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for read-write concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS queue_messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id TEXT NOT NULL UNIQUE,
                tracking_id TEXT NOT NULL UNIQUE,
                message_group_id TEXT NOT NULL,
                correlation_id TEXT NOT NULL,
                laboratory_cnes TEXT NOT NULL,
                body TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'queued',
                attempts INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                enqueued_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_queue_status ON queue_messages(status)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            message_group_id: message_group_id.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Mark messages failed after `max_attempts` delivery failures.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| QueueError::Other("queue connection lock poisoned".to_string()))
    }

    /// Oldest queued messages first
    pub fn pending(&self, limit: usize) -> Result<Vec<PendingMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT message_id, tracking_id, message_group_id, correlation_id, body, attempts
             FROM queue_messages WHERE status = 'queued' ORDER BY seq LIMIT ?",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(PendingMessage {
                message_id: row.get(0)?,
                tracking_id: row.get(1)?,
                message_group_id: row.get(2)?,
                correlation_id: row.get(3)?,
                body: row.get(4)?,
                attempts: row.get(5)?,
            })
        })?;

        let mut pending = Vec::new();
        for message in rows {
            pending.push(message?);
        }
        Ok(pending)
    }

    /// Hand-off succeeded: the message is now with the processing pipeline.
    pub fn mark_dispatched(&self, message_id: &str) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE queue_messages SET status = 'processing', updated_at = ? WHERE message_id = ?",
            params![Utc::now().to_rfc3339(), message_id],
        )?;
        if rows == 0 {
            return Err(QueueError::NotFound {
                message_id: message_id.to_string(),
            });
        }
        Ok(())
    }

    /// Count a failed delivery. Returns the resulting status.
    pub fn record_failure(&self, message_id: &str, error: &str) -> Result<ExamStatus> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE queue_messages
             SET attempts = attempts + 1,
                 last_error = ?,
                 status = CASE WHEN attempts + 1 >= ? THEN 'failed' ELSE 'queued' END,
                 updated_at = ?
             WHERE message_id = ?",
            params![error, self.max_attempts, Utc::now().to_rfc3339(), message_id],
        )?;
        if rows == 0 {
            return Err(QueueError::NotFound {
                message_id: message_id.to_string(),
            });
        }

        let status: String = conn.query_row(
            "SELECT status FROM queue_messages WHERE message_id = ?",
            params![message_id],
            |row| row.get(0),
        )?;
        ExamStatus::parse(&status)
            .ok_or_else(|| QueueError::Other(format!("Unknown status: {}", status)))
    }

    /// Current status of a hemogram, if it was ever enqueued
    pub fn status(&self, tracking_id: &Uuid) -> Result<Option<ExamStatus>> {
        let conn = self.conn()?;
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM queue_messages WHERE tracking_id = ?",
                params![tracking_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.as_deref().and_then(ExamStatus::parse))
    }

    /// Message counts by status
    pub fn count_by_status(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM queue_messages GROUP BY status ORDER BY status",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }
}

impl MessageQueue for SqliteQueue {
    fn send_message(&self, message: &QueueMessage) -> Result<String> {
        let body = serde_json::to_string(message)?;
        let tracking_id = message.tracking_id.to_string();

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT message_id FROM queue_messages WHERE tracking_id = ?",
                params![tracking_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(message_id) = existing {
            tracing::debug!(
                tracking_id = %tracking_id,
                message_id = %message_id,
                "Duplicate message ignored"
            );
            return Ok(message_id);
        }

        let message_id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO queue_messages
                (message_id, tracking_id, message_group_id, correlation_id, laboratory_cnes,
                 body, status, enqueued_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 'queued', ?, ?)",
            params![
                message_id,
                tracking_id,
                self.message_group_id,
                message.correlation_id,
                message.laboratory_cnes,
                body,
                message.received_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        tracing::info!(
            tracking_id = %tracking_id,
            message_id = %message_id,
            message_group_id = %self.message_group_id,
            "Message enqueued"
        );

        Ok(message_id)
    }
}
