//! Database query functions for the `messages` table.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::models::{Message, MessageRole};

/// Parameters for inserting a new message row.
#[derive(Debug, Clone)]
pub struct NewMessage<'a> {
    pub session_id: &'a str,
    pub role: MessageRole,
    pub content: Option<&'a str>,
    pub tool_call_id: Option<&'a str>,
    pub tool_calls: Option<&'a Value>,
}

impl<'a> NewMessage<'a> {
    /// A plain text message with no tool metadata.
    pub fn text(session_id: &'a str, role: MessageRole, content: &'a str) -> Self {
        Self {
            session_id,
            role,
            content: Some(content),
            tool_call_id: None,
            tool_calls: None,
        }
    }
}

/// Insert a new message row. Returns the inserted row with its
/// auto-incremented id.
///
/// Fails when `session_id` does not reference an existing session.
pub async fn insert_message(pool: &SqlitePool, new: &NewMessage<'_>) -> Result<Message> {
    let message = sqlx::query_as::<_, Message>(
        "INSERT INTO messages (session_id, role, content, tool_call_id, tool_calls, created_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         RETURNING *",
    )
    .bind(new.session_id)
    .bind(new.role)
    .bind(new.content)
    .bind(new.tool_call_id)
    .bind(new.tool_calls.map(Json))
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .with_context(|| {
        format!(
            "failed to insert {} message for session {}",
            new.role, new.session_id
        )
    })?;

    Ok(message)
}

/// All messages of a session in insertion order (id ascending).
pub async fn list_messages_for_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages \
         WHERE session_id = ? \
         ORDER BY id ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list messages for session {session_id}"))?;

    Ok(messages)
}

/// Number of messages stored for a session.
pub async fn count_messages_for_session(pool: &SqlitePool, session_id: &str) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE session_id = ?")
        .bind(session_id)
        .fetch_one(pool)
        .await
        .context("failed to count messages")?;

    Ok(count)
}
