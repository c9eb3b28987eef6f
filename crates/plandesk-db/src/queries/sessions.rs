//! Database query functions for the `sessions` table.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{Session, SessionStatus};

/// Parameters for inserting a new session row.
#[derive(Debug, Clone)]
pub struct NewSession<'a> {
    pub id: &'a str,
    pub working_dir: &'a str,
    pub title: Option<&'a str>,
    pub status: SessionStatus,
}

/// Insert a new session row with zero tokens and both timestamps set to now.
pub async fn insert_session(pool: &SqlitePool, new: &NewSession<'_>) -> Result<Session> {
    let now = Utc::now();
    let session = sqlx::query_as::<_, Session>(
        "INSERT INTO sessions (id, status, working_dir, title, total_tokens, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 0, ?, ?) \
         RETURNING *",
    )
    .bind(new.id)
    .bind(new.status)
    .bind(new.working_dir)
    .bind(new.title)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert session {}", new.id))?;

    Ok(session)
}

/// Fetch a session by its ID.
pub async fn get_session(pool: &SqlitePool, id: &str) -> Result<Option<Session>> {
    let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch session")?;

    Ok(session)
}

/// List all sessions, most recently updated first.
pub async fn list_sessions(pool: &SqlitePool) -> Result<Vec<Session>> {
    let sessions =
        sqlx::query_as::<_, Session>("SELECT * FROM sessions ORDER BY updated_at DESC, id")
            .fetch_all(pool)
            .await
            .context("failed to list sessions")?;

    Ok(sessions)
}

/// Update the status of a session and bump `updated_at`.
pub async fn update_session_status(
    pool: &SqlitePool,
    id: &str,
    status: SessionStatus,
) -> Result<()> {
    let result = sqlx::query("UPDATE sessions SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("failed to update session status")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("session {id} not found");
    }

    Ok(())
}

/// Point a session at a plan filename, or clear it with `None`.
pub async fn set_current_plan(pool: &SqlitePool, id: &str, plan: Option<&str>) -> Result<()> {
    let result = sqlx::query("UPDATE sessions SET current_plan = ?, updated_at = ? WHERE id = ?")
        .bind(plan)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("failed to set current plan")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("session {id} not found");
    }

    Ok(())
}

/// Add `delta` to a session's token counter. Returns the new total.
pub async fn add_tokens(pool: &SqlitePool, id: &str, delta: i64) -> Result<i64> {
    let total: Option<(i64,)> = sqlx::query_as(
        "UPDATE sessions SET total_tokens = total_tokens + ?, updated_at = ? \
         WHERE id = ? \
         RETURNING total_tokens",
    )
    .bind(delta)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to add session tokens")?;

    match total {
        Some((total,)) => Ok(total),
        None => anyhow::bail!("session {id} not found"),
    }
}

/// Delete a session. Its messages are removed by the cascading foreign key.
///
/// Returns `false` when no session had that ID.
pub async fn delete_session(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to delete session {id}"))?;

    Ok(result.rows_affected() > 0)
}
