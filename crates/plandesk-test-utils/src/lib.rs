//! Shared test utilities for plandesk integration tests.
//!
//! Provides a disposable in-memory SQLite database with the full schema
//! applied. Each test owns its own [`TestDb`]; nothing is shared between
//! tests, so they may run in parallel.
//!
//! ```ignore
//! let mut db = TestDb::new();
//! let pool = db.create().await?;
//! insert_test_session(pool, "s1", "/tmp", None).await;
//! db.clear().await?;
//! db.close().await;
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use plandesk_db::models::{Message, MessageRole, Session, SessionStatus};
use plandesk_db::pool;
use plandesk_db::queries::{messages, sessions};

/// Errors surfaced by the [`TestDb`] lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum TestDbError {
    #[error("test database not initialized; call TestDb::create first")]
    NotInitialized,

    #[error("failed to set up test database: {0:#}")]
    Setup(anyhow::Error),

    #[error("test database query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Handle to a schema-initialized in-memory database.
///
/// Holds at most one live pool. [`TestDb::create`] replaces any previous
/// pool after closing it, so repeated setup never leaks connections.
#[derive(Debug, Default)]
pub struct TestDb {
    pool: Option<SqlitePool>,
}

impl TestDb {
    /// An uninitialized handle. Call [`TestDb::create`] before use.
    pub const fn new() -> Self {
        Self { pool: None }
    }

    /// Open a fresh in-memory database with migrations applied.
    ///
    /// Closes the previously held database first, if any.
    pub async fn create(&mut self) -> Result<&SqlitePool, TestDbError> {
        self.close().await;

        let pool = pool::create_in_memory_pool()
            .await
            .map_err(TestDbError::Setup)?;
        pool::run_migrations(&pool)
            .await
            .map_err(TestDbError::Setup)?;

        debug!("test database created");
        Ok(self.pool.insert(pool))
    }

    /// The live pool, or [`TestDbError::NotInitialized`].
    pub fn get(&self) -> Result<&SqlitePool, TestDbError> {
        self.pool.as_ref().ok_or(TestDbError::NotInitialized)
    }

    /// Whether a database is currently held.
    pub fn is_open(&self) -> bool {
        self.pool.is_some()
    }

    /// Delete every row from `messages` and then `sessions`.
    ///
    /// No-op when uninitialized.
    pub async fn clear(&self) -> Result<(), TestDbError> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        // Children first so the foreign key never sees an orphan.
        sqlx::query("DELETE FROM messages").execute(pool).await?;
        sqlx::query("DELETE FROM sessions").execute(pool).await?;
        Ok(())
    }

    /// Close the database and drop the handle. No-op if already closed.
    pub async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            debug!("test database closed");
        }
    }
}

/// Create a [`TestDb`] that is already initialized.
///
/// Panics if the database cannot be set up.
pub async fn create_test_db() -> TestDb {
    let mut db = TestDb::new();
    db.create()
        .await
        .unwrap_or_else(|e| panic!("failed to create test database: {e}"));
    db
}

// ---------------------------------------------------------------------------
// Seed / query helpers
// ---------------------------------------------------------------------------

/// Insert a session with test defaults: status `idle` unless given, zero
/// tokens, no title, timestamps set to now.
pub async fn insert_test_session(
    pool: &SqlitePool,
    id: &str,
    working_dir: &str,
    status: Option<SessionStatus>,
) -> Session {
    let new = sessions::NewSession {
        id,
        working_dir,
        title: None,
        status: status.unwrap_or_default(),
    };
    sessions::insert_session(pool, &new)
        .await
        .unwrap_or_else(|e| panic!("failed to insert test session {id}: {e:#}"))
}

/// Insert a plain text message into an existing session.
pub async fn insert_test_message(
    pool: &SqlitePool,
    session_id: &str,
    role: MessageRole,
    content: &str,
) -> Message {
    messages::insert_message(pool, &messages::NewMessage::text(session_id, role, content))
        .await
        .unwrap_or_else(|e| panic!("failed to insert test message: {e:#}"))
}

/// Fetch a session by id.
pub async fn get_test_session(pool: &SqlitePool, id: &str) -> Option<Session> {
    sessions::get_session(pool, id)
        .await
        .unwrap_or_else(|e| panic!("failed to fetch test session {id}: {e:#}"))
}

/// Fetch a session's messages ordered by id ascending.
pub async fn get_test_messages(pool: &SqlitePool, session_id: &str) -> Vec<Message> {
    messages::list_messages_for_session(pool, session_id)
        .await
        .unwrap_or_else(|e| panic!("failed to fetch messages for {session_id}: {e:#}"))
}
