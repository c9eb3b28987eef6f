//! Session and message storage for plandesk.
//!
//! SQLite via `sqlx`, with the schema embedded as migrations.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
