//! Write transactions
//!
//! A deferred transaction that reads before writing fails with
//! `SQLITE_BUSY` when another connection holds the write lock; the busy
//! timeout does not cover that upgrade. Write paths start with
//! `BEGIN IMMEDIATE` and queue on the busy timeout instead.

use crate::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Open a transaction that holds the database write lock from its start
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}
