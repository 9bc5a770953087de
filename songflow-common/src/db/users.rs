//! User identity records

use crate::identity::UserId;
use crate::time::unix_now;
use crate::Result;
use sqlx::SqlitePool;

/// Record an identity on first contact (no-op when already known)
pub async fn record_user(pool: &SqlitePool, user: &UserId) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO users (id, created_at) VALUES (?, ?)")
        .bind(user.as_str())
        .bind(unix_now())
        .execute(pool)
        .await?;

    Ok(())
}
