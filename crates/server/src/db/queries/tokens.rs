//! Outstanding refresh tokens

use anyhow::Result;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use studyhub_core::UserId;

pub async fn record_refresh_token(
    pool: &Pool,
    user_id: UserId,
    jti: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "INSERT INTO outstanding_tokens (user_id, jti, expires_at) VALUES ($1, $2, $3)",
            &[&user_id, &jti, &expires_at],
        )
        .await?;
    Ok(())
}

/// Live refresh tokens of a user, oldest first.
pub async fn active_token_ids(pool: &Pool, user_id: UserId) -> Result<Vec<String>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT jti FROM outstanding_tokens
             WHERE user_id = $1 AND blacklisted_at IS NULL AND expires_at > NOW()
             ORDER BY created_at ASC, id ASC",
            &[&user_id],
        )
        .await?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
}

/// Blacklist a token. Returns false when it was unknown or already blacklisted.
pub async fn blacklist_token(pool: &Pool, jti: &str) -> Result<bool> {
    let client = pool.get().await?;
    let updated = client
        .execute(
            "UPDATE outstanding_tokens SET blacklisted_at = NOW()
             WHERE jti = $1 AND blacklisted_at IS NULL",
            &[&jti],
        )
        .await?;
    Ok(updated > 0)
}

/// Whether the token was issued by us and is not blacklisted.
pub async fn is_token_usable(pool: &Pool, jti: &str) -> Result<bool> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "SELECT 1 FROM outstanding_tokens WHERE jti = $1 AND blacklisted_at IS NULL",
            &[&jti],
        )
        .await?;
    Ok(row.is_some())
}
