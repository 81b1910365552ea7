//! Database queries (PostgreSQL)
//!
//! One module per table group. Every query takes the pool, checks out a
//! connection and maps rows into core model types.

pub mod concepts;
pub mod courses;
pub mod daily;
pub mod discussion;
pub mod problems;
pub mod submissions;
pub mod tokens;
pub mod users;

use anyhow::Result;
use deadpool_postgres::Pool;

// ============================================================================
// EVENTS
// ============================================================================

pub async fn log_event(
    pool: &Pool,
    event_type: &str,
    entity_type: Option<&str>,
    entity_id: Option<&str>,
    payload: Option<&serde_json::Value>,
    actor: Option<&str>,
) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "INSERT INTO events (event_type, entity_type, entity_id, payload, actor)
             VALUES ($1, $2, $3, $4, $5)",
            &[&event_type, &entity_type, &entity_id, &payload, &actor],
        )
        .await?;
    Ok(())
}

/// Whether a database error is a unique-constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<tokio_postgres::Error>()
        .and_then(|e| e.code())
        .map(|code| *code == tokio_postgres::error::SqlState::UNIQUE_VIOLATION)
        .unwrap_or(false)
}
