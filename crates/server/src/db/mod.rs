//! Database module
//!
//! One PostgreSQL database holds everything. `init_db` creates it on first
//! start and applies the schema.

pub mod queries;
pub mod schema;

use anyhow::{anyhow, Result};
use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

pub type DbPool = Pool;

/// Strip a trailing database name, if any, from a connection URL.
pub fn base_url(url: &str) -> &str {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    if without_scheme.contains('/') {
        url.trim_end_matches(|c: char| c != '/').trim_end_matches('/')
    } else {
        url.trim_end_matches('/')
    }
}

/// Initialize the server database, creating it if it doesn't exist.
pub async fn init_db(database_url: &str, db_name: &str) -> Result<DbPool> {
    if !db_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(anyhow!(
            "Invalid database name: must be alphanumeric with underscores only"
        ));
    }

    let base_url = base_url(database_url);

    // Connect to the postgres database to create ours if needed
    let admin_pool = create_pool(&format!("{}/postgres", base_url))?;
    let admin_client = admin_pool.get().await?;

    let row = admin_client
        .query_opt("SELECT 1 FROM pg_database WHERE datname = $1", &[&db_name])
        .await?;

    if row.is_none() {
        admin_client
            .execute(&format!("CREATE DATABASE {}", db_name), &[])
            .await?;
        info!("Created database: {}", db_name);
    }

    let pool = create_pool(&format!("{}/{}", base_url, db_name))?;

    let client = pool.get().await?;
    schema::run_migrations(&client).await?;

    info!("Database initialized: {}", db_name);
    Ok(pool)
}

/// Build a pool without connecting. Connections are opened on first use.
pub fn create_pool(database_url: &str) -> Result<DbPool> {
    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());
    let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        assert_eq!(
            base_url("postgres://u:p@localhost:5432"),
            "postgres://u:p@localhost:5432"
        );
        assert_eq!(
            base_url("postgres://u:p@localhost:5432/studyhub"),
            "postgres://u:p@localhost:5432"
        );
        assert_eq!(
            base_url("postgres://u:p@localhost:5432/"),
            "postgres://u:p@localhost:5432"
        );
    }
}
