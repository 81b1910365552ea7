//! StudyHub Server
//!
//! ```
//! StudyHub Server (this)
//!  ├── REST API (accounts, content, progress, judging, discussion)
//!  ├── Rule Engine (rate limits, size limits)
//!  ├── Judge0 client for code runs
//!  └── PostgreSQL database
//! ```

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use studyhub_server::{db, init_sentry, AppState, ServerConfig};
use tracing::{debug, info};

/// How often expired rate limit buckets are dropped.
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("studyhub_server=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();

    let _sentry_guard = init_sentry();
    if _sentry_guard.is_some() {
        info!("Sentry error tracking enabled");
    }

    let config = ServerConfig::parse();

    info!("╔══════════════════════════════════════════════════════════════╗");
    info!("║              StudyHub - Learning Platform API                ║");
    info!("╚══════════════════════════════════════════════════════════════╝");
    info!("");
    info!("  Listening on: {}:{}", config.host, config.port);
    info!("  Media root:   {}", config.media_root.display());

    let pool = db::init_db(&config.database_url, &config.database_name).await?;
    info!("  Database: {}", config.database_name);

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(pool, config)?);

    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = cleanup_state.rules.cleanup_expired();
            if removed > 0 {
                debug!("Dropped {} expired rate limit entries", removed);
            }
        }
    });

    let app = studyhub_server::app(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("");
    info!("╔══════════════════════════════════════════════════════════════╗");
    info!("║  Server ready at http://{:<37}║", addr);
    info!("╠══════════════════════════════════════════════════════════════╣");
    info!("║  Accounts:  /user/*                                          ║");
    info!("║  Concepts:  /concepts/*                                      ║");
    info!("║  Courses:   /courses/*                                       ║");
    info!("║  Problems:  /problems/*                                      ║");
    info!("╚══════════════════════════════════════════════════════════════╝");

    axum::serve(listener, app).await?;

    Ok(())
}
