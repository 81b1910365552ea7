//! Application state

use crate::auth::{JwtKeys, ResetTokens};
use crate::config::ServerConfig;
use crate::db::DbPool;
use crate::mail::{HttpMailer, LogMailer, Mailer};
use crate::rule_engine::RuleEngine;
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use studyhub_judge::{CodeExecutor, Judge, Judge0Client, Judge0Config};

pub struct AppState {
    pub db: DbPool,
    pub config: ServerConfig,
    pub judge: Judge,
    /// Shared client for Google and mail relay calls
    pub http: reqwest::Client,
    pub mailer: Arc<dyn Mailer>,
    pub rules: RuleEngine,
    pub jwt: JwtKeys,
    pub reset_tokens: ResetTokens,
}

impl AppState {
    /// State backed by the configured Judge0 service.
    pub fn new(db: DbPool, config: ServerConfig) -> Result<Self> {
        let executor = Judge0Client::new(Judge0Config {
            url: config.run_code_api_url.clone(),
            api_key: config.rapidapi_key.clone(),
            api_host: config.rapidapi_host.clone(),
            timeout: config.run_code_timeout(),
        })?;
        Self::with_executor(db, config, Arc::new(executor))
    }

    pub fn with_executor(
        db: DbPool,
        config: ServerConfig,
        executor: Arc<dyn CodeExecutor>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let mailer: Arc<dyn Mailer> = match &config.mail_relay_url {
            Some(url) if !url.is_empty() => Arc::new(HttpMailer::new(http.clone(), url.clone())),
            _ => Arc::new(LogMailer),
        };
        Ok(Self {
            db,
            judge: Judge::new(executor).with_language(config.run_code_language_id),
            http,
            mailer,
            rules: RuleEngine::new(config.rate_limit_window()),
            jwt: JwtKeys::new(
                &config.secret_key,
                config.access_token_ttl(),
                config.refresh_token_ttl(),
            ),
            reset_tokens: ResetTokens::new(&config.secret_key),
            config,
        })
    }

    /// Calendar day used for daily content and streaks.
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}
