//! Observability - Sentry Integration and Audit Trail
//!
//! Provides:
//! - Sentry error tracking (enabled via SENTRY_DSN env var)
//! - Structured audit logging for account and judging events
//! - Operation timing

use crate::db::queries;
use crate::state::AppState;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info, span, warn, Level};

/// Initialize Sentry if SENTRY_DSN is set
pub fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok()?;

    if dsn.is_empty() {
        info!("Sentry DSN is empty, error tracking disabled");
        return None;
    }

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: std::env::var("ENVIRONMENT").ok().map(|s| s.into()),
            traces_sample_rate: 0.1, // 10% of transactions
            ..Default::default()
        },
    ));

    info!("Sentry initialized for error tracking");
    Some(guard)
}

/// Audit event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Accounts
    Registration,
    LoginSucceeded,
    LoginFailed,
    GoogleSignIn,
    Logout,
    PasswordResetRequested,
    PasswordResetCompleted,

    // Judging
    SubmissionJudged,
    JudgeFailed,

    // Security
    RateLimitExceeded,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_string(self).unwrap_or_else(|_| "unknown".to_string());
        write!(f, "{}", s.trim_matches('"'))
    }
}

/// Structured audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub event_type: AuditEventType,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    /// Username or e-mail of whoever triggered the event
    pub actor: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub duration_ms: Option<u64>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl AuditEntry {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_type,
            entity_type: None,
            entity_id: None,
            actor: None,
            payload: None,
            duration_ms: None,
            success: true,
            error_message: None,
        }
    }

    pub fn entity(mut self, entity_type: &str, entity_id: &str) -> Self {
        self.entity_type = Some(entity_type.to_string());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn failed(mut self, error: &str) -> Self {
        self.success = false;
        self.error_message = Some(error.to_string());
        self
    }
}

/// Audit logger for structured logging and persistence
pub struct AuditLogger;

impl AuditLogger {
    /// Log an audit event to both tracing and database
    pub async fn log(state: &AppState, entry: AuditEntry) {
        let span = span!(
            Level::INFO,
            "audit",
            event_type = %entry.event_type,
            entity_type = ?entry.entity_type,
            entity_id = ?entry.entity_id,
            actor = ?entry.actor,
            success = entry.success,
        );
        let _guard = span.enter();

        if entry.success {
            info!(
                event = %entry.event_type,
                entity = ?entry.entity_id,
                actor = ?entry.actor,
                duration_ms = ?entry.duration_ms,
                "Audit event"
            );
        } else {
            warn!(
                event = %entry.event_type,
                entity = ?entry.entity_id,
                actor = ?entry.actor,
                error = ?entry.error_message,
                "Audit event failed"
            );

            if let Some(ref msg) = entry.error_message {
                sentry::capture_message(
                    &format!("{}: {}", entry.event_type, msg),
                    sentry::Level::Warning,
                );
            }
        }

        let mut payload = entry.payload.clone().unwrap_or_else(|| serde_json::json!({}));
        if let Some(map) = payload.as_object_mut() {
            map.insert("success".into(), entry.success.into());
            if let Some(d) = entry.duration_ms {
                map.insert("duration_ms".into(), d.into());
            }
            if let Some(ref e) = entry.error_message {
                map.insert("error".into(), e.clone().into());
            }
        }

        if let Err(e) = queries::log_event(
            &state.db,
            &entry.event_type.to_string(),
            entry.entity_type.as_deref(),
            entry.entity_id.as_deref(),
            Some(&payload),
            entry.actor.as_deref(),
        )
        .await
        {
            error!(error = %e, "Failed to persist audit event");
        }
    }

    /// Log a login attempt
    pub async fn login(state: &AppState, email: &str, error: Option<&str>) {
        let entry = match error {
            None => AuditEntry::new(AuditEventType::LoginSucceeded).actor(email),
            Some(e) => AuditEntry::new(AuditEventType::LoginFailed)
                .actor(email)
                .failed(e),
        };
        Self::log(state, entry).await;
    }

    /// Log an account event for a known user
    pub async fn account(state: &AppState, event: AuditEventType, user_id: i64, actor: &str) {
        let entry = AuditEntry::new(event)
            .entity("user", &user_id.to_string())
            .actor(actor);
        Self::log(state, entry).await;
    }

    /// Log a judged submission
    pub async fn submission(
        state: &AppState,
        submission_id: i64,
        problem_id: i64,
        username: &str,
        verdict: &str,
        duration_ms: u64,
    ) {
        let entry = AuditEntry::new(AuditEventType::SubmissionJudged)
            .entity("submission", &submission_id.to_string())
            .actor(username)
            .with_payload(serde_json::json!({
                "problem_id": problem_id,
                "verdict": verdict,
            }))
            .with_duration(duration_ms);
        Self::log(state, entry).await;
    }

    /// Log a failed call to the code executor
    pub async fn judge_failed(state: &AppState, problem_id: i64, username: &str, error: &str) {
        let entry = AuditEntry::new(AuditEventType::JudgeFailed)
            .entity("problem", &problem_id.to_string())
            .actor(username)
            .failed(error);
        Self::log(state, entry).await;
    }

    /// Log security event
    pub async fn security(state: &AppState, event: AuditEventType, actor: &str, details: &str) {
        let event_str = event.to_string();
        let entry = AuditEntry::new(event).actor(actor).failed(details);

        Self::log(state, entry).await;

        sentry::capture_message(
            &format!("Security event: {} - {} - {}", event_str, actor, details),
            sentry::Level::Warning,
        );
    }
}

/// Timer for measuring operation duration
pub struct OperationTimer {
    start: Instant,
}

impl OperationTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_entry_builder() {
        let entry = AuditEntry::new(AuditEventType::SubmissionJudged)
            .entity("submission", "123")
            .actor("ada")
            .with_payload(serde_json::json!({"test": true}))
            .with_duration(100);

        assert!(entry.success);
        assert_eq!(entry.entity_id, Some("123".to_string()));
        assert_eq!(entry.actor, Some("ada".to_string()));
        assert_eq!(entry.duration_ms, Some(100));
    }

    #[test]
    fn test_audit_entry_failed() {
        let entry = AuditEntry::new(AuditEventType::LoginFailed)
            .actor("ada@example.com")
            .failed("Invalid credentials");

        assert!(!entry.success);
        assert_eq!(entry.error_message, Some("Invalid credentials".to_string()));
    }

    #[test]
    fn test_event_type_display() {
        assert_eq!(
            AuditEventType::PasswordResetRequested.to_string(),
            "password_reset_requested"
        );
        assert_eq!(AuditEventType::RateLimitExceeded.to_string(), "rate_limit_exceeded");
    }
}
