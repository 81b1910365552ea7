//! Rule Engine - Server-Side Enforcement
//!
//! Fixed-window rate limits per subject plus payload size rules:
//! - login attempts per e-mail address
//! - code runs and submissions per user
//! - comments per user

use crate::api::error::ApiError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use studyhub_core::UserId;
use thiserror::Error;
use tracing::{debug, warn};

/// Largest accepted source file.
pub const MAX_CODE_BYTES: usize = 64 * 1024;

/// Longest accepted comment, in characters.
pub const MAX_COMMENT_CHARS: usize = 5000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleViolation {
    #[error("Request was throttled. Try again later.")]
    RateLimited,

    #[error("Code exceeds maximum size ({max} bytes)")]
    CodeTooLarge { max: usize },

    #[error("Code cannot be empty")]
    EmptyCode,

    #[error("Comment exceeds maximum length ({max} characters)")]
    CommentTooLong { max: usize },

    #[error("Comment content cannot be empty")]
    EmptyComment,
}

impl From<RuleViolation> for ApiError {
    fn from(v: RuleViolation) -> Self {
        match v {
            RuleViolation::RateLimited => ApiError::too_many_requests(v.to_string()),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window duration
    pub window_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_duration: Duration::from_secs(60),
        }
    }
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

/// Fixed-window counter per key.
pub struct RateLimiter {
    name: &'static str,
    entries: RwLock<HashMap<String, RateLimitEntry>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(name: &'static str, config: RateLimitConfig) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Count one request for `key`. Errors once the window is full.
    pub fn check(&self, key: &str) -> Result<(), RuleViolation> {
        let mut entries = self.entries.write();
        let now = Instant::now();

        let entry = entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) > self.config.window_duration {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.config.max_requests {
            warn!(limiter = self.name, key = %key, "Rate limit exceeded");
            return Err(RuleViolation::RateLimited);
        }

        entry.count += 1;
        Ok(())
    }

    /// Drop keys whose window has passed. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        let window = self.config.window_duration;
        entries.retain(|_, e| e.window_start.elapsed() <= window);
        before - entries.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.read().len()
    }
}

/// Per-endpoint limits.
#[derive(Debug, Clone)]
pub struct RuleLimits {
    pub login_per_window: u32,
    pub run_code_per_window: u32,
    pub comments_per_window: u32,
    pub window: Duration,
}

impl Default for RuleLimits {
    fn default() -> Self {
        Self {
            login_per_window: 10,
            run_code_per_window: 30,
            comments_per_window: 20,
            window: Duration::from_secs(60),
        }
    }
}

/// Rule Engine for server-side enforcement
pub struct RuleEngine {
    login: RateLimiter,
    run_code: RateLimiter,
    comments: RateLimiter,
}

impl RuleEngine {
    pub fn new(window: Duration) -> Self {
        Self::with_limits(RuleLimits {
            window,
            ..Default::default()
        })
    }

    pub fn with_limits(limits: RuleLimits) -> Self {
        let config = |max_requests| RateLimitConfig {
            max_requests,
            window_duration: limits.window,
        };
        Self {
            login: RateLimiter::new("login", config(limits.login_per_window)),
            run_code: RateLimiter::new("run_code", config(limits.run_code_per_window)),
            comments: RateLimiter::new("comments", config(limits.comments_per_window)),
        }
    }

    pub fn check_login(&self, email: &str) -> Result<(), RuleViolation> {
        self.login.check(&email.trim().to_lowercase())
    }

    pub fn check_run_code(&self, user_id: UserId, code: &str) -> Result<(), RuleViolation> {
        if code.trim().is_empty() {
            return Err(RuleViolation::EmptyCode);
        }
        if code.len() > MAX_CODE_BYTES {
            return Err(RuleViolation::CodeTooLarge {
                max: MAX_CODE_BYTES,
            });
        }
        self.run_code.check(&user_id.to_string())
    }

    pub fn check_comment(&self, user_id: UserId, content: &str) -> Result<(), RuleViolation> {
        if content.trim().is_empty() {
            return Err(RuleViolation::EmptyComment);
        }
        if content.chars().count() > MAX_COMMENT_CHARS {
            return Err(RuleViolation::CommentTooLong {
                max: MAX_COMMENT_CHARS,
            });
        }
        self.comments.check(&user_id.to_string())
    }

    pub fn cleanup_expired(&self) -> usize {
        let removed = self.login.cleanup_expired()
            + self.run_code.cleanup_expired()
            + self.comments.cleanup_expired();
        if removed > 0 {
            debug!(removed, "Cleaned up expired rate limit windows");
        }
        removed
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::with_limits(RuleLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window: Duration) -> RateLimiter {
        RateLimiter::new(
            "test",
            RateLimitConfig {
                max_requests,
                window_duration: window,
            },
        )
    }

    #[test]
    fn test_rate_limit() {
        let limiter = limiter(3, Duration::from_secs(60));
        assert!(limiter.check("user1").is_ok());
        assert!(limiter.check("user1").is_ok());
        assert!(limiter.check("user1").is_ok());
        assert_eq!(limiter.check("user1"), Err(RuleViolation::RateLimited));
    }

    #[test]
    fn test_rate_limit_different_keys() {
        let limiter = limiter(1, Duration::from_secs(60));
        assert!(limiter.check("user1").is_ok());
        assert!(limiter.check("user2").is_ok());
        assert!(limiter.check("user1").is_err());
    }

    #[test]
    fn test_window_reset_and_cleanup() {
        let limiter = limiter(1, Duration::from_millis(20));
        assert!(limiter.check("user1").is_ok());
        assert!(limiter.check("user1").is_err());
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(limiter.cleanup_expired(), 1);
        assert_eq!(limiter.tracked_keys(), 0);
        assert!(limiter.check("user1").is_ok());
    }

    #[test]
    fn test_code_rules() {
        let engine = RuleEngine::default();
        assert_eq!(engine.check_run_code(1, "  "), Err(RuleViolation::EmptyCode));
        let big = "x".repeat(MAX_CODE_BYTES + 1);
        assert!(matches!(
            engine.check_run_code(1, &big),
            Err(RuleViolation::CodeTooLarge { .. })
        ));
        assert!(engine.check_run_code(1, "print(1)").is_ok());
    }

    #[test]
    fn test_comment_rules() {
        let engine = RuleEngine::default();
        assert_eq!(engine.check_comment(1, ""), Err(RuleViolation::EmptyComment));
        let long = "é".repeat(MAX_COMMENT_CHARS + 1);
        assert!(matches!(
            engine.check_comment(1, &long),
            Err(RuleViolation::CommentTooLong { .. })
        ));
        assert!(engine.check_comment(1, &"é".repeat(MAX_COMMENT_CHARS)).is_ok());
    }

    #[test]
    fn test_login_keys_are_case_insensitive() {
        let engine = RuleEngine::with_limits(RuleLimits {
            login_per_window: 1,
            ..Default::default()
        });
        assert!(engine.check_login("Ada@Example.com").is_ok());
        assert!(engine.check_login("ada@example.com ").is_err());
    }
}
