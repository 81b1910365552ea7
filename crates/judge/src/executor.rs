//! Code executor abstraction
//!
//! The pipeline only talks to a `CodeExecutor`. Production uses the Judge0
//! client; tests plug in a scripted executor.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Judge0 language id for Python 3.
pub const PYTHON3_LANGUAGE_ID: i64 = 71;

/// Status ids up to this value mean the run did not fail.
pub const LAST_PASSING_STATUS: i64 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub source: String,
    pub stdin: String,
    /// When set the executor compares stdout against it
    pub expected_output: Option<String>,
    pub language_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub id: i64,
    pub description: String,
}

/// Outcome of one run, with outputs already decoded to text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub compile_output: String,
    pub status: Option<ExecutionStatus>,
    /// Wall time in seconds
    pub time: f64,
    /// Peak memory in KB
    pub memory: f64,
}

impl ExecutionResult {
    pub fn status_id(&self) -> i64 {
        self.status.as_ref().map(|s| s.id).unwrap_or(0)
    }

    pub fn status_description(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.description.as_str())
            .unwrap_or("Unknown Error")
    }

    pub fn failed(&self) -> bool {
        self.status_id() > LAST_PASSING_STATUS
    }
}

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Run `request.source` once against `request.stdin`.
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult>;
}
