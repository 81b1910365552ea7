//! Error types for the judging pipeline

use thiserror::Error;

/// Result type for judge operations
pub type Result<T> = std::result::Result<T, JudgeError>;

#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("Error while communicating with Judge0 API: {0}")]
    Transport(String),

    #[error("Judge0 API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid JSON received from Judge0 API: {0}")]
    InvalidResponse(String),

    #[error("Problem has no ideal solution to produce expected output")]
    MissingIdealSolution,

    #[error("Problem has no submission test cases")]
    NoTestCases,
}

impl From<reqwest::Error> for JudgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            JudgeError::InvalidResponse(err.to_string())
        } else {
            JudgeError::Transport(err.to_string())
        }
    }
}
