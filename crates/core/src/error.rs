//! Error types for domain operations

use thiserror::Error;

/// Result type for domain operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid page.")]
    InvalidPage,

    #[error("start_date must be before or equal to end_date")]
    InvalidDateRange,

    #[error("Invalid date format. Use YYYY-MM-DD.")]
    InvalidDate,

    #[error("Invalid problem type. Use 'concept' or 'dataset'.")]
    InvalidProblemKind(String),

    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    #[error("Replies to replies are not allowed.")]
    NestedReply,

    #[error("Validation error: {0}")]
    Validation(String),
}
