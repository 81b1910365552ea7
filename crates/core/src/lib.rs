//! StudyHub Core - domain model for the learning platform
//!
//! Everything in here is pure: no database handles, no HTTP. The server crate
//! loads rows, hands them to these functions and serializes whatever comes
//! back.
//!
//! - `verdict`: judge status mapping onto internal submission verdicts
//! - `slug`: URL slug generation with uniqueness suffixes
//! - `models`: users, concepts, courses, problems, submissions, comments
//! - `pagination`: Django-style and DRF-style page handling
//! - `filter`: catalog filters for problems and concepts
//! - `heatmap`: per-day activity aggregation
//! - `progress`: daily calendar, monthly completion, user history
//! - `streak`: daily completion streaks

pub mod error;
pub mod filter;
pub mod heatmap;
pub mod models;
pub mod pagination;
pub mod progress;
pub mod slug;
pub mod streak;
pub mod verdict;

pub use error::{CoreError, Result};
pub use models::*;
pub use verdict::Verdict;
