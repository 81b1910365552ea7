//! Data models for the learning platform

use crate::error::{CoreError, Result};
use crate::verdict::Verdict;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;

// ============================================================================
// USERS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Default interface language for new profiles.
pub const DEFAULT_LANGUAGE: &str = "eng";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Profile {
    pub user_id: UserId,
    pub phone_number: Option<String>,
    pub organisation_name: Option<String>,
    pub address: Option<String>,
    pub language_selected: String,
    /// Path relative to the media root
    pub profile_photo: Option<String>,
    pub is_premium_user: bool,
    pub bio: Option<String>,
    pub occupation: Option<String>,
    pub kaggle_profile_url: Option<String>,
    pub github: Option<String>,
    pub twitter: Option<String>,
    pub portfolio: Option<String>,
    pub linkedin: Option<String>,
    pub pronouns: Option<String>,
    pub interests: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_streak_date: Option<NaiveDate>,
    pub is_onboarding_complete: bool,
    pub is_email_verified: bool,
}

impl Profile {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            language_selected: DEFAULT_LANGUAGE.to_string(),
            ..Default::default()
        }
    }
}

// ============================================================================
// CONTENT CLASSIFICATION
// ============================================================================

/// Problem difficulty. Problems use lowercase names on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Easy,
    Medium,
    Hard,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Easy, Level::Medium, Level::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Easy => "easy",
            Level::Medium => "medium",
            Level::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Level::Easy),
            "medium" => Ok(Level::Medium),
            "hard" => Ok(Level::Hard),
            other => Err(CoreError::InvalidLevel(other.to_string())),
        }
    }
}

/// Concept difficulty. Concepts use capitalised names on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConceptLevel {
    Easy,
    Medium,
    Hard,
}

impl ConceptLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConceptLevel::Easy => "Easy",
            ConceptLevel::Medium => "Medium",
            ConceptLevel::Hard => "Hard",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match Level::parse(s)? {
            Level::Easy => Ok(ConceptLevel::Easy),
            Level::Medium => Ok(ConceptLevel::Medium),
            Level::Hard => Ok(ConceptLevel::Hard),
        }
    }
}

/// Subject area: machine learning or deep learning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Track {
    #[default]
    Ml,
    Dl,
}

impl Track {
    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Ml => "ML",
            Track::Dl => "DL",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ML" => Ok(Track::Ml),
            "DL" => Ok(Track::Dl),
            other => Err(CoreError::Validation(format!("Invalid track: {}", other))),
        }
    }
}

/// Concept-based problems are solved with code; dataset-based problems with
/// model predictions scored by metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemKind {
    Concept,
    Dataset,
}

impl ProblemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemKind::Concept => "concept",
            ProblemKind::Dataset => "dataset",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "concept" => Ok(ProblemKind::Concept),
            "dataset" => Ok(ProblemKind::Dataset),
            other => Err(CoreError::InvalidProblemKind(other.to_string())),
        }
    }
}

// ============================================================================
// CONCEPTS & COURSES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub one_liner_desc: String,
    pub level: ConceptLevel,
    pub preview_image_url: String,
    pub author_id: UserId,
    pub concept_type: Track,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptRead {
    pub user_id: UserId,
    pub concept_id: i64,
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub followers_count: i64,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// PROBLEMS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    pub kind: ProblemKind,
    pub title: String,
    pub slug: String,
    pub track: Track,
    pub author_id: UserId,
    pub description: Option<String>,
    pub editorial: Option<String>,
    pub level: Level,
    pub accepted_submissions: i64,
    pub total_submissions: i64,
    pub course_id: Option<i64>,
    pub course_slug: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Problem {
    pub fn acceptance_rate(&self) -> f64 {
        acceptance_rate(self.accepted_submissions, self.total_submissions)
    }
}

/// Percentage of accepted submissions, rounded to two decimals.
pub fn acceptance_rate(accepted: i64, total: i64) -> f64 {
    if accepted == 0 || total == 0 {
        return 0.0;
    }
    let rate = accepted as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConceptProblemDetails {
    pub code_editor_template: Option<String>,
    pub ideal_solution_code: Option<String>,
    /// Sample inputs; expected outputs come from running the ideal solution
    pub validation_testcases: Vec<String>,
    pub submission_testcases: Vec<TestCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetProblemDetails {
    pub evaluation_metrics: serde_json::Value,
    pub test_data_file_path: Option<String>,
    pub data_available_to_user_file_path: String,
    pub ideal_metrics_json_file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProblemDetails {
    Concept(ConceptProblemDetails),
    Dataset(DatasetProblemDetails),
}

// ============================================================================
// SUBMISSIONS, NOTES, COMMENTS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub user_id: UserId,
    pub problem_id: i64,
    pub code: Option<String>,
    pub verdict: Verdict,
    pub time_taken: Option<f64>,
    pub memory_taken: Option<f64>,
    pub failed_testcase_info: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub user_id: UserId,
    pub problem_id: i64,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "like" => Ok(Reaction::Like),
            "dislike" => Ok(Reaction::Dislike),
            _ => Err(CoreError::Validation("Invalid action".to_string())),
        }
    }

    /// Past-tense form used in responses ("liked" / "disliked").
    pub fn past_tense(&self) -> &'static str {
        match self {
            Reaction::Like => "liked",
            Reaction::Dislike => "disliked",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub user_id: UserId,
    pub problem_id: i64,
    pub content: String,
    pub parent_id: Option<i64>,
    pub like_count: i64,
    pub dislike_count: i64,
    /// Reaction of the viewing user, if any
    pub viewer_reaction: Option<Reaction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reply must target a top-level comment on the same problem.
pub fn validate_reply_target(parent: &Comment, problem_id: i64) -> Result<()> {
    if parent.parent_id.is_some() {
        return Err(CoreError::NestedReply);
    }
    if parent.problem_id != problem_id {
        return Err(CoreError::Validation(
            "Parent comment belongs to a different problem".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// DAILY CONTENT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyContent {
    pub id: i64,
    pub date: NaiveDate,
    pub concept_id: i64,
    pub problem_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DailyProgress {
    pub solved: bool,
    pub concept_read: bool,
}

impl DailyProgress {
    pub fn is_complete(&self) -> bool {
        self.solved && self.concept_read
    }
}
