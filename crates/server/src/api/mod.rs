//! API handlers and routes
//!
//! Paths keep their trailing slashes; existing clients call them that way.

pub mod accounts;
pub mod concepts;
pub mod courses;
pub mod dashboard;
pub mod discussion;
pub mod error;
pub mod judging;
pub mod problems;

use crate::db::queries;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::{DefaultBodyLimit, FromRequest, Request};
use axum::http::Uri;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use error::{ApiError, ApiResult};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use studyhub_core::{Problem, ProblemKind};

/// Upload limit for multipart profile updates (2 MB photo plus form fields).
const PROFILE_UPDATE_BODY_LIMIT: usize = 4 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        // === ACCOUNTS ===
        .route("/user/register/", post(accounts::register))
        .route("/user/login/", post(accounts::login))
        .route("/user/google-auth/", post(accounts::google_auth))
        .route("/user/forgot-password/", post(accounts::forgot_password))
        .route("/user/reset-password/", post(accounts::reset_password))
        .route(
            "/user/generate-access-token/",
            post(accounts::generate_access_token),
        )
        .route("/user/logout/", post(accounts::logout))
        .route(
            "/user/complete-onboarding/",
            post(accounts::complete_onboarding),
        )
        .route("/user/user-detail/", get(accounts::user_detail))
        .route(
            "/user/user-detail-update/",
            patch(accounts::user_detail_update)
                .layer(DefaultBodyLimit::max(PROFILE_UPDATE_BODY_LIMIT)),
        )
        .route("/user/header-data/", get(accounts::header_data))
        // === DASHBOARD ===
        .route("/user/dashboard/:username/", get(dashboard::overview))
        .route("/user/dashboard/:username/heatmap/", get(dashboard::heatmap))
        .route(
            "/user/dashboard/:username/problems/",
            get(dashboard::problems_attempted),
        )
        .route(
            "/user/dashboard/:username/concepts/",
            get(dashboard::concepts_read),
        )
        .route(
            "/user/dashboard/:username/submissions/",
            get(dashboard::submissions),
        )
        // === CONCEPTS ===
        .route("/concepts/", get(concepts::list))
        .route("/concepts/filtered-concepts/", get(concepts::filtered))
        .route("/concepts/by-date/", get(concepts::by_date))
        .route("/concepts/:concept/", get(concepts::detail))
        .route("/concepts/:concept/save/", post(concepts::toggle_save))
        .route("/concepts/:concept/mark-read/", post(concepts::mark_read))
        // === COURSES ===
        .route("/courses/", get(courses::list))
        .route("/courses/:course/", get(courses::detail))
        .route("/courses/:course/like/", post(courses::toggle_like))
        .route("/courses/:course/follow/", post(courses::follow))
        // === PROBLEMS ===
        .route("/problems/", get(problems::list))
        .route("/problems/monthly-content/", get(problems::monthly_content))
        .route("/problems/user-history/", get(problems::user_history))
        .route(
            "/problems/notes/",
            get(discussion::notes_get).post(discussion::notes_post),
        )
        .route("/problems/run-code/", post(judging::run_code))
        .route("/problems/comments/react/", post(discussion::react))
        .route("/problems/:kind/:slug/", get(problems::detail))
        .route("/problems/:kind/:slug/code-editor/", get(problems::code_editor))
        .route("/problems/:kind/:slug/editorial/", get(problems::editorial))
        .route(
            "/problems/:kind/:slug/submissions/",
            get(judging::submissions),
        )
        .route(
            "/problems/:kind/:slug/comments/",
            get(discussion::comments_get).post(discussion::comments_post),
        )
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// JSON body whose rejections render as `{"message": ...}`.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

/// Collects per-field validation errors.
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<(String, String)>);

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

impl FieldErrors {
    pub fn add(&mut self, field: &str, msg: impl Into<String>) {
        self.0.push((field.to_string(), msg.into()));
    }

    /// Trimmed value of a required string field; records an error and
    /// returns "" when it is missing or blank.
    pub fn require<'a>(&mut self, field: &str, value: &'a Option<String>) -> &'a str {
        match value.as_deref().map(str::trim) {
            None => {
                self.add(field, REQUIRED);
                ""
            }
            Some("") => {
                self.add(field, BLANK);
                ""
            }
            Some(v) => v,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn finish(self) -> ApiResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Fields(self.0))
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.chars().any(char::is_whitespace)
        && !domain.contains('@')
}

/// Problem kind taken from a URL path; unknown kinds read as a missing problem.
pub fn path_kind(kind: &str) -> ApiResult<ProblemKind> {
    ProblemKind::parse(kind).map_err(|_| ApiError::not_found("Problem not found"))
}

pub async fn find_problem(state: &AppState, kind: &str, slug: &str) -> ApiResult<Problem> {
    let kind = path_kind(kind)?;
    queries::problems::get_problem_by_slug(&state.db, kind, slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Problem not found"))
}

/// Absolute link to another page of the current listing. Page 1 drops the
/// `page` parameter.
pub fn page_link(public_url: &str, uri: &Uri, page: Option<usize>) -> Option<String> {
    let page = page?;
    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(
        uri.query().unwrap_or("").as_bytes(),
    )
    .into_owned()
    .filter(|(k, _)| k != "page")
    .collect();
    if page > 1 {
        pairs.push(("page".to_string(), page.to_string()));
    }
    let base = format!("{}{}", public_url.trim_end_matches('/'), uri.path());
    if pairs.is_empty() {
        return Some(base);
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    Some(format!("{}?{}", base, query))
}
