//! Public user dashboards: profile summary, activity heatmap and paginated
//! history of problems, concepts and submissions.

use super::error::{ApiError, ApiResult};
use super::page_link;
use crate::daily;
use crate::db::queries::{concepts, problems, submissions, users};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use studyhub_core::heatmap::{build_heatmap, DateRange, HeatmapDay};
use studyhub_core::pagination::{strict_window, Page, PageLimits, PageWindow, Paginated};
use studyhub_core::progress::ProblemSolvedData;
use studyhub_core::{Level, Problem, ProblemKind, Track, User, Verdict};

const DASHBOARD_PAGE: PageLimits = PageLimits::new(20, 100);

async fn dashboard_user(state: &AppState, username: &str) -> ApiResult<User> {
    users::get_user_by_username(&state.db, username)
        .await?
        .ok_or_else(|| ApiError::Error(StatusCode::NOT_FOUND, "User not found".into()))
}

/// Validate the requested page against `count` rows before fetching it.
fn dashboard_window(params: &HashMap<String, String>, count: i64) -> ApiResult<PageWindow> {
    let per_page = DASHBOARD_PAGE.resolve(params.get("page_size").map(String::as_str));
    Ok(strict_window(
        usize::try_from(count).unwrap_or_default(),
        params.get("page").map(String::as_str),
        per_page,
    )?)
}

/// `next` and `previous` links for a page of the current listing.
fn page_links<T>(state: &AppState, uri: &Uri, page: &Page<T>) -> (Option<String>, Option<String>) {
    let public_url = &state.config.public_url;
    (
        page_link(public_url, uri, page.next_number()),
        page_link(public_url, uri, page.previous_number()),
    )
}

// ============================================================================
// OVERVIEW & HEATMAP
// ============================================================================

pub async fn overview(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> ApiResult<Json<Value>> {
    let user = dashboard_user(&state, &username).await?;
    let profile = users::get_profile(&state.db, user.id).await?;

    let photo_url = profile
        .profile_photo
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| state.config.media_url(p));

    let levels = submissions::accepted_levels(&state.db, user.id).await?;
    let totals = problems::difficulty_totals(&state.db).await?;

    Ok(Json(json!({
        "profile_data": {
            "username": user.username,
            "name": user.full_name(),
            "profile_photo_url": photo_url,
            "current_streak": daily::current_streak(&profile, state.today()),
            "longest_streak": profile.longest_streak,
            "organisation_name": profile.organisation_name,
            "location": profile.address,
            "occupation": profile.occupation,
            "kaggle_profile_url": profile.kaggle_profile_url,
            "github": profile.github,
            "twitter": profile.twitter,
            "portfolio": profile.portfolio,
            "linkedin": profile.linkedin,
        },
        "problem_solved_data": ProblemSolvedData::new(levels, totals),
    })))
}

pub async fn heatmap(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Vec<HeatmapDay>>> {
    let user = dashboard_user(&state, &username).await?;
    let range = DateRange::resolve(
        params.get("start_date").map(String::as_str),
        params.get("end_date").map(String::as_str),
        state.today(),
    )?;

    let accepted: HashMap<_, _> =
        submissions::accepted_per_day(&state.db, user.id, range.start, range.end_exclusive())
            .await?
            .into_iter()
            .collect();
    let reads: HashMap<_, _> =
        concepts::reads_per_day(&state.db, user.id, range.start, range.end_exclusive())
            .await?
            .into_iter()
            .collect();

    Ok(Json(build_heatmap(&range, &accepted, &reads)))
}

// ============================================================================
// HISTORY LISTS
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AttemptedProblem {
    pub id: i64,
    pub title: String,
    pub level: Level,
    pub tag: Vec<String>,
    pub problem_type: ProblemKind,
    pub slug: String,
    pub last_attempted: DateTime<Utc>,
    pub status: Verdict,
}

/// Latest attempt per problem, most recent first.
pub async fn problems_attempted(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    uri: Uri,
) -> ApiResult<Json<Paginated<AttemptedProblem>>> {
    let user = dashboard_user(&state, &username).await?;
    let count = submissions::count_attempted(&state.db, user.id).await?;
    let window = dashboard_window(&params, count)?;
    let attempts = submissions::latest_attempts(
        &state.db,
        user.id,
        window.limit() as i64,
        window.offset() as i64,
    )
    .await?;

    let page = window.page(attempts);
    let (next, previous) = page_links(&state, &uri, &page);
    let ids: Vec<i64> = page.items.iter().map(|a| a.problem_id).collect();
    let by_id: HashMap<i64, Problem> = problems::get_problems_by_ids(&state.db, &ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let results = page
        .items
        .into_iter()
        .filter_map(|attempt| {
            let problem = by_id.get(&attempt.problem_id)?;
            Some(AttemptedProblem {
                id: problem.id,
                title: problem.title.clone(),
                level: problem.level,
                tag: problem.tags.clone(),
                problem_type: problem.kind,
                slug: problem.slug.clone(),
                last_attempted: attempt.last_attempted,
                status: attempt.verdict,
            })
        })
        .collect();

    Ok(Json(Paginated {
        count: page.count,
        next,
        previous,
        results,
    }))
}

#[derive(Debug, Serialize)]
pub struct ReadConcept {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub last_read: DateTime<Utc>,
}

pub async fn concepts_read(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    uri: Uri,
) -> ApiResult<Json<Paginated<ReadConcept>>> {
    let user = dashboard_user(&state, &username).await?;
    let count = concepts::count_reads(&state.db, user.id).await?;
    let window = dashboard_window(&params, count)?;
    let history = concepts::read_history(
        &state.db,
        user.id,
        window.limit() as i64,
        window.offset() as i64,
    )
    .await?;

    let page = window.page(history).map(|(concept, last_read)| ReadConcept {
        id: concept.id,
        title: concept.title,
        description: concept.description,
        slug: concept.slug,
        last_read,
    });
    let (next, previous) = page_links(&state, &uri, &page);

    Ok(Json(Paginated {
        count: page.count,
        next,
        previous,
        results: page.items,
    }))
}

#[derive(Debug, Serialize)]
pub struct SubmissionProblem {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub track: Track,
    pub problem_type: ProblemKind,
    pub level: Level,
    pub slug: String,
}

#[derive(Debug, Serialize)]
pub struct SubmissionEntry {
    pub id: i64,
    pub verdict: Verdict,
    pub verdict_display: &'static str,
    pub created_timestamp: DateTime<Utc>,
    pub time_taken: Option<f64>,
    pub memory_taken: Option<f64>,
    pub problem: Option<SubmissionProblem>,
}

pub async fn submissions(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    uri: Uri,
) -> ApiResult<Json<Paginated<SubmissionEntry>>> {
    let user = dashboard_user(&state, &username).await?;
    let count = submissions::count_for_user(&state.db, user.id).await?;
    let window = dashboard_window(&params, count)?;
    let rows = submissions::list_for_user(
        &state.db,
        user.id,
        window.limit() as i64,
        window.offset() as i64,
    )
    .await?;

    let page = window.page(rows);
    let (next, previous) = page_links(&state, &uri, &page);
    let by_id: HashMap<i64, Problem> = submissions::problems_for(&state.db, &page.items)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let count = page.count;
    let results = page
        .items
        .into_iter()
        .map(|s| SubmissionEntry {
            id: s.id,
            verdict: s.verdict,
            verdict_display: s.verdict.display(),
            created_timestamp: s.created_at,
            time_taken: s.time_taken,
            memory_taken: s.memory_taken,
            problem: by_id.get(&s.problem_id).map(|p| SubmissionProblem {
                id: p.id,
                title: p.title.clone(),
                track: p.track,
                problem_type: p.kind,
                level: p.level,
                slug: p.slug.clone(),
            }),
        })
        .collect();

    Ok(Json(Paginated {
        count,
        next,
        previous,
        results,
    }))
}
