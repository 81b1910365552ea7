//! Problem catalogue, calendar and per-problem pages

use super::error::{ApiError, ApiResult};
use super::find_problem;
use crate::auth::{AuthUser, MaybeUser};
use crate::db::queries::{concepts, daily, discussion, problems, submissions};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use studyhub_core::filter::{difficulty_counts, DifficultyCounts, ProblemFilter};
use studyhub_core::heatmap::parse_required_date;
use studyhub_core::pagination::{lenient_page, PageLimits};
use studyhub_core::progress::{
    self, days_in_month, latest_per_problem_verdict, resolve_month, CalendarDay, MonthlyContent,
};
use studyhub_core::{Concept, Level, Problem, ProblemDetails, ProblemKind, Track, Verdict};

const PROBLEM_PAGE: PageLimits = PageLimits::new(10, 100);

/// Status shown next to a problem: the accepted verdict code once solved.
fn solved_status(solved: bool) -> i16 {
    if solved {
        Verdict::Accepted.code()
    } else {
        0
    }
}

// ============================================================================
// LISTING
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ProblemRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub level: Level,
    pub acceptance_rate: f64,
    pub status: i16,
    pub problem_type: ProblemKind,
    pub tags: Vec<String>,
    pub notes_id: Option<i64>,
    pub submissions: i64,
    #[serde(rename = "type")]
    pub track: Track,
}

#[derive(Debug, Serialize)]
pub struct ProblemListing {
    pub problems: Vec<ProblemRow>,
    pub difficulty_counts: DifficultyCounts,
    pub total_pages: usize,
    pub current_page: usize,
    pub total_problems: usize,
    pub total_problems_solved: usize,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ProblemListing>> {
    let filter = ProblemFilter::from_params(&params);
    let matching = filter.apply(problems::list_problems(&state.db, filter.kind).await?);
    let counts = difficulty_counts(&matching);

    let (solved, notes): (HashSet<i64>, HashMap<i64, i64>) = match viewer.id() {
        Some(user_id) => (
            submissions::accepted_problem_ids(&state.db, user_id).await?,
            discussion::note_ids(&state.db, user_id).await?,
        ),
        None => Default::default(),
    };
    let total_solved = matching.iter().filter(|p| solved.contains(&p.id)).count();

    let per_page = PROBLEM_PAGE.resolve(params.get("page_size").map(String::as_str));
    let page = lenient_page(matching, params.get("page").map(String::as_str), per_page);

    Ok(Json(ProblemListing {
        total_pages: page.num_pages,
        current_page: page.number,
        total_problems: page.count,
        difficulty_counts: counts,
        total_problems_solved: total_solved,
        problems: page
            .items
            .into_iter()
            .map(|p| ProblemRow {
                acceptance_rate: p.acceptance_rate(),
                status: solved_status(solved.contains(&p.id)),
                notes_id: notes.get(&p.id).copied(),
                submissions: p.total_submissions,
                id: p.id,
                title: p.title,
                slug: p.slug,
                level: p.level,
                problem_type: p.kind,
                tags: p.tags,
                track: p.track,
            })
            .collect(),
    }))
}

// ============================================================================
// CALENDAR
// ============================================================================

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))?;
    Some((first, last))
}

/// Daily concept and problem for every past day of a month, with the
/// caller's progress.
pub async fn monthly_content(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<MonthlyContent>> {
    let today = state.today();
    let (year, month) = resolve_month(
        params.get("year").map(String::as_str),
        params.get("month").map(String::as_str),
        today,
    );
    let Some((first, last)) = month_bounds(year, month) else {
        return Ok(Json(progress::monthly_content(year, month, Vec::new(), today)));
    };

    let entries = daily::list_between(&state.db, first, last.min(today)).await?;
    let concept_ids: Vec<i64> = entries.iter().map(|e| e.concept_id).collect();
    let problem_ids: Vec<i64> = entries.iter().map(|e| e.problem_id).collect();
    let concepts: HashMap<i64, Concept> = concepts::get_concepts_by_ids(&state.db, &concept_ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();
    let problems: HashMap<i64, Problem> = problems::get_problems_by_ids(&state.db, &problem_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let (done, solved) = match viewer.id() {
        Some(user_id) => {
            let daily_ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
            (
                daily::progress_for(&state.db, user_id, &daily_ids).await?,
                submissions::accepted_problem_ids(&state.db, user_id).await?,
            )
        }
        None => Default::default(),
    };

    let days = entries
        .iter()
        .filter_map(|entry| {
            Some(CalendarDay {
                date: entry.date,
                concept: concepts.get(&entry.concept_id)?.clone(),
                problem: problems.get(&entry.problem_id)?.clone(),
                progress: done.get(&entry.id).copied().unwrap_or_default(),
                problem_status: solved_status(solved.contains(&entry.problem_id)),
            })
        })
        .collect();

    Ok(Json(progress::monthly_content(year, month, days, today)))
}

/// Problems submitted and concepts read on one day.
pub async fn user_history(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let raw = params
        .get("date")
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::bad_request("Date query parameter is required."))?;
    let date = parse_required_date(raw)?;

    let events = submissions::events_on(&state.db, user.id, date).await?;
    let concepts_read: Vec<Value> = concepts::reads_on(&state.db, user.id, date)
        .await?
        .into_iter()
        .map(|(id, title)| json!({ "concept_id": id, "concept_title": title }))
        .collect();

    Ok(Json(json!({
        "problems_submitted": latest_per_problem_verdict(events),
        "concepts_read": concepts_read,
    })))
}

// ============================================================================
// PROBLEM PAGES
// ============================================================================

pub async fn detail(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path((kind, slug)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let problem = find_problem(&state, &kind, &slug).await?;

    let (submission_status, notes_id) = match viewer.id() {
        Some(user_id) => (
            Some(solved_status(
                submissions::has_accepted(&state.db, user_id, problem.id).await?,
            )),
            discussion::note_id(&state.db, user_id, problem.id).await?,
        ),
        None => (None, None),
    };

    Ok(Json(json!({
        "id": problem.id,
        "title": problem.title,
        "description": problem.description,
        "level": problem.level,
        "acceptance_rate": problem.acceptance_rate(),
        "submission_status": submission_status,
        "type": problem.track,
        "tags": problem.tags,
        "notes_id": notes_id,
        "total_submissions": problem.total_submissions,
        "accepted_submissions": problem.accepted_submissions,
    })))
}

pub async fn code_editor(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path((kind, slug)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let problem = find_problem(&state, &kind, &slug).await?;

    let code_editor_data = match problems::get_details(&state.db, &problem).await? {
        ProblemDetails::Concept(details) => json!({
            "template_code": details.code_editor_template,
            "validation_testcases": details.validation_testcases,
        }),
        ProblemDetails::Dataset(details) => json!({
            "evaluation_metrics_dict": details.evaluation_metrics,
            "test_data_file_path": details.test_data_file_path,
            "data_available_to_user_file_path": details.data_available_to_user_file_path,
            "ideal_metrics_json_file_path": details.ideal_metrics_json_file_path,
        }),
    };

    Ok(Json(json!({
        "problem_id": problem.id,
        "code_editor_data": code_editor_data,
    })))
}

pub async fn editorial(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path((kind, slug)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let problem = find_problem(&state, &kind, &slug).await.map_err(|e| match e {
        ApiError::Internal(e) => ApiError::Internal(e),
        _ => ApiError::bad_request("Provided problem type and slug do not match any problem"),
    })?;
    Ok(Json(json!({ "editorial": problem.editorial })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solved_status() {
        assert_eq!(solved_status(true), 3);
        assert_eq!(solved_status(false), 0);
    }

    #[test]
    fn test_month_bounds() {
        let (first, last) = month_bounds(2028, 2).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2028, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());
        assert!(month_bounds(2025, 13).is_none());
    }
}
