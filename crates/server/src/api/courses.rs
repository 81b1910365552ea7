//! Course catalogue, likes and follows

use super::error::{ApiError, ApiResult};
use crate::auth::AuthUser;
use crate::db::queries::courses;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use studyhub_core::Course;

#[derive(Debug, Serialize)]
pub struct CourseView {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub followers_count: i64,
    pub likes_count: i64,
}

impl From<Course> for CourseView {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            slug: course.slug,
            title: course.title,
            description: course.description,
            followers_count: course.followers_count,
            likes_count: course.likes_count,
        }
    }
}

pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<CourseView>>> {
    let all = courses::list_courses(&state.db).await?;
    Ok(Json(all.into_iter().map(CourseView::from).collect()))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<Json<CourseView>> {
    let course = courses::get_course_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found."))?;
    Ok(Json(course.into()))
}

/// Courses are addressed by id for likes and follows.
async fn course_by_id(state: &AppState, raw: &str) -> ApiResult<Course> {
    let not_found = || ApiError::Detail(StatusCode::NOT_FOUND, "Not found.".into());
    let id: i64 = raw.parse().map_err(|_| not_found())?;
    courses::get_course(&state.db, id).await?.ok_or_else(not_found)
}

pub async fn toggle_like(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(course): Path<String>,
) -> ApiResult<Json<Value>> {
    let course = course_by_id(&state, &course).await?;
    let (liked, likes_count) = courses::toggle_like(&state.db, course.id, user.id).await?;
    let message = if liked {
        "Course liked successfully."
    } else {
        "Course unliked successfully."
    };
    Ok(Json(json!({ "message": message, "likes_count": likes_count })))
}

pub async fn follow(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(course): Path<String>,
) -> ApiResult<StatusCode> {
    let course = course_by_id(&state, &course).await?;
    courses::follow(&state.db, course.id, user.id).await?;
    Ok(StatusCode::OK)
}
