//! Private notes and public comment threads on problems

use super::error::{ApiError, ApiResult};
use super::{find_problem, ApiJson, FieldErrors};
use crate::auth::{AuthUser, MaybeUser};
use crate::db::queries::{discussion, problems};
use crate::observability::{AuditEventType, AuditLogger};
use crate::rule_engine::RuleViolation;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use studyhub_core::{validate_reply_target, Comment, ProblemKind, Reaction};

// ============================================================================
// NOTES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NotesRequest {
    pub notes: Option<String>,
    pub problem_type: Option<String>,
    pub problem_id: Option<i64>,
}

pub async fn notes_post(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<NotesRequest>,
) -> ApiResult<Json<Value>> {
    let mut errors = FieldErrors::default();
    let notes = errors.require("notes", &req.notes).to_string();
    let raw_kind = errors.require("problem_type", &req.problem_type).to_string();
    if req.problem_id.is_none() {
        errors.add("problem_id", super::REQUIRED);
    }
    errors.finish()?;

    let kind = ProblemKind::parse(&raw_kind)?;
    let problem_id = req.problem_id.unwrap_or_default();
    let problem = problems::get_problem(&state.db, kind, problem_id)
        .await?
        .ok_or_else(|| ApiError::non_field("Problem not found"))?;

    discussion::save_note(&state.db, user.id, problem.id, &notes).await?;
    Ok(Json(json!({ "message": "Notes saved successfully" })))
}

pub async fn notes_get(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let slug = params
        .get("problem_slug")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Problem slug is required."))?;
    let kind = params.get("problem_type").map(String::as_str).unwrap_or("");

    let problem = find_problem(&state, kind, slug).await?;
    let note = discussion::get_or_create_note(&state.db, user.id, problem.id).await?;
    Ok(Json(json!({ "notes": note.note })))
}

// ============================================================================
// COMMENTS
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub action_performed: Option<&'static str>,
    pub like_count: i64,
    pub dislike_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentView>>,
}

impl CommentView {
    fn new(comment: &Comment, replies: Option<Vec<CommentView>>) -> Self {
        Self {
            id: comment.id,
            content: comment.content.clone(),
            created_at: comment.created_at,
            action_performed: comment.viewer_reaction.map(|r| r.past_tense()),
            like_count: comment.like_count,
            dislike_count: comment.dislike_count,
            replies,
        }
    }
}

/// Group replies under their top-level comment. Replies whose parent is not
/// in the list are dropped.
pub fn build_threads(comments: &[Comment]) -> Vec<CommentView> {
    let mut replies: HashMap<i64, Vec<CommentView>> = HashMap::new();
    for reply in comments.iter().filter(|c| c.parent_id.is_some()) {
        if let Some(parent) = reply.parent_id {
            replies
                .entry(parent)
                .or_default()
                .push(CommentView::new(reply, None));
        }
    }
    comments
        .iter()
        .filter(|c| c.parent_id.is_none())
        .map(|c| CommentView::new(c, Some(replies.remove(&c.id).unwrap_or_default())))
        .collect()
}

pub async fn comments_get(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path((kind, slug)): Path<(String, String)>,
) -> ApiResult<Json<Vec<CommentView>>> {
    let problem = find_problem(&state, &kind, &slug).await?;
    // Anonymous viewers have no reactions; id 0 never matches a user.
    let viewer_id = viewer.id().unwrap_or(0);
    let comments = discussion::list_comments(&state.db, problem.id, viewer_id).await?;
    Ok(Json(build_threads(&comments)))
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
    pub parent_comment_id: Option<i64>,
}

pub async fn comments_post(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((kind, slug)): Path<(String, String)>,
    ApiJson(req): ApiJson<CommentRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut errors = FieldErrors::default();
    let content = errors.require("content", &req.content).to_string();
    errors.finish()?;

    let problem = find_problem(&state, &kind, &slug).await?;
    let parent_id = match req.parent_comment_id {
        Some(parent_id) => {
            let parent = discussion::get_comment(&state.db, parent_id, user.id)
                .await?
                .ok_or_else(|| ApiError::non_field("Parent comment not found"))?;
            validate_reply_target(&parent, problem.id)?;
            Some(parent.id)
        }
        None => None,
    };

    if let Err(v) = state.rules.check_comment(user.id, &content) {
        if matches!(v, RuleViolation::RateLimited) {
            AuditLogger::security(
                &state,
                AuditEventType::RateLimitExceeded,
                &user.username,
                "comments",
            )
            .await;
        }
        return Err(v.into());
    }

    discussion::insert_comment(&state.db, user.id, problem.id, &content, parent_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Comment created successfully" })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub comment_id: Option<i64>,
    pub action: Option<String>,
}

pub async fn react(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<ReactionRequest>,
) -> ApiResult<Json<Value>> {
    let mut errors = FieldErrors::default();
    let action = errors.require("action", &req.action).to_string();
    if req.comment_id.is_none() {
        errors.add("comment_id", super::REQUIRED);
    }
    let reaction = if action.is_empty() {
        None
    } else {
        match Reaction::parse(&action) {
            Ok(r) => Some(r),
            Err(_) => {
                errors.add("action", "Invalid action");
                None
            }
        }
    };
    errors.finish()?;

    let (Some(comment_id), Some(reaction)) = (req.comment_id, reaction) else {
        return Err(ApiError::non_field("Comment not found"));
    };
    let comment = discussion::get_comment(&state.db, comment_id, user.id)
        .await?
        .ok_or_else(|| ApiError::non_field("Comment not found"))?;

    discussion::set_reaction(&state.db, comment.id, user.id, reaction).await?;
    Ok(Json(json!({
        "message": format!("Comment {} successfully", reaction.past_tense())
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn comment(id: i64, parent_id: Option<i64>, reaction: Option<Reaction>) -> Comment {
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        Comment {
            id,
            user_id: 1,
            problem_id: 7,
            content: format!("comment {}", id),
            parent_id,
            like_count: 0,
            dislike_count: 0,
            viewer_reaction: reaction,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_build_threads() {
        let comments = vec![
            comment(1, None, Some(Reaction::Like)),
            comment(2, Some(1), None),
            comment(3, None, None),
            comment(4, Some(1), Some(Reaction::Dislike)),
            comment(5, Some(99), None),
        ];
        let threads = build_threads(&comments);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].id, 1);
        assert_eq!(threads[0].action_performed, Some("liked"));
        let replies = threads[0].replies.as_ref().unwrap();
        assert_eq!(replies.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(replies[1].action_performed, Some("disliked"));
        assert!(threads[1].replies.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_thread_json_shape() {
        let threads = build_threads(&[comment(1, None, None), comment(2, Some(1), None)]);
        let value = serde_json::to_value(&threads).unwrap();
        assert_eq!(value[0]["action_performed"], Value::Null);
        assert!(value[0]["replies"][0].get("replies").is_none());
    }
}
