//! Concept listing, detail, saving and reading

use super::error::{ApiError, ApiResult};
use crate::auth::{AuthUser, MaybeUser};
use crate::daily;
use crate::db::queries::concepts;
use crate::db::queries::daily::{self as daily_queries, DailyPart};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use studyhub_core::filter::ConceptFilter;
use studyhub_core::heatmap::parse_required_date;
use studyhub_core::pagination::{lenient_page, Page, PageLimits};
use studyhub_core::Concept;
use tracing::debug;

const CONCEPT_PAGE: PageLimits = PageLimits::new(10, 100);

/// `{concepts, page, total_pages, total_items}` listing envelope.
#[derive(Debug, Serialize)]
pub struct ConceptListing<T: Serialize> {
    pub concepts: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T: Serialize> From<Page<T>> for ConceptListing<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            concepts: page.items,
            page: page.number,
            total_pages: page.num_pages,
            total_items: page.count,
        }
    }
}

fn concept_page(params: &HashMap<String, String>, concepts: Vec<Concept>) -> Page<Concept> {
    let per_page = CONCEPT_PAGE.resolve(params.get("page_size").map(String::as_str));
    lenient_page(concepts, params.get("page").map(String::as_str), per_page)
}

#[derive(Debug, Serialize)]
pub struct ConceptSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub preview_image_url: String,
    pub creation_timestamp: DateTime<Utc>,
    pub tags: Vec<String>,
    pub short_description: String,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ConceptListing<ConceptSummary>>> {
    let all = concepts::list_concepts(&state.db).await?;
    let page = concept_page(&params, all).map(|c| ConceptSummary {
        id: c.id,
        title: c.title,
        slug: c.slug,
        preview_image_url: c.preview_image_url,
        creation_timestamp: c.created_at,
        tags: c.tags,
        short_description: c.one_liner_desc,
    });
    Ok(Json(page.into()))
}

#[derive(Debug, Serialize)]
pub struct FilteredConcept {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub creation_timestamp: DateTime<Utc>,
    pub tags: Vec<String>,
    pub description: String,
}

/// Filter by tags, title search, creation window, saved-by-caller and
/// read-by-user.
pub async fn filtered(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ConceptListing<FilteredConcept>>> {
    let mut filter = ConceptFilter::from_params(&params);
    if ConceptFilter::wants_saved_only(&params) {
        // Anonymous callers get the unfiltered list.
        if let Some(user_id) = viewer.id() {
            filter.saved = Some(concepts::saved_concept_ids(&state.db, user_id).await?);
        }
    }
    if let Some(reader) = ConceptFilter::read_by(&params) {
        filter.read = Some(concepts::read_concept_ids(&state.db, reader).await?);
    }

    let matching = filter.apply(concepts::list_concepts(&state.db).await?);
    debug!(matched = matching.len(), "Filtered concepts");

    let page = concept_page(&params, matching).map(|c| FilteredConcept {
        id: c.id,
        title: c.title,
        slug: c.slug,
        creation_timestamp: c.created_at,
        tags: c.tags,
        description: c.one_liner_desc,
    });
    Ok(Json(page.into()))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<Value>> {
    let concept = concepts::get_concept_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::Detail(StatusCode::NOT_FOUND, "Not found.".into()))?;
    let concept_saved = match viewer.id() {
        Some(user_id) => concepts::is_saved(&state.db, concept.id, user_id).await?,
        None => false,
    };

    Ok(Json(json!({
        "id": concept.id,
        "title": concept.title,
        "slug": concept.slug,
        "level": concept.level,
        "preview_image_url": concept.preview_image_url,
        "creation_timestamp": concept.created_at,
        "tags": concept.tags,
        "one_liner_desc": concept.one_liner_desc,
        "description": concept.description,
        "concept_saved": concept_saved,
    })))
}

async fn concept_by_id(state: &AppState, raw: &str) -> ApiResult<Concept> {
    let not_found = || ApiError::Detail(StatusCode::NOT_FOUND, "Not found.".into());
    let id: i64 = raw.parse().map_err(|_| not_found())?;
    concepts::get_concept(&state.db, id).await?.ok_or_else(not_found)
}

pub async fn toggle_save(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(concept): Path<String>,
) -> ApiResult<Json<Value>> {
    let concept = concept_by_id(&state, &concept).await?;
    let (saved, saved_count) = concepts::toggle_save(&state.db, concept.id, user.id).await?;
    let message = if saved {
        "Concept saved successfully."
    } else {
        "Concept unsaved successfully."
    };
    Ok(Json(json!({ "message": message, "saved_count": saved_count })))
}

/// Record a read. Reading today's concept also counts toward the daily
/// progress and streak.
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(concept): Path<String>,
) -> ApiResult<Json<Value>> {
    let concept = concept_by_id(&state, &concept).await?;
    let first_read = concepts::record_read(&state.db, user.id, concept.id).await?;
    let progress = daily::record_progress(
        &state.db,
        user.id,
        DailyPart::Concept,
        concept.id,
        state.today(),
    )
    .await?;

    Ok(Json(json!({
        "message": "Concept marked as read.",
        "first_read": first_read,
        "daily_progress": progress,
    })))
}

pub async fn by_date(
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

    let entry = daily_queries::get_by_date(&state.db, date)
        .await?
        .ok_or_else(|| ApiError::not_found("No content found for the specified date."))?;
    let concept = concepts::get_concept(&state.db, entry.concept_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No content found for the specified date."))?;
    let read = concepts::was_read_on(&state.db, user.id, concept.id, date).await?;

    Ok(Json(json!({
        "date": raw,
        "concept_data": {
            "id": concept.id,
            "slug": concept.slug,
            "title": concept.title,
            "level": concept.level,
            "type": concept.concept_type,
            "tags": concept.tags,
            "preview_image_url": concept.preview_image_url,
            "read": u8::from(read),
        },
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use studyhub_core::{ConceptLevel, Track};

    fn concept(id: i64) -> Concept {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Concept {
            id,
            title: format!("Concept {}", id),
            slug: format!("concept-{}", id),
            description: String::new(),
            one_liner_desc: String::new(),
            level: ConceptLevel::Easy,
            preview_image_url: String::new(),
            author_id: 1,
            concept_type: Track::Ml,
            tags: Vec::new(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_concept_page_is_lenient() {
        let all: Vec<Concept> = (1..=25).map(concept).collect();
        let mut params = HashMap::new();
        params.insert("page".to_string(), "9".to_string());
        let listing: ConceptListing<Concept> = concept_page(&params, all.clone()).into();
        assert_eq!(listing.page, 3);
        assert_eq!(listing.total_pages, 3);
        assert_eq!(listing.total_items, 25);
        assert_eq!(listing.concepts.len(), 5);

        params.insert("page".to_string(), "abc".to_string());
        params.insert("page_size".to_string(), "20".to_string());
        let listing: ConceptListing<Concept> = concept_page(&params, all).into();
        assert_eq!(listing.page, 1);
        assert_eq!(listing.concepts.len(), 20);
    }
}
