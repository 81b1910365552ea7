//! Concepts, saves and reads

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use deadpool_postgres::Pool;
use std::collections::HashSet;
use studyhub_core::{Concept, ConceptLevel, Track, UserId};
use tokio_postgres::Row;

pub(crate) const CONCEPT_COLUMNS: &str = "id, title, slug, description, one_liner_desc, level, \
     preview_image_url, author_id, concept_type, tags, created_at, updated_at";

pub(crate) fn concept_from_row(row: &Row) -> Result<Concept> {
    Ok(Concept {
        id: row.get(0),
        title: row.get(1),
        slug: row.get(2),
        description: row.get(3),
        one_liner_desc: row.get(4),
        level: ConceptLevel::parse(row.get(5))?,
        preview_image_url: row.get(6),
        author_id: row.get(7),
        concept_type: Track::parse(row.get(8))?,
        tags: row.get(9),
        created_at: row.get(10),
        updated_at: row.get(11),
    })
}

fn concepts_from_rows(rows: &[Row]) -> Result<Vec<Concept>> {
    rows.iter().map(concept_from_row).collect()
}

/// All concepts, newest first.
pub async fn list_concepts(pool: &Pool) -> Result<Vec<Concept>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!(
                "SELECT {} FROM concepts ORDER BY created_at DESC, id DESC",
                CONCEPT_COLUMNS
            ),
            &[],
        )
        .await?;
    concepts_from_rows(&rows)
}

pub async fn get_concept_by_slug(pool: &Pool, slug: &str) -> Result<Option<Concept>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!("SELECT {} FROM concepts WHERE slug = $1", CONCEPT_COLUMNS),
            &[&slug],
        )
        .await?;
    row.as_ref().map(concept_from_row).transpose()
}

pub async fn get_concept(pool: &Pool, id: i64) -> Result<Option<Concept>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!("SELECT {} FROM concepts WHERE id = $1", CONCEPT_COLUMNS),
            &[&id],
        )
        .await?;
    row.as_ref().map(concept_from_row).transpose()
}

pub async fn get_concepts_by_ids(pool: &Pool, ids: &[i64]) -> Result<Vec<Concept>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!("SELECT {} FROM concepts WHERE id = ANY($1)", CONCEPT_COLUMNS),
            &[&ids],
        )
        .await?;
    concepts_from_rows(&rows)
}

pub async fn concept_slugs(pool: &Pool) -> Result<Vec<String>> {
    let client = pool.get().await?;
    let rows = client.query("SELECT slug FROM concepts", &[]).await?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
}

#[derive(Debug, Clone)]
pub struct NewConcept {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub one_liner_desc: String,
    pub level: ConceptLevel,
    pub preview_image_url: String,
    pub author_id: UserId,
    pub concept_type: Track,
    pub tags: Vec<String>,
}

pub async fn insert_concept(pool: &Pool, new: &NewConcept) -> Result<Concept> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            &format!(
                "INSERT INTO concepts (title, slug, description, one_liner_desc, level,
                    preview_image_url, author_id, concept_type, tags)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 RETURNING {}",
                CONCEPT_COLUMNS
            ),
            &[
                &new.title,
                &new.slug,
                &new.description,
                &new.one_liner_desc,
                &new.level.as_str(),
                &new.preview_image_url,
                &new.author_id,
                &new.concept_type.as_str(),
                &new.tags,
            ],
        )
        .await?;
    concept_from_row(&row)
}

// ============================================================================
// SAVES
// ============================================================================

pub async fn saved_concept_ids(pool: &Pool, user_id: UserId) -> Result<HashSet<i64>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT concept_id FROM concept_saves WHERE user_id = $1",
            &[&user_id],
        )
        .await?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
}

pub async fn is_saved(pool: &Pool, concept_id: i64, user_id: UserId) -> Result<bool> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "SELECT 1 FROM concept_saves WHERE concept_id = $1 AND user_id = $2",
            &[&concept_id, &user_id],
        )
        .await?;
    Ok(row.is_some())
}

/// Flip the save state. Returns the new state and the concept's save count.
pub async fn toggle_save(pool: &Pool, concept_id: i64, user_id: UserId) -> Result<(bool, i64)> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let removed = tx
        .execute(
            "DELETE FROM concept_saves WHERE concept_id = $1 AND user_id = $2",
            &[&concept_id, &user_id],
        )
        .await?;
    let saved = removed == 0;
    if saved {
        tx.execute(
            "INSERT INTO concept_saves (concept_id, user_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
            &[&concept_id, &user_id],
        )
        .await?;
    }

    let row = tx
        .query_one(
            "SELECT COUNT(*) FROM concept_saves WHERE concept_id = $1",
            &[&concept_id],
        )
        .await?;
    tx.commit().await?;
    Ok((saved, row.get(0)))
}

// ============================================================================
// READS
// ============================================================================

pub async fn read_concept_ids(pool: &Pool, user_id: UserId) -> Result<HashSet<i64>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT concept_id FROM concept_reads WHERE user_id = $1",
            &[&user_id],
        )
        .await?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
}

/// Record a read. A concept counts once per user; re-reading keeps the
/// first timestamp. Returns true on the first read.
pub async fn record_read(pool: &Pool, user_id: UserId, concept_id: i64) -> Result<bool> {
    let client = pool.get().await?;
    let inserted = client
        .execute(
            "INSERT INTO concept_reads (user_id, concept_id) VALUES ($1, $2)
             ON CONFLICT (user_id, concept_id) DO NOTHING",
            &[&user_id, &concept_id],
        )
        .await?;
    Ok(inserted > 0)
}

/// Whether the user read the concept on `day` (UTC).
pub async fn was_read_on(
    pool: &Pool,
    user_id: UserId,
    concept_id: i64,
    day: NaiveDate,
) -> Result<bool> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "SELECT 1 FROM concept_reads
             WHERE user_id = $1 AND concept_id = $2 AND (read_at AT TIME ZONE 'UTC')::date = $3",
            &[&user_id, &concept_id, &day],
        )
        .await?;
    Ok(row.is_some())
}

/// Concepts read on `day` as (id, title).
pub async fn reads_on(pool: &Pool, user_id: UserId, day: NaiveDate) -> Result<Vec<(i64, String)>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT c.id, c.title FROM concept_reads r
             JOIN concepts c ON c.id = r.concept_id
             WHERE r.user_id = $1 AND (r.read_at AT TIME ZONE 'UTC')::date = $2
             ORDER BY r.read_at ASC",
            &[&user_id, &day],
        )
        .await?;
    Ok(rows.iter().map(|row| (row.get(0), row.get(1))).collect())
}

/// Read counts per UTC day within `[start, end_exclusive)`.
pub async fn reads_per_day(
    pool: &Pool,
    user_id: UserId,
    start: NaiveDate,
    end_exclusive: NaiveDate,
) -> Result<Vec<(NaiveDate, i64)>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT (read_at AT TIME ZONE 'UTC')::date AS day, COUNT(*)
             FROM concept_reads
             WHERE user_id = $1
               AND (read_at AT TIME ZONE 'UTC')::date >= $2
               AND (read_at AT TIME ZONE 'UTC')::date < $3
             GROUP BY day ORDER BY day",
            &[&user_id, &start, &end_exclusive],
        )
        .await?;
    Ok(rows.iter().map(|row| (row.get(0), row.get(1))).collect())
}

pub async fn count_reads(pool: &Pool, user_id: UserId) -> Result<i64> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "SELECT COUNT(*) FROM concept_reads r JOIN concepts c ON c.id = r.concept_id
             WHERE r.user_id = $1",
            &[&user_id],
        )
        .await?;
    Ok(row.get(0))
}

/// One page of the concepts a user read, most recent first.
pub async fn read_history(
    pool: &Pool,
    user_id: UserId,
    limit: i64,
    offset: i64,
) -> Result<Vec<(Concept, DateTime<Utc>)>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT c.id, c.title, c.slug, c.description, c.one_liner_desc, c.level,
                    c.preview_image_url, c.author_id, c.concept_type, c.tags, c.created_at,
                    c.updated_at, r.read_at
             FROM concept_reads r JOIN concepts c ON c.id = r.concept_id
             WHERE r.user_id = $1
             ORDER BY r.read_at DESC, r.id DESC
             LIMIT $2 OFFSET $3",
            &[&user_id, &limit, &offset],
        )
        .await?;
    rows.iter()
        .map(|row| Ok((concept_from_row(row)?, row.get(12))))
        .collect()
}
