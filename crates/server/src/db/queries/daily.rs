//! Daily calendar and per-user progress

use anyhow::Result;
use chrono::NaiveDate;
use deadpool_postgres::Pool;
use std::collections::{HashMap, HashSet};
use studyhub_core::{DailyContent, DailyProgress, UserId};
use tokio_postgres::Row;

fn daily_from_row(row: &Row) -> DailyContent {
    DailyContent {
        id: row.get(0),
        date: row.get(1),
        concept_id: row.get(2),
        problem_id: row.get(3),
    }
}

pub async fn get_by_date(pool: &Pool, date: NaiveDate) -> Result<Option<DailyContent>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "SELECT id, date, concept_id, problem_id FROM daily_content WHERE date = $1",
            &[&date],
        )
        .await?;
    Ok(row.as_ref().map(daily_from_row))
}

/// Calendar entries within `[start, end]`, in date order.
pub async fn list_between(
    pool: &Pool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DailyContent>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT id, date, concept_id, problem_id FROM daily_content
             WHERE date >= $1 AND date <= $2 ORDER BY date",
            &[&start, &end],
        )
        .await?;
    Ok(rows.iter().map(daily_from_row).collect())
}

pub async fn list_all(pool: &Pool) -> Result<Vec<DailyContent>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT id, date, concept_id, problem_id FROM daily_content ORDER BY date",
            &[],
        )
        .await?;
    Ok(rows.iter().map(daily_from_row).collect())
}

pub async fn taken_dates(
    pool: &Pool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<HashSet<NaiveDate>> {
    Ok(list_between(pool, start, end)
        .await?
        .into_iter()
        .map(|d| d.date)
        .collect())
}

/// Insert a calendar entry. Returns false when the date is already taken.
pub async fn insert_daily(
    pool: &Pool,
    date: NaiveDate,
    concept_id: i64,
    problem_id: i64,
) -> Result<bool> {
    let client = pool.get().await?;
    let inserted = client
        .execute(
            "INSERT INTO daily_content (date, concept_id, problem_id) VALUES ($1, $2, $3)
             ON CONFLICT (date) DO NOTHING",
            &[&date, &concept_id, &problem_id],
        )
        .await?;
    Ok(inserted > 0)
}

/// Progress rows of one user for the given calendar entries.
pub async fn progress_for(
    pool: &Pool,
    user_id: UserId,
    daily_ids: &[i64],
) -> Result<HashMap<i64, DailyProgress>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT daily_content_id, solved, concept_read FROM daily_progress
             WHERE user_id = $1 AND daily_content_id = ANY($2)",
            &[&user_id, &daily_ids],
        )
        .await?;
    Ok(rows
        .iter()
        .map(|row| {
            (
                row.get(0),
                DailyProgress {
                    solved: row.get(1),
                    concept_read: row.get(2),
                },
            )
        })
        .collect())
}

/// Which half of a calendar day was completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyPart {
    Problem,
    Concept,
}

/// Mark one half of a day done and return the resulting progress.
pub async fn mark_done(
    pool: &Pool,
    user_id: UserId,
    daily_id: i64,
    part: DailyPart,
) -> Result<DailyProgress> {
    let sql = match part {
        DailyPart::Problem => {
            "INSERT INTO daily_progress (user_id, daily_content_id, solved) VALUES ($1, $2, TRUE)
             ON CONFLICT (user_id, daily_content_id) DO UPDATE SET solved = TRUE
             RETURNING solved, concept_read"
        }
        DailyPart::Concept => {
            "INSERT INTO daily_progress (user_id, daily_content_id, concept_read) VALUES ($1, $2, TRUE)
             ON CONFLICT (user_id, daily_content_id) DO UPDATE SET concept_read = TRUE
             RETURNING solved, concept_read"
        }
    };
    let client = pool.get().await?;
    let row = client.query_one(sql, &[&user_id, &daily_id]).await?;
    Ok(DailyProgress {
        solved: row.get(0),
        concept_read: row.get(1),
    })
}
