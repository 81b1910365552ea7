//! Submissions and per-user solve statistics

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use deadpool_postgres::Pool;
use serde_json::Value;
use std::collections::HashSet;
use studyhub_core::progress::SubmissionEvent;
use studyhub_core::{Level, Problem, Submission, UserId, Verdict};
use tokio_postgres::Row;

const SUBMISSION_COLUMNS: &str = "id, user_id, problem_id, code, verdict, time_taken, \
     memory_taken, failed_testcase_info, created_at, updated_at";

fn verdict_from_code(code: i16) -> Result<Verdict> {
    Verdict::from_code(code).ok_or_else(|| anyhow!("unknown verdict code {}", code))
}

fn submission_from_row(row: &Row) -> Result<Submission> {
    Ok(Submission {
        id: row.get(0),
        user_id: row.get(1),
        problem_id: row.get(2),
        code: row.get(3),
        verdict: verdict_from_code(row.get(4))?,
        time_taken: row.get(5),
        memory_taken: row.get(6),
        failed_testcase_info: row.get(7),
        created_at: row.get(8),
        updated_at: row.get(9),
    })
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub user_id: UserId,
    pub problem_id: i64,
    pub code: String,
    pub verdict: Verdict,
    pub time_taken: f64,
    pub memory_taken: f64,
    pub failed_testcase_info: Option<Value>,
}

/// Problem counters after a submission was stored.
#[derive(Debug, Clone, Copy)]
pub struct ProblemCounters {
    pub accepted_submissions: i64,
    pub total_submissions: i64,
}

/// Store a submission and bump the problem's counters in one transaction.
pub async fn create_submission(
    pool: &Pool,
    new: &NewSubmission,
) -> Result<(Submission, ProblemCounters)> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let row = tx
        .query_one(
            &format!(
                "INSERT INTO submissions (user_id, problem_id, code, verdict, time_taken,
                    memory_taken, failed_testcase_info)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING {}",
                SUBMISSION_COLUMNS
            ),
            &[
                &new.user_id,
                &new.problem_id,
                &new.code,
                &new.verdict.code(),
                &new.time_taken,
                &new.memory_taken,
                &new.failed_testcase_info,
            ],
        )
        .await?;
    let submission = submission_from_row(&row)?;

    let accepted_inc: i64 = if new.verdict.is_accepted() { 1 } else { 0 };
    let counters = tx
        .query_one(
            "UPDATE problems
             SET total_submissions = total_submissions + 1,
                 accepted_submissions = accepted_submissions + $2
             WHERE id = $1
             RETURNING accepted_submissions, total_submissions",
            &[&new.problem_id, &accepted_inc],
        )
        .await?;

    tx.commit().await?;
    Ok((
        submission,
        ProblemCounters {
            accepted_submissions: counters.get(0),
            total_submissions: counters.get(1),
        },
    ))
}

/// Ids of problems the user has an accepted submission for.
pub async fn accepted_problem_ids(pool: &Pool, user_id: UserId) -> Result<HashSet<i64>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT DISTINCT problem_id FROM submissions WHERE user_id = $1 AND verdict = $2",
            &[&user_id, &Verdict::Accepted.code()],
        )
        .await?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
}

pub async fn has_accepted(pool: &Pool, user_id: UserId, problem_id: i64) -> Result<bool> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "SELECT 1 FROM submissions WHERE user_id = $1 AND problem_id = $2 AND verdict = $3 LIMIT 1",
            &[&user_id, &problem_id, &Verdict::Accepted.code()],
        )
        .await?;
    Ok(row.is_some())
}

/// A user's submissions for one problem, newest first.
pub async fn list_for_problem(
    pool: &Pool,
    user_id: UserId,
    problem_id: i64,
) -> Result<Vec<Submission>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!(
                "SELECT {} FROM submissions WHERE user_id = $1 AND problem_id = $2
                 ORDER BY created_at DESC, id DESC",
                SUBMISSION_COLUMNS
            ),
            &[&user_id, &problem_id],
        )
        .await?;
    rows.iter().map(submission_from_row).collect()
}

/// Submissions made on `day` (UTC) with their problem titles.
pub async fn events_on(
    pool: &Pool,
    user_id: UserId,
    day: NaiveDate,
) -> Result<Vec<SubmissionEvent>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT s.id, s.problem_id, p.title, s.verdict, s.created_at
             FROM submissions s JOIN problems p ON p.id = s.problem_id
             WHERE s.user_id = $1 AND (s.created_at AT TIME ZONE 'UTC')::date = $2",
            &[&user_id, &day],
        )
        .await?;
    rows.iter()
        .map(|row| {
            Ok(SubmissionEvent {
                submission_id: row.get(0),
                problem_id: row.get(1),
                problem_title: row.get(2),
                verdict: verdict_from_code(row.get(3))?,
                created_at: row.get(4),
            })
        })
        .collect()
}

/// Accepted submission counts per UTC day within `[start, end_exclusive)`.
pub async fn accepted_per_day(
    pool: &Pool,
    user_id: UserId,
    start: NaiveDate,
    end_exclusive: NaiveDate,
) -> Result<Vec<(NaiveDate, i64)>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*)
             FROM submissions
             WHERE user_id = $1 AND verdict = $2
               AND (created_at AT TIME ZONE 'UTC')::date >= $3
               AND (created_at AT TIME ZONE 'UTC')::date < $4
             GROUP BY day ORDER BY day",
            &[&user_id, &Verdict::Accepted.code(), &start, &end_exclusive],
        )
        .await?;
    Ok(rows.iter().map(|row| (row.get(0), row.get(1))).collect())
}

/// Level of the problem behind every accepted submission.
pub async fn accepted_levels(pool: &Pool, user_id: UserId) -> Result<Vec<Level>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT p.level FROM submissions s JOIN problems p ON p.id = s.problem_id
             WHERE s.user_id = $1 AND s.verdict = $2",
            &[&user_id, &Verdict::Accepted.code()],
        )
        .await?;
    rows.iter()
        .map(|row| Ok(Level::parse(row.get(0))?))
        .collect()
}

/// Most recent submission per problem.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub problem_id: i64,
    pub verdict: Verdict,
    pub last_attempted: DateTime<Utc>,
}

/// Number of distinct problems the user has submitted to.
pub async fn count_attempted(pool: &Pool, user_id: UserId) -> Result<i64> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "SELECT COUNT(DISTINCT problem_id) FROM submissions WHERE user_id = $1",
            &[&user_id],
        )
        .await?;
    Ok(row.get(0))
}

/// One page of the latest submission for every problem the user attempted,
/// newest first.
pub async fn latest_attempts(
    pool: &Pool,
    user_id: UserId,
    limit: i64,
    offset: i64,
) -> Result<Vec<Attempt>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT * FROM (
                SELECT DISTINCT ON (problem_id) problem_id, verdict, created_at
                FROM submissions WHERE user_id = $1
                ORDER BY problem_id, created_at DESC, id DESC
             ) latest
             ORDER BY created_at DESC, problem_id DESC
             LIMIT $2 OFFSET $3",
            &[&user_id, &limit, &offset],
        )
        .await?;
    rows.iter()
        .map(|row| {
            Ok(Attempt {
                problem_id: row.get(0),
                verdict: verdict_from_code(row.get(1))?,
                last_attempted: row.get(2),
            })
        })
        .collect()
}

pub async fn count_for_user(pool: &Pool, user_id: UserId) -> Result<i64> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "SELECT COUNT(*) FROM submissions WHERE user_id = $1",
            &[&user_id],
        )
        .await?;
    Ok(row.get(0))
}

/// One page of a user's submissions, newest first.
pub async fn list_for_user(
    pool: &Pool,
    user_id: UserId,
    limit: i64,
    offset: i64,
) -> Result<Vec<Submission>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!(
                "SELECT {} FROM submissions WHERE user_id = $1
                 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
                SUBMISSION_COLUMNS
            ),
            &[&user_id, &limit, &offset],
        )
        .await?;
    rows.iter().map(submission_from_row).collect()
}

/// Resolve the problems referenced by a batch of submissions.
pub async fn problems_for(pool: &Pool, submissions: &[Submission]) -> Result<Vec<Problem>> {
    let mut ids: Vec<i64> = submissions.iter().map(|s| s.problem_id).collect();
    ids.sort_unstable();
    ids.dedup();
    super::problems::get_problems_by_ids(pool, &ids).await
}
