//! Problems and their kind-specific details

use anyhow::{anyhow, Result};
use deadpool_postgres::Pool;
use serde_json::Value;
use studyhub_core::filter::DifficultyCounts;
use studyhub_core::{
    ConceptProblemDetails, DatasetProblemDetails, Level, Problem, ProblemDetails, ProblemKind,
    TestCase, Track, UserId,
};
use tokio_postgres::Row;

const PROBLEM_SELECT: &str = "SELECT p.id, p.kind, p.title, p.slug, p.track, p.author_id,
        p.description, p.editorial, p.level, p.accepted_submissions, p.total_submissions,
        p.course_id, c.slug, p.tags, p.created_at, p.updated_at
     FROM problems p LEFT JOIN courses c ON c.id = p.course_id";

fn problem_from_row(row: &Row) -> Result<Problem> {
    Ok(Problem {
        id: row.get(0),
        kind: ProblemKind::parse(row.get(1))?,
        title: row.get(2),
        slug: row.get(3),
        track: Track::parse(row.get(4))?,
        author_id: row.get(5),
        description: row.get(6),
        editorial: row.get(7),
        level: Level::parse(row.get(8))?,
        accepted_submissions: row.get(9),
        total_submissions: row.get(10),
        course_id: row.get(11),
        course_slug: row.get(12),
        tags: row.get(13),
        created_at: row.get(14),
        updated_at: row.get(15),
    })
}

fn problems_from_rows(rows: &[Row]) -> Result<Vec<Problem>> {
    rows.iter().map(problem_from_row).collect()
}

/// Problems of one kind, or of both when `kind` is `None`.
pub async fn list_problems(pool: &Pool, kind: Option<ProblemKind>) -> Result<Vec<Problem>> {
    let client = pool.get().await?;
    let rows = match kind {
        Some(kind) => {
            client
                .query(
                    &format!("{} WHERE p.kind = $1 ORDER BY p.id", PROBLEM_SELECT),
                    &[&kind.as_str()],
                )
                .await?
        }
        None => {
            client
                .query(&format!("{} ORDER BY p.id", PROBLEM_SELECT), &[])
                .await?
        }
    };
    problems_from_rows(&rows)
}

pub async fn get_problem_by_slug(
    pool: &Pool,
    kind: ProblemKind,
    slug: &str,
) -> Result<Option<Problem>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!("{} WHERE p.kind = $1 AND p.slug = $2", PROBLEM_SELECT),
            &[&kind.as_str(), &slug],
        )
        .await?;
    row.as_ref().map(problem_from_row).transpose()
}

pub async fn get_problem(pool: &Pool, kind: ProblemKind, id: i64) -> Result<Option<Problem>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!("{} WHERE p.kind = $1 AND p.id = $2", PROBLEM_SELECT),
            &[&kind.as_str(), &id],
        )
        .await?;
    row.as_ref().map(problem_from_row).transpose()
}

pub async fn get_problems_by_ids(pool: &Pool, ids: &[i64]) -> Result<Vec<Problem>> {
    let client = pool.get().await?;
    let rows = client
        .query(&format!("{} WHERE p.id = ANY($1)", PROBLEM_SELECT), &[&ids])
        .await?;
    problems_from_rows(&rows)
}

pub async fn problem_slugs(pool: &Pool, kind: ProblemKind) -> Result<Vec<String>> {
    let client = pool.get().await?;
    let rows = client
        .query("SELECT slug FROM problems WHERE kind = $1", &[&kind.as_str()])
        .await?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
}

/// Number of problems per level across both kinds.
pub async fn difficulty_totals(pool: &Pool) -> Result<DifficultyCounts> {
    let client = pool.get().await?;
    let rows = client
        .query("SELECT level, COUNT(*) FROM problems GROUP BY level", &[])
        .await?;
    let mut totals = DifficultyCounts::default();
    for row in &rows {
        if let Ok(level) = Level::parse(row.get(0)) {
            totals.add(level, row.get(1));
        }
    }
    Ok(totals)
}

// ============================================================================
// DETAILS
// ============================================================================

fn string_list(value: Option<Value>) -> Result<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => Ok(serde_json::from_value(v)?),
    }
}

fn testcase_list(value: Option<Value>) -> Result<Vec<TestCase>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => Ok(serde_json::from_value(v)?),
    }
}

pub async fn get_details(pool: &Pool, problem: &Problem) -> Result<ProblemDetails> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "SELECT code_editor_template, ideal_solution_code, validation_testcases,
                    submission_testcases, evaluation_metrics, test_data_file_path,
                    data_available_to_user_file_path, ideal_metrics_json_file_path
             FROM problems WHERE id = $1",
            &[&problem.id],
        )
        .await?;

    let details = match problem.kind {
        ProblemKind::Concept => ProblemDetails::Concept(ConceptProblemDetails {
            code_editor_template: row.get(0),
            ideal_solution_code: row.get(1),
            validation_testcases: string_list(row.get(2))?,
            submission_testcases: testcase_list(row.get(3))?,
        }),
        ProblemKind::Dataset => ProblemDetails::Dataset(DatasetProblemDetails {
            evaluation_metrics: row.get::<_, Option<Value>>(4).unwrap_or(Value::Null),
            test_data_file_path: row.get(5),
            data_available_to_user_file_path: row
                .get::<_, Option<String>>(6)
                .ok_or_else(|| anyhow!("dataset problem {} has no user data file", problem.id))?,
            ideal_metrics_json_file_path: row.get(7),
        }),
    };
    Ok(details)
}

#[derive(Debug, Clone)]
pub struct NewProblem {
    pub title: String,
    pub slug: String,
    pub track: Track,
    pub author_id: UserId,
    pub description: Option<String>,
    pub editorial: Option<String>,
    pub level: Level,
    pub course_id: Option<i64>,
    pub tags: Vec<String>,
    pub details: ProblemDetails,
}

impl NewProblem {
    pub fn kind(&self) -> ProblemKind {
        match self.details {
            ProblemDetails::Concept(_) => ProblemKind::Concept,
            ProblemDetails::Dataset(_) => ProblemKind::Dataset,
        }
    }
}

pub async fn insert_problem(pool: &Pool, new: &NewProblem) -> Result<i64> {
    let kind = new.kind();
    let (template, ideal, validation, submission) = match &new.details {
        ProblemDetails::Concept(c) => (
            c.code_editor_template.clone(),
            c.ideal_solution_code.clone(),
            Some(serde_json::to_value(&c.validation_testcases)?),
            Some(serde_json::to_value(&c.submission_testcases)?),
        ),
        ProblemDetails::Dataset(_) => (None, None, None, None),
    };
    let (metrics, test_path, user_path, ideal_path) = match &new.details {
        ProblemDetails::Dataset(d) => (
            Some(d.evaluation_metrics.clone()),
            d.test_data_file_path.clone(),
            Some(d.data_available_to_user_file_path.clone()),
            d.ideal_metrics_json_file_path.clone(),
        ),
        ProblemDetails::Concept(_) => (None, None, None, None),
    };

    let client = pool.get().await?;
    let row = client
        .query_one(
            "INSERT INTO problems (kind, title, slug, track, author_id, description, editorial,
                level, course_id, tags, code_editor_template, ideal_solution_code,
                validation_testcases, submission_testcases, evaluation_metrics,
                test_data_file_path, data_available_to_user_file_path, ideal_metrics_json_file_path)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                     $10, $11, $12, $13, $14, $15, $16, $17, $18)
             RETURNING id",
            &[
                &kind.as_str(),
                &new.title,
                &new.slug,
                &new.track.as_str(),
                &new.author_id,
                &new.description,
                &new.editorial,
                &new.level.as_str(),
                &new.course_id,
                &new.tags,
                &template,
                &ideal,
                &validation,
                &submission,
                &metrics,
                &test_path,
                &user_path,
                &ideal_path,
            ],
        )
        .await?;
    Ok(row.get(0))
}
