//! Code runs and graded submissions

use super::error::{ApiError, ApiResult};
use super::{find_problem, ApiJson};
use crate::auth::AuthUser;
use crate::daily;
use crate::db::queries::daily::DailyPart;
use crate::db::queries::{problems, submissions};
use crate::observability::{AuditEventType, AuditLogger, OperationTimer};
use crate::rule_engine::RuleViolation;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use studyhub_core::{Problem, ProblemDetails, ProblemKind, Verdict};
use studyhub_judge::JudgeError;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct RunCodeRequest {
    pub code: Option<String>,
    pub problem_id: Option<i64>,
    pub problem_type: Option<String>,
    #[serde(default)]
    pub testcases: Vec<String>,
    pub run_only: Option<bool>,
}

/// Validated run-code input.
#[derive(Debug)]
pub struct RunCode {
    pub code: String,
    pub problem_id: i64,
    pub kind: ProblemKind,
    pub testcases: Vec<String>,
    pub run_only: bool,
}

impl RunCodeRequest {
    pub fn validate(self) -> ApiResult<RunCode> {
        let code = self.code.filter(|c| !c.trim().is_empty());
        let kind = match self.problem_type.as_deref() {
            Some(raw) if !raw.is_empty() => Some(ProblemKind::parse(raw)?),
            _ => None,
        };
        match (code, self.problem_id, kind, self.run_only) {
            (Some(code), Some(problem_id), Some(kind), Some(run_only)) if problem_id != 0 => {
                Ok(RunCode {
                    code,
                    problem_id,
                    kind,
                    testcases: self.testcases,
                    run_only,
                })
            }
            _ => Err(ApiError::non_field(
                "All fields (code, problem_id, problem_type, run_only) are required.",
            )),
        }
    }
}

/// Run code against sample inputs, or judge it against the stored test
/// cases and record a submission.
pub async fn run_code(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<RunCodeRequest>,
) -> ApiResult<Json<Value>> {
    let req = req.validate()?;
    if let Err(v) = state.rules.check_run_code(user.id, &req.code) {
        if matches!(v, RuleViolation::RateLimited) {
            AuditLogger::security(
                &state,
                AuditEventType::RateLimitExceeded,
                &user.username,
                "run-code",
            )
            .await;
        }
        return Err(v.into());
    }

    let problem = problems::get_problem(&state.db, req.kind, req.problem_id)
        .await?
        .ok_or_else(|| ApiError::non_field("Problem not found."))?;
    let ProblemDetails::Concept(details) = problems::get_details(&state.db, &problem).await? else {
        return Err(ApiError::bad_request(
            "Dataset problems are evaluated offline and cannot be run here.",
        ));
    };

    if req.run_only {
        let inputs = if req.testcases.is_empty() {
            details.validation_testcases
        } else {
            req.testcases
        };
        let ordered_testcases = match state
            .judge
            .run_samples(&req.code, details.ideal_solution_code.as_deref(), &inputs)
            .await
        {
            Ok(results) => results,
            Err(e) => return Err(judge_failed(&state, &problem, &user.username, e).await),
        };
        return Ok(Json(json!({ "ordered_testcases": ordered_testcases })));
    }

    let timer = OperationTimer::start();
    let judgement = match state
        .judge
        .judge_submission(&req.code, &details.submission_testcases)
        .await
    {
        Ok(j) => j,
        Err(e) => return Err(judge_failed(&state, &problem, &user.username, e).await),
    };

    let failed_info = judgement
        .failed_testcase
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(anyhow::Error::from)?;
    let (submission, counters) = submissions::create_submission(
        &state.db,
        &submissions::NewSubmission {
            user_id: user.id,
            problem_id: problem.id,
            code: req.code,
            verdict: judgement.verdict,
            time_taken: judgement.time_taken,
            memory_taken: judgement.memory_taken,
            failed_testcase_info: failed_info.clone(),
        },
    )
    .await?;

    info!(
        submission_id = submission.id,
        problem_id = problem.id,
        verdict = judgement.verdict.display(),
        passed = judgement.passed_count,
        total = judgement.total_count,
        "Submission judged"
    );
    AuditLogger::submission(
        &state,
        submission.id,
        problem.id,
        &user.username,
        judgement.verdict.display(),
        timer.elapsed_ms(),
    )
    .await;

    if judgement.verdict.is_accepted() {
        daily::record_progress(
            &state.db,
            user.id,
            DailyPart::Problem,
            problem.id,
            state.today(),
        )
        .await?;
    }

    Ok(Json(json!({
        "verdict": judgement.verdict,
        "passed_count": judgement.passed_count,
        "total_count": judgement.total_count,
        "stdout": judgement.stdout,
        "stderr": judgement.stderr,
        "time_taken": judgement.time_taken,
        "memory_taken": judgement.memory_taken,
        "problem_accepted": counters.accepted_submissions,
        "problem_total_submissions": counters.total_submissions,
        "problem_acceptance_rate": studyhub_core::acceptance_rate(
            counters.accepted_submissions,
            counters.total_submissions,
        ),
        "failed_testcase_info": failed_info.unwrap_or_else(|| json!({})),
    })))
}

async fn judge_failed(
    state: &AppState,
    problem: &Problem,
    username: &str,
    err: JudgeError,
) -> ApiError {
    warn!(problem_id = problem.id, user = username, error = %err, "Code execution failed");
    AuditLogger::judge_failed(state, problem.id, username, &err.to_string()).await;
    err.into()
}

#[derive(Debug, Serialize)]
pub struct SubmissionRow {
    pub verdict: Verdict,
    pub time_taken: Option<f64>,
    pub memory_taken: Option<f64>,
    pub created_timestamp: DateTime<Utc>,
    pub code_submitted: Option<String>,
    pub failed_testcase_info: Option<Value>,
}

/// The caller's submissions for one problem, newest first.
pub async fn submissions(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((kind, slug)): Path<(String, String)>,
) -> ApiResult<Json<Vec<SubmissionRow>>> {
    let problem = find_problem(&state, &kind, &slug).await?;
    let rows = submissions::list_for_problem(&state.db, user.id, problem.id)
        .await?
        .into_iter()
        .map(|s| SubmissionRow {
            verdict: s.verdict,
            time_taken: s.time_taken,
            memory_taken: s.memory_taken,
            created_timestamp: s.created_at,
            code_submitted: s.code,
            failed_testcase_info: s.failed_testcase_info,
        })
        .collect();
    Ok(Json(rows))
}
