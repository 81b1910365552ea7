//! Run and submit pipeline
//!
//! `run_samples` backs the "run" button: expected outputs are produced on the
//! fly by the problem's ideal solution. `judge_submission` backs "submit":
//! the stored test cases are run in order and the first failure decides the
//! verdict.

use crate::error::{JudgeError, Result};
use crate::executor::{CodeExecutor, ExecutionRequest, PYTHON3_LANGUAGE_ID};
use serde::Serialize;
use std::sync::Arc;
use studyhub_core::{TestCase, Verdict};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleResult {
    pub input: String,
    pub actual_output: String,
    pub expected_output: String,
    /// Executor status description, e.g. "Accepted" or "Wrong Answer"
    pub verdict: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedTestcase {
    /// 1-based position of the failing test case
    pub testcase_index: usize,
    pub input: String,
    pub output: String,
    pub expected_output: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Judgement {
    pub verdict: Verdict,
    pub passed_count: usize,
    pub total_count: usize,
    /// Output of the last executed test case
    pub stdout: String,
    pub stderr: String,
    /// Slowest test case, seconds
    pub time_taken: f64,
    /// Hungriest test case, KB
    pub memory_taken: f64,
    pub failed_testcase: Option<FailedTestcase>,
}

/// Executor plus the language submissions are compiled as.
#[derive(Clone)]
pub struct Judge {
    executor: Arc<dyn CodeExecutor>,
    language_id: i64,
}

impl Judge {
    pub fn new(executor: Arc<dyn CodeExecutor>) -> Self {
        Self {
            executor,
            language_id: PYTHON3_LANGUAGE_ID,
        }
    }

    pub fn with_language(mut self, language_id: i64) -> Self {
        self.language_id = language_id;
        self
    }

    fn request(&self, source: &str, stdin: &str, expected: Option<&str>) -> ExecutionRequest {
        ExecutionRequest {
            source: source.to_string(),
            stdin: stdin.to_string(),
            expected_output: expected.map(str::to_string),
            language_id: self.language_id,
        }
    }

    /// Run `code` on each input, using `ideal_solution` to produce the
    /// expected output.
    pub async fn run_samples(
        &self,
        code: &str,
        ideal_solution: Option<&str>,
        inputs: &[String],
    ) -> Result<Vec<SampleResult>> {
        let ideal = ideal_solution
            .filter(|s| !s.trim().is_empty())
            .ok_or(JudgeError::MissingIdealSolution)?;

        let mut results = Vec::with_capacity(inputs.len());
        for input in inputs {
            let reference = self
                .executor
                .execute(self.request(ideal, input, None))
                .await?;
            let expected = reference.stdout;

            let run = self
                .executor
                .execute(self.request(code, input, Some(&expected)))
                .await?;

            results.push(SampleResult {
                input: input.clone(),
                verdict: run.status_description().to_string(),
                actual_output: run.stdout,
                expected_output: expected,
            });
        }

        debug!("Ran {} sample inputs", results.len());
        Ok(results)
    }

    /// Judge `code` against the stored test cases.
    pub async fn judge_submission(&self, code: &str, testcases: &[TestCase]) -> Result<Judgement> {
        if testcases.is_empty() {
            return Err(JudgeError::NoTestCases);
        }

        let mut judgement = Judgement {
            verdict: Verdict::Accepted,
            passed_count: 0,
            total_count: testcases.len(),
            stdout: String::new(),
            stderr: String::new(),
            time_taken: 0.0,
            memory_taken: 0.0,
            failed_testcase: None,
        };

        for (index, tc) in testcases.iter().enumerate() {
            let run = self
                .executor
                .execute(self.request(code, &tc.input, Some(&tc.output)))
                .await?;

            judgement.time_taken = judgement.time_taken.max(run.time);
            judgement.memory_taken = judgement.memory_taken.max(run.memory);

            if run.failed() {
                judgement.verdict = Verdict::from_judge_status(run.status_id());
                // compile errors only show up in compile_output
                let error = if run.stderr.is_empty() {
                    run.compile_output.clone()
                } else {
                    run.stderr.clone()
                };
                judgement.failed_testcase = Some(FailedTestcase {
                    testcase_index: index + 1,
                    input: tc.input.clone(),
                    output: run.stdout.clone(),
                    expected_output: tc.output.clone(),
                    error,
                });
                judgement.stdout = run.stdout;
                judgement.stderr = run.stderr;
                break;
            }

            judgement.passed_count += 1;
            judgement.stdout = run.stdout;
            judgement.stderr = run.stderr;
        }

        info!(
            "Judged submission: {} ({}/{} passed)",
            judgement.verdict, judgement.passed_count, judgement.total_count
        );
        Ok(judgement)
    }
}
