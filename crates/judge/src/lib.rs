//! StudyHub Judge - runs user code against problem test cases
//!
//! Execution itself is delegated to a Judge0-compatible service behind the
//! `CodeExecutor` trait; this crate turns executor results into verdicts.

pub mod error;
pub mod executor;
pub mod judge0;
pub mod pipeline;

pub use error::{JudgeError, Result};
pub use executor::{CodeExecutor, ExecutionRequest, ExecutionResult, ExecutionStatus};
pub use judge0::{Judge0Client, Judge0Config};
pub use pipeline::{FailedTestcase, Judge, Judgement, SampleResult};
