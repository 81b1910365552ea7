//! Judge0 HTTP client
//!
//! Submissions go through the synchronous endpoint (`wait=true`) with every
//! text field base64 encoded, so a single POST returns the finished run.

use crate::error::{JudgeError, Result};
use crate::executor::{CodeExecutor, ExecutionRequest, ExecutionResult, ExecutionStatus};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_HOST: &str = "judge0-ce.p.rapidapi.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct Judge0Config {
    /// Submissions endpoint, e.g. `https://judge0-ce.p.rapidapi.com/submissions`
    pub url: String,
    pub api_key: String,
    pub api_host: String,
    pub timeout: Duration,
}

impl Judge0Config {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            api_host: DEFAULT_API_HOST.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
struct SubmissionBody {
    language_id: i64,
    source_code: String,
    stdin: String,
    expected_output: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    status: Option<ExecutionStatus>,
    // seconds, sent as a decimal string
    time: Option<serde_json::Value>,
    memory: Option<serde_json::Value>,
}

fn encode(text: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
}

/// Decode a base64 field. Judge0 wraps long values across lines.
pub fn decode_field(field: Option<&str>) -> Result<String> {
    let Some(raw) = field else {
        return Ok(String::new());
    };
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| JudgeError::InvalidResponse(format!("bad base64 field: {}", e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Numbers arrive either as JSON numbers or as strings.
fn as_number(value: Option<&serde_json::Value>) -> f64 {
    match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub struct Judge0Client {
    config: Judge0Config,
    client: Client,
}

impl Judge0Client {
    pub fn new(config: Judge0Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| JudgeError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl CodeExecutor for Judge0Client {
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let body = SubmissionBody {
            language_id: request.language_id,
            source_code: encode(&request.source),
            stdin: encode(&request.stdin),
            expected_output: request
                .expected_output
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(encode),
        };

        debug!(
            "Submitting {} bytes to Judge0 (language {})",
            request.source.len(),
            request.language_id
        );

        let resp = self
            .client
            .post(&self.config.url)
            .query(&[
                ("base64_encoded", "true"),
                ("wait", "true"),
                ("fields", "*"),
            ])
            .header("x-rapidapi-host", &self.config.api_host)
            .header("x-rapidapi-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Judge0 returned {}: {}", status, body);
            return Err(JudgeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        let raw: SubmissionResponse = serde_json::from_str(&text)
            .map_err(|e| JudgeError::InvalidResponse(e.to_string()))?;

        Ok(ExecutionResult {
            stdout: decode_field(raw.stdout.as_deref())?,
            stderr: decode_field(raw.stderr.as_deref())?,
            compile_output: decode_field(raw.compile_output.as_deref())?,
            status: raw.status,
            time: as_number(raw.time.as_ref()),
            memory: as_number(raw.memory.as_ref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_field() {
        assert_eq!(decode_field(None).unwrap(), "");
        assert_eq!(decode_field(Some("aGVsbG8K")).unwrap(), "hello\n");
        // line-wrapped payload
        assert_eq!(decode_field(Some("aGVs\nbG8K\n")).unwrap(), "hello\n");
        assert!(decode_field(Some("not base64!")).is_err());
    }

    #[test]
    fn test_as_number() {
        assert_eq!(as_number(Some(&serde_json::json!("0.25"))), 0.25);
        assert_eq!(as_number(Some(&serde_json::json!(3072))), 3072.0);
        assert_eq!(as_number(Some(&serde_json::Value::Null)), 0.0);
        assert_eq!(as_number(None), 0.0);
    }

    #[test]
    fn test_body_encoding() {
        let body = SubmissionBody {
            language_id: 71,
            source_code: encode("print(1)"),
            stdin: encode(""),
            expected_output: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["source_code"], "cHJpbnQoMSk=");
        assert_eq!(json["stdin"], "");
        assert!(json["expected_output"].is_null());
        assert_eq!(json["language_id"], 71);
    }

    #[test]
    fn test_response_parse() {
        let raw: SubmissionResponse = serde_json::from_str(
            r#"{"stdout":"NDIK","stderr":null,"compile_output":null,
                "status":{"id":3,"description":"Accepted"},"time":"0.012","memory":3360}"#,
        )
        .unwrap();
        assert_eq!(decode_field(raw.stdout.as_deref()).unwrap(), "42\n");
        assert_eq!(raw.status.unwrap().id, 3);
        assert_eq!(as_number(raw.time.as_ref()), 0.012);
    }
}
