//! API error responses
//!
//! Error bodies follow the shapes clients already parse:
//! `{"message": ...}`, `{"detail": ...}`, `{"error": ...}`,
//! `{"<field>": ["..."]}` and `{"non_field_errors": ["..."]}`.

use crate::auth::AuthError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use studyhub_core::CoreError;
use studyhub_judge::JudgeError;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    Message(StatusCode, String),
    Detail(StatusCode, String),
    Error(StatusCode, String),
    /// Field validation errors, rendered as 400
    Fields(Vec<(String, String)>),
    NonField(String),
    Body(StatusCode, Value),
    Internal(anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::Message(StatusCode::BAD_REQUEST, msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::Message(StatusCode::NOT_FOUND, msg.into())
    }

    pub fn field(name: impl Into<String>, msg: impl Into<String>) -> Self {
        ApiError::Fields(vec![(name.into(), msg.into())])
    }

    pub fn non_field(msg: impl Into<String>) -> Self {
        ApiError::NonField(msg.into())
    }

    pub fn too_many_requests(msg: impl Into<String>) -> Self {
        ApiError::Detail(StatusCode::TOO_MANY_REQUESTS, msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Message(s, _)
            | ApiError::Detail(s, _)
            | ApiError::Error(s, _)
            | ApiError::Body(s, _) => *s,
            ApiError::Fields(_) | ApiError::NonField(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(self) -> Value {
        match self {
            ApiError::Message(_, m) => json!({ "message": m }),
            ApiError::Detail(_, d) => json!({ "detail": d }),
            ApiError::Error(_, e) => json!({ "error": e }),
            ApiError::Fields(fields) => {
                let mut map = Map::new();
                for (name, msg) in fields {
                    match map.entry(name).or_insert_with(|| Value::Array(Vec::new())) {
                        Value::Array(list) => list.push(Value::String(msg)),
                        other => *other = json!([msg]),
                    }
                }
                Value::Object(map)
            }
            ApiError::NonField(m) => json!({ "non_field_errors": [m] }),
            ApiError::Body(_, body) => body,
            ApiError::Internal(e) => {
                error!(error = %e, "Internal server error");
                json!({ "message": "Internal server error" })
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.body())).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidPage => ApiError::Detail(StatusCode::NOT_FOUND, err.to_string()),
            CoreError::InvalidDateRange => {
                ApiError::Error(StatusCode::BAD_REQUEST, err.to_string())
            }
            CoreError::InvalidDate => ApiError::bad_request(err.to_string()),
            CoreError::InvalidProblemKind(_) => ApiError::field("problem_type", err.to_string()),
            CoreError::NestedReply => ApiError::non_field(err.to_string()),
            CoreError::InvalidLevel(_) => ApiError::bad_request(err.to_string()),
            CoreError::Validation(msg) => ApiError::bad_request(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::WrongTokenType
            | AuthError::UserNotFound
            | AuthError::UserInactive => {
                let detail = match err {
                    AuthError::WrongTokenType => AuthError::InvalidToken.to_string(),
                    other => other.to_string(),
                };
                ApiError::Detail(StatusCode::UNAUTHORIZED, detail)
            }
            AuthError::Google(reason) => {
                ApiError::non_field(format!("Invalid Google token: {}", reason))
            }
            AuthError::Internal(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<JudgeError> for ApiError {
    fn from(err: JudgeError) -> Self {
        match err {
            JudgeError::NoTestCases | JudgeError::MissingIdealSolution => {
                ApiError::bad_request(err.to_string())
            }
            other => ApiError::Body(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "status": "error", "message": other.to_string() }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(err: ApiError) -> (StatusCode, Value) {
        let status = err.status();
        (status, err.body())
    }

    #[test]
    fn test_field_errors_group_by_name() {
        let (status, body) = render(ApiError::Fields(vec![
            ("email".into(), "a".into()),
            ("email".into(), "b".into()),
            ("username".into(), "c".into()),
        ]));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"email": ["a", "b"], "username": ["c"]}));
    }

    #[test]
    fn test_core_error_mapping() {
        let (status, body) = render(CoreError::InvalidPage.into());
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"detail": "Invalid page."}));

        let (status, body) = render(CoreError::InvalidDateRange.into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"error": "start_date must be before or equal to end_date"})
        );

        let (_, body) = render(CoreError::NestedReply.into());
        assert_eq!(
            body,
            json!({"non_field_errors": ["Replies to replies are not allowed."]})
        );

        let (_, body) = render(CoreError::InvalidProblemKind("x".into()).into());
        assert_eq!(
            body,
            json!({"problem_type": ["Invalid problem type. Use 'concept' or 'dataset'."]})
        );
    }

    #[test]
    fn test_auth_error_mapping() {
        let (status, body) = render(AuthError::MissingToken.into());
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            json!({"detail": "Authentication credentials were not provided."})
        );
        let (_, body) = render(AuthError::WrongTokenType.into());
        assert_eq!(
            body,
            json!({"detail": "Given token not valid for any token type"})
        );
    }

    #[test]
    fn test_judge_error_mapping() {
        let (status, body) = render(JudgeError::Transport("timeout".into()).into());
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(
            body["message"],
            "Error while communicating with Judge0 API: timeout"
        );

        let (status, _) = render(JudgeError::NoTestCases.into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
