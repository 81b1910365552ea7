//! Handler tests against a real PostgreSQL server
//!
//! Set `STUDYHUB_TEST_DATABASE_URL` to a server URL (no database name) to run
//! them. Each test creates and drops its own database; without the variable
//! the tests are skipped.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::{json, Value};
use std::sync::Arc;
use studyhub_core::streak::Streak;
use studyhub_core::{
    ConceptLevel, ConceptProblemDetails, Level, ProblemDetails, ProblemKind, TestCase, Track,
    UserId, Verdict,
};
use studyhub_judge::{CodeExecutor, ExecutionRequest, ExecutionResult, ExecutionStatus};
use studyhub_server::db::queries::{concepts, daily, problems, users};
use studyhub_server::rule_engine::{RuleEngine, RuleLimits};
use studyhub_server::{db, AppState, DbPool, ServerConfig};
use tempfile::TempDir;
use tokio_postgres::types::ToSql;
use tower::ServiceExt;
use uuid::Uuid;

const DATABASE_ENV: &str = "STUDYHUB_TEST_DATABASE_URL";
const PASSWORD: &str = "correct horse battery";

/// Echoes the expected output, so every test case passes.
struct AcceptingExecutor;

#[async_trait]
impl CodeExecutor for AcceptingExecutor {
    async fn execute(&self, request: ExecutionRequest) -> studyhub_judge::Result<ExecutionResult> {
        Ok(ExecutionResult {
            stdout: request.expected_output.unwrap_or_default(),
            stderr: String::new(),
            compile_output: String::new(),
            status: Some(ExecutionStatus {
                id: 3,
                description: "Accepted".to_string(),
            }),
            time: 0.02,
            memory: 2048.0,
        })
    }
}

struct TestDb {
    base_url: String,
    name: String,
    pool: DbPool,
}

async fn test_db(test: &str) -> Option<TestDb> {
    let Ok(url) = std::env::var(DATABASE_ENV) else {
        eprintln!("skipping {}: {} not set", test, DATABASE_ENV);
        return None;
    };
    let name = format!("studyhub_test_{}", Uuid::new_v4().simple());
    let pool = db::init_db(&url, &name).await.unwrap();
    Some(TestDb {
        base_url: db::base_url(&url).to_string(),
        name,
        pool,
    })
}

impl TestDb {
    async fn cleanup(self) {
        self.pool.close();
        let admin = db::create_pool(&format!("{}/postgres", self.base_url)).unwrap();
        let client = admin.get().await.unwrap();
        let dropped = client
            .execute(
                &format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", self.name),
                &[],
            )
            .await;
        if let Err(e) = dropped {
            eprintln!("could not drop {}: {}", self.name, e);
        }
    }

    async fn count(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> i64 {
        let client = self.pool.get().await.unwrap();
        client.query_one(sql, params).await.unwrap().get(0)
    }
}

/// A registered user with a token, plus one concept and one problem that
/// make up today's calendar entry.
struct Fixture {
    app: Router,
    state: Arc<AppState>,
    _media: TempDir,
    token: String,
    user_id: UserId,
    concept_id: i64,
    problem_id: i64,
}

async fn fixture(db: &TestDb, limits: Option<RuleLimits>) -> Fixture {
    let media = TempDir::new().unwrap();
    let mut config = ServerConfig::for_tests();
    config.media_root = media.path().to_path_buf();
    config.password_iterations = 1000;
    config.recaptcha_secret = String::new();
    let mut state =
        AppState::with_executor(db.pool.clone(), config, Arc::new(AcceptingExecutor)).unwrap();
    if let Some(limits) = limits {
        state.rules = RuleEngine::with_limits(limits);
    }
    let state = Arc::new(state);
    let app = studyhub_server::app(state.clone());

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/user/register/",
            None,
            json!({
                "email": "ada@example.com",
                "username": "ada",
                "password": PASSWORD,
                "first_name": "Ada",
                "last_name": "Lovelace",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/user/login/",
            None,
            json!({ "email": "ada@example.com", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let token = body["access"].as_str().unwrap().to_string();

    let user_id = users::get_user_by_username(&db.pool, "ada")
        .await
        .unwrap()
        .unwrap()
        .id;
    let concept = concepts::insert_concept(
        &db.pool,
        &concepts::NewConcept {
            title: "Linear Regression".to_string(),
            slug: "linear-regression".to_string(),
            description: "Fitting a line".to_string(),
            one_liner_desc: String::new(),
            level: ConceptLevel::Easy,
            preview_image_url: String::new(),
            author_id: user_id,
            concept_type: Track::Ml,
            tags: vec!["regression".to_string()],
        },
    )
    .await
    .unwrap();
    let problem_id = problems::insert_problem(
        &db.pool,
        &problems::NewProblem {
            title: "Fit a Line".to_string(),
            slug: "fit-a-line".to_string(),
            track: Track::Ml,
            author_id: user_id,
            description: Some("Add two numbers".to_string()),
            editorial: None,
            level: Level::Easy,
            course_id: None,
            tags: Vec::new(),
            details: ProblemDetails::Concept(ConceptProblemDetails {
                submission_testcases: vec![
                    TestCase {
                        input: "1 2".to_string(),
                        output: "3".to_string(),
                    },
                    TestCase {
                        input: "2 2".to_string(),
                        output: "4".to_string(),
                    },
                ],
                ..Default::default()
            }),
        },
    )
    .await
    .unwrap();
    assert!(
        daily::insert_daily(&db.pool, state.today(), concept.id, problem_id)
            .await
            .unwrap()
    );

    Fixture {
        app,
        state,
        _media: media,
        token,
        user_id,
        concept_id: concept.id,
        problem_id,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, body)
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

impl Fixture {
    async fn submit(&self) -> (StatusCode, Value) {
        send(
            &self.app,
            json_request(
                Method::POST,
                "/problems/run-code/",
                Some(&self.token),
                json!({
                    "code": "print(sum(map(int, input().split())))",
                    "problem_id": self.problem_id,
                    "problem_type": "concept",
                    "run_only": false,
                }),
            ),
        )
        .await
    }

    async fn mark_read(&self) -> (StatusCode, Value) {
        send(
            &self.app,
            json_request(
                Method::POST,
                &format!("/concepts/{}/mark-read/", self.concept_id),
                Some(&self.token),
                json!({}),
            ),
        )
        .await
    }

    async fn comment(
        &self,
        slug: &str,
        content: &str,
        parent: Option<i64>,
    ) -> (StatusCode, Value) {
        send(
            &self.app,
            json_request(
                Method::POST,
                &format!("/problems/concept/{}/comments/", slug),
                Some(&self.token),
                json!({ "content": content, "parent_comment_id": parent }),
            ),
        )
        .await
    }
}

#[tokio::test]
async fn test_accepted_submission_records_progress_and_streak() {
    let Some(db) = test_db("test_accepted_submission_records_progress_and_streak").await else {
        return;
    };
    let fx = fixture(&db, None).await;
    let today = fx.state.today();

    let (status, body) = fx.submit().await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["verdict"], json!(Verdict::Accepted.code()));
    assert_eq!(body["passed_count"], 2);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["problem_accepted"], 1);
    assert_eq!(body["problem_total_submissions"], 1);

    let problem = problems::get_problem(&db.pool, ProblemKind::Concept, fx.problem_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(problem.accepted_submissions, 1);
    assert_eq!(problem.total_submissions, 1);
    assert_eq!(
        db.count(
            "SELECT COUNT(*) FROM events WHERE event_type = $1 AND actor = $2",
            &[&"submission_judged", &"ada"],
        )
        .await,
        1
    );

    // Only the problem half is done, so the streak has not moved.
    let entry = daily::get_by_date(&db.pool, today).await.unwrap().unwrap();
    let progress = daily::progress_for(&db.pool, fx.user_id, &[entry.id])
        .await
        .unwrap()
        .remove(&entry.id)
        .unwrap();
    assert!(progress.solved);
    assert!(!progress.concept_read);
    let profile = users::get_profile(&db.pool, fx.user_id).await.unwrap();
    assert_eq!(profile.current_streak, 0);

    let (status, body) = fx.mark_read().await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let profile = users::get_profile(&db.pool, fx.user_id).await.unwrap();
    assert_eq!(profile.current_streak, 1);
    assert_eq!(profile.longest_streak, 1);
    assert_eq!(profile.last_streak_date, Some(today));

    // Completing the same day again counts once.
    let (status, body) = fx.submit().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["problem_total_submissions"], 2);
    let (status, _) = fx.mark_read().await;
    assert_eq!(status, StatusCode::OK);
    let profile = users::get_profile(&db.pool, fx.user_id).await.unwrap();
    assert_eq!(profile.current_streak, 1);

    let (status, body) = send(&fx.app, get("/user/header-data/", Some(&fx.token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_streak"], 1);
    assert_eq!(body["current_day_problem_solved"], true);
    assert_eq!(body["current_day_concept_read"], true);

    db.cleanup().await;
}

#[tokio::test]
async fn test_yesterday_streak_is_extended() {
    let Some(db) = test_db("test_yesterday_streak_is_extended").await else {
        return;
    };
    let fx = fixture(&db, None).await;
    let today = fx.state.today();
    users::save_streak(
        &db.pool,
        fx.user_id,
        &Streak::new(4, 4, Some(today - Duration::days(1))),
    )
    .await
    .unwrap();

    assert_eq!(fx.submit().await.0, StatusCode::OK);
    assert_eq!(fx.mark_read().await.0, StatusCode::OK);

    let profile = users::get_profile(&db.pool, fx.user_id).await.unwrap();
    assert_eq!(profile.current_streak, 5);
    assert_eq!(profile.longest_streak, 5);

    db.cleanup().await;
}

#[tokio::test]
async fn test_lapsed_streak_reads_zero_everywhere() {
    let Some(db) = test_db("test_lapsed_streak_reads_zero_everywhere").await else {
        return;
    };
    let fx = fixture(&db, None).await;
    let today = fx.state.today();
    users::save_streak(
        &db.pool,
        fx.user_id,
        &Streak::new(5, 7, Some(today - Duration::days(2))),
    )
    .await
    .unwrap();

    let (status, body) = send(&fx.app, get("/user/dashboard/ada/", None)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["profile_data"]["current_streak"], 0);
    assert_eq!(body["profile_data"]["longest_streak"], 7);

    let (_, body) = send(&fx.app, get("/user/user-detail/", Some(&fx.token))).await;
    assert_eq!(body["user"]["current_streak"], 0);
    assert_eq!(body["user"]["longest_streak"], 7);

    let (_, body) = send(&fx.app, get("/user/header-data/", Some(&fx.token))).await;
    assert_eq!(body["current_streak"], 0);

    // A fresh completion after the gap restarts at one.
    assert_eq!(fx.submit().await.0, StatusCode::OK);
    assert_eq!(fx.mark_read().await.0, StatusCode::OK);
    let profile = users::get_profile(&db.pool, fx.user_id).await.unwrap();
    assert_eq!(profile.current_streak, 1);
    assert_eq!(profile.longest_streak, 7);

    db.cleanup().await;
}

#[tokio::test]
async fn test_dashboard_lists_page_in_the_database() {
    let Some(db) = test_db("test_dashboard_lists_page_in_the_database").await else {
        return;
    };
    let fx = fixture(&db, None).await;
    for _ in 0..3 {
        assert_eq!(fx.submit().await.0, StatusCode::OK);
    }
    assert_eq!(fx.mark_read().await.0, StatusCode::OK);

    let (status, body) = send(
        &fx.app,
        get("/user/dashboard/ada/submissions/?page_size=2", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["count"], 3);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["results"][0]["problem"]["slug"], "fit-a-line");
    assert!(body["next"].as_str().unwrap().contains("page=2"));
    assert_eq!(body["previous"], Value::Null);

    let (status, body) = send(
        &fx.app,
        get("/user/dashboard/ada/submissions/?page_size=2&page=2", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["next"], Value::Null);

    let (_, body) = send(&fx.app, get("/user/dashboard/ada/problems/", None)).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["status"], json!(Verdict::Accepted.code()));

    let (_, body) = send(&fx.app, get("/user/dashboard/ada/concepts/", None)).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["slug"], "linear-regression");

    for uri in [
        "/user/dashboard/ada/submissions/?page=9",
        "/user/dashboard/ada/problems/?page=2",
        "/user/dashboard/ada/concepts/?page=abc",
    ] {
        let (status, body) = send(&fx.app, get(uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body, json!({ "detail": "Invalid page." }), "{}", uri);
    }

    db.cleanup().await;
}

#[tokio::test]
async fn test_comment_reply_targets() {
    let Some(db) = test_db("test_comment_reply_targets").await else {
        return;
    };
    let fx = fixture(&db, None).await;
    let comment_id = |content: &'static str| {
        let pool = db.pool.clone();
        async move {
            let client = pool.get().await.unwrap();
            let row = client
                .query_one("SELECT id FROM comments WHERE content = $1", &[&content])
                .await
                .unwrap();
            row.get::<_, i64>(0)
        }
    };

    let (status, body) = fx.comment("fit-a-line", "Nice problem", None).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let top = comment_id("Nice problem").await;

    let (status, _) = fx.comment("fit-a-line", "Agreed", Some(top)).await;
    assert_eq!(status, StatusCode::CREATED);
    let reply = comment_id("Agreed").await;

    let (status, body) = fx.comment("fit-a-line", "Nested", Some(reply)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "non_field_errors": ["Replies to replies are not allowed."] })
    );

    let (status, body) = fx.comment("fit-a-line", "Orphan", Some(top + 1000)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "non_field_errors": ["Parent comment not found"] }));

    assert_eq!(db.count("SELECT COUNT(*) FROM comments", &[]).await, 2);

    db.cleanup().await;
}

#[tokio::test]
async fn test_unknown_problem_does_not_use_comment_quota() {
    let Some(db) = test_db("test_unknown_problem_does_not_use_comment_quota").await else {
        return;
    };
    let limits = RuleLimits {
        comments_per_window: 1,
        ..Default::default()
    };
    let fx = fixture(&db, Some(limits)).await;

    for _ in 0..3 {
        let (status, _) = fx.comment("no-such-problem", "Hello", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (status, body) = fx.comment("fit-a-line", "Hello", None).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, _) = fx.comment("fit-a-line", "Hello again", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    db.cleanup().await;
}
