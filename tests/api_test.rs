mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

use quiz_backend::middleware::auth::issue_token;
use quiz_backend::routes;

use common::{MemoryStore, JWT_SECRET};

fn token(user: Uuid, role: &str) -> String {
    issue_token(JWT_SECRET, user, role, chrono::Duration::hours(1)).expect("token")
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = bearer {
        builder = builder.header("Authorization", format!("Bearer {}", t));
    }
    let request = match body {
        Some(b) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_is_public() {
    let app = routes::router(MemoryStore::new().app_state());
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn bank_requires_admin_role() {
    let app = routes::router(MemoryStore::new().app_state());

    let (status, _) = send(&app, "GET", "/api/questions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let student = token(Uuid::new_v4(), "student");
    let (status, body) = send(&app, "GET", "/api/questions", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn quiz_flow_end_to_end() {
    let app = routes::router(MemoryStore::new().app_state());
    let admin = token(Uuid::new_v4(), "admin");
    let student = token(Uuid::new_v4(), "student");

    let mut question_ids = Vec::new();
    for (text, correct) in [("Which adapter keeps matches?", "B"), ("Which consumes?", "A")] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/questions",
            Some(&admin),
            Some(json!({
                "question_text": text,
                "type": "multiple_choice",
                "options": [
                    {"key": "A", "value": "collect"},
                    {"key": "B", "value": "filter"}
                ],
                "correct_answer": correct,
                "difficulty": "Easy",
                "concepts": ["iterators"],
                "domain": "Programming",
                "subject": "Rust"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        question_ids.push(body["id"].as_str().unwrap().to_string());
    }

    let (status, _) = send(
        &app,
        "POST",
        "/api/quizzes",
        Some(&student),
        Some(json!({"title": "Nope", "question_ids": question_ids})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, quiz) = send(
        &app,
        "POST",
        "/api/quizzes",
        Some(&admin),
        Some(json!({
            "title": "Iterators",
            "time_limit_minutes": 10,
            "question_ids": question_ids
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", quiz);
    let quiz_id = quiz["id"].as_str().unwrap().to_string();

    let (status, started) = send(
        &app,
        "POST",
        &format!("/api/quizzes/{}/attempts", quiz_id),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", started);
    assert_eq!(started["delivered"], 2);
    assert!(!started.to_string().contains("correct_answer"));
    let attempt_id = started["attempt_id"].as_str().unwrap().to_string();

    let (status, recorded) = send(
        &app,
        "PUT",
        &format!("/api/attempts/{}/answers/{}", attempt_id, question_ids[0]),
        Some(&student),
        Some(json!({"answer": "b"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recorded["is_correct"], true);

    let (status, recorded) = send(
        &app,
        "PUT",
        &format!("/api/attempts/{}/answers/{}", attempt_id, question_ids[1]),
        Some(&student),
        Some(json!({"answer": "B"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recorded["is_correct"], false);
    assert_eq!(recorded["all_answered"], true);

    let (status, completed) = send(
        &app,
        "POST",
        &format!("/api/attempts/{}/complete", attempt_id),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["summary"]["correct_answers"], 1);
    assert_eq!(completed["summary"]["score_percentage"], 50);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/attempts/{}/abandon", attempt_id),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/questions/{}", question_ids[0]),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, stats) = send(&app, "GET", "/api/attempts/statistics", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["completed_attempts"], 1);
}

#[tokio::test]
async fn empty_pool_maps_to_unprocessable() {
    let app = routes::router(MemoryStore::new().app_state());
    let admin = token(Uuid::new_v4(), "admin");

    let (status, quiz) = send(
        &app,
        "POST",
        "/api/quizzes",
        Some(&admin),
        Some(json!({
            "title": "Nothing matches",
            "criteria": {"domain": "Astronomy", "count": 5}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", quiz);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/quizzes/{}/attempts", quiz["id"].as_str().unwrap()),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Astronomy"));
}

#[tokio::test]
async fn import_skips_malformed_questions() {
    let app = routes::router(MemoryStore::new().app_state());
    let admin = token(Uuid::new_v4(), "admin");

    let (status, report) = send(
        &app,
        "POST",
        "/api/questions/import",
        Some(&admin),
        Some(json!({
            "questions": [
                {
                    "type": "multiple_choice",
                    "question_text": "Pick the iterator adapter",
                    "options": ["A) map", "B) len"],
                    "correct_answer": "A"
                },
                {
                    "type": "multiple_choice",
                    "question_text": "No options at all"
                }
            ],
            "metadata": {"domain": "Programming", "subject": "Rust", "difficulty": "easy"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", report);
    assert_eq!(report["imported"].as_array().unwrap().len(), 1);
    assert_eq!(report["skipped"][0]["index"], 1);
}

#[tokio::test]
async fn huge_page_number_returns_an_empty_page() {
    let app = routes::router(MemoryStore::new().app_state());
    let admin = token(Uuid::new_v4(), "admin");

    let uri = format!("/api/questions?page={}&per_page=100", i64::MAX);
    let (status, body) = send(&app, "GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["page"], i64::MAX);
}
