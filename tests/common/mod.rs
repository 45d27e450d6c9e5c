#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use lms_client::api::ApiClient;
use lms_client::config::ApiConfig;

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "correct horse";
pub const COURSE: &str = "course-rust";
/// Course whose detail route always fails with a 500
pub const BROKEN_COURSE: &str = "course-broken";
/// Courses whose enrollment lookup answers "not enrolled" without a 404
pub const EMPTY_BODY_COURSE: &str = "course-empty-body";
pub const NO_CONTENT_COURSE: &str = "course-no-content";
pub const NULL_DATA_COURSE: &str = "course-null-data";

#[derive(Default)]
struct BackendState {
    issued_tokens: HashSet<String>,
    logged_out: usize,
    enrollments: HashMap<String, Vec<String>>,
    completion_calls: Vec<String>,
}

type Shared = Arc<Mutex<BackendState>>;

/// In-process stand-in for the LMS REST API
pub struct MockBackend {
    pub port: u16,
    pub base_url: String,
    state: Shared,
}

impl MockBackend {
    pub async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}/api", port);
        let state = Shared::default();

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind mock backend")?;
        let app = router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            port,
            base_url,
            state,
        })
    }

    pub fn api_config(&self) -> ApiConfig {
        api_config(&self.base_url)
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.api_config()).expect("mock backend url is valid")
    }

    /// Client carrying a token the backend will accept
    pub async fn signed_in_client(&self) -> Result<ApiClient> {
        let credentials = self.client().login(EMAIL, PASSWORD).await?;
        Ok(self.client().with_token(Some(&credentials.access_token)))
    }

    pub fn enroll_directly(&self, course: &str, completed: &[&str]) {
        self.state.lock().unwrap().enrollments.insert(
            course.to_string(),
            completed.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn completion_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().completion_calls.clone()
    }

    pub fn logout_calls(&self) -> usize {
        self.state.lock().unwrap().logged_out
    }
}

pub fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        request_timeout_secs: 5,
        user_agent: "lms-client-tests".to_string(),
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/profile", get(profile))
        .route("/api/courses/:id", get(course))
        .route("/api/modules/course/:id", get(modules))
        .route("/api/enrollments/courses/:id/enrollment", get(enrollment))
        .route("/api/enrollments/courses/:id/enroll", post(enroll))
        .route(
            "/api/enrollments/courses/:id/lessons/:lesson/complete",
            patch(complete),
        )
        .with_state(state)
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn ok(data: Value) -> Response {
    (StatusCode::OK, Json(json!({ "success": true, "data": data }))).into_response()
}

fn authorize(state: &Shared, headers: &HeaderMap) -> Result<(), Response> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if state.lock().unwrap().issued_tokens.contains(token) => Ok(()),
        Some(_) => Err(failure(StatusCode::UNAUTHORIZED, "Token is not valid")),
        None => Err(failure(StatusCode::UNAUTHORIZED, "No token, authorization denied")),
    }
}

fn user() -> Value {
    json!({ "_id": "u-1", "name": "Ada Lovelace", "email": EMAIL, "role": "student" })
}

fn issue_token() -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({ "id": "u-1", "role": "student", "iat": now, "exp": now + 3600 });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"mock-backend-secret"),
    )
    .expect("encode token")
}

/// Modules deliberately out of order; `m-intro` sorts its lessons by `order`
fn course_modules() -> Value {
    json!([
        {
            "_id": "m-advanced",
            "title": "Advanced",
            "order": 3,
            "lessons": [
                { "_id": "l-lifetimes", "title": "Lifetimes", "order": 1,
                  "videoUrl": "https://cdn.example.com/lifetimes.mp4", "duration": 12 }
            ]
        },
        {
            "_id": "m-intro",
            "title": "Introduction",
            "order": 1,
            "lessons": [
                { "_id": "l-ownership", "title": "Ownership", "order": 2,
                  "content": "Every value has one owner." },
                { "_id": "l-hello", "title": "Hello, Cargo", "order": 1,
                  "videoUrl": "https://cdn.example.com/hello.mp4", "duration": 5 }
            ]
        },
        { "_id": "m-empty", "title": "Coming soon", "order": 2, "lessons": [] }
    ])
}

const TOTAL_LESSONS: usize = 3;

fn enrollment_body(completed: &[String]) -> Value {
    let count = completed.len();
    let percentage = (count as f64 * 100.0 / TOTAL_LESSONS as f64).round();
    let status = if count == TOTAL_LESSONS { "completed" } else { "in-progress" };
    json!({
        "enrollment": {
            "_id": "enr-1",
            "status": status,
            "progress": {
                "completedLessons": completed,
                "completionPercentage": percentage,
                "completedLessonsCount": count,
                "totalLessons": TOTAL_LESSONS
            }
        }
    })
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    if body["email"] != EMAIL || body["password"] != PASSWORD {
        return failure(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    let token = issue_token();
    state.lock().unwrap().issued_tokens.insert(token.clone());
    ok(json!({ "user": user(), "accessToken": token, "refreshToken": "refresh-1" }))
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == EMAIL {
        return failure(StatusCode::BAD_REQUEST, "User already exists");
    }
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "User registered successfully" })),
    )
        .into_response()
}

async fn logout(State(state): State<Shared>) -> Response {
    state.lock().unwrap().logged_out += 1;
    Json(json!({ "success": true, "message": "Logged out successfully" })).into_response()
}

async fn profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    ok(json!({ "user": user() }))
}

async fn course(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    match id.as_str() {
        COURSE => ok(json!({
            "course": {
                "_id": COURSE,
                "title": "Rust from Scratch",
                "description": "Systems programming without fear.",
                "category": "programming",
                "level": "beginner",
                "teacher": { "_id": "t-1", "name": "Grace Hopper" },
                "rating": { "average": 4.5, "count": 12 },
                "learningOutcomes": ["Ownership", "Borrowing"],
                "requirements": []
            }
        })),
        BROKEN_COURSE => failure(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable"),
        _ => failure(StatusCode::NOT_FOUND, "Course not found"),
    }
}

async fn modules(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    if id != COURSE {
        return ok(json!({ "modules": [] }));
    }
    ok(json!({ "modules": course_modules() }))
}

async fn enrollment(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    match id.as_str() {
        EMPTY_BODY_COURSE => return (StatusCode::OK, "").into_response(),
        NO_CONTENT_COURSE => return StatusCode::NO_CONTENT.into_response(),
        NULL_DATA_COURSE => return Json(json!({ "success": true, "data": null })).into_response(),
        _ => {}
    }
    let completed = state.lock().unwrap().enrollments.get(&id).cloned();
    match completed {
        Some(completed) => ok(enrollment_body(&completed)),
        None => failure(StatusCode::NOT_FOUND, "Enrollment not found"),
    }
}

async fn enroll(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    let mut guard = state.lock().unwrap();
    if guard.enrollments.contains_key(&id) {
        return failure(StatusCode::BAD_REQUEST, "Already enrolled in this course");
    }
    guard.enrollments.insert(id, Vec::new());
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": enrollment_body(&[]) })),
    )
        .into_response()
}

async fn complete(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((id, lesson)): Path<(String, String)>,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    let mut guard = state.lock().unwrap();
    guard.completion_calls.push(lesson.clone());
    let Some(completed) = guard.enrollments.get_mut(&id) else {
        return failure(StatusCode::NOT_FOUND, "Enrollment not found");
    };
    if !completed.contains(&lesson) {
        completed.push(lesson);
    }
    let body = enrollment_body(completed);
    ok(body)
}
