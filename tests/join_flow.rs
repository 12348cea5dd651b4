use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    routing::{get, post},
};
use chrono::{Duration as ChronoDuration, Utc};
use event_board_gateway::backend::BackendClient;
use event_board_gateway::build_router;
use event_board_gateway::limits::EventLimits;
use event_board_gateway::rate_limit::RateLimitConfig;
use event_board_gateway::state::AppState;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

// In-memory stand-in for the managed backend
#[derive(Default)]
struct MockBackend {
    participants: Mutex<HashSet<(String, String)>>,
    created: Mutex<usize>,
}

fn user_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer token-")
        .map(str::to_string)
}

fn filter(params: &HashMap<String, String>, key: &str) -> String {
    params
        .get(key)
        .and_then(|v| v.strip_prefix("eq."))
        .unwrap_or_default()
        .to_string()
}

async fn auth_user(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    let user = user_from(&headers).ok_or(StatusCode::UNAUTHORIZED)?;
    Ok(Json(json!({ "id": user, "email": format!("{}@campus.test", user) })))
}

async fn events(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let id = filter(&params, "id");
    let tomorrow = (Utc::now() + ChronoDuration::days(1)).to_rfc3339();
    let yesterday = (Utc::now() - ChronoDuration::days(1)).to_rfc3339();

    let row = match id.as_str() {
        "finished" => json!({ "id": id, "status": "finished", "event_date": tomorrow }),
        "started" => json!({ "id": id, "status": "started", "event_date": tomorrow }),
        "past" => json!({ "id": id, "status": "upcoming", "event_date": yesterday }),
        "missing" => return Ok(Json(json!([]))),
        "not-a-uuid" => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "code": "22P02", "message": "invalid input syntax for type uuid" })),
            ));
        }
        _ => json!({ "id": id, "status": "upcoming", "event_date": tomorrow }),
    };
    Ok(Json(json!([row])))
}

async fn insert_participant(
    State(mock): State<Arc<MockBackend>>,
    Json(body): Json<Value>,
) -> StatusCode {
    let key = (
        body["event_id"].as_str().unwrap_or_default().to_string(),
        body["user_id"].as_str().unwrap_or_default().to_string(),
    );
    // no unique constraint here, duplicates must be caught by the lookup
    mock.participants.lock().unwrap().insert(key);
    StatusCode::CREATED
}

async fn find_participant(
    State(mock): State<Arc<MockBackend>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let key = (filter(&params, "event_id"), filter(&params, "user_id"));
    if mock.participants.lock().unwrap().contains(&key) {
        Json(json!([{ "id": 1 }]))
    } else {
        Json(json!([]))
    }
}

async fn delete_participant(
    State(mock): State<Arc<MockBackend>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let key = (filter(&params, "event_id"), filter(&params, "user_id"));
    if mock.participants.lock().unwrap().remove(&key) {
        Json(json!([{ "event_id": key.0, "user_id": key.1 }]))
    } else {
        Json(json!([]))
    }
}

async fn create_event(State(mock): State<Arc<MockBackend>>, Json(mut body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut created = mock.created.lock().unwrap();
    *created += 1;
    body["id"] = json!(format!("event-{}", created));
    (StatusCode::CREATED, Json(json!([body])))
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

struct Harness {
    url: String,
    http: reqwest::Client,
}

impl Harness {
    async fn start(enforce_create_limit: bool) -> Self {
        let mock = Arc::new(MockBackend::default());
        let backend_app = Router::new()
            .route("/auth/v1/user", get(auth_user))
            .route("/auth/v1/health", get(|| async { "ok" }))
            .route("/rest/v1/events", get(events).post(create_event))
            .route(
                "/rest/v1/participants",
                get(find_participant)
                    .post(insert_participant)
                    .delete(delete_participant),
            )
            .with_state(mock);
        let backend_url = serve(backend_app).await;

        let day = Duration::from_secs(86_400);
        let state = Arc::new(AppState {
            backend: Arc::new(BackendClient::new(reqwest::Client::new(), &backend_url, "anon")),
            limits: EventLimits::new(RateLimitConfig::new(3, day), RateLimitConfig::new(3, day)),
            enforce_create_limit,
        });

        Self {
            url: serve(build_router(state)).await,
            http: reqwest::Client::new(),
        }
    }

    async fn join(&self, user: &str, event: &str) -> reqwest::Response {
        self.http
            .post(format!("{}/api/events/{}/join", self.url, event))
            .bearer_auth(format!("token-{}", user))
            .send()
            .await
            .unwrap()
    }

    async fn leave(&self, user: &str, event: &str) -> reqwest::Response {
        self.http
            .delete(format!("{}/api/events/{}/join", self.url, event))
            .bearer_auth(format!("token-{}", user))
            .send()
            .await
            .unwrap()
    }

    async fn create(&self, user: &str, body: Value) -> reqwest::Response {
        self.http
            .post(format!("{}/api/events", self.url))
            .bearer_auth(format!("token-{}", user))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn remaining(&self, user: &str, action: &str) -> u64 {
        let body: Value = self
            .http
            .get(format!("{}/api/me/limits", self.url))
            .bearer_auth(format!("token-{}", user))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        body["limits"]
            .as_array()
            .unwrap()
            .iter()
            .find(|quota| quota["action"] == action)
            .and_then(|quota| quota["remaining"].as_u64())
            .unwrap()
    }
}

fn event_body() -> Value {
    json!({
        "title": "Late night ramen run",
        "location": "East gate",
        "event_date": (Utc::now() + ChronoDuration::hours(5)).to_rfc3339(),
    })
}

#[tokio::test]
async fn fourth_join_of_the_day_is_rejected() {
    let h = Harness::start(false).await;

    for event in ["e1", "e2", "e3"] {
        assert_eq!(h.join("alice", event).await.status(), StatusCode::OK);
    }

    let res = h.join("alice", "e4").await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = res.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 86_400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Daily event join limit reached (3 events per day)");

    assert_eq!(h.remaining("alice", "join").await, 0);

    // other users keep their own quota
    assert_eq!(h.join("bob", "e4").await.status(), StatusCode::OK);
    assert_eq!(h.remaining("bob", "join").await, 2);
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let h = Harness::start(false).await;

    let res = h
        .http
        .post(format!("{}/api/events/e1/join", h.url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = h
        .http
        .post(format!("{}/api/events/e1/join", h.url))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn unjoinable_events_do_not_consume_quota() {
    let h = Harness::start(false).await;

    let cases = [
        ("finished", StatusCode::BAD_REQUEST, "Cannot join finished events"),
        ("started", StatusCode::BAD_REQUEST, "Cannot join events that have already started"),
        ("past", StatusCode::BAD_REQUEST, "Cannot join past events"),
        ("missing", StatusCode::NOT_FOUND, "Event not found"),
        ("not-a-uuid", StatusCode::NOT_FOUND, "Event not found"),
    ];
    for (event, status, message) in cases {
        let res = h.join("carol", event).await;
        assert_eq!(res.status(), status, "{}", event);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], message);
    }

    assert_eq!(h.remaining("carol", "join").await, 3);
}

#[tokio::test]
async fn duplicate_join_is_reported() {
    let h = Harness::start(false).await;

    assert_eq!(h.join("dave", "e1").await.status(), StatusCode::OK);
    let res = h.join("dave", "e1").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Already joined this event");

    // the limiter admitted both attempts before the duplicate was spotted
    assert_eq!(h.remaining("dave", "join").await, 1);
}

#[tokio::test]
async fn leaving_does_not_refund_quota() {
    let h = Harness::start(false).await;

    assert_eq!(h.join("erin", "e1").await.status(), StatusCode::OK);
    assert_eq!(h.leave("erin", "e1").await.status(), StatusCode::OK);
    assert_eq!(h.remaining("erin", "join").await, 2);

    let res = h.leave("erin", "e1").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn creation_is_unlimited_unless_enforced() {
    let open = Harness::start(false).await;
    for _ in 0..4 {
        assert_eq!(open.create("frank", event_body()).await.status(), StatusCode::CREATED);
    }
    assert_eq!(open.remaining("frank", "create").await, 3);

    let enforced = Harness::start(true).await;
    for _ in 0..3 {
        let res = enforced.create("frank", event_body()).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["event"]["creator_id"], "frank");
    }
    let res = enforced.create("frank", event_body()).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Daily event creation limit reached (3 events per day)");
}

#[tokio::test]
async fn invalid_events_are_rejected_before_the_limit() {
    let h = Harness::start(true).await;

    let mut body = event_body();
    body["event_date"] = json!((Utc::now() - ChronoDuration::hours(1)).to_rfc3339());
    let res = h.create("gina", body).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Event date must be in the future");

    assert_eq!(h.remaining("gina", "create").await, 3);
}

#[tokio::test]
async fn health_and_metrics_are_exposed() {
    let h = Harness::start(false).await;
    h.join("hank", "e1").await;

    let health: Value = h
        .http
        .get(format!("{}/health", h.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["tracked_identifiers"], 1);

    let metrics = h
        .http
        .get(format!("{}/metrics", h.url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("event_board_admitted_total"));
}

#[tokio::test]
async fn malformed_body_gets_json_errors_after_auth() {
    let h = Harness::start(false).await;

    let res = h
        .http
        .post(format!("{}/api/events", h.url))
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Unauthorized");

    let res = h
        .http
        .post(format!("{}/api/events", h.url))
        .bearer_auth("token-ivy")
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("JSON"));
}

#[tokio::test]
async fn description_html_is_cleaned_before_insert() {
    let h = Harness::start(false).await;

    let mut body = event_body();
    body["description"] = json!("<b>Free</b> ramen<script>steal()</script>");
    let res = h.create("jack", body).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let created: Value = res.json().await.unwrap();
    assert_eq!(created["event"]["description"], "<b>Free</b> ramen");
}
