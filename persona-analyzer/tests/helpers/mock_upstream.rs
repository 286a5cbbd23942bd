//! Local axum server imitating the upstream web API
//!
//! Profiles:
//! - `alice`: 30 public posts over three pages (12 + 12 + 6). Post 3 is a
//!   video; every post whose index is a multiple of 5 has a broken image.
//! - `hidden`: private
//! - `throttled`: HTTP 429
//! - `waitplease`: HTTP 401 with a "please wait" body
//! - `nulluser`: HTTP 200 with a null user
//! - anything else: HTTP 404
//!
//! [`MockClassifier`] stands in for hosted text and image models.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const ALICE_POSTS: usize = 30;
const PAGE: usize = 12;
const BASE_TIMESTAMP: i64 = 1_717_243_200;

pub struct MockUpstream {
    pub base_url: String,
    pub profile_hits: Arc<AtomicUsize>,
    pub page_hits: Arc<AtomicUsize>,
    pub image_hits: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct MockState {
    base_url: Arc<String>,
    profile_hits: Arc<AtomicUsize>,
    page_hits: Arc<AtomicUsize>,
    image_hits: Arc<AtomicUsize>,
}

impl MockUpstream {
    /// Bind on an ephemeral port and serve in the background
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let state = MockState {
            base_url: Arc::new(base_url.clone()),
            profile_hits: Arc::new(AtomicUsize::new(0)),
            page_hits: Arc::new(AtomicUsize::new(0)),
            image_hits: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/api/v1/users/web_profile_info/", get(profile_info))
            .route("/graphql/query/", get(timeline_page))
            .route("/img/:name", get(image))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            profile_hits: state.profile_hits,
            page_hits: state.page_hits,
            image_hits: state.image_hits,
        }
    }

    pub fn page_hits(&self) -> usize {
        self.page_hits.load(Ordering::SeqCst)
    }

    pub fn image_hits(&self) -> usize {
        self.image_hits.load(Ordering::SeqCst)
    }
}

fn media_node(base_url: &str, i: usize) -> Value {
    let shortcode = format!("p{:02}", i);
    let image = if i % 5 == 0 {
        format!("{}/img/broken-{}.jpg", base_url, shortcode)
    } else {
        format!("{}/img/{}.jpg", base_url, shortcode)
    };

    json!({
        "node": {
            "id": format!("{}", 1000 + i),
            "shortcode": shortcode,
            "display_url": image,
            "is_video": i == 3,
            "taken_at_timestamp": BASE_TIMESTAMP - (i as i64) * 3600,
            "edge_media_to_caption": { "edges": [
                { "node": { "text": format!("Day {} with friends at the beach #summer @pal", i) } }
            ] },
            "edge_liked_by": { "count": 100 + i },
            "edge_media_to_comment": { "count": 4 },
            "edge_media_preview_comment": { "edges": [ { "node": { "text": "love it" } } ] }
        }
    })
}

fn timeline(base_url: &str, start: usize, end: usize, cursor: Option<&str>) -> Value {
    let edges: Vec<Value> = (start..end.min(ALICE_POSTS)).map(|i| media_node(base_url, i)).collect();
    json!({
        "count": ALICE_POSTS,
        "page_info": { "has_next_page": cursor.is_some(), "end_cursor": cursor },
        "edges": edges
    })
}

async fn profile_info(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.profile_hits.fetch_add(1, Ordering::SeqCst);
    let username = params.get("username").cloned().unwrap_or_default();

    match username.as_str() {
        "alice" | "hidden" => Json(json!({
            "data": { "user": {
                "id": "42",
                "username": username,
                "full_name": "Alice Example",
                "biography": "Sun, sea and friends",
                "profile_pic_url": format!("{}/img/avatar.jpg", state.base_url),
                "is_private": username == "hidden",
                "is_verified": false,
                "edge_followed_by": { "count": 2000 },
                "edge_follow": { "count": 150 },
                "edge_owner_to_timeline_media": timeline(&state.base_url, 0, PAGE, Some("c1"))
            } },
            "status": "ok"
        }))
        .into_response(),
        "throttled" => (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response(),
        "waitplease" => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "message": "Please wait a few minutes before you try again.",
                "status": "fail"
            })),
        )
            .into_response(),
        "nulluser" => Json(json!({ "data": { "user": null }, "status": "ok" })).into_response(),
        _ => (StatusCode::NOT_FOUND, "").into_response(),
    }
}

async fn timeline_page(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.page_hits.fetch_add(1, Ordering::SeqCst);

    let variables: Value = params
        .get("variables")
        .and_then(|v| serde_json::from_str(v).ok())
        .unwrap_or(Value::Null);
    if variables["id"] != "42" {
        return (StatusCode::BAD_REQUEST, "bad id").into_response();
    }

    let media = match variables["after"].as_str() {
        Some("c1") => timeline(&state.base_url, PAGE, 2 * PAGE, Some("c2")),
        Some("c2") => timeline(&state.base_url, 2 * PAGE, 3 * PAGE, None),
        _ => return (StatusCode::BAD_REQUEST, "bad cursor").into_response(),
    };

    Json(json!({
        "data": { "user": { "edge_owner_to_timeline_media": media } },
        "status": "ok"
    }))
    .into_response()
}

async fn image(State(state): State<MockState>, Path(name): Path<String>) -> Response {
    state.image_hits.fetch_add(1, Ordering::SeqCst);
    if name.starts_with("broken") {
        return (StatusCode::NOT_FOUND, "").into_response();
    }
    // Minimal JPEG-looking payload
    (
        [("content-type", "image/jpeg")],
        vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9],
    )
        .into_response()
}

// ============================================================================
// Hosted classifier
// ============================================================================

pub const CLASSIFIER_TOKEN: &str = "test-token";

/// Hosted model stand-in
///
/// `POST /text` labels every input "positive" (nested response shape) and
/// fails with HTTP 500 when the input contains `FAIL`. `POST /image` labels
/// every image "seashore" (flat shape). Both require the bearer token.
/// `GET /img/:name` serves image bytes.
pub struct MockClassifier {
    pub base_url: String,
    pub text_hits: Arc<AtomicUsize>,
    pub image_hits: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct ClassifierState {
    text_hits: Arc<AtomicUsize>,
    image_hits: Arc<AtomicUsize>,
}

impl MockClassifier {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let state = ClassifierState {
            text_hits: Arc::new(AtomicUsize::new(0)),
            image_hits: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/text", post(classify_text))
            .route("/image", post(classify_image))
            .route("/img/:name", get(classifier_image))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            text_hits: state.text_hits,
            image_hits: state.image_hits,
        }
    }

    pub fn text_hits(&self) -> usize {
        self.text_hits.load(Ordering::SeqCst)
    }

    pub fn image_hits(&self) -> usize {
        self.image_hits.load(Ordering::SeqCst)
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", CLASSIFIER_TOKEN))
        .unwrap_or(false)
}

async fn classify_text(
    State(state): State<ClassifierState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.text_hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    }
    let input = body["inputs"].as_str().unwrap_or_default();
    if input.contains("FAIL") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "model crashed").into_response();
    }
    Json(json!([[{ "label": "POSITIVE", "score": 0.9 }, { "label": "unmapped", "score": 0.1 }]])).into_response()
}

async fn classify_image(State(state): State<ClassifierState>, headers: HeaderMap, body: Bytes) -> Response {
    state.image_hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    }
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "no image").into_response();
    }
    Json(json!([{ "label": "seashore, coast, seacoast", "score": 0.7 }])).into_response()
}

async fn classifier_image(Path(_name): Path<String>) -> Response {
    (
        [("content-type", "image/jpeg")],
        vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9],
    )
        .into_response()
}
