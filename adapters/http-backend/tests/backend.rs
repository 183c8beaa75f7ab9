//! Drives `HttpBackend` (and the store on top of it) against an in-process
//! axum server that mimics the links API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use domain::analytics::summarize;
use domain::store::LinkCollectionStore;
use domain::{CoreError, DeviceClass, LinkDraft, Session, ShortCode};
use http_backend::HttpBackend;
use serde_json::{json, Value};

const TOKEN: &str = "test-token";

#[derive(Clone, Default)]
struct Mock {
    links: Arc<Mutex<Vec<Value>>>,
    requests: Arc<AtomicUsize>,
    last_payload: Arc<Mutex<Option<Value>>>,
}

fn authorized(mock: &Mock, headers: &HeaderMap) -> bool {
    mock.requests.fetch_add(1, Ordering::SeqCst);
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn unauthorized() -> axum::response::Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid token"}))).into_response()
}

async fn list(State(mock): State<Mock>, headers: HeaderMap) -> axum::response::Response {
    if !authorized(&mock, &headers) {
        return unauthorized();
    }
    let links = mock.links.lock().unwrap().clone();
    Json(Value::Array(links)).into_response()
}

async fn create(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if !authorized(&mock, &headers) {
        return unauthorized();
    }
    *mock.last_payload.lock().unwrap() = Some(body.clone());
    let link = json!({
        "originalUrl": body["originalUrl"],
        "shortUrl": "new001",
        "remark": body["remark"],
        "expirationDate": body["expirationDate"],
        "clicks": [],
        "totalClicks": 0
    });
    mock.links.lock().unwrap().push(link.clone());
    (StatusCode::CREATED, Json(link)).into_response()
}

async fn update(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Path(code): Path<String>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if !authorized(&mock, &headers) {
        return unauthorized();
    }
    let mut links = mock.links.lock().unwrap();
    match links.iter_mut().find(|l| l["shortUrl"] == code.as_str()) {
        Some(link) => {
            link["originalUrl"] = body["originalUrl"].clone();
            link["remark"] = body["remark"].clone();
            link["expirationDate"] = body["expirationDate"].clone();
            Json(link.clone()).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "Link not found"}))).into_response(),
    }
}

async fn remove(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> axum::response::Response {
    if !authorized(&mock, &headers) {
        return unauthorized();
    }
    let mut links = mock.links.lock().unwrap();
    let before = links.len();
    links.retain(|l| l["shortUrl"] != code.as_str());
    if links.len() == before {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "Link not found"}))).into_response();
    }
    Json(json!({"message": "Link deleted"})).into_response()
}

async fn stats(State(mock): State<Mock>, headers: HeaderMap) -> axum::response::Response {
    if !authorized(&mock, &headers) {
        return unauthorized();
    }
    Json(json!({
        "totalClicks": 7,
        "dateWiseClicks": [
            {"date": "2025-01-06", "clicks": 4},
            {"date": "2025-01-05", "clicks": 3}
        ],
        "deviceTypes": {"Desktop": 5, "Mobile": 2}
    }))
    .into_response()
}

fn seed() -> Vec<Value> {
    vec![
        json!({
            "originalUrl": "https://example.com/a",
            "shortUrl": "aaa111",
            "remark": "first",
            "expirationDate": null,
            "clicks": [
                {"timestamp": "2025-01-05T10:00:00.000Z", "ip": "1.1.1.1", "userAgent": "Mozilla/5.0 (Windows NT 10.0; Win64; x64)"},
                {"timestamp": "2025-01-06T10:00:00.000Z", "ip": "1.1.1.2", "userAgent": "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"}
            ],
            "totalClicks": 2
        }),
        json!({
            "originalUrl": "https://example.com/b",
            "shortUrl": "bbb222",
            "remark": "second",
            "expirationDate": "2030-01-01T00:00:00.000Z",
            "clicks": [
                {"timestamp": "2025-01-06T11:00:00.000Z", "ip": "2.2.2.2", "userAgent": "Some tablet browser"}
            ],
            "totalClicks": 1
        }),
    ]
}

async fn spawn_mock() -> (String, Mock) {
    let mock = Mock::default();
    *mock.links.lock().unwrap() = seed();
    let app = Router::new()
        .route("/api/links", get(list).post(create))
        .route("/api/links/stats", get(stats))
        .route("/api/links/short/:code", put(update).delete(remove))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), mock)
}

fn backend(base: &str) -> HttpBackend {
    HttpBackend::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn store_round_trip_over_http() {
    let (base, mock) = spawn_mock().await;
    let mut store = LinkCollectionStore::new(backend(&base), Session::new(TOKEN));

    assert_eq!(store.refresh().await.unwrap(), 2);
    let events = store.click_events(&format!("{base}/api/links"));
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].short_url, format!("{base}/api/links/aaa111"));
    let summary = summarize(&events);
    assert_eq!(summary.total_clicks, 3);
    let devices: Vec<_> = summary.clicks_by_device.iter().map(|b| b.device).collect();
    assert_eq!(
        devices,
        vec![DeviceClass::Tablet, DeviceClass::Desktop, DeviceClass::Ios]
    );

    let created = store
        .create(&LinkDraft::new("https://rust-lang.org", "docs"))
        .await
        .unwrap();
    assert_eq!(created.short_code.as_str(), "new001");
    assert_eq!(store.len(), 3);
    assert_eq!(
        mock.last_payload.lock().unwrap().clone(),
        Some(json!({"originalUrl": "https://rust-lang.org", "remark": "docs", "expirationDate": null}))
    );

    let code = ShortCode::new("bbb222").unwrap();
    let updated = store
        .update(&code, &LinkDraft::new("https://example.com/b2", "renamed"))
        .await
        .unwrap();
    assert_eq!(updated.remark, "renamed");
    assert_eq!(updated.expiration_date, None);
    assert_eq!(store.get(&code).unwrap().clicks.len(), 1);

    store.remove(&ShortCode::new("aaa111").unwrap()).await.unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(mock.links.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn stats_endpoint_is_authoritative() {
    let (base, _mock) = spawn_mock().await;
    let store = LinkCollectionStore::new(backend(&base), Session::new(TOKEN));
    let summary = store.fetch_summary().await.unwrap();
    assert_eq!(summary.total_clicks, 7);
    assert_eq!(summary.clicks_by_date.len(), 2);
    assert!(summary.clicks_by_date[0].date < summary.clicks_by_date[1].date);
    assert_eq!(summary.clicks_by_device[0].device, DeviceClass::Mobile);
}

#[tokio::test]
async fn rejected_token_is_a_transport_error() {
    let (base, _mock) = spawn_mock().await;
    let mut store = LinkCollectionStore::new(backend(&base), Session::new("wrong"));
    let err = store.refresh().await.unwrap_err();
    match err {
        CoreError::Transport(msg) => {
            assert!(msg.contains("401"), "{msg}");
            assert!(msg.contains("Invalid token"), "{msg}");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn backend_404_leaves_local_state() {
    let (base, mock) = spawn_mock().await;
    let mut store = LinkCollectionStore::new(backend(&base), Session::new(TOKEN));
    store.refresh().await.unwrap();
    // Another client deletes the link behind our back.
    mock.links.lock().unwrap().retain(|l| l["shortUrl"] != "aaa111");

    let code = ShortCode::new("aaa111").unwrap();
    let err = store
        .update(&code, &LinkDraft::new("https://e.com", "r"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Transport(ref m) if m.contains("404")));
    assert_eq!(store.get(&code).unwrap().remark, "first");
}

#[tokio::test]
async fn anonymous_session_sends_nothing() {
    let (base, mock) = spawn_mock().await;
    let mut store = LinkCollectionStore::new(backend(&base), Session::anonymous());
    assert_eq!(store.refresh().await, Err(CoreError::Unauthenticated));
    assert!(store.fetch_summary().await.is_err());
    assert_eq!(mock.requests.load(Ordering::SeqCst), 0);
}
