//! Pinning adapter integration tests
//!
//! Runs `PinningServiceStore` against an in-process axum server that mimics
//! the pinning API (pinFileToIPFS / gateway / unpin).

use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;

use wsnap_core::config::PinningConfig;
use wsnap_core::snapshot::NoAppState;
use wsnap_core::store::{
    BlobMetadata, BlobStore, MemoryPointerRegistry, PinningServiceStore, StoreError,
};
use wsnap_core::{ContentId, SnapshotEngine, SnapshotError};

const JWT: &str = "test-jwt";

#[derive(Default)]
struct MockPins {
    blobs: HashMap<String, Vec<u8>>,
    metadata: HashMap<String, serde_json::Value>,
    unpinned: Vec<String>,
    next: u64,
}

type Shared = Arc<Mutex<MockPins>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", JWT))
}

async fn pin_file(
    State(state): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }

    let mut file = None;
    let mut metadata = serde_json::Value::Null;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let data = field.bytes().await.unwrap_or_default();
        match name.as_str() {
            "file" => file = Some(data.to_vec()),
            "pinataMetadata" => {
                metadata = serde_json::from_slice(&data).unwrap_or(serde_json::Value::Null)
            }
            _ => {}
        }
    }
    let Some(file) = file else {
        return (StatusCode::BAD_REQUEST, "missing file").into_response();
    };

    let mut pins = state.lock().await;
    pins.next += 1;
    let cid = format!("QmMock{}", pins.next);
    let size = file.len();
    pins.blobs.insert(cid.clone(), file);
    pins.metadata.insert(cid.clone(), metadata);

    Json(json!({
        "IpfsHash": cid,
        "PinSize": size,
        "Timestamp": "2024-01-01T00:00:00Z"
    }))
    .into_response()
}

async fn gateway(State(state): State<Shared>, UrlPath(cid): UrlPath<String>) -> Response {
    match state.lock().await.blobs.get(&cid) {
        Some(data) => data.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn unpin(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(cid): UrlPath<String>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let mut pins = state.lock().await;
    if pins.blobs.contains_key(&cid) {
        pins.unpinned.push(cid);
        StatusCode::OK.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn start_mock() -> (SocketAddr, Shared) {
    let state: Shared = Arc::new(Mutex::new(MockPins::default()));
    let app = Router::new()
        .route("/pinning/pinFileToIPFS", post(pin_file))
        .route("/pinning/unpin/:cid", delete(unpin))
        .route("/ipfs/:cid", get(gateway))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn config(addr: SocketAddr, jwt: &str) -> PinningConfig {
    PinningConfig {
        api_url: format!("http://{}", addr),
        gateway_url: format!("http://{}/", addr),
        jwt: Some(jwt.to_string()),
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_upload_fetch_unpin() {
    let (addr, state) = start_mock().await;
    let store = PinningServiceStore::new(&config(addr, JWT)).unwrap();

    let meta = BlobMetadata::new("wsnap-ws").with("workspaceId", "ws");
    let id = store
        .upload(bytes::Bytes::from_static(b"{\"k\":1}"), &meta)
        .await
        .unwrap();
    assert_eq!(id, ContentId::from("QmMock1"));
    assert_eq!(store.fetch(&id).await.unwrap().as_ref(), b"{\"k\":1}");

    {
        let pins = state.lock().await;
        assert_eq!(pins.metadata["QmMock1"]["name"], "wsnap-ws");
        assert_eq!(pins.metadata["QmMock1"]["keyvalues"]["workspaceId"], "ws");
    }

    store.unpin(&id).await.unwrap();
    assert_eq!(state.lock().await.unpinned, vec!["QmMock1".to_string()]);
}

#[tokio::test]
async fn test_fetch_missing_is_not_found() {
    let (addr, _) = start_mock().await;
    let store = PinningServiceStore::new(&config(addr, JWT)).unwrap();
    assert!(matches!(
        store.fetch(&ContentId::from("QmNothing")).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_bad_token_fails_upload_and_keeps_pointer() {
    let (addr, state) = start_mock().await;
    let src = TempDir::new().unwrap();
    fs::write(src.path().join("a.txt"), "hello").unwrap();

    let registry = Arc::new(MemoryPointerRegistry::new());
    let store = Arc::new(PinningServiceStore::new(&config(addr, "wrong")).unwrap());
    let engine = SnapshotEngine::new(store, registry.clone());

    let result = engine.commit("ws", src.path(), &NoAppState).await;
    assert!(matches!(
        result,
        Err(SnapshotError::UploadFailed(StoreError::Rejected { status: 401, .. }))
    ));
    assert!(engine.current("ws").await.unwrap().is_none());
    assert!(state.lock().await.blobs.is_empty());
}

#[tokio::test]
async fn test_engine_over_pinning_service() {
    let (addr, state) = start_mock().await;
    let src = TempDir::new().unwrap();
    fs::create_dir_all(src.path().join("sub")).unwrap();
    fs::write(src.path().join("a.txt"), "hello").unwrap();
    fs::write(src.path().join("sub/b.txt"), "world").unwrap();

    let store = Arc::new(PinningServiceStore::new(&config(addr, JWT)).unwrap());
    let engine = SnapshotEngine::new(store, Arc::new(MemoryPointerRegistry::new()));

    let c1 = engine.commit("ws", src.path(), &NoAppState).await.unwrap();
    fs::write(src.path().join("a.txt"), "hello again").unwrap();
    let c2 = engine.commit("ws", src.path(), &NoAppState).await.unwrap();

    assert_eq!(state.lock().await.unpinned, vec![c1.content_id.to_string()]);
    assert_eq!(
        engine.current("ws").await.unwrap().unwrap().current_content_id,
        c2.content_id
    );

    let dst = TempDir::new().unwrap();
    let out = engine.restore_current("ws", dst.path()).await.unwrap();
    assert!(out.diagnostics.is_empty());
    assert_eq!(
        fs::read_to_string(dst.path().join("a.txt")).unwrap(),
        "hello again"
    );
    assert_eq!(fs::read_to_string(dst.path().join("sub/b.txt")).unwrap(), "world");
}
