use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use canvas_common::types::{DocumentDraft, DocumentId};
use canvas_sync::{
    DocumentStore, HttpDocumentStore, MemoryDocumentStore, StoreError, SyncController,
    SyncTimings,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

type Reply = (StatusCode, Json<Value>);

// ── Fake document store server ──────────────────────────────────────

fn failure(error: StoreError) -> Reply {
    let status = match error {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(json!({ "success": false, "error": error.to_string() })))
}

fn success(body: Value) -> Reply {
    (StatusCode::OK, Json(body))
}

async fn list(State(store): State<MemoryDocumentStore>) -> Reply {
    match store.list().await {
        Ok(documents) => success(json!({ "success": true, "documents": documents })),
        Err(error) => failure(error),
    }
}

async fn create(
    State(store): State<MemoryDocumentStore>,
    Json(draft): Json<DocumentDraft>,
) -> Reply {
    match store.create(&draft).await {
        Ok(document) => success(json!({ "success": true, "document": document })),
        Err(error) => failure(error),
    }
}

async fn fetch(State(store): State<MemoryDocumentStore>, Path(id): Path<String>) -> Reply {
    match store.get(&DocumentId::from(id)).await {
        Ok(document) => success(json!({ "success": true, "document": document })),
        Err(error) => failure(error),
    }
}

async fn update(
    State(store): State<MemoryDocumentStore>,
    Path(id): Path<String>,
    Json(draft): Json<DocumentDraft>,
) -> Reply {
    match store.update(&DocumentId::from(id), &draft).await {
        Ok(document) => success(json!({ "success": true, "document": document })),
        Err(error) => failure(error),
    }
}

async fn remove(State(store): State<MemoryDocumentStore>, Path(id): Path<String>) -> Reply {
    match store.delete(&DocumentId::from(id)).await {
        Ok(()) => success(json!({ "success": true })),
        Err(error) => failure(error),
    }
}

async fn activate(State(store): State<MemoryDocumentStore>, Path(id): Path<String>) -> Reply {
    match store.set_active(&DocumentId::from(id)).await {
        Ok(()) => success(json!({ "success": true })),
        Err(error) => failure(error),
    }
}

async fn versions(State(store): State<MemoryDocumentStore>, Path(id): Path<String>) -> Reply {
    match store.list_versions(&DocumentId::from(id)).await {
        Ok(versions) => success(json!({ "success": true, "versions": versions })),
        Err(error) => failure(error),
    }
}

async fn version(
    State(store): State<MemoryDocumentStore>,
    Path((id, index)): Path<(String, usize)>,
) -> Reply {
    match store.get_version(&DocumentId::from(id), index).await {
        Ok(content) => success(json!({ "success": true, "version": { "content": content } })),
        Err(error) => failure(error),
    }
}

fn store_router(store: MemoryDocumentStore) -> Router {
    Router::new()
        .route("/api/documents", get(list).post(create))
        .route("/api/documents/active/{id}", post(activate))
        .route("/api/documents/{id}", get(fetch).put(update).delete(remove))
        .route("/api/documents/{id}/versions", get(versions))
        .route("/api/documents/{id}/versions/{index}", get(version))
        .with_state(store)
}

async fn serve(router: Router) -> (HttpDocumentStore, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("listener should bind");
    let addr = listener.local_addr().expect("listener should expose local address");
    let task = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("fake store should run");
    });
    let client = HttpDocumentStore::new(&format!("http://{addr}/api")).expect("valid base url");
    (client, task)
}

/// A server whose document routes all answer with `status` and `body`.
async fn serve_canned(
    status: StatusCode,
    body: &'static str,
) -> (HttpDocumentStore, JoinHandle<()>) {
    let reply = move || async move { (status, body) };
    let router = Router::new()
        .route("/api/documents", get(reply))
        .route("/api/documents/{id}", get(reply).put(reply));
    serve(router).await
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..150 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met within 3s");
}

// ── Contract ────────────────────────────────────────────────────────

#[tokio::test]
async fn crud_and_versions_round_trip_over_http() {
    let backing = MemoryDocumentStore::new();
    let (client, server) = serve(store_router(backing.clone())).await;

    let created = client.create(&DocumentDraft::new("Plan", "first")).await.unwrap();
    assert_eq!(created.title, "Plan");

    let listed = client.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);

    let updated =
        client.update(&created.id, &DocumentDraft::new("Plan", "second")).await.unwrap();
    assert_eq!(updated.content, "second");
    assert!(updated.updated_at > created.updated_at);
    assert_eq!(client.get(&created.id).await.unwrap(), updated);

    client.set_active(&created.id).await.unwrap();
    assert_eq!(backing.active_document(), Some(created.id.clone()));

    let versions = client.list_versions(&created.id).await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].content_preview, "first");
    assert_eq!(client.get_version(&created.id, 0).await.unwrap(), "first");
    assert_eq!(client.get_version(&created.id, 1).await.unwrap(), "second");

    client.delete(&created.id).await.unwrap();
    assert_eq!(client.get(&created.id).await, Err(StoreError::NotFound(created.id.clone())));

    server.abort();
}

#[tokio::test]
async fn missing_document_is_not_found_everywhere() {
    let (client, server) = serve(store_router(MemoryDocumentStore::new())).await;
    let missing = DocumentId::from("41");
    let expected = StoreError::NotFound(missing.clone());

    assert_eq!(client.get(&missing).await, Err(expected.clone()));
    assert_eq!(
        client.update(&missing, &DocumentDraft::new("x", "y")).await,
        Err(expected.clone())
    );
    assert_eq!(client.delete(&missing).await, Err(expected.clone()));
    assert_eq!(client.set_active(&missing).await, Err(expected.clone()));
    assert_eq!(client.list_versions(&missing).await, Err(expected));

    server.abort();
}

#[tokio::test]
async fn missing_version_is_not_a_missing_document() {
    let backing = MemoryDocumentStore::new();
    let doc = backing.insert("Plan", "only");
    let (client, server) = serve(store_router(backing)).await;

    let error = client.get_version(&doc.id, 9).await.unwrap_err();
    assert!(!error.is_not_found());
    assert_eq!(error, StoreError::Status { status: 400 });

    server.abort();
}

#[tokio::test]
async fn malformed_body_is_a_soft_failure() {
    let (client, server) = serve_canned(StatusCode::OK, "<html>oops</html>").await;
    assert!(matches!(client.list().await, Err(StoreError::Malformed(_))));
    assert!(matches!(client.get(&DocumentId::from("1")).await, Err(StoreError::Malformed(_))));
    server.abort();
}

#[tokio::test]
async fn envelope_without_success_is_rejected() {
    let (client, server) =
        serve_canned(StatusCode::OK, r#"{"success": false, "error": "database locked"}"#).await;
    assert_eq!(client.list().await, Err(StoreError::Rejected("database locked".into())));
    server.abort();
}

#[tokio::test]
async fn success_without_document_is_malformed() {
    let (client, server) = serve_canned(StatusCode::OK, r#"{"success": true}"#).await;
    let result = client.update(&DocumentId::from("1"), &DocumentDraft::new("a", "b")).await;
    assert!(matches!(result, Err(StoreError::Malformed(message)) if message.contains("document")));
    server.abort();
}

#[tokio::test]
async fn server_error_status_is_reported() {
    let (client, server) = serve_canned(StatusCode::BAD_GATEWAY, "upstream down").await;
    assert_eq!(client.get(&DocumentId::from("1")).await, Err(StoreError::Status { status: 502 }));
    server.abort();
}

#[tokio::test]
async fn numeric_ids_and_naive_timestamps_decode() {
    let body = r#"{
        "success": true,
        "document": {
            "id": 7,
            "title": "Canvas",
            "content": "hello",
            "updated_at": "2026-05-01 12:00:00.250"
        }
    }"#;
    let (client, server) = serve_canned(StatusCode::OK, body).await;

    let document = client.get(&DocumentId::from("7")).await.unwrap();
    assert_eq!(document.id, DocumentId::from("7"));
    assert_eq!(
        document.updated_at,
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap() + chrono::Duration::milliseconds(250)
    );
    assert!(!document.is_active);
    server.abort();
}

#[tokio::test]
async fn unreachable_store_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpDocumentStore::new(&format!("http://{addr}/api")).unwrap();
    assert!(matches!(client.list().await, Err(StoreError::Transport(_))));
}

// ── Controller over HTTP ────────────────────────────────────────────

#[tokio::test]
async fn controller_saves_and_adopts_through_the_http_store() {
    let backing = MemoryDocumentStore::new();
    let doc = backing.insert("Canvas", "start");
    let (client, server) = serve(store_router(backing.clone())).await;
    let timings = SyncTimings {
        debounce: Duration::from_millis(50),
        poll_interval: Duration::from_millis(100),
    };
    let handle = SyncController::spawn(client, timings);

    let opened = handle.open(&doc.id).await.unwrap();
    assert_eq!(opened.content, "start");
    assert_eq!(backing.active_document(), Some(doc.id.clone()));

    handle.notify_edit(&doc.id, "Canvas", "typed by the human").await.unwrap();
    wait_for(|| {
        backing.document(&doc.id).is_some_and(|stored| stored.content == "typed by the human")
    })
    .await;

    backing.external_update(&doc.id, "written by the agent").unwrap();
    wait_for(|| {
        handle
            .snapshot()
            .document
            .is_some_and(|open| open.content == "written by the agent")
    })
    .await;

    handle.shutdown().await.unwrap();
    server.abort();
}
