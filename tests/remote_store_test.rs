use std::sync::Arc;

use attendance_dashboard::models::{EntityKind, FacilityRequest};
use attendance_dashboard::persistence::{
    HttpRemoteStore, LoadSource, LocalStore, PersistenceAdapter, RemoteConfig, RemoteStore,
};
use attendance_dashboard::services::{Dashboard, NoticeLevel, Notifier};
use attendance_dashboard::store::EntityStore;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

/// Serves `app` on an ephemeral port and returns the API base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });
    format!("http://{}/api", addr)
}

async fn empty() -> Json<Value> {
    Json(json!([]))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

fn http_remote(base_url: String) -> Arc<dyn RemoteStore> {
    Arc::new(HttpRemoteStore::new(RemoteConfig { base_url }).expect("Failed to build remote"))
}

#[tokio::test]
async fn test_load_reads_all_collections_from_remote() {
    let base_url = serve(
        Router::new()
            .route(
                "/api/labs",
                get(|| async { Json(json!([{"id": "l1", "name": "AIML-324A", "capacity": 40}])) }),
            )
            .route("/api/classes", get(empty))
            .route(
                "/api/lab-attendance",
                get(|| async {
                    Json(json!([{
                        "id": "a1",
                        "date": "2024-01-10",
                        "labId": "l1",
                        "slot": "9:10-11:10",
                        "count": 25
                    }]))
                }),
            )
            .route("/api/class-attendance", get(empty)),
    )
    .await;

    let local = LocalStore::in_memory().await.expect("Failed to create test db");
    let adapter = PersistenceAdapter::new(local, http_remote(base_url));
    let (snapshot, source) = adapter.load().await.expect("Load failed");

    assert_eq!(source, LoadSource::Remote);
    assert_eq!(snapshot.labs[0].name, "AIML-324A");
    assert_eq!(snapshot.lab_attendance[0].count, 25);
}

#[tokio::test]
async fn test_server_error_on_one_collection_falls_back_to_local() {
    let base_url = serve(
        Router::new()
            .route("/api/labs", get(empty))
            .route("/api/classes", get(empty))
            .route("/api/lab-attendance", get(broken))
            .route("/api/class-attendance", get(empty)),
    )
    .await;

    let local = LocalStore::in_memory().await.expect("Failed to create test db");
    let mut saved = EntityStore::new();
    saved
        .add_facility(EntityKind::Lab, &FacilityRequest::new("AIML-323B", 40))
        .unwrap();
    local.save_snapshot(&saved.to_snapshot()).await.unwrap();

    let adapter = PersistenceAdapter::new(local, http_remote(base_url));
    let (snapshot, source) = adapter.load().await.expect("Load failed");

    assert_eq!(source, LoadSource::Local);
    assert_eq!(snapshot, saved.to_snapshot());
}

#[tokio::test]
async fn test_unreachable_remote_falls_back_to_local() {
    // bind then drop, so nothing is listening on the port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let local = LocalStore::in_memory().await.expect("Failed to create test db");
    let adapter = PersistenceAdapter::new(local, http_remote(format!("http://{}/api", addr)));
    let (_, source) = adapter.load().await.expect("Load failed");
    assert_eq!(source, LoadSource::Local);
}

#[tokio::test]
async fn test_rejected_push_becomes_error_notice() {
    let base_url = serve(
        Router::new()
            .route("/api/labs", get(empty).post(broken))
            .route("/api/classes", get(empty))
            .route("/api/lab-attendance", get(empty))
            .route("/api/class-attendance", get(empty)),
    )
    .await;

    let local = LocalStore::in_memory().await.expect("Failed to create test db");
    let adapter = PersistenceAdapter::new(local.clone(), http_remote(base_url));
    let mut dashboard = Dashboard::load(adapter, Notifier::new(), false)
        .await
        .expect("Failed to load dashboard");
    assert_eq!(dashboard.source(), LoadSource::Remote);

    let id = dashboard
        .add_facility(EntityKind::Lab, &FacilityRequest::new("AIML-324A", 40))
        .await
        .expect("Local add should succeed");
    dashboard.flush_remote().await;

    assert!(dashboard.store().find_lab(&id).is_some());
    assert_eq!(local.load_snapshot().await.unwrap().labs.len(), 1);

    let notices = dashboard.notifier().recent();
    let errors: Vec<_> = notices
        .iter()
        .filter(|n| n.level == NoticeLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.starts_with("Remote sync failed"));
}
