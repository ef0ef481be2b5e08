//! Integration tests for the onboarding progress endpoint.
//!
//! Each test spins up an Axum server on a random port and queries it with
//! reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::net::TcpListener;

use vendor_onboard::error::StoreError;
use vendor_onboard::onboarding::{
    InMemorySessionStore, OnboardingRouteState, SessionStore, SessionUpdate, VendorSession,
    onboarding_routes,
};

/// Store whose backend is down.
struct OfflineStore;

#[async_trait]
impl SessionStore for OfflineStore {
    async fn get(&self, _session_id: &str) -> Result<Option<VendorSession>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn update(
        &self,
        _session_id: &str,
        _update: SessionUpdate,
    ) -> Result<VendorSession, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// Serve the routes over `store` on a random port.
async fn serve(store: Arc<dyn SessionStore>) -> u16 {
    let app = onboarding_routes(OnboardingRouteState { store });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    port
}

/// Start an Axum server on a random port, return (port, store).
async fn start_server() -> (u16, Arc<InMemorySessionStore>) {
    let store = Arc::new(InMemorySessionStore::new());
    let port = serve(store.clone()).await;
    (port, store)
}

async fn get_progress(port: u16, session_id: &str) -> (u16, Value) {
    let response = reqwest::get(format!(
        "http://127.0.0.1:{}/api/onboarding/{}",
        port, session_id
    ))
    .await
    .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn unknown_session_is_empty_snapshot() {
    let (port, _store) = start_server().await;
    let (status, body) = get_progress(port, "nobody").await;

    assert_eq!(status, 200);
    assert_eq!(body["session_id"], "nobody");
    assert_eq!(body["application_complete"], false);
    assert!(body.get("company_name").is_none());
    assert_eq!(body["progress"]["completed"], 0);
    assert_eq!(body["progress"]["total"], 3);
    assert_eq!(body["progress"]["percent"], 0);
}

#[tokio::test]
async fn partial_session_reports_progress() {
    let (port, store) = start_server().await;
    store
        .update(
            "s1",
            SessionUpdate::new().company_name("Acme Inc").lookup_complete(),
        )
        .await
        .unwrap();

    let (status, body) = get_progress(port, "s1").await;
    assert_eq!(status, 200);
    assert_eq!(body["company_name"], "Acme Inc");
    assert_eq!(body["progress"]["completed"], 1);
    assert_eq!(body["progress"]["percent"], 33);

    let steps = body["progress"]["steps"].as_array().unwrap();
    let names: Vec<&str> = steps.iter().map(|s| s["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Company Info", "Compliance", "Data Access"]);
    assert_eq!(steps[0]["complete"], true);
    assert_eq!(steps[1]["complete"], false);
}

#[tokio::test]
async fn complete_session_snapshot() {
    let (port, store) = start_server().await;
    let now = Utc::now();
    store
        .update(
            "s2",
            SessionUpdate::new()
                .company_name("Acme Inc")
                .certifications("SOC 2", now),
        )
        .await
        .unwrap();
    store
        .update("s2", SessionUpdate::new().data_access("None", now))
        .await
        .unwrap();

    let (_, body) = get_progress(port, "s2").await;
    assert_eq!(body["application_complete"], true);
    assert_eq!(body["compliance_certifications"], "SOC 2");
    assert_eq!(body["data_access_needs"], "None");
    assert_eq!(body["progress"]["percent"], 100);
}

#[tokio::test]
async fn store_fault_is_server_error() {
    let port = serve(Arc::new(OfflineStore)).await;
    let (status, body) = get_progress(port, "s3").await;

    assert_eq!(status, 500);
    assert_eq!(body["error"], "Session backend unavailable: connection refused");
}
