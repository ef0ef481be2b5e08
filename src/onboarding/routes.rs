//! REST endpoint for onboarding progress.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use super::model::{Progress, SessionSnapshot};
use super::store::SessionStore;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub store: Arc<dyn SessionStore>,
}

#[derive(Debug, Serialize)]
struct ProgressResponse {
    session_id: String,
    #[serde(flatten)]
    snapshot: SessionSnapshot,
    progress: Progress,
}

/// GET /api/onboarding/{session_id}
///
/// Snapshot plus progress. Unknown sessions get an empty snapshot.
async fn get_progress(
    State(state): State<OnboardingRouteState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.store.get(&session_id).await {
        Ok(session) => {
            let session = session.unwrap_or_default();
            Json(ProgressResponse {
                session_id,
                snapshot: session.snapshot(),
                progress: session.progress(),
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!(session_id = %session_id, "Failed to read session: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/{session_id}", get(get_progress))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
