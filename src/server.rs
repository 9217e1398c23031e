//! HTTP surface: the opportunities list, per-notice draft text and references, and a health probe.
//!
//! Every request re-reads the store; there is no in-memory cache to invalidate after a fetch.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::GateSettings;
use crate::draft::{build_references, render_draft, DraftReferences};
use crate::gate::{require_access, AccessGate};
use crate::models::{NoticesResponse, Opportunity, Publication};
use crate::store::{load_json_or_default, NoticeStore, StoreError};

#[derive(Debug, Clone)]
pub struct ServeSettings {
    pub addr: SocketAddr,
    pub store_path: PathBuf,
    pub publications_path: PathBuf,
    pub gate: Option<GateSettings>,
}

#[derive(Clone)]
pub struct AppState {
    pub store: NoticeStore,
    pub publications: Arc<Vec<Publication>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("No opportunity with id '{0}'")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(e) => {
                error!("Store read failed - error={}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn build_router(state: AppState, gate: Option<Arc<AccessGate>>) -> Router {
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/opportunities",
            get(list_opportunities).fallback(method_not_allowed),
        )
        .route("/opportunities/:id/draft", get(draft_text))
        .route("/opportunities/:id/references", get(draft_references))
        .fallback(not_found)
        .with_state(state);

    let router = match gate {
        Some(gate) => router.layer(from_fn_with_state(gate, require_access)),
        None => router,
    };
    router.layer(TraceLayer::new_for_http())
}

pub async fn serve(settings: ServeSettings) -> anyhow::Result<()> {
    let publications: Vec<Publication> = load_json_or_default(&settings.publications_path)?;
    info!(
        "Server config - store={}, publications={} ({} entries), gate={}",
        settings.store_path.display(),
        settings.publications_path.display(),
        publications.len(),
        if settings.gate.is_some() { "on" } else { "off" }
    );

    let state = AppState {
        store: NoticeStore::new(settings.store_path),
        publications: Arc::new(publications),
    };
    let gate = settings.gate.map(|g| Arc::new(AccessGate::new(g)));
    let app = build_router(state, gate);

    let listener = tokio::net::TcpListener::bind(settings.addr).await?;
    info!("Listening - addr={}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn list_opportunities(State(state): State<AppState>) -> Result<Json<NoticesResponse>, ApiError> {
    let notices = state.store.load_opportunities()?;
    Ok(Json(NoticesResponse { notices }))
}

fn find_opportunity(state: &AppState, id: &str) -> Result<Opportunity, ApiError> {
    state
        .store
        .load_opportunities()?
        .into_iter()
        .find(|o| o.id == id)
        .ok_or_else(|| ApiError::NotFound(id.to_string()))
}

async fn draft_text(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let opp = find_opportunity(&state, &id)?;
    let body = render_draft(&opp);
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

async fn draft_references(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DraftReferences>, ApiError> {
    let opp = find_opportunity(&state, &id)?;
    Ok(Json(build_references(&opp, &state.publications)))
}
