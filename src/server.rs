use std::net::IpAddr;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    aggregate::ReconPipeline,
    campaign::{Campaign, StartError},
};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: ReconPipeline,
    pub campaign: Campaign,
}

impl AppState {
    pub fn new(pipeline: ReconPipeline, campaign: Campaign) -> Self {
        Self { pipeline, campaign }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReconRequest {
    #[serde(default)]
    pub domain: String,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub ips: Vec<String>,
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/recon", post(post_recon))
        .route("/scan", post(post_scan))
        .route("/scan/status", get(get_status))
        .route("/scan/cancel", post(post_cancel));

    Router::new()
        .nest("/api", api)
        .route("/start-port-scan", post(post_scan))
        .route("/port-status", get(get_status))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn spawn_server(bind: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "serving API");
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "error": msg.into() }))).into_response()
}

async fn post_recon(State(app): State<AppState>, Json(req): Json<ReconRequest>) -> Response {
    info!(domain = req.domain.trim(), "domain submitted");
    let report = app.pipeline.run(&req.domain).await;
    (StatusCode::OK, Json(report)).into_response()
}

async fn post_scan(State(app): State<AppState>, Json(req): Json<ScanRequest>) -> Response {
    let mut ips: Vec<IpAddr> = Vec::with_capacity(req.ips.len());
    for raw in &req.ips {
        match raw.trim().parse::<IpAddr>() {
            Ok(ip) => ips.push(ip),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("invalid IP {raw}: {e}")),
        }
    }

    match app.campaign.start_scan(ips).await {
        Ok(ticket) => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "started", "total": ticket.total })),
        )
            .into_response(),
        Err(e @ StartError::NoTargets) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e @ StartError::AlreadyRunning) => error_response(StatusCode::CONFLICT, e.to_string()),
    }
}

async fn get_status(State(app): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(app.campaign.status().await))
}

async fn post_cancel(State(app): State<AppState>) -> Response {
    if app.campaign.cancel().await {
        (StatusCode::OK, Json(json!({ "status": "cancelled" }))).into_response()
    } else {
        error_response(StatusCode::CONFLICT, "no scan running")
    }
}
