use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use recon_scan_rs::aggregate::ReconPipeline;
use recon_scan_rs::campaign::Campaign;
use recon_scan_rs::config::ReconConfig;
use recon_scan_rs::discovery::Discoverer;
use recon_scan_rs::portscan::PortScanner;
use recon_scan_rs::resolve::{DnsLookup, LookupError, RecordData, RecordKind, Resolver};
use recon_scan_rs::server::{create_router, AppState};
use recon_scan_rs::tools::{ToolError, ToolRunner};
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tower::ServiceExt;

struct Subfinder;

#[async_trait]
impl ToolRunner for Subfinder {
    async fn run(&self, _program: &Path, args: &[String], _timeout: Duration) -> Result<String, ToolError> {
        assert_eq!(args, ["-d", "example.com", "-silent"]);
        Ok("www.example.com\nmail.example.com\n\nwww.example.com\n".into())
    }
}

struct Dns;

#[async_trait]
impl DnsLookup for Dns {
    async fn lookup(&self, hostname: &str, kind: RecordKind) -> Result<Vec<RecordData>, LookupError> {
        if hostname == "www.example.com" && kind == RecordKind::A {
            return Ok(vec![RecordData::Addr("198.51.100.4".parse().unwrap())]);
        }
        Err(LookupError {
            hostname: hostname.into(),
            kind,
            reason: "NXDOMAIN".into(),
        })
    }
}

/// Each scan waits for one permit so tests control when a campaign finishes.
struct Gated(Semaphore);

#[async_trait]
impl PortScanner for Gated {
    async fn scan_ports(&self, _ip: IpAddr) -> Vec<u16> {
        self.0.acquire().await.expect("gate").forget();
        vec![443]
    }
}

fn app(scanner: Arc<Gated>) -> (Router, Campaign) {
    let config = ReconConfig::default();
    let pipeline = ReconPipeline::new(
        Discoverer::new(Arc::new(Subfinder), &config),
        Resolver::new(Arc::new(Dns), false),
    );
    let campaign = Campaign::new(scanner);
    (
        create_router(AppState::new(pipeline, campaign.clone())),
        campaign,
    )
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn recon_returns_aggregated_report() {
    let (app, _) = app(Arc::new(Gated(Semaphore::new(0))));
    let (status, body) = send(&app, post_json("/api/recon", json!({ "domain": "example.com" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allHostnames"], json!(["mail.example.com", "www.example.com"]));
    assert_eq!(body["activeHostnames"], json!(["www.example.com"]));
    assert_eq!(body["hostnameToIPs"], json!({ "www.example.com": ["198.51.100.4"] }));
    assert_eq!(body["allIPs"], json!(["198.51.100.4"]));
}

#[tokio::test]
async fn empty_domain_yields_empty_report() {
    let (app, _) = app(Arc::new(Gated(Semaphore::new(0))));
    let (status, body) = send(&app, post_json("/api/recon", json!({ "domain": "  " }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allIPs"], json!([]));
}

#[tokio::test]
async fn start_rejects_empty_and_malformed_lists() {
    let (app, campaign) = app(Arc::new(Gated(Semaphore::new(0))));

    let (status, body) = send(&app, post_json("/api/scan", json!({ "ips": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No IPs selected");

    let (status, _) = send(&app, post_json("/api/scan", json!({ "ips": ["10.0.0.300"] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(!campaign.status().await.running);
}

#[tokio::test]
async fn scan_lifecycle_over_http() {
    let scanner = Arc::new(Gated(Semaphore::new(0)));
    let (app, campaign) = app(scanner.clone());

    let (status, body) = send(
        &app,
        post_json("/start-port-scan", json!({ "ips": ["10.0.0.1", "10.0.0.2"] })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({ "status": "started", "total": 2 }));

    let (status, body) = send(&app, post_json("/api/scan", json!({ "ips": ["10.0.0.3"] }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "scan already running");

    let (_, body) = send(&app, get("/port-status")).await;
    assert_eq!(body["running"], true);
    assert_eq!(body["done"], false);

    scanner.0.add_permits(2);
    tokio::time::timeout(Duration::from_secs(5), campaign.wait_until_idle())
        .await
        .unwrap();

    let (status, body) = send(&app, get("/api/scan/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], false);
    assert_eq!(body["done"], true);
    assert_eq!(body["results"], json!({ "10.0.0.1": [443], "10.0.0.2": [443] }));
}

#[tokio::test]
async fn cancel_endpoint() {
    let (app, _) = app(Arc::new(Gated(Semaphore::new(0))));

    let (status, _) = send(&app, post_json("/api/scan/cancel", json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(&app, post_json("/api/scan", json!({ "ips": ["10.0.0.1"] }))).await;
    let (status, body) = send(&app, post_json("/api/scan/cancel", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (_, body) = send(&app, get("/api/scan/status")).await;
    assert_eq!(body["running"], false);
    assert_eq!(body["cancelled"], true);
}

#[tokio::test]
async fn healthz() {
    let (app, _) = app(Arc::new(Gated(Semaphore::new(0))));
    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
