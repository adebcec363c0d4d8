//! End-to-end passes against a local stub of the catalogue and AdGuard Home

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lds_core::rules::{END_MARKER, START_MARKER};
use lds_core::{Config, Error, Syncer};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// `admin:secret`
const EXPECTED_AUTH: &str = "Basic YWRtaW46c2VjcmV0";

const CATALOGUE: &str = r#"{
    "cache_domains": [
        { "name": "steam", "description": "SteamPipe", "domain_files": ["steam.txt"] },
        { "name": "blizzard", "domain_files": ["blizzard.txt", "missing.txt"] },
        { "name": "origin", "domain_files": ["origin.txt"] }
    ]
}"#;

const SLOW_CATALOGUE: &str = r#"{
    "cache_domains": [
        { "name": "mixed", "domain_files": ["origin.txt", "slow.txt"] }
    ]
}"#;

#[derive(Clone)]
struct Stub {
    catalogue: Arc<String>,
    rules: Arc<Mutex<Vec<String>>>,
    writes: Arc<AtomicUsize>,
}

impl Stub {
    fn new(catalogue: &str, rules: &[&str]) -> Self {
        Self {
            catalogue: Arc::new(catalogue.to_string()),
            rules: Arc::new(Mutex::new(rules.iter().map(|r| r.to_string()).collect())),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn rules(&self) -> Vec<String> {
        self.rules.lock().unwrap().clone()
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[derive(Deserialize)]
struct SetRules {
    rules: Vec<String>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(EXPECTED_AUTH)
}

async fn catalogue(State(stub): State<Stub>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        stub.catalogue.as_str().to_string(),
    )
        .into_response()
}

async fn filtering_status(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "enabled": true, "user_rules": stub.rules() })).into_response()
}

async fn set_rules(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<SetRules>,
) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    *stub.rules.lock().unwrap() = body.rules;
    stub.writes.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn spawn_stub(stub: Stub) -> String {
    let app = Router::new()
        .route("/cache-domains/cache_domains.json", get(catalogue))
        .route(
            "/cache-domains/steam.txt",
            get(|| async { "# Steam\nlancache.steamcontent.com\n\n*.steamcontent.com\n" }),
        )
        .route(
            "/cache-domains/blizzard.txt",
            get(|| async { "dist.blizzard.com\n" }),
        )
        .route(
            "/cache-domains/origin.txt",
            get(|| async { "origin-a.akamaihd.net\n" }),
        )
        .route(
            "/cache-domains/slow.txt",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "slow.example\n"
            }),
        )
        .route("/control/filtering/status", get(filtering_status))
        .route("/control/filtering/set_rules", post(set_rules))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn config_for(base: &str, services: &[&str]) -> Config {
    let mut config = Config::default();
    config.adguard.url = base.to_string();
    config.adguard.username = "admin".to_string();
    config.adguard.password = "secret".to_string();
    config.lancache.server = Some("10.0.0.50".parse().unwrap());
    config.sync.services = services.iter().map(|s| s.to_string()).collect();
    config.catalogue.base_url = format!("{base}/cache-domains");
    config
}

fn rewrite(host: &str) -> String {
    format!("|{host}^$dnsrewrite=NOERROR;A;10.0.0.50,important")
}

#[tokio::test]
async fn test_sync_preserves_foreign_rules() {
    let stub = Stub::new(
        CATALOGUE,
        &[
            "||ads.example^",
            START_MARKER,
            "|stale.example^$dnsrewrite=NOERROR;A;10.0.0.1,important",
            END_MARKER,
            "@@||allowed.example^",
        ],
    );
    let base = spawn_stub(stub.clone()).await;
    let syncer = Syncer::from_config(&config_for(&base, &["steam"])).unwrap();

    let report = syncer.run_once(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.rules_written, 2);
    assert_eq!(report.rules_preserved, 2);
    assert_eq!(
        stub.rules(),
        vec![
            "||ads.example^".to_string(),
            "@@||allowed.example^".to_string(),
            START_MARKER.to_string(),
            rewrite("lancache.steamcontent.com"),
            "||steamcontent.com^$dnsrewrite=NOERROR;A;10.0.0.50,important".to_string(),
            END_MARKER.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_repeated_passes_are_stable() {
    let stub = Stub::new(CATALOGUE, &["||ads.example^"]);
    let base = spawn_stub(stub.clone()).await;
    let syncer = Syncer::from_config(&config_for(&base, &["steam", "origin"])).unwrap();

    syncer.run_once(&CancellationToken::new()).await.unwrap();
    let mut first = stub.rules();
    syncer.run_once(&CancellationToken::new()).await.unwrap();
    let mut second = stub.rules();

    assert_eq!(stub.writes(), 2);
    assert_eq!(second.iter().filter(|r| *r == START_MARKER).count(), 1);
    assert_eq!(second[0], "||ads.example^");

    // Files land in completion order, so compare contents only.
    first.sort();
    second.sort();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_domain_file_is_skipped() {
    let stub = Stub::new(CATALOGUE, &[]);
    let base = spawn_stub(stub.clone()).await;
    let syncer = Syncer::from_config(&config_for(&base, &["blizzard"])).unwrap();

    let report = syncer.run_once(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.files_selected, 2);
    assert_eq!(report.files_failed, 1);
    assert_eq!(
        stub.rules(),
        vec![
            START_MARKER.to_string(),
            rewrite("dist.blizzard.com"),
            END_MARKER.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_bad_credentials_leave_rules_untouched() {
    let stub = Stub::new(CATALOGUE, &["||ads.example^"]);
    let base = spawn_stub(stub.clone()).await;
    let mut config = config_for(&base, &["*"]);
    config.adguard.password = "wrong".to_string();
    let syncer = Syncer::from_config(&config).unwrap();

    let err = syncer.run_once(&CancellationToken::new()).await.unwrap_err();

    assert!(err.to_string().starts_with("reconcile rules"));
    assert!(matches!(err.root(), Error::Status { status: 401, .. }));
    assert_eq!(stub.writes(), 0);
    assert_eq!(stub.rules(), vec!["||ads.example^".to_string()]);
}

#[tokio::test]
async fn test_malformed_catalogue_aborts_pass() {
    let stub = Stub::new("{ not json", &["||ads.example^"]);
    let base = spawn_stub(stub.clone()).await;
    let syncer = Syncer::from_config(&config_for(&base, &["*"])).unwrap();

    let err = syncer.run_once(&CancellationToken::new()).await.unwrap_err();

    assert!(err.to_string().starts_with("fetch catalogue"));
    assert!(matches!(err.root(), Error::Format { .. }));
    assert_eq!(stub.writes(), 0);
}

#[tokio::test]
async fn test_unknown_service_makes_no_calls() {
    let stub = Stub::new(CATALOGUE, &["||ads.example^"]);
    let base = spawn_stub(stub.clone()).await;
    let syncer = Syncer::from_config(&config_for(&base, &["uplay"])).unwrap();

    let report = syncer.run_once(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.files_selected, 0);
    assert_eq!(stub.writes(), 0);
}

#[tokio::test]
async fn test_timed_out_file_counts_as_failed() {
    let stub = Stub::new(SLOW_CATALOGUE, &[]);
    let base = spawn_stub(stub.clone()).await;
    let mut config = config_for(&base, &["mixed"]);
    config.sync.timeout = "500ms".parse().unwrap();
    let syncer = Syncer::from_config(&config).unwrap();

    let report = syncer.run_once(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.files_selected, 2);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.rewrites, 1);
    assert_eq!(
        stub.rules(),
        vec![
            START_MARKER.to_string(),
            rewrite("origin-a.akamaihd.net"),
            END_MARKER.to_string(),
        ]
    );
}
