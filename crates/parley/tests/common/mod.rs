//! Test utilities and common setup.

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, header};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

use parley::api;
use parley::db::Database;
use parley::history::{HistoryStore, SqliteHistoryStore};
use parley::provider::{CompletionOutcome, CompletionProvider, ProviderConfig, ProviderResult};
use parley::relay::RelayService;

/// Provider stub that echoes the prompt back.
#[derive(Default)]
pub struct EchoProvider {
    calls: AtomicUsize,
}

impl EchoProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for EchoProvider {
    async fn complete(&self, _api_key: &str, prompt: &str) -> ProviderResult<CompletionOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CompletionOutcome::Success(format!("You said: {prompt}")))
    }
}

pub struct TestApp {
    pub router: Router,
    pub database: Database,
    pub provider: Arc<EchoProvider>,
}

/// Create a test application backed by an in-memory database.
pub async fn test_app() -> TestApp {
    build(ProviderConfig::resolve(Some("gsk_test"))).await
}

/// Same as [`test_app`] but without a provider key.
pub async fn test_app_unconfigured() -> TestApp {
    build(ProviderConfig::Unconfigured).await
}

async fn build(config: ProviderConfig) -> TestApp {
    let database = Database::in_memory().await.unwrap();
    let store: Arc<dyn HistoryStore> = Arc::new(SqliteHistoryStore::new(database.clone()));
    let provider = Arc::new(EchoProvider::default());

    let relay = Arc::new(RelayService::new(
        Arc::clone(&store),
        provider.clone(),
        config,
    ));
    let state = api::AppState::new(relay, store);

    TestApp {
        router: api::create_router(state),
        database,
        provider,
    }
}

/// Send a request through a clone of `router`.
pub async fn send(router: &Router, method: Method, uri: &str, body: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri).method(method);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
