#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use scripthost_api::config::ServerConfig;
use scripthost_api::router::build_app_router;
use scripthost_api::state::AppState;
use scripthost_engine::{HostConfig, ReqwestTransport};
use tempfile::TempDir;
use tower::ServiceExt;

/// A test application rooted in its own temporary directory.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    pub fn script_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("scripts")
    }

    pub fn write_script(&self, name: &str, source: &str) {
        std::fs::write(self.script_dir().join(name), source).expect("write script");
    }
}

/// Build a `ServerConfig` with safe defaults rooted at `root`.
pub fn test_config(root: &Path, digest_threshold: u32) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        host_config: HostConfig {
            script_dir: root.join("scripts"),
            store_dir: root.join("store"),
            exec_timeout: Duration::from_millis(500),
            http_timeout: Duration::from_millis(500),
            digest_threshold,
            preset_profiles: Vec::new(),
        },
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(digest_threshold: u32) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(dir.path().join("scripts")).expect("mkdir scripts");
    let config = test_config(dir.path(), digest_threshold);
    let transport = Arc::new(ReqwestTransport::new().expect("transport"));
    let (state, _feed) = AppState::build(config, transport);
    TestApp {
        router: build_app_router(state.clone()),
        state,
        dir,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    app.oneshot(request).await.expect("response")
}

pub async fn post_json(app: Router, uri: &str, json: &serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .expect("request");
    app.oneshot(request).await.expect("response")
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    app.oneshot(request).await.expect("response")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
