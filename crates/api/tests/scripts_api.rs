//! Integration tests for the script endpoints.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, post_empty, post_json};
use serde_json::json;

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_scripts_returns_sorted_names() {
    let app = build_test_app(50);
    app.write_script("b.rhai", "done(2);");
    app.write_script("a.rhai", "done(1);");

    let json = body_json(get(app.router.clone(), "/api/v1/scripts").await).await;

    assert_eq!(json["data"], json!(["a.rhai", "b.rhai"]));
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_returns_done_payload() {
    let app = build_test_app(50);
    app.write_script("hello.rhai", r#"done(#{ greeting: "hi" });"#);

    let response = post_empty(app.router.clone(), "/api/v1/scripts/hello.rhai/run").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["done"], json!({"greeting": "hi"}));
    assert_eq!(json["data"]["status"]["state"], "completed");
}

#[tokio::test]
async fn run_unknown_script_returns_404() {
    let app = build_test_app(50);

    let response = post_empty(app.router.clone(), "/api/v1/scripts/ghost.rhai/run").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn run_with_external_context() {
    let app = build_test_app(50);
    app.write_script(
        "echo.rhai",
        r#"done(#{ url: request.url, body: request.body, env: env });"#,
    );

    let body = json!({
        "request": {
            "url": "https://intercepted/x",
            "requestOptions": {"headers": {}},
            "requestData": "a=1"
        },
        "env": "test"
    });
    let response = post_json(app.router.clone(), "/api/v1/scripts/echo.rhai/run", &body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(
        json["data"]["done"],
        json!({"url": "https://intercepted/x", "body": "a=1", "env": "test"})
    );
}

#[tokio::test]
async fn malformed_external_context_is_400() {
    let app = build_test_app(50);
    app.write_script("x.rhai", "done(1);");

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/scripts/x.rhai/run")
        .body(axum::body::Body::from("{nope"))
        .expect("request");
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn timed_out_run_still_returns_200_with_status() {
    let app = build_test_app(50);
    app.write_script("spin.rhai", "let n = 0; loop { n += 1; }");

    let response = post_empty(app.router.clone(), "/api/v1/scripts/spin.rhai/run").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["status"]["state"], "timed_out");
    assert_eq!(json["data"]["done"], "");
}

// ---------------------------------------------------------------------------
// Stats and feed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_reflect_runs_and_profiles() {
    let app = build_test_app(50);
    app.write_script("a.rhai", "done(1);");

    post_empty(app.router.clone(), "/api/v1/scripts/a.rhai/run").await;
    post_empty(app.router.clone(), "/api/v1/scripts/a.rhai/run").await;

    let json = body_json(get(app.router.clone(), "/api/v1/stats").await).await;
    assert_eq!(json["data"]["remaining"], 48);
    assert_eq!(json["data"]["counts"]["a.rhai"], 2);
    assert_eq!(json["data"]["profiles"]["http_client"], false);
}

#[tokio::test]
async fn digest_lands_in_feed() {
    let app = build_test_app(2);
    app.write_script("a.rhai", "done(1);");

    for _ in 0..2 {
        post_empty(app.router.clone(), "/api/v1/scripts/a.rhai/run").await;
    }

    // The feed collector runs on its own task.
    let mut items = serde_json::Value::Null;
    for _ in 0..50 {
        let json = body_json(get(app.router.clone(), "/api/v1/feed").await).await;
        if json["data"].as_array().is_some_and(|a| !a.is_empty()) {
            items = json["data"].clone();
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(items[0]["title"], "Ran scripts 2 times");
    assert!(items[0]["body"]
        .as_str()
        .expect("body")
        .ends_with("a.rhai: 2 times"));
    assert_eq!(app.state.feed.len(), 1);
}
