mod common;

use common::spawn_app;
use serde_json::Value;

#[tokio::test]
async fn health_reports_the_service() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["app"], "Storefront Test");
    assert_eq!(body["data"]["version"], "9.9.9");
    assert_eq!(body["data"]["environment"], "development");
}

#[tokio::test]
async fn database_probe_pings() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/health/db")).send().await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn unknown_route_gets_the_error_envelope() {
    let app = spawn_app().await;

    let response = app.client.get(app.api("/nowhere")).send().await.unwrap();
    assert_eq!(response.status(), 404);
    let request_id = response
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"]["code"], "not_found");
    assert_eq!(body["trace_id"], request_id);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.api("/orders"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errors"]["code"], "validation_error");
    assert!(body["trace_id"].is_string());
}
