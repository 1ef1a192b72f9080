mod common;

use common::{order_payload, product_body, spawn_app, TestApp};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;

async fn product_quantity(app: &TestApp, cookie: &str, id: &Value) -> i64 {
    let body: Value = app
        .with_cookie(app.client.get(app.api(&format!("/admin/products/{id}"))), cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["data"]["quantity"].as_i64().unwrap()
}

async fn admin_patch(app: &TestApp, cookie: &str, path: &str) -> (u16, Value) {
    let response = app
        .with_cookie(app.client.patch(app.api(path)), cookie)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn order_for_whole_stock_totals_and_syncs() {
    let app = spawn_app().await;
    let cookie = app.admin_cookie().await;
    let product = app.create_product(&cookie, product_body("p-1", 1000, 5)).await;

    let response = app
        .place_order(json!([{ "product_id": product["id"], "quantity": 5 }]), 300)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Order created");
    let order = &body["data"];
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["delivery_mode"], "HOME");
    assert_eq!(order["items_subtotal"], 5000);
    assert_eq!(order["delivery_fee"], 300);
    assert_eq!(order["total_amount"], 5300);
    assert_eq!(order["items"][0]["product_slug"], "p-1");
    assert_eq!(order["items"][0]["line_total"], 5000);
    assert_eq!(order["sheets_status"], "SUCCESS");

    assert_eq!(product_quantity(&app, &cookie, &product["id"]).await, 0);
    let rows = app.sheets.rows.lock().unwrap().clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], order["id"].to_string());
}

#[tokio::test]
async fn duplicate_lines_are_merged() {
    let app = spawn_app().await;
    let cookie = app.admin_cookie().await;
    let product = app.create_product(&cookie, product_body("p-1", 100, 10)).await;

    let items = json!([
        { "product_id": product["id"], "quantity": 2 },
        { "product_id": product["id"], "quantity": 3 },
    ]);
    let body: Value = app.place_order(items, 0).await.json().await.unwrap();
    let lines = body["data"]["items"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["quantity"], 5);
    assert_eq!(product_quantity(&app, &cookie, &product["id"]).await, 5);
}

#[tokio::test]
async fn insufficient_stock_leaves_stock_untouched() {
    let app = spawn_app().await;
    let cookie = app.admin_cookie().await;
    let product = app.create_product(&cookie, product_body("p-1", 1000, 2)).await;

    let response = app
        .place_order(json!([{ "product_id": product["id"], "quantity": 3 }]), 0)
        .await;
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errors"]["code"], "insufficient_stock");
    assert_eq!(body["errors"]["items"][0]["requested"], 3);
    assert_eq!(body["errors"]["items"][0]["available"], 2);
    assert!(body["trace_id"].is_string());

    assert_eq!(product_quantity(&app, &cookie, &product["id"]).await, 2);
    assert!(app.sheets.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_products_are_unavailable() {
    let app = spawn_app().await;

    let response = app
        .place_order(json!([{ "product_id": 999, "quantity": 1 }]), 0)
        .await;
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errors"]["code"], "product_unavailable");
    assert_eq!(body["errors"]["missing_product_ids"], json!([999]));
}

#[tokio::test]
async fn empty_order_is_rejected() {
    let app = spawn_app().await;

    let response = app.place_order(json!([]), 0).await;
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errors"]["code"], "invalid_order_payload");
    assert!(body["errors"]["items"].is_string());
}

#[tokio::test]
async fn unknown_delivery_mode_is_rejected() {
    let app = spawn_app().await;
    let mut payload = order_payload(json!([{ "product_id": 1, "quantity": 1 }]), 0);
    payload["delivery_mode"] = json!("DRONE");

    let response = app
        .client
        .post(app.api("/orders"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errors"]["delivery_mode"], "DRONE");
}

#[tokio::test]
async fn sheets_failure_keeps_the_order_and_can_be_retried() {
    let app = spawn_app().await;
    let cookie = app.admin_cookie().await;
    let product = app.create_product(&cookie, product_body("p-1", 1000, 5)).await;

    app.sheets.fail.store(true, Ordering::SeqCst);
    let response = app
        .place_order(json!([{ "product_id": product["id"], "quantity": 1 }]), 0)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let order_id = body["data"]["id"].clone();
    assert_eq!(body["data"]["sheets_status"], "FAILED");
    assert!(body["data"]["sheets_error"].as_str().unwrap().contains("503"));
    assert!(body["data"]["sheets_synced_at"].is_null());

    app.sheets.fail.store(false, Ordering::SeqCst);
    let response = app
        .with_cookie(
            app.client
                .post(app.api(&format!("/admin/orders/{order_id}/sheets/retry"))),
            &cookie,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["sheets_status"], "SUCCESS");
    assert!(body["data"]["sheets_error"].is_null());
    assert!(body["data"]["sheets_synced_at"].is_string());
}

#[tokio::test]
async fn status_changes_follow_the_lifecycle() {
    let app = spawn_app().await;
    let cookie = app.admin_cookie().await;
    let a = app.create_product(&cookie, product_body("p-a", 100, 5)).await;
    let b = app.create_product(&cookie, product_body("p-b", 200, 5)).await;

    let items = json!([
        { "product_id": a["id"], "quantity": 2 },
        { "product_id": b["id"], "quantity": 1 },
    ]);
    let body: Value = app.place_order(items, 0).await.json().await.unwrap();
    let id = body["data"]["id"].clone();

    let (status, body) = admin_patch(&app, &cookie, &format!("/admin/orders/{id}/deliver")).await;
    assert_eq!(status, 409);
    assert_eq!(body["errors"]["code"], "invalid_status_transition");
    assert_eq!(body["errors"]["from"], "PENDING");
    assert_eq!(body["errors"]["to"], "DELIVERED");

    let (status, body) = admin_patch(&app, &cookie, &format!("/admin/orders/{id}/confirm")).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "CONFIRMED");

    let (status, body) = admin_patch(&app, &cookie, &format!("/admin/orders/{id}/cancel")).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Order canceled");
    assert_eq!(body["data"]["status"], "CANCELED");
    assert_eq!(product_quantity(&app, &cookie, &a["id"]).await, 5);
    assert_eq!(product_quantity(&app, &cookie, &b["id"]).await, 5);

    // Repeating the cancel changes nothing, including stock.
    let (status, _) = admin_patch(&app, &cookie, &format!("/admin/orders/{id}/cancel")).await;
    assert_eq!(status, 200);
    assert_eq!(product_quantity(&app, &cookie, &a["id"]).await, 5);

    let (status, _) = admin_patch(&app, &cookie, &format!("/admin/orders/{id}/confirm")).await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let app = spawn_app().await;
    let cookie = app.admin_cookie().await;

    let (status, body) = admin_patch(&app, &cookie, "/admin/orders/42/confirm").await;
    assert_eq!(status, 404);
    assert_eq!(body["errors"]["order_id"], 42);
}

#[tokio::test]
async fn last_unit_goes_to_exactly_one_buyer() {
    let app = spawn_app().await;
    let cookie = app.admin_cookie().await;
    let product = app.create_product(&cookie, product_body("p-1", 1000, 1)).await;

    let items = json!([{ "product_id": product["id"], "quantity": 1 }]);
    let (first, second) = tokio::join!(
        app.place_order(items.clone(), 0),
        app.place_order(items.clone(), 0)
    );

    let mut statuses = [first.status().as_u16(), second.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, [200, 409]);
    assert_eq!(product_quantity(&app, &cookie, &product["id"]).await, 0);
}

#[tokio::test]
async fn admin_order_listing_filters_by_status_and_phone() {
    let app = spawn_app().await;
    let cookie = app.admin_cookie().await;
    let product = app.create_product(&cookie, product_body("p-1", 100, 10)).await;
    let items = json!([{ "product_id": product["id"], "quantity": 1 }]);

    let first: Value = app.place_order(items.clone(), 0).await.json().await.unwrap();
    app.place_order(items.clone(), 0).await;
    let mut other = order_payload(items, 0);
    other["phone_number"] = json!("0660999888");
    app.client.post(app.api("/orders")).json(&other).send().await.unwrap();

    let id = first["data"]["id"].clone();
    admin_patch(&app, &cookie, &format!("/admin/orders/{id}/confirm")).await;

    let list = |query: &'static str| {
        let request = app.with_cookie(
            app.client.get(app.api(&format!("/admin/orders?{query}"))),
            &cookie,
        );
        async move {
            let body: Value = request.send().await.unwrap().json().await.unwrap();
            body["data"].clone()
        }
    };

    let all = list("").await;
    assert_eq!(all["total"], 3);
    assert_eq!(all["page_size"], 20);

    let confirmed = list("status=confirmed").await;
    assert_eq!(confirmed["total"], 1);
    assert_eq!(confirmed["items"][0]["id"], id);

    assert_eq!(list("phone_number=0660").await["total"], 1);
    assert_eq!(list("status=PENDING&phone_number=0550").await["total"], 1);
}

#[tokio::test]
async fn admin_order_routes_require_the_cookie() {
    let app = spawn_app().await;

    let response = app.client.get(app.api("/admin/orders")).send().await.unwrap();
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errors"]["code"], "auth_required");
}

#[tokio::test]
async fn admin_order_listing_is_newest_first() {
    let app = spawn_app().await;
    let cookie = app.admin_cookie().await;
    let product = app.create_product(&cookie, product_body("p-1", 100, 10)).await;
    let items = json!([{ "product_id": product["id"], "quantity": 1 }]);

    let mut placed = Vec::new();
    for _ in 0..3 {
        let body: Value = app.place_order(items.clone(), 0).await.json().await.unwrap();
        placed.push(body["data"]["id"].clone());
    }

    let list = |query: &'static str| {
        let request = app.with_cookie(
            app.client.get(app.api(&format!("/admin/orders?{query}"))),
            &cookie,
        );
        async move {
            let body: Value = request.send().await.unwrap().json().await.unwrap();
            body["data"]["items"]
                .as_array()
                .unwrap()
                .iter()
                .map(|order| order["id"].clone())
                .collect::<Vec<_>>()
        }
    };

    assert_eq!(
        list("").await,
        [placed[2].clone(), placed[1].clone(), placed[0].clone()]
    );
    assert_eq!(list("page=2&page_size=1").await, [placed[1].clone()]);
    assert!(list("page=9223372036854775807").await.is_empty());
}
