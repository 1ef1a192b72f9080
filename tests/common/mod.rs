#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use storefront::api::{create_api_router, AppState};
use storefront::config::Settings;
use storefront::entities::setup_schema;
use storefront::integrations::cloudinary::{ImageHost, ImageHostError, ImageUpload};
use storefront::integrations::google_sheets::{SheetsClient, SheetsError};

pub const ADMIN_EMAIL: &str = "admin@shop.dz";
pub const ADMIN_PASSWORD: &str = "hunter2";
pub const JWT_SECRET: &str = "integration-secret";

/// Records appended rows; flips to failing on demand.
#[derive(Default)]
pub struct RecordingSheets {
    pub rows: Mutex<Vec<Vec<String>>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl SheetsClient for RecordingSheets {
    async fn append_row(&self, row: Vec<String>) -> Result<(), SheetsError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SheetsError::Api {
                status: 503,
                body: "sheets down".to_string(),
            });
        }
        self.rows.lock().unwrap().push(row);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingImages {
    pub uploads: Mutex<Vec<ImageUpload>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl ImageHost for RecordingImages {
    async fn upload(&self, image: ImageUpload) -> Result<String, ImageHostError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ImageHostError::MissingUrl);
        }
        let url = format!("https://img.test/{}.webp", image.public_id);
        self.uploads.lock().unwrap().push(image);
        Ok(url)
    }
}

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub db: Arc<DatabaseConnection>,
    pub sheets: Arc<RecordingSheets>,
    pub images: Arc<RecordingImages>,
}

pub fn test_settings() -> Settings {
    let vars = HashMap::from([
        ("ENV", "development"),
        ("APP_NAME", "Storefront Test"),
        ("VERSION", "9.9.9"),
        ("DATABASE_URL", "sqlite::memory:"),
        ("ADMIN_EMAIL", ADMIN_EMAIL),
        ("ADMIN_PASSWORD", ADMIN_PASSWORD),
        ("JWT_SECRET_KEY", JWT_SECRET),
        ("GOOGLE_SHEETS_SPREADSHEET_ID", "sheet-id"),
        ("GOOGLE_SHEETS_SHEET_NAME", "Orders"),
        ("GOOGLE_SERVICE_ACCOUNT_JSON_B64", "e30="),
        ("CLOUDINARY_CLOUD_NAME", "cloud"),
        ("CLOUDINARY_API_KEY", "key"),
        ("CLOUDINARY_API_SECRET", "shh"),
    ]);
    Settings::from_lookup(|key| vars.get(key).map(|value| value.to_string()))
        .expect("Failed to build test settings")
}

/// Serves the full router on an ephemeral port backed by a fresh in-memory
/// database.
pub async fn spawn_app() -> TestApp {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    setup_schema(&db).await.expect("Failed to create schema");
    let db = Arc::new(db);

    let sheets = Arc::new(RecordingSheets::default());
    let images = Arc::new(RecordingImages::default());
    let state = AppState {
        db: db.clone(),
        settings: Arc::new(test_settings()),
        sheets: sheets.clone(),
        images: images.clone(),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, create_api_router(state))
            .await
            .expect("Test server failed");
    });

    TestApp {
        address,
        client: Client::new(),
        db,
        sheets,
        images,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.address, path)
    }

    /// Logs in as the configured admin and returns the `Cookie` header value.
    pub async fn admin_cookie(&self) -> String {
        let response = self
            .client
            .post(self.api("/admin/login"))
            .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
            .send()
            .await
            .expect("Failed to send login request");
        assert_eq!(response.status(), 200);
        session_cookie(&response).expect("Login did not set a cookie")
    }

    pub fn with_cookie(&self, request: RequestBuilder, cookie: &str) -> RequestBuilder {
        request.header(header::COOKIE, cookie)
    }

    /// Creates a product through the admin API and returns its `data`.
    pub async fn create_product(&self, cookie: &str, body: Value) -> Value {
        let response = self
            .with_cookie(self.client.post(self.api("/admin/products")), cookie)
            .json(&body)
            .send()
            .await
            .expect("Failed to send create product request");
        let status = response.status();
        let body: Value = response.json().await.expect("Invalid JSON body");
        assert_eq!(status, 200, "unexpected body: {body}");
        body["data"].clone()
    }

    pub async fn place_order(&self, items: Value, delivery_fee: i64) -> Response {
        self.client
            .post(self.api("/orders"))
            .json(&order_payload(items, delivery_fee))
            .send()
            .await
            .expect("Failed to send order request")
    }
}

/// `name=value` of the first Set-Cookie header.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(|pair| pair.trim().to_string())
}

pub fn product_body(slug: &str, price: i64, quantity: i32) -> Value {
    json!({
        "slug": slug,
        "name": format!("Product {slug}"),
        "description": "Cold pressed",
        "price": price,
        "category": "oils",
        "quantity": quantity,
        "thumbnail_url": format!("https://img.test/{slug}-thumb.webp"),
        "images": [format!("https://img.test/{slug}-1.webp")],
    })
}

pub fn order_payload(items: Value, delivery_fee: i64) -> Value {
    json!({
        "first_name": "Amina",
        "last_name": "Benali",
        "phone_number": "0550123456",
        "wilaya": "Alger",
        "baladiya": "Bab Ezzouar",
        "delivery_mode": "HOME",
        "address_line": "Cite 5 juillet, bt 12",
        "delivery_fee": delivery_fee,
        "items": items,
    })
}
