use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::SheetsSettings;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("Invalid service account credentials: {0}")]
    Credentials(String),
    #[error("Failed to sign token request: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("Sheets request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sheets API responded with {status}: {body}")]
    Api { status: u16, body: String },
}

/// Appends rows to a spreadsheet. One call, no retries.
#[async_trait]
pub trait SheetsClient: Send + Sync {
    async fn append_row(&self, values: Vec<String>) -> Result<(), SheetsError>;
}

#[derive(Deserialize)]
struct ServiceAccount {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct GoogleSheetsClient {
    settings: SheetsSettings,
    http: reqwest::Client,
}

impl GoogleSheetsClient {
    pub fn new(settings: SheetsSettings) -> GoogleSheetsClient {
        GoogleSheetsClient {
            settings,
            http: reqwest::Client::new(),
        }
    }

    async fn access_token(&self, account: &ServiceAccount) -> Result<String, SheetsError> {
        let token_uri = account.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &account.client_email,
            scope: SHEETS_SCOPE,
            aud: token_uri,
            iat,
            exp: iat + 3600,
        };
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)?;

        let response = self
            .http
            .post(token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<TokenResponse>().await?.access_token)
    }
}

#[async_trait]
impl SheetsClient for GoogleSheetsClient {
    async fn append_row(&self, values: Vec<String>) -> Result<(), SheetsError> {
        // Decoded per call so a broken credential surfaces as a sync failure,
        // not a startup crash.
        let account = decode_service_account(&self.settings.service_account_json_b64)?;
        let token = self.access_token(&account).await?;
        let url = append_url(&self.settings.spreadsheet_id, &self.settings.sheet_name)?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [values] }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SheetsError::Api {
        status: status.as_u16(),
        body,
    })
}

fn decode_service_account(encoded: &str) -> Result<ServiceAccount, SheetsError> {
    let raw = STANDARD
        .decode(encoded.trim())
        .map_err(|e| SheetsError::Credentials(format!("base64: {e}")))?;
    serde_json::from_slice(&raw).map_err(|e| SheetsError::Credentials(format!("json: {e}")))
}

/// `values/'<sheet>'!A1:append` under the spreadsheet, path-encoded.
fn append_url(spreadsheet_id: &str, sheet_name: &str) -> Result<Url, SheetsError> {
    let mut url = Url::parse(SHEETS_API_BASE)
        .map_err(|e| SheetsError::Credentials(format!("invalid api base: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| SheetsError::Credentials("invalid api base".to_string()))?
        .push(spreadsheet_id)
        .push("values")
        .push(&format!("'{sheet_name}'!A1:append"));
    Ok(url)
}
