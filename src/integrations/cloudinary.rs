use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::config::CloudinarySettings;

#[derive(Error, Debug)]
pub enum ImageHostError {
    #[error("Cloudinary request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Cloudinary responded with {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Cloudinary did not return a secure_url")]
    MissingUrl,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageVariant {
    /// 300x300, filled around the detected subject.
    Thumbnail,
    /// At most 1920x1080, never upscaled.
    Full,
}

impl ImageVariant {
    pub fn transformation(self) -> &'static str {
        match self {
            ImageVariant::Thumbnail => "c_fill,f_webp,g_auto,h_300,q_auto,w_300",
            ImageVariant::Full => "c_limit,f_webp,h_1080,q_auto,w_1920",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub public_id: String,
    pub variant: ImageVariant,
}

/// Stores an image and hands back its public delivery URL.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, image: ImageUpload) -> Result<String, ImageHostError>;
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

pub struct CloudinaryClient {
    settings: CloudinarySettings,
    http: reqwest::Client,
}

impl CloudinaryClient {
    pub fn new(settings: CloudinarySettings) -> CloudinaryClient {
        CloudinaryClient {
            settings,
            http: reqwest::Client::new(),
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.settings.cloud_name
        )
    }
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn upload(&self, image: ImageUpload) -> Result<String, ImageHostError> {
        let timestamp = Utc::now().timestamp().to_string();
        let mut params = vec![
            ("folder", self.settings.products_folder.clone()),
            ("overwrite", "true".to_string()),
            ("public_id", image.public_id.clone()),
            ("timestamp", timestamp),
            ("transformation", image.variant.transformation().to_string()),
        ];
        let signature = sign(&params, &self.settings.api_secret);
        params.push(("api_key", self.settings.api_key.clone()));
        params.push(("signature", signature));

        let file = Part::bytes(image.bytes)
            .file_name(image.public_id)
            .mime_str(&image.content_type)?;
        let form = params
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key, value))
            .part("file", file);

        let response = self.http.post(self.upload_url()).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageHostError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<UploadResponse>()
            .await?
            .secure_url
            .filter(|url| !url.is_empty())
            .ok_or(ImageHostError::MissingUrl)
    }
}

/// Upload signature: params sorted by key, joined as `k=v&k=v`, secret
/// appended, SHA-1 hex digest.
fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
