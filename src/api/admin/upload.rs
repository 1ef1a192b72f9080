use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Extension, Multipart},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::api::AppState;
use crate::error::AppError;
use crate::integrations::cloudinary::{ImageUpload, ImageVariant};
use crate::response::ok;

pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;
pub const MAX_IMAGES_PER_REQUEST: usize = 10;

const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

//ROUTERS
pub fn upload_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/uploads/thumbnail", post(upload_thumbnail))
        .route("/admin/uploads/images", post(upload_images))
        .layer(DefaultBodyLimit::max(
            MAX_IMAGES_PER_REQUEST * MAX_IMAGE_BYTES + 64 * 1024,
        ))
        .layer(Extension(state))
}

//ROUTES
async fn upload_thumbnail(
    Extension(state): Extension<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut files = read_files(multipart, "file").await?;
    if files.len() != 1 {
        return Err(AppError::RequestValidation(json!({
            "file": "exactly one file is required",
        })));
    }
    let file = files.remove(0);
    validate_image(&file)?;

    let url = state
        .images
        .upload(file.into_upload(ImageVariant::Thumbnail))
        .await?;
    tracing::info!(url = %url, "Uploaded thumbnail");
    Ok(ok(json!({ "url": url }), "Thumbnail uploaded"))
}

async fn upload_images(
    Extension(state): Extension<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let files = read_files(multipart, "files").await?;
    if files.is_empty() || files.len() > MAX_IMAGES_PER_REQUEST {
        return Err(AppError::RequestValidation(json!({
            "files": format!("between 1 and {MAX_IMAGES_PER_REQUEST} files are required"),
        })));
    }
    // Nothing is uploaded unless every file is acceptable.
    for file in &files {
        validate_image(file)?;
    }

    let mut urls = Vec::with_capacity(files.len());
    for file in files {
        urls.push(
            state
                .images
                .upload(file.into_upload(ImageVariant::Full))
                .await?,
        );
    }
    tracing::info!(count = urls.len(), "Uploaded product images");
    Ok(ok(json!({ "urls": urls }), "Images uploaded"))
}

//Structs
#[derive(Debug)]
struct UploadedFile {
    content_type: String,
    bytes: Vec<u8>,
}

impl UploadedFile {
    fn into_upload(self, variant: ImageVariant) -> ImageUpload {
        ImageUpload {
            bytes: self.bytes,
            content_type: self.content_type,
            public_id: Uuid::new_v4().to_string(),
            variant,
        }
    }
}

/// Collects every part named `field_name`. Other parts are skipped.
async fn read_files(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<Vec<UploadedFile>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(field_name) {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|value| value.to_ascii_lowercase())
            .unwrap_or_default();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        files.push(UploadedFile {
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Ok(files)
}

fn validate_image(file: &UploadedFile) -> Result<(), AppError> {
    if !ALLOWED_CONTENT_TYPES.contains(&file.content_type.as_str()) {
        return Err(AppError::ImageValidation {
            message: "Unsupported image type",
            details: json!({
                "content_type": file.content_type,
                "allowed": ALLOWED_CONTENT_TYPES,
            }),
        });
    }
    if file.bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::ImageValidation {
            message: "Image too large",
            details: json!({
                "max_bytes": MAX_IMAGE_BYTES,
                "size_bytes": file.bytes.len(),
            }),
        });
    }
    Ok(())
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::RequestValidation(json!({ "multipart": err.body_text() }))
}
