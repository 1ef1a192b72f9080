use std::env;
use std::net::SocketAddr;

use thiserror::Error;

/// One year.
pub const MAX_TOKEN_MINUTES: i64 = 365 * 24 * 60;

/// Process configuration, read once at startup and handed to every component
/// that needs it.
#[derive(Clone, Debug)]
pub struct Settings {
    pub env: String,
    pub app_name: String,
    pub version: String,
    pub log_level: String,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub admin: AdminSettings,
    pub sheets: SheetsSettings,
    pub cloudinary: CloudinarySettings,
}

#[derive(Clone, Debug)]
pub struct AdminSettings {
    pub email: String,
    pub password: String,
    pub jwt_secret_key: String,
    pub token_expires_minutes: i64,
}

#[derive(Clone, Debug)]
pub struct SheetsSettings {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    /// Service-account JSON, base64 encoded.
    pub service_account_json_b64: String,
}

#[derive(Clone, Debug)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub products_folder: String,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl Settings {
    /// Loads `.env` (if present) and then reads the process environment.
    pub fn from_env() -> Result<Settings, ConfigError> {
        dotenvy::dotenv().ok();
        Settings::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Secrets have no defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &'static str, default: &str| -> String {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let bind_addr = optional("BIND_ADDR", "0.0.0.0:3000");
        let bind_addr = bind_addr.parse().map_err(|_| ConfigError::Invalid {
            var: "BIND_ADDR",
            reason: format!("'{bind_addr}' is not a socket address"),
        })?;

        let expires = optional("JWT_ACCESS_TOKEN_EXPIRES_MINUTES", "60");
        let token_expires_minutes = match expires.trim().parse::<i64>() {
            Ok(minutes) if (1..=MAX_TOKEN_MINUTES).contains(&minutes) => minutes,
            _ => {
                return Err(ConfigError::Invalid {
                    var: "JWT_ACCESS_TOKEN_EXPIRES_MINUTES",
                    reason: format!("'{expires}' is not between 1 and {MAX_TOKEN_MINUTES} minutes"),
                })
            }
        };

        Ok(Settings {
            env: optional("ENV", "development"),
            app_name: optional("APP_NAME", "E-commerce Platform"),
            version: optional("VERSION", "1.0.0"),
            log_level: optional("LOG_LEVEL", "info"),
            bind_addr,
            database_url: required("DATABASE_URL")?,
            admin: AdminSettings {
                email: required("ADMIN_EMAIL")?,
                password: required("ADMIN_PASSWORD")?,
                jwt_secret_key: required("JWT_SECRET_KEY")?,
                token_expires_minutes,
            },
            sheets: SheetsSettings {
                spreadsheet_id: required("GOOGLE_SHEETS_SPREADSHEET_ID")?,
                sheet_name: required("GOOGLE_SHEETS_SHEET_NAME")?,
                service_account_json_b64: required("GOOGLE_SERVICE_ACCOUNT_JSON_B64")?,
            },
            cloudinary: CloudinarySettings {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
                products_folder: optional("CLOUDINARY_PRODUCTS_FOLDER", "purity/products"),
            },
        })
    }

    pub fn is_development(&self) -> bool {
        self.env.eq_ignore_ascii_case("development")
    }
}
