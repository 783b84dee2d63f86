use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub db_url: Option<String>,
    pub app_name: String,
    pub deployment: String,
    pub bind_address: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub password_hash_cost: u32,
    pub public_frontend_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub lab_name: String,
    pub report_recipient: String,
    pub email: Option<EmailConfig>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Transactional email provider settings. Delivery is disabled when
/// `EMAIL_API_URL` is not set.
#[derive(Deserialize, Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
    pub access_token: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} must be set"))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load from .env file if available
        let db_url = match env::var("DB_URL") {
            Ok(url) => Some(url),
            Err(_) => Some(format!(
                "{}://{}:{}@{}:{}/{}",
                env::var("DB_PREFIX").unwrap_or_else(|_| "postgresql".to_string()),
                required("DB_USER")?,
                required("DB_PASSWORD")?,
                required("DB_HOST")?,
                env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string()),
                required("DB_NAME")?,
            )),
        };

        let email = match optional("EMAIL_API_URL") {
            Some(api_url) => Some(EmailConfig {
                api_url,
                service_id: required("EMAIL_SERVICE_ID")?,
                template_id: required("EMAIL_TEMPLATE_ID")?,
                public_key: required("EMAIL_PUBLIC_KEY")?,
                access_token: optional("EMAIL_ACCESS_TOKEN"),
            }),
            None => None,
        };

        let bootstrap_admin = match (
            optional("BOOTSTRAP_ADMIN_EMAIL"),
            optional("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        let cors_allowed_origins = optional("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            app_name: required("APP_NAME")?,
            deployment: required("DEPLOYMENT")
                .context("this can be local, dev, stage, or prod")?,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            token_ttl_hours: env::var("TOKEN_TTL_HOURS")
                .ok()
                .map(|hours| hours.parse())
                .transpose()
                .context("TOKEN_TTL_HOURS must be a whole number of hours")?
                .unwrap_or(12),
            password_hash_cost: env::var("PASSWORD_HASH_COST")
                .ok()
                .map(|cost| cost.parse())
                .transpose()
                .context("PASSWORD_HASH_COST must be an integer between 4 and 31")?
                .unwrap_or(bcrypt::DEFAULT_COST),
            public_frontend_url: required("PUBLIC_FRONTEND_URL")?,
            cors_allowed_origins,
            lab_name: env::var("LAB_NAME").unwrap_or_else(|_| "Laboratory Division".to_string()),
            report_recipient: env::var("REPORT_RECIPIENT").unwrap_or_default(),
            email,
            bootstrap_admin,
            db_url,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            app_name: "sample-tracker-api-test".to_string(),
            deployment: "test".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
            password_hash_cost: 4,
            public_frontend_url: "https://lab.example.test/".to_string(),
            cors_allowed_origins: vec![],
            lab_name: "Test Laboratory".to_string(),
            report_recipient: "reports@example.test".to_string(),
            email: None,
            bootstrap_admin: Some(BootstrapAdmin {
                email: "admin@example.test".to_string(),
                password: "admin-password".to_string(),
            }),
            db_url: None,
        }
    }
}
