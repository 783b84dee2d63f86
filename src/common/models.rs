use crate::config::Config;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Settings a browser client needs; the single source of the public base URL
#[derive(ToSchema, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UIConfiguration {
    pub app_name: String,
    pub deployment: String,
    pub public_frontend_url: String,
    pub lab_name: String,
}

impl UIConfiguration {
    pub fn from_config(config: &Config) -> Self {
        Self {
            app_name: config.app_name.clone(),
            deployment: config.deployment.clone(),
            public_frontend_url: config.public_frontend_url.clone(),
            lab_name: config.lab_name.clone(),
        }
    }
}

#[derive(ToSchema, Deserialize, Serialize)]
pub struct HealthCheck {
    pub status: String,
}

/// Generic `{ "message": ... }` acknowledgement
#[derive(ToSchema, Deserialize, Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

/// Accepts a JSON string, number or null and keeps it as text. Result
/// values are transmitted as strings but some clients send numbers.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string or a number, got {other}"
        ))),
    }
}

/// Accepts either a string or a list of strings; lists are joined with ", "
pub fn text_or_list<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Array(items)) => {
            let parts = items
                .into_iter()
                .map(|item| match item {
                    Value::String(text) => Ok(text),
                    other => Err(de::Error::custom(format!(
                        "expected a list of strings, found {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, D::Error>>()?;
            Ok(Some(parts.join(", ")))
        }
        Some(other) => Err(de::Error::custom(format!(
            "expected a string or a list of strings, got {other}"
        ))),
    }
}

/// Trims a text field and maps blank values to `None`
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// `Content-Disposition` value for a download. The quoted name keeps only
/// printable ASCII other than `"` and `\`; the full name travels
/// percent-encoded in `filename*`.
pub fn attachment_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}
