use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use std::fmt;

/// Error type shared by every handler and service in the API
#[derive(Debug, Clone)]
pub enum BusinessError {
    /// Validation errors for user input (400 Bad Request)
    ValidationError { field: String, message: String },
    /// Missing or invalid credentials (401 Unauthorized)
    Unauthorized { message: String },
    /// Permission denied (403 Forbidden)
    Forbidden { action: String, resource: String },
    /// Resource not found (404 Not Found)
    NotFound { resource: String, id: String },
    /// Duplicate resource (409 Conflict)
    Duplicate { resource: String, field: String },
    /// Business rule violations (422 Unprocessable Entity)
    BusinessRuleViolation { rule: String, message: String },
    /// External service errors (502 Bad Gateway)
    ExternalServiceError { service: String, message: String },
    /// Generic application error (500 Internal Server Error)
    InternalError { message: String },
}

impl BusinessError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn rule(rule: &str, message: impl Into<String>) -> Self {
        Self::BusinessRuleViolation {
            rule: rule.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            BusinessError::ValidationError { .. } => "VALIDATION_ERROR",
            BusinessError::Unauthorized { .. } => "UNAUTHORIZED",
            BusinessError::Forbidden { .. } => "FORBIDDEN",
            BusinessError::NotFound { .. } => "RESOURCE_NOT_FOUND",
            BusinessError::Duplicate { .. } => "DUPLICATE_RESOURCE",
            BusinessError::BusinessRuleViolation { .. } => "BUSINESS_RULE_VIOLATION",
            BusinessError::ExternalServiceError { .. } => "EXTERNAL_SERVICE_ERROR",
            BusinessError::InternalError { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BusinessError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            BusinessError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            BusinessError::Forbidden { .. } => StatusCode::FORBIDDEN,
            BusinessError::NotFound { .. } => StatusCode::NOT_FOUND,
            BusinessError::Duplicate { .. } => StatusCode::CONFLICT,
            BusinessError::BusinessRuleViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BusinessError::ExternalServiceError { .. } => StatusCode::BAD_GATEWAY,
            BusinessError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessError::ValidationError { field, message } => {
                write!(f, "Validation failed for field '{field}': {message}")
            }
            BusinessError::Unauthorized { message } => f.write_str(message),
            BusinessError::Forbidden { action, resource } => {
                write!(f, "Not authorized to {action} {resource}")
            }
            BusinessError::NotFound { resource, id } => {
                write!(f, "{resource} with id '{id}' not found")
            }
            BusinessError::Duplicate { resource, field } => {
                write!(f, "{resource} with this {field} already exists")
            }
            BusinessError::BusinessRuleViolation { rule, message } => {
                write!(f, "Business rule '{rule}' violated: {message}")
            }
            BusinessError::ExternalServiceError { service, message } => {
                write!(f, "External service '{service}' error: {message}")
            }
            BusinessError::InternalError { message } => {
                write!(f, "Internal error: {message}")
            }
        }
    }
}

impl std::error::Error for BusinessError {}

/// Convert `BusinessError` to HTTP responses
impl IntoResponse for BusinessError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(error = %message, "Request failed");
        }

        let body = Json(json!({
            "message": message,
            "error": {
                "code": self.code(),
                "message": message,
                "type": format!("{self:?}").split([' ', '{']).next().unwrap_or("Unknown")
            }
        }));

        (status, body).into_response()
    }
}

/// Maps database errors onto the business error taxonomy
pub struct ErrorMapper;

impl ErrorMapper {
    pub fn map_db_error(err: DbErr, context: &str) -> BusinessError {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return BusinessError::Duplicate {
                resource: Self::extract_resource_from_context(context),
                field: Self::extract_field_from_constraint(&detail),
            };
        }

        match err {
            DbErr::RecordNotFound(msg) => BusinessError::NotFound {
                resource: Self::extract_resource_from_context(context),
                id: Self::extract_id_from_message(&msg),
            },
            DbErr::Conn(conn_err) => BusinessError::ExternalServiceError {
                service: "database".to_string(),
                message: conn_err.to_string(),
            },
            _ => BusinessError::InternalError {
                message: err.to_string(),
            },
        }
    }

    fn extract_resource_from_context(context: &str) -> String {
        context.replace('_', " ")
    }

    fn extract_id_from_message(msg: &str) -> String {
        for quote in ['\'', '"'] {
            let pattern = format!(" id {quote}");
            if let Some(start_pos) = msg.find(&pattern) {
                let after_id = &msg[start_pos + pattern.len()..];
                if let Some(end_pos) = after_id.find(quote) {
                    return after_id[..end_pos].to_string();
                }
            }
        }
        "unknown".to_string()
    }

    fn extract_field_from_constraint(msg: &str) -> String {
        // Postgres names the constraint, SQLite names table.column
        ["reference_number", "email", "sample_id", "sequence_number"]
            .into_iter()
            .find(|field| msg.contains(field))
            .unwrap_or("field")
            .to_string()
    }
}

impl From<DbErr> for BusinessError {
    fn from(err: DbErr) -> Self {
        ErrorMapper::map_db_error(err, "record")
    }
}

/// Extension trait to add business error conversion to `DbErr`
pub trait DbErrorExt {
    fn to_business_error(self, context: &str) -> BusinessError;
}

impl DbErrorExt for DbErr {
    fn to_business_error(self, context: &str) -> BusinessError {
        ErrorMapper::map_db_error(self, context)
    }
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;
