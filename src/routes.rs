use crate::common::state::AppState;
use crate::config::Config;
use crate::external::email::{DisabledNotifier, HttpEmailNotifier, ReportNotifier};
use crate::{chemicals, customer_samples, references, samples, users};
use axum::http::HeaderValue;
use axum::{Router, extract::DefaultBodyLimit};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    security(
        ("bearerAuth" = [])
    ),
    info(title = "Sample Tracker API", description = "Laboratory sample lifecycle, reports and intake records")
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

fn build_notifier(config: &Config) -> anyhow::Result<Arc<dyn ReportNotifier>> {
    match &config.email {
        Some(email) => Ok(Arc::new(HttpEmailNotifier::new(email.clone())?)),
        None => {
            tracing::warn!("EMAIL_API_URL is not set; finalized reports will stay pending");
            Ok(Arc::new(DisabledNotifier))
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn build_router(db: &DatabaseConnection, config: &Config) -> anyhow::Result<Router> {
    let notifier = build_notifier(config)?;
    let state = AppState::new(db.clone(), config.clone(), notifier);
    Ok(router_from_state(state))
}

pub fn router_from_state(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    // Build the router with OpenAPI documentation
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(crate::common::views::router(&state)) // Root routes
        .nest("/api/users", users::views::router(&state))
        .nest("/api/samples", samples::views::router(&state))
        .nest("/api/chemicals", chemicals::views::router(&state))
        .nest("/api/reference", references::views::router(&state))
        .nest("/api/cusSamples", customer_samples::views::router(&state))
        .split_for_parts();

    router
        .merge(Scalar::with_url("/api/docs", api))
        .layer(DefaultBodyLimit::max(30 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
