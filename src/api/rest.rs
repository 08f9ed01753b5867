//! REST API router and configuration.

use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::handlers::{
    create_activity_handler, delete_activity_handler, get_activity_handler,
    list_occurrences_handler, submit_all_handler, transition_handler, update_activity_handler,
    ApiState,
};
use crate::config::ApiConfig;

/// REST API configuration.
#[derive(Debug, Clone)]
pub struct RestApiConfig {
    /// Enable CORS.
    pub enable_cors: bool,
    /// API prefix (e.g., "/api/v1").
    pub prefix: String,
}

impl Default for RestApiConfig {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

impl From<&ApiConfig> for RestApiConfig {
    fn from(config: &ApiConfig) -> Self {
        Self {
            enable_cors: config.enable_cors,
            prefix: config.prefix.clone(),
        }
    }
}

/// Create the REST API router.
///
/// Endpoints:
/// - GET    /api/v1/occurrences?start=&end=         - List occurrences
/// - POST   /api/v1/activities                      - Create an activity or series
/// - GET    /api/v1/activities/:id                  - Get a record
/// - PATCH  /api/v1/activities/:id?scope=           - Edit an occurrence or series
/// - DELETE /api/v1/activities/:id?scope=           - Delete an occurrence or series
/// - POST   /api/v1/activities/:id/transitions      - Apply a lifecycle action
/// - POST   /api/v1/activities/submit-all           - Submit all drafts
pub fn create_rest_router(state: Arc<ApiState>, config: &RestApiConfig) -> Router {
    let api_routes = Router::new()
        .route("/occurrences", get(list_occurrences_handler))
        .route("/activities", post(create_activity_handler))
        .route("/activities/submit-all", post(submit_all_handler))
        .route(
            "/activities/:id",
            get(get_activity_handler)
                .patch(update_activity_handler)
                .delete(delete_activity_handler),
        )
        .route("/activities/:id/transitions", post(transition_handler))
        .with_state(state);

    let router = Router::new().nest(&config.prefix, api_routes);

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_origin(Any);

        router.layer(cors)
    } else {
        router
    }
}

/// Create the REST router plus the `/api` endpoint catalogue.
pub fn create_combined_router(state: Arc<ApiState>, config: &RestApiConfig) -> Router {
    let rest_router = create_rest_router(state, config);
    let prefix = config.prefix.clone();
    let info_route = Router::new().route(
        "/api",
        get(move || {
            let prefix = prefix.clone();
            async move { api_info_handler(&prefix) }
        }),
    );

    rest_router.merge(info_route)
}

/// API info handler.
fn api_info_handler(prefix: &str) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "Civic Agenda REST API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Recurring-activity scheduling for civic-services establishments",
        "endpoints": {
            "list_occurrences": {
                "method": "GET",
                "path": format!("{prefix}/occurrences"),
                "description": "Occurrences in a date range, sorted by date and start time",
                "params": {
                    "start": "First day, YYYY-MM-DD (required)",
                    "end": "Last day, inclusive (default: start + default range)",
                    "establishment_id": "Limit to one establishment",
                    "include_cancelled": "Keep cancelled occurrences (default: true)"
                }
            },
            "create_activity": {
                "method": "POST",
                "path": format!("{prefix}/activities"),
                "description": "Create a standalone activity or a recurring series"
            },
            "get_activity": {
                "method": "GET",
                "path": format!("{prefix}/activities/:id"),
                "description": "Get an activity record by id"
            },
            "update_activity": {
                "method": "PATCH",
                "path": format!("{prefix}/activities/:id"),
                "description": "Edit one occurrence or the whole series",
                "params": {
                    "scope": "occurrence (default) or series; a series id itself only accepts series"
                }
            },
            "delete_activity": {
                "method": "DELETE",
                "path": format!("{prefix}/activities/:id"),
                "description": "Delete one occurrence or the whole series",
                "params": {
                    "scope": "occurrence (default) or series; a series id itself only accepts series"
                }
            },
            "transition": {
                "method": "POST",
                "path": format!("{prefix}/activities/:id/transitions"),
                "description": "Apply a lifecycle action: submit, approve, start, complete, file_report, cancel"
            },
            "submit_all": {
                "method": "POST",
                "path": format!("{prefix}/activities/submit-all"),
                "description": "Submit every draft, optionally for one establishment"
            }
        }
    }))
}
