//! REST API request handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::activity::{ActivityUpdate, LifecycleAction, NewActivity, Scope};
use crate::directory::{Establishment, EstablishmentDirectory, StaticDirectory};
use crate::error::AgendaError;
use crate::scheduling::{Occurrence, OccurrenceQuery, SchedulingService};

/// Application state shared across handlers.
pub struct ApiState {
    /// Scheduling facade.
    pub service: Arc<SchedulingService>,
    /// Establishment lookup used to decorate occurrences.
    pub directory: Arc<dyn EstablishmentDirectory>,
}

impl ApiState {
    /// Create new API state with an empty directory.
    pub fn new(service: Arc<SchedulingService>) -> Self {
        Self {
            service,
            directory: Arc::new(StaticDirectory::default()),
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn EstablishmentDirectory>) -> Self {
        self.directory = directory;
        self
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Occurrence listing parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct OccurrencesParams {
    pub start: NaiveDate,
    /// Defaults to `start` plus the configured default range.
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub establishment_id: Option<String>,
    #[serde(default = "default_include_cancelled")]
    pub include_cancelled: bool,
}

fn default_include_cancelled() -> bool {
    true
}

/// An occurrence with its establishment summary.
#[derive(Debug, Clone, Serialize)]
pub struct OccurrenceView {
    #[serde(flatten)]
    pub occurrence: Occurrence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub establishment: Option<Establishment>,
}

/// Occurrences list response.
#[derive(Debug, Clone, Serialize)]
pub struct OccurrencesResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub occurrences: Vec<OccurrenceView>,
    pub total: usize,
}

/// Scope query parameter for writes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScopeParams {
    #[serde(default)]
    pub scope: Option<String>,
}

/// Lifecycle transition request.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionRequest {
    pub action: String,
}

/// Bulk submit request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitAllRequest {
    #[serde(default)]
    pub establishment_id: Option<String>,
}

/// Error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// HTTP status for an error kind.
pub fn status_for(err: &AgendaError) -> StatusCode {
    match err {
        AgendaError::Validation(_) => StatusCode::BAD_REQUEST,
        AgendaError::StateTransition(_) | AgendaError::Conflict(_) => StatusCode::CONFLICT,
        AgendaError::NotFound(_) => StatusCode::NOT_FOUND,
        AgendaError::Config(_)
        | AgendaError::Storage(_)
        | AgendaError::Io(_)
        | AgendaError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: AgendaError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    } else {
        tracing::debug!(error = %err, "Request rejected");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.code().to_string(),
        }),
    )
        .into_response()
}

fn parse_scope(params: &ScopeParams) -> Result<Scope, AgendaError> {
    match params.scope.as_deref() {
        Some(scope) => Ok(scope.parse()?),
        None => Ok(Scope::default()),
    }
}

// ============================================================================
// Handler Functions
// ============================================================================

/// GET /api/v1/occurrences - List occurrences in a date range.
pub async fn list_occurrences_handler(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<OccurrencesParams>,
) -> impl IntoResponse {
    let end = match params.end {
        Some(end) => end,
        None => match state.service.default_end(params.start) {
            Ok(end) => end,
            Err(e) => return error_response(e),
        },
    };
    let mut query = OccurrenceQuery::new(params.start, end);
    if let Some(establishment_id) = params.establishment_id {
        query = query.for_establishment(establishment_id);
    }
    if !params.include_cancelled {
        query = query.without_cancelled();
    }

    match state.service.occurrences(&query).await {
        Ok(occurrences) => {
            let occurrences: Vec<OccurrenceView> = occurrences
                .into_iter()
                .map(|occurrence| OccurrenceView {
                    establishment: state.directory.lookup(&occurrence.establishment_id),
                    occurrence,
                })
                .collect();
            let total = occurrences.len();

            (
                StatusCode::OK,
                Json(OccurrencesResponse {
                    start: params.start,
                    end,
                    occurrences,
                    total,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/activities - Create an activity or a series.
pub async fn create_activity_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<NewActivity>,
) -> impl IntoResponse {
    match state.service.create_activity(request).await {
        Ok(activity) => (StatusCode::CREATED, Json(activity)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/activities/:id - Get an activity record.
pub async fn get_activity_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.get_activity(&id).await {
        Ok(activity) => (StatusCode::OK, Json(activity)).into_response(),
        Err(e) => error_response(e),
    }
}

/// PATCH /api/v1/activities/:id - Edit an occurrence or a series.
pub async fn update_activity_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Query(params): Query<ScopeParams>,
    Json(update): Json<ActivityUpdate>,
) -> impl IntoResponse {
    let scope = match parse_scope(&params) {
        Ok(scope) => scope,
        Err(e) => return error_response(e),
    };

    match state.service.update_activity(&id, update, scope).await {
        Ok(activity) => (StatusCode::OK, Json(activity)).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/v1/activities/:id - Delete an occurrence or a series.
pub async fn delete_activity_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Query(params): Query<ScopeParams>,
) -> impl IntoResponse {
    let scope = match parse_scope(&params) {
        Ok(scope) => scope,
        Err(e) => return error_response(e),
    };

    match state.service.delete_activity(&id, scope).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/activities/:id/transitions - Apply a lifecycle action.
pub async fn transition_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> impl IntoResponse {
    let action: LifecycleAction = match request.action.parse() {
        Ok(action) => action,
        Err(e) => return error_response(AgendaError::Validation(e)),
    };

    match state.service.transition(&id, action).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/activities/submit-all - Submit every draft.
///
/// A batch that stopped on a failure is reported with 409 and the full
/// per-record report, so callers can see what was rolled back.
pub async fn submit_all_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SubmitAllRequest>,
) -> impl IntoResponse {
    match state
        .service
        .submit_all_drafts(request.establishment_id.as_deref())
        .await
    {
        Ok(report) if report.committed => (StatusCode::OK, Json(report)).into_response(),
        Ok(report) => (StatusCode::CONFLICT, Json(report)).into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NotFoundError, ValidationError};

    #[test]
    fn test_status_mapping() {
        let err: AgendaError = ValidationError::MissingField("title".to_string()).into();
        assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);

        let err: AgendaError = NotFoundError::Activity("a".to_string()).into();
        assert_eq!(status_for(&err), StatusCode::NOT_FOUND);

        let err: AgendaError = crate::error::StateTransitionError {
            from: crate::activity::ActivityStatus::Draft,
            to: crate::activity::ActivityStatus::Completed,
        }
        .into();
        assert_eq!(status_for(&err), StatusCode::CONFLICT);
    }

    #[test]
    fn test_parse_scope() {
        assert_eq!(parse_scope(&ScopeParams::default()).unwrap(), Scope::Occurrence);
        let params = ScopeParams {
            scope: Some("series".to_string()),
        };
        assert_eq!(parse_scope(&params).unwrap(), Scope::Series);
        let params = ScopeParams {
            scope: Some("everything".to_string()),
        };
        assert!(matches!(
            parse_scope(&params),
            Err(AgendaError::Validation(ValidationError::InvalidScope(_)))
        ));
    }
}
