use axum::{
    Router,
    body::Bytes,
    extract::{Path, State, rejection::BytesRejection},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::task::{Task, TaskInput, TaskService, TaskServiceError, TaskState};

const TASK_NOT_FOUND: &str = "Task not found.";
const TITLE_REQUIRED: &str = "Title is required.";
const UNEXPECTED_ERROR: &str = "An unexpected error occurred.";

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskJson {
    /// Store-generated identifier
    id: i64,
    title: String,
    description: String,
    /// Free-form status, `pending` unless set
    status: String,
    /// Creation instant as an RFC 3339 string in UTC
    created_at: Option<String>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().to_string(),
            status: task.status().to_string(),
            created_at: task
                .created_at()
                .map(|created_at| created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

/// Body accepted by the update endpoint. Missing fields fall back to defaults.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl UpdateTaskRequest {
    /// Parses a request body, treating an empty or malformed body as `{}`.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_else(|err| {
            tracing::debug!("Treating unreadable JSON body as empty: {}", err);
            Self::default()
        })
    }
}

impl From<UpdateTaskRequest> for TaskInput {
    fn from(request: UpdateTaskRequest) -> Self {
        TaskInput::new(
            request.title.as_deref(),
            request.description.as_deref(),
            request.status.as_deref(),
        )
    }
}

/// Successful update envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskUpdatedResponse {
    ok: bool,
    task: TaskJson,
}

/// Successful delete envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskDeletedResponse {
    ok: bool,
}

/// Failure envelope shared by every API endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    ok: bool,
    error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: TaskServiceError) -> ApiError {
    match err {
        TaskServiceError::TaskNotFound(_) => {
            (StatusCode::NOT_FOUND, Json(ErrorResponse::new(TASK_NOT_FOUND)))
        }
        TaskServiceError::TitleRequired => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(TITLE_REQUIRED)))
        }
        TaskServiceError::Database(err) => {
            tracing::error!("Task store failure: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(UNEXPECTED_ERROR)),
            )
        }
    }
}

/// Path ids that are not integers cannot name a stored task.
fn parse_task_id(raw_id: &str) -> Result<i64, ApiError> {
    raw_id
        .parse()
        .map_err(|_| (StatusCode::NOT_FOUND, Json(ErrorResponse::new(TASK_NOT_FOUND))))
}

/// Bodies that cannot be buffered (over the size limit, broken stream) keep
/// the rejection's status but use the shared error envelope.
fn body_error(rejection: BytesRejection) -> ApiError {
    tracing::debug!("Rejected unreadable request body: {}", rejection);
    (rejection.status(), Json(ErrorResponse::new(rejection.body_text())))
}

/// Handler for POST /api/tasks/{id}/update.
#[tracing::instrument(skip(state, body))]
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/update",
    params(
        ("id" = i64, Path, description = "Task identifier")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskUpdatedResponse),
        (status = 400, description = "Title is blank", body = ErrorResponse),
        (status = 404, description = "Task does not exist", body = ErrorResponse),
        (status = 413, description = "Request body too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(raw_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<TaskUpdatedResponse>, ApiError> {
    let id = parse_task_id(&raw_id)?;
    let body = body.map_err(body_error)?;
    let request = UpdateTaskRequest::from_body(&body);
    let task_service = TaskService::new(state.store.as_ref());

    let task = task_service
        .update_task(id, request.into())
        .await
        .map_err(api_error)?;
    Ok(Json(TaskUpdatedResponse {
        ok: true,
        task: TaskJson::from(task),
    }))
}

/// Handler for POST /api/tasks/{id}/delete.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/delete",
    params(
        ("id" = i64, Path, description = "Task identifier")
    ),
    responses(
        (status = 200, description = "Task deleted", body = TaskDeletedResponse),
        (status = 404, description = "Task does not exist", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<TaskDeletedResponse>, ApiError> {
    let id = parse_task_id(&raw_id)?;
    let task_service = TaskService::new(state.store.as_ref());

    task_service
        .delete_existing_task(id)
        .await
        .map_err(api_error)?;
    Ok(Json(TaskDeletedResponse { ok: true }))
}

#[derive(OpenApi)]
#[openapi(
    paths(update_task_handler, delete_task_handler),
    components(schemas(
        TaskJson,
        UpdateTaskRequest,
        TaskUpdatedResponse,
        TaskDeletedResponse,
        ErrorResponse
    )),
    tags((name = "Tasks", description = "Headless task updates"))
)]
pub struct ApiDoc;

/// Handler for GET /api/openapi.json.
#[tracing::instrument]
async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Creates and returns the JSON API router.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/api/tasks/{id}/update", post(update_task_handler))
        .route("/api/tasks/{id}/delete", post(delete_task_handler))
        .route("/api/openapi.json", get(openapi_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn treats_malformed_body_as_empty_object() {
        let request = UpdateTaskRequest::from_body(b"{not json");

        assert!(request.title.is_none());
        assert!(request.status.is_none());
    }

    #[test]
    fn treats_wrongly_typed_fields_as_empty_object() {
        let request = UpdateTaskRequest::from_body(br#"{"title": 5, "status": "done"}"#);

        assert!(request.title.is_none());
        assert!(request.status.is_none());
    }

    #[test]
    fn reads_partial_body() {
        let input: TaskInput = UpdateTaskRequest::from_body(br#"{"title": " Call mum "}"#).into();

        assert_eq!(input.title(), "Call mum");
        assert_eq!(input.description(), "");
        assert_eq!(input.status(), "pending");
    }

    #[test]
    fn renders_created_at_as_rfc3339() {
        let created_at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 5).unwrap();
        let task = Task::new(
            4,
            "Report".to_string(),
            String::new(),
            "pending".to_string(),
            Some(created_at),
        );

        let json = TaskJson::from(task);

        assert_eq!(json.created_at.as_deref(), Some("2025-06-01T12:00:05Z"));
    }

    #[test]
    fn maps_non_integer_id_to_not_found() {
        let (status, Json(body)) = parse_task_id("abc").unwrap_err();

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, TASK_NOT_FOUND);
    }

    #[test]
    fn documents_both_endpoints() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/tasks/{id}/update"));
        assert!(doc.paths.paths.contains_key("/api/tasks/{id}/delete"));
    }
}
