use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State, rejection::FormRejection},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use crate::flash::{self, FlashLevel, FlashMessage};
use crate::task::{Task, TaskInput, TaskService, TaskServiceError, TaskState};
use crate::web::{internal_error_response, redirect_found};

pub const TASK_CREATED: &str = "Task created successfully!";
pub const TASK_UPDATED: &str = "Task updated successfully!";
pub const TASK_DELETED: &str = "Task deleted.";
pub const TASK_NOT_FOUND: &str = "Task not found.";
pub const TITLE_REQUIRED: &str = "Title is required.";

/// Fields posted by the create and edit forms. Every field may be absent.
#[derive(Debug, Default, Deserialize)]
pub struct TaskForm {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl TaskForm {
    /// Treats a missing or unreadable form body as a form with no fields.
    fn or_default(form: Result<Form<TaskForm>, FormRejection>) -> Self {
        match form {
            Ok(Form(form)) => form,
            Err(rejection) => {
                tracing::debug!("Treating unreadable form body as empty: {}", rejection);
                Self::default()
            }
        }
    }
}

impl From<TaskForm> for TaskInput {
    fn from(form: TaskForm) -> Self {
        TaskInput::new(
            form.title.as_deref(),
            form.description.as_deref(),
            form.status.as_deref(),
        )
    }
}

/// Custom error type for task handler operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Represents an error during template rendering.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    /// Represents a task service error.
    #[error("Task service error: {0}")]
    Service(#[from] TaskServiceError),
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        tracing::error!("Task request failed: {}", self);
        internal_error_response()
    }
}

#[derive(Template)]
#[template(path = "tasks/index.html")]
struct IndexTemplate {
    tasks: Vec<Task>,
    messages: Vec<FlashMessage>,
}

impl IndexTemplate {
    pub fn new(tasks: Vec<Task>, messages: Vec<FlashMessage>) -> Self {
        Self { tasks, messages }
    }
}

#[derive(Template)]
#[template(path = "tasks/edit.html")]
struct EditTaskTemplate {
    task: Task,
    messages: Vec<FlashMessage>,
}

impl EditTaskTemplate {
    pub fn new(task: Task, messages: Vec<FlashMessage>) -> Self {
        Self { task, messages }
    }
}

/// Path ids that are not integers cannot name a stored task.
fn parse_task_id(raw_id: &str) -> Option<i64> {
    raw_id.parse().ok()
}

fn task_not_found(jar: CookieJar, secret: &str) -> (CookieJar, Response) {
    (
        flash::push(jar, secret, FlashLevel::Error, TASK_NOT_FOUND),
        redirect_found("/"),
    )
}

/// Handler for `GET /` that lists every task, newest first.
#[tracing::instrument(skip(state, jar))]
async fn index_handler(
    State(state): State<Arc<TaskState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), TaskError> {
    let task_service = TaskService::new(state.store.as_ref());
    let tasks = task_service.list_tasks().await?;

    let (jar, messages) = flash::take(jar, &state.session_secret);
    let html = IndexTemplate::new(tasks, messages).render()?;
    Ok((jar, Html(html)))
}

/// Handler for `POST /tasks`.
#[tracing::instrument(skip(state, jar))]
async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    jar: CookieJar,
    form: Result<Form<TaskForm>, FormRejection>,
) -> Result<(CookieJar, Response), TaskError> {
    let task_service = TaskService::new(state.store.as_ref());
    let secret = &state.session_secret;
    let form = TaskForm::or_default(form);

    match task_service.create_task(form.into()).await {
        Ok(_) => Ok((
            flash::push(jar, secret, FlashLevel::Success, TASK_CREATED),
            redirect_found("/"),
        )),
        Err(TaskServiceError::TitleRequired) => {
            tracing::debug!("Rejected task without a title");
            Ok((
                flash::push(jar, secret, FlashLevel::Error, TITLE_REQUIRED),
                redirect_found("/"),
            ))
        }
        Err(err) => Err(TaskError::Service(err)),
    }
}

/// Handler for `GET /tasks/{id}/edit` that serves the pre-filled edit form.
#[tracing::instrument(skip(state, jar))]
async fn edit_task_handler(
    State(state): State<Arc<TaskState>>,
    jar: CookieJar,
    Path(raw_id): Path<String>,
) -> Result<(CookieJar, Response), TaskError> {
    let task_service = TaskService::new(state.store.as_ref());
    let secret = &state.session_secret;
    let Some(id) = parse_task_id(&raw_id) else {
        return Ok(task_not_found(jar, secret));
    };

    match task_service.get_task(id).await {
        Ok(task) => {
            let (jar, messages) = flash::take(jar, secret);
            let html = EditTaskTemplate::new(task, messages).render()?;
            Ok((jar, Html(html).into_response()))
        }
        Err(TaskServiceError::TaskNotFound(_)) => Ok(task_not_found(jar, secret)),
        Err(err) => Err(TaskError::Service(err)),
    }
}

/// Handler for `POST /tasks/{id}` that saves the edit form.
#[tracing::instrument(skip(state, jar))]
async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    jar: CookieJar,
    Path(raw_id): Path<String>,
    form: Result<Form<TaskForm>, FormRejection>,
) -> Result<(CookieJar, Response), TaskError> {
    let task_service = TaskService::new(state.store.as_ref());
    let secret = &state.session_secret;
    let Some(id) = parse_task_id(&raw_id) else {
        return Ok(task_not_found(jar, secret));
    };
    let form = TaskForm::or_default(form);

    match task_service.update_task(id, form.into()).await {
        Ok(_) => Ok((
            flash::push(jar, secret, FlashLevel::Success, TASK_UPDATED),
            redirect_found("/"),
        )),
        Err(TaskServiceError::TaskNotFound(_)) => Ok(task_not_found(jar, secret)),
        Err(TaskServiceError::TitleRequired) => {
            tracing::debug!(task_id = id, "Rejected update without a title");
            Ok((
                flash::push(jar, secret, FlashLevel::Error, TITLE_REQUIRED),
                redirect_found(&format!("/tasks/{}/edit", id)),
            ))
        }
        Err(err) => Err(TaskError::Service(err)),
    }
}

/// Handler for `POST /tasks/{id}/delete`. Succeeds for unknown IDs too.
#[tracing::instrument(skip(state, jar))]
async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    jar: CookieJar,
    Path(raw_id): Path<String>,
) -> Result<(CookieJar, Response), TaskError> {
    // A non-integer id names nothing, so there is nothing to remove.
    if let Some(id) = parse_task_id(&raw_id) {
        let task_service = TaskService::new(state.store.as_ref());
        task_service.delete_task(id).await?;
    }
    Ok((
        flash::push(jar, &state.session_secret, FlashLevel::Info, TASK_DELETED),
        redirect_found("/"),
    ))
}

/// Creates and returns the router for the HTML form flow.
pub fn create_task_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/tasks", post(create_task_handler))
        .route("/tasks/{id}", post(update_task_handler))
        .route("/tasks/{id}/edit", get(edit_task_handler))
        .route("/tasks/{id}/delete", post(delete_task_handler))
        .with_state(state)
}
