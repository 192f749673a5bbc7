use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;

use crate::entities::task;

pub mod api;
pub mod store;
pub mod web;

pub use store::{NewTask, SeaOrmTaskStore, TaskStore};

/// Status given to tasks that do not specify one.
pub const DEFAULT_STATUS: &str = "pending";

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: i64,
    title: String,
    description: String,
    status: String,
    created_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        id: i64,
        title: String,
        description: String,
        status: String,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            status,
            created_at,
        }
    }

    /// Returns the ID of the task.
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Returns when the task was created, if the store recorded it.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Human readable creation time for the HTML views.
    pub fn created_at_display(&self) -> String {
        self.created_at
            .map(|created_at| created_at.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_default()
    }

    /// Replaces the mutable fields, leaving `id` and `created_at` alone.
    fn apply(&mut self, input: TaskInput) {
        self.title = input.title;
        self.description = input.description;
        self.status = input.status;
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Task::new(
            model.id,
            model.title,
            model.description.unwrap_or_default(),
            model.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            model
                .created_at
                .map(|created_at| created_at.with_timezone(&Utc)),
        )
    }
}

/// User supplied task fields, normalised the same way for forms and the JSON API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInput {
    title: String,
    description: String,
    status: String,
}

impl TaskInput {
    /// Trims title and description; a missing status becomes [`DEFAULT_STATUS`].
    pub fn new(title: Option<&str>, description: Option<&str>, status: Option<&str>) -> Self {
        Self {
            title: title.unwrap_or_default().trim().to_string(),
            description: description.unwrap_or_default().trim().to_string(),
            status: status.unwrap_or(DEFAULT_STATUS).to_string(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    fn validate(&self) -> Result<(), TaskServiceError> {
        if self.title.is_empty() {
            return Err(TaskServiceError::TitleRequired);
        }
        Ok(())
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// The title was empty after trimming.
    #[error("Title is required.")]
    TitleRequired,
    /// No task with this ID exists in the store.
    #[error("Task with ID {0} not found")]
    TaskNotFound(i64),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Router state shared by the HTML and JSON handlers.
#[derive(Clone)]
pub struct TaskState {
    pub store: Arc<dyn TaskStore>,
    pub session_secret: String,
}

impl TaskState {
    pub fn new(store: Arc<dyn TaskStore>, session_secret: impl Into<String>) -> Self {
        Self {
            store,
            session_secret: session_secret.into(),
        }
    }
}

pub struct TaskService<'a> {
    store: &'a dyn TaskStore,
}

impl TaskService<'_> {
    pub fn new(store: &dyn TaskStore) -> TaskService<'_> {
        TaskService { store }
    }

    /// Retrieves all tasks, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(&self) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.store.list().await?)
    }

    /// Retrieves a task by its ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_task(&self, id: i64) -> Result<Task, TaskServiceError> {
        self.store
            .find(id)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }

    /// Creates a task stamped with the current UTC time.
    ///
    /// # Returns
    ///
    /// The stored task, or [`TaskServiceError::TitleRequired`] without touching
    /// the store when the title is blank.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, input: TaskInput) -> Result<Task, TaskServiceError> {
        input.validate()?;
        let new_task = NewTask {
            title: input.title,
            description: input.description,
            status: input.status,
            created_at: Utc::now().trunc_subsecs(6),
        };
        let task = self.store.insert(new_task).await?;
        tracing::info!(task_id = task.id(), "Created task");
        Ok(task)
    }

    /// Updates title, description and status of an existing task.
    ///
    /// The lookup happens before validation, so an unknown ID reports
    /// [`TaskServiceError::TaskNotFound`] even when the title is blank.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(&self, id: i64, input: TaskInput) -> Result<Task, TaskServiceError> {
        let mut task = self.get_task(id).await?;
        input.validate()?;
        task.apply(input);
        let task = self.store.save(&task).await.map_err(|err| match err {
            // Deleted between the lookup and the write.
            sea_orm::DbErr::RecordNotUpdated => TaskServiceError::TaskNotFound(id),
            err => TaskServiceError::Database(err),
        })?;
        tracing::info!(task_id = task.id(), "Updated task");
        Ok(task)
    }

    /// Deletes a task by ID whether or not it exists.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: i64) -> Result<(), TaskServiceError> {
        self.store.delete(id).await?;
        tracing::info!(task_id = id, "Deleted task");
        Ok(())
    }

    /// Deletes a task that must exist, returning what was removed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_existing_task(&self, id: i64) -> Result<Task, TaskServiceError> {
        let task = self.get_task(id).await?;
        self.store.delete(task.id()).await?;
        tracing::info!(task_id = task.id(), "Deleted task");
        Ok(task)
    }
}
