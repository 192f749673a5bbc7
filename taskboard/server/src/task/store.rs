use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, NullOrdering, Order};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};

use crate::entities::task;
use crate::task::Task;

/// A task that has not been persisted yet; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Operations the application needs from the task store.
///
/// The store is the only source of truth: implementations must not cache, and
/// every call goes to the backing database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Returns every task, newest `created_at` first. Tasks without a creation
    /// time come last; ties go to the higher id.
    async fn list(&self) -> Result<Vec<Task>, DbErr>;

    /// Looks a task up by id.
    async fn find(&self, id: i64) -> Result<Option<Task>, DbErr>;

    /// Persists a new task and returns it with its generated id.
    async fn insert(&self, task: NewTask) -> Result<Task, DbErr>;

    /// Writes the mutable fields (title, description, status) of an existing task.
    ///
    /// Fails with [`DbErr::RecordNotUpdated`] when no such task is stored.
    async fn save(&self, task: &Task) -> Result<Task, DbErr>;

    /// Removes a task by id. Removing an unknown id is not an error.
    async fn delete(&self, id: i64) -> Result<(), DbErr>;
}

/// [`TaskStore`] backed by a sea-orm connection, partitioned by namespace.
#[derive(Debug, Clone)]
pub struct SeaOrmTaskStore {
    db: DatabaseConnection,
    namespace: String,
}

impl SeaOrmTaskStore {
    pub fn new(db: DatabaseConnection, namespace: impl Into<String>) -> Self {
        Self {
            db,
            namespace: namespace.into(),
        }
    }

    /// Returns the namespace this store reads and writes.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl TaskStore for SeaOrmTaskStore {
    #[tracing::instrument(skip(self), fields(namespace = %self.namespace))]
    async fn list(&self) -> Result<Vec<Task>, DbErr> {
        let tasks = task::Entity::find()
            .filter(task::Column::Namespace.eq(self.namespace.as_str()))
            .order_by_with_nulls(task::Column::CreatedAt, Order::Desc, NullOrdering::Last)
            .order_by_desc(task::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    #[tracing::instrument(skip(self), fields(namespace = %self.namespace))]
    async fn find(&self, id: i64) -> Result<Option<Task>, DbErr> {
        let model = task::Entity::find_by_id(id)
            .filter(task::Column::Namespace.eq(self.namespace.as_str()))
            .one(&self.db)
            .await?;
        Ok(model.map(Task::from))
    }

    #[tracing::instrument(skip(self), fields(namespace = %self.namespace))]
    async fn insert(&self, new_task: NewTask) -> Result<Task, DbErr> {
        let active_model = task::ActiveModel {
            namespace: ActiveValue::Set(self.namespace.clone()),
            title: ActiveValue::Set(new_task.title),
            description: ActiveValue::Set(Some(new_task.description)),
            status: ActiveValue::Set(Some(new_task.status)),
            created_at: ActiveValue::Set(Some(new_task.created_at.fixed_offset())),
            ..Default::default()
        };
        let created_model = active_model.insert(&self.db).await?;
        Ok(Task::from(created_model))
    }

    #[tracing::instrument(skip(self), fields(namespace = %self.namespace))]
    async fn save(&self, task: &Task) -> Result<Task, DbErr> {
        let result = task::Entity::update_many()
            .col_expr(task::Column::Title, Expr::value(task.title().to_string()))
            .col_expr(
                task::Column::Description,
                Expr::value(Some(task.description().to_string())),
            )
            .col_expr(
                task::Column::Status,
                Expr::value(Some(task.status().to_string())),
            )
            .filter(task::Column::Id.eq(task.id()))
            .filter(task::Column::Namespace.eq(self.namespace.as_str()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            tracing::warn!(task_id = task.id(), "Task vanished before it could be saved");
            return Err(DbErr::RecordNotUpdated);
        }
        Ok(task.clone())
    }

    #[tracing::instrument(skip(self), fields(namespace = %self.namespace))]
    async fn delete(&self, id: i64) -> Result<(), DbErr> {
        task::Entity::delete_many()
            .filter(task::Column::Id.eq(id))
            .filter(task::Column::Namespace.eq(self.namespace.as_str()))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
