use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Task {
    Table,
    Id,
    Namespace,
    Title,
    Description,
    Status,
    CreatedAt,
}

const IDX_TASK_NAMESPACE_CREATED_AT: &str = "idx-task-namespace-created_at";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Task::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Task::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(Task::Namespace))
                    .col(string(Task::Title))
                    .col(text_null(Task::Description))
                    .col(string_null(Task::Status))
                    .col(timestamp_with_time_zone_null(Task::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_TASK_NAMESPACE_CREATED_AT)
                    .table(Task::Table)
                    .col(Task::Namespace)
                    .col(Task::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_TASK_NAMESPACE_CREATED_AT)
                    .table(Task::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Task::Table).to_owned())
            .await
    }
}
