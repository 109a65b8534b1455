use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IngestionUnits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IngestionUnits::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IngestionUnits::Uuid)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(ColumnDef::new(IngestionUnits::RepositoryId).integer().null())
                    .col(ColumnDef::new(IngestionUnits::Tag).string_len(128).null())
                    .col(ColumnDef::new(IngestionUnits::Commit).string_len(128).null())
                    .col(
                        ColumnDef::new(IngestionUnits::Environment)
                            .string_len(128)
                            .null(),
                    )
                    .col(ColumnDef::new(IngestionUnits::JobUrl).string_len(256).null())
                    .col(ColumnDef::new(IngestionUnits::RawMessage).text().not_null())
                    .col(
                        ColumnDef::new(IngestionUnits::Succeeded)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(IngestionUnits::FailureLog)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ingestion_units_repository")
                            .from(IngestionUnits::Table, IngestionUnits::RepositoryId)
                            .to(Repositories::Table, Repositories::Id)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ingestion_units_uuid")
                    .table(IngestionUnits::Table)
                    .col(IngestionUnits::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IngestionUnits::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum IngestionUnits {
    Table,
    Id,
    Uuid,
    RepositoryId,
    Tag,
    Commit,
    Environment,
    JobUrl,
    RawMessage,
    Succeeded,
    FailureLog,
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
}
