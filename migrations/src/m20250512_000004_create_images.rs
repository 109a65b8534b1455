use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Images::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Images::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Images::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Images::BackendTech).string_len(24).null())
                    .col(ColumnDef::new(Images::AccountId).string_len(12).not_null())
                    .col(ColumnDef::new(Images::Digest).string_len(72).not_null())
                    .col(ColumnDef::new(Images::Tag).string_len(128).null())
                    .col(ColumnDef::new(Images::Commit).string_len(128).null())
                    .col(ColumnDef::new(Images::Platform).string_len(24).not_null())
                    .col(ColumnDef::new(Images::ParentImageId).integer().null())
                    .col(ColumnDef::new(Images::BaseImageId).integer().null())
                    .col(ColumnDef::new(Images::RepositoryId).integer().null())
                    .col(ColumnDef::new(Images::IngestionUnitId).integer().null())
                    .col(
                        ColumnDef::new(Images::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Images::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_images_account")
                            .from(Images::Table, Images::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_images_parent_image")
                            .from(Images::Table, Images::ParentImageId)
                            .to(Images::Table, Images::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_images_base_image")
                            .from(Images::Table, Images::BaseImageId)
                            .to(Images::Table, Images::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_images_repository")
                            .from(Images::Table, Images::RepositoryId)
                            .to(Repositories::Table, Repositories::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_images_ingestion_unit")
                            .from(Images::Table, Images::IngestionUnitId)
                            .to(IngestionUnits::Table, IngestionUnits::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // The natural key callers race on.
        manager
            .create_index(
                Index::create()
                    .name("idx_images_name_digest_platform_account")
                    .table(Images::Table)
                    .col(Images::Name)
                    .col(Images::Digest)
                    .col(Images::Platform)
                    .col(Images::AccountId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Images::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Images {
    Table,
    Id,
    Name,
    BackendTech,
    AccountId,
    Digest,
    Tag,
    Commit,
    Platform,
    ParentImageId,
    BaseImageId,
    RepositoryId,
    IngestionUnitId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum IngestionUnits {
    Table,
    Id,
}
