use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repositories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Repositories::Provider)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Repositories::Org).string_len(200).not_null())
                    .col(ColumnDef::new(Repositories::Name).string_len(200).not_null())
                    .col(
                        ColumnDef::new(Repositories::IsPublic)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // The natural key callers race on.
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_provider_org_name")
                    .table(Repositories::Table)
                    .col(Repositories::Provider)
                    .col(Repositories::Org)
                    .col(Repositories::Name)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
    Provider,
    Org,
    Name,
    IsPublic,
}
