use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LicenseFamily::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LicenseFamily::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LicenseFamily::Name).string_len(150).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_license_family_name")
                    .table(LicenseFamily::Table)
                    .col(LicenseFamily::Name)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LicenseFamily::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum LicenseFamily {
    Table,
    Id,
    Name,
}
