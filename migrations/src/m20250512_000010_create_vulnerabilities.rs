use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vulnerabilities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vulnerabilities::Id)
                            .string_len(50)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Vulnerabilities::Description)
                            .string_len(500)
                            .null(),
                    )
                    .col(ColumnDef::new(Vulnerabilities::Severity).string_len(10).null())
                    .col(ColumnDef::new(Vulnerabilities::Related).string_len(200).null())
                    .col(ColumnDef::new(Vulnerabilities::CvssBaseScore).double().null())
                    .col(
                        ColumnDef::new(Vulnerabilities::CvssExploitabilityScore)
                            .double()
                            .null(),
                    )
                    .col(ColumnDef::new(Vulnerabilities::CvssImpactScore).double().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vulnerabilities::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Vulnerabilities {
    Table,
    Id,
    Description,
    Severity,
    Related,
    CvssBaseScore,
    CvssExploitabilityScore,
    CvssImpactScore,
}
