use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VulnerabilityPackageAssociation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VulnerabilityPackageAssociation::VulnerabilityId)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VulnerabilityPackageAssociation::PackageId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VulnerabilityPackageAssociation::Fix)
                            .string_len(100)
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(VulnerabilityPackageAssociation::VulnerabilityId)
                            .col(VulnerabilityPackageAssociation::PackageId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vulnerability_package_vulnerability")
                            .from(
                                VulnerabilityPackageAssociation::Table,
                                VulnerabilityPackageAssociation::VulnerabilityId,
                            )
                            .to(Vulnerabilities::Table, Vulnerabilities::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vulnerability_package_package")
                            .from(
                                VulnerabilityPackageAssociation::Table,
                                VulnerabilityPackageAssociation::PackageId,
                            )
                            .to(Packages::Table, Packages::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(VulnerabilityPackageAssociation::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum VulnerabilityPackageAssociation {
    Table,
    VulnerabilityId,
    PackageId,
    Fix,
}

#[derive(DeriveIden)]
enum Vulnerabilities {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Packages {
    Table,
    Id,
}
