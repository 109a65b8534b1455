use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PackageLicenseAssociation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PackageLicenseAssociation::PackageId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PackageLicenseAssociation::LicenseId)
                            .integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(PackageLicenseAssociation::PackageId)
                            .col(PackageLicenseAssociation::LicenseId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_package_license_package")
                            .from(
                                PackageLicenseAssociation::Table,
                                PackageLicenseAssociation::PackageId,
                            )
                            .to(Packages::Table, Packages::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_package_license_license")
                            .from(
                                PackageLicenseAssociation::Table,
                                PackageLicenseAssociation::LicenseId,
                            )
                            .to(LicenseFamily::Table, LicenseFamily::Id)
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
                    .table(PackageLicenseAssociation::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum PackageLicenseAssociation {
    Table,
    PackageId,
    LicenseId,
}

#[derive(DeriveIden)]
enum Packages {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum LicenseFamily {
    Table,
    Id,
}
