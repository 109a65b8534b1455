use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ImagePackageAssociation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ImagePackageAssociation::ImageId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ImagePackageAssociation::PackageId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ImagePackageAssociation::PkgMetadata).text().null())
                    .primary_key(
                        Index::create()
                            .col(ImagePackageAssociation::ImageId)
                            .col(ImagePackageAssociation::PackageId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_image_package_image")
                            .from(ImagePackageAssociation::Table, ImagePackageAssociation::ImageId)
                            .to(Images::Table, Images::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_image_package_package")
                            .from(
                                ImagePackageAssociation::Table,
                                ImagePackageAssociation::PackageId,
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
            .drop_table(Table::drop().table(ImagePackageAssociation::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ImagePackageAssociation {
    Table,
    ImageId,
    PackageId,
    PkgMetadata,
}

#[derive(DeriveIden)]
enum Images {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Packages {
    Table,
    Id,
}
