use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Layers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Layers::ImageId).integer().not_null())
                    .col(ColumnDef::new(Layers::Seq).integer().not_null())
                    .col(ColumnDef::new(Layers::Digest).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Layers::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(Layers::ImageId)
                            .col(Layers::Seq)
                            .col(Layers::Digest),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_layers_image")
                            .from(Layers::Table, Layers::ImageId)
                            .to(Images::Table, Images::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Lineage candidate lookups filter on (digest, seq).
        manager
            .create_index(
                Index::create()
                    .name("idx_layers_digest_seq")
                    .table(Layers::Table)
                    .col(Layers::Digest)
                    .col(Layers::Seq)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Layers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Layers {
    Table,
    ImageId,
    Seq,
    Digest,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Images {
    Table,
    Id,
}
