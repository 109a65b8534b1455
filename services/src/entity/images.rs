use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub backend_tech: Option<String>,
    pub account_id: String,
    pub digest: String,
    pub tag: Option<String>,
    pub commit: Option<String>,
    /// "os/architecture", e.g. "linux/arm64".
    pub platform: String,
    /// Nearest image whose layer sequence is a strict prefix of this one's.
    pub parent_image_id: Option<i32>,
    /// Topmost ancestor owned by the golden account.
    pub base_image_id: Option<i32>,
    pub repository_id: Option<i32>,
    pub ingestion_unit_id: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::layers::Entity")]
    Layers,
    #[sea_orm(has_many = "super::image_package_association::Entity")]
    Packages,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Account,
    #[sea_orm(
        belongs_to = "super::repositories::Entity",
        from = "Column::RepositoryId",
        to = "super::repositories::Column::Id"
    )]
    Repository,
    #[sea_orm(
        belongs_to = "super::ingestion_units::Entity",
        from = "Column::IngestionUnitId",
        to = "super::ingestion_units::Column::Id"
    )]
    IngestionUnit,
    #[sea_orm(belongs_to = "Entity", from = "Column::ParentImageId", to = "Column::Id")]
    ParentImage,
    #[sea_orm(belongs_to = "Entity", from = "Column::BaseImageId", to = "Column::Id")]
    BaseImage,
}

impl Related<super::layers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Layers.def()
    }
}

impl Related<super::image_package_association::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Packages.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::repositories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl Related<super::ingestion_units::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IngestionUnit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.name, self.id)
    }
}
