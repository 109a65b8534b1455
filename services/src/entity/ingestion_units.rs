use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One bounded unit of ingestion work, from message acceptance to
/// finalization. Persisted exactly once at the end of processing whether the
/// unit succeeded or failed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingestion_units")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub uuid: String,
    pub repository_id: Option<i32>,
    pub tag: Option<String>,
    pub commit: Option<String>,
    pub environment: Option<String>,
    pub job_url: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub raw_message: String,
    pub succeeded: bool,
    /// Accumulating free-text log of everything that went wrong.
    #[sea_orm(column_type = "Text")]
    pub failure_log: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repositories::Entity",
        from = "Column::RepositoryId",
        to = "super::repositories::Column::Id"
    )]
    Repository,
    #[sea_orm(has_many = "super::images::Entity")]
    Images,
}

impl Related<super::repositories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl Related<super::images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
