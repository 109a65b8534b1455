use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub provider: String,
    pub org: String,
    pub name: String,
    pub is_public: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::images::Entity")]
    Images,
    #[sea_orm(has_many = "super::ingestion_units::Entity")]
    IngestionUnits,
}

impl Related<super::images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::ingestion_units::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IngestionUnits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Canonical ssh-form URL the repository was parsed from.
    pub fn url(&self) -> String {
        format!("git@{}:{}/{}", self.provider, self.org, self.name)
    }
}
