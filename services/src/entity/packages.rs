use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "packages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub version: Option<String>,
    pub language: Option<String>,
    #[sea_orm(unique)]
    pub purl: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::image_package_association::Entity")]
    Images,
    #[sea_orm(has_many = "super::package_license_association::Entity")]
    Licenses,
    #[sea_orm(has_many = "super::vulnerability_package_association::Entity")]
    Vulnerabilities,
}

impl Related<super::image_package_association::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::package_license_association::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Licenses.def()
    }
}

impl Related<super::vulnerability_package_association::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vulnerabilities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
