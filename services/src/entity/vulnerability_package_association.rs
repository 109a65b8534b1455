use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vulnerability_package_association")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub vulnerability_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub package_id: i32,
    /// Comma-separated list of fix versions; overwritten on every merge pass.
    pub fix: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vulnerabilities::Entity",
        from = "Column::VulnerabilityId",
        to = "super::vulnerabilities::Column::Id"
    )]
    Vulnerability,
    #[sea_orm(
        belongs_to = "super::packages::Entity",
        from = "Column::PackageId",
        to = "super::packages::Column::Id"
    )]
    Package,
}

impl Related<super::vulnerabilities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vulnerability.def()
    }
}

impl Related<super::packages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Package.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
