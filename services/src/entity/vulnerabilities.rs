use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vulnerabilities")]
pub struct Model {
    /// External vulnerability id, e.g. "CVE-2024-0001" or "GHSA-...".
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub description: Option<String>,
    pub severity: Option<String>,
    /// Comma-separated list of related vulnerability ids.
    pub related: Option<String>,
    pub cvss_base_score: Option<f64>,
    pub cvss_exploitability_score: Option<f64>,
    pub cvss_impact_score: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vulnerability_package_association::Entity")]
    Packages,
}

impl Related<super::vulnerability_package_association::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Packages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
