use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One content-addressed filesystem diff of an image, ordered by `seq`.
/// Immutable once created; rows are only ever replaced wholesale.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "layers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub image_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub seq: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub digest: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::images::Entity",
        from = "Column::ImageId",
        to = "super::images::Column::Id"
    )]
    Image,
}

impl Related<super::images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Image.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Two images share a layer at a position iff both the content hash and
    /// the sequence number match.
    pub fn same_as(&self, other: &Model) -> bool {
        self.digest == other.digest && self.seq == other.seq
    }
}
