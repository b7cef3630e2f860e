//! Child rows of a [`super::cached_reply`] record: one row per currency code/rate pair.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "exchange_rates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub response_id: i32,
    pub currency: String,
    pub rate: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cached_reply::Entity",
        from = "Column::ResponseId",
        to = "super::cached_reply::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    CachedReply,
}

impl Related<super::cached_reply::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CachedReply.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
