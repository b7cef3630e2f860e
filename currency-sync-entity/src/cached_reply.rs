//! `SeaORM` entity for a cached reply (`response_to_kafka` in the original schema).
//!
//! `currency` is the full argument string exactly as parsed from the query envelope
//! (`"ALL"`, a single code, or a comma-separated code list) and is the join key used
//! by the freshness engine's code-set containment check.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "response_to_kafka")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub currency: String,
    pub base_currency: String,
    pub date: String,
    pub request_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::exchange_rate::Entity")]
    ExchangeRate,
}

impl Related<super::exchange_rate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExchangeRate.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
