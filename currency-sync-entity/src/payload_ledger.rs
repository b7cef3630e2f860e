//! `SeaORM` entity for the payload ledger (`payload_table` in the original schema).
//!
//! Keyed by the literal query string (`"<kind>:<argument>"`); `last_saved` drives the
//! freshness decision in the cache engine.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "payload_table")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_name = "payload")]
    pub payload: String,
    #[sea_orm(column_name = "last_save_payload")]
    pub last_saved: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
