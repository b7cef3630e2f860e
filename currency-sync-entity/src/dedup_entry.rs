//! `SeaORM` entity for the dedup ledger (`requestId-collection` in the original schema).
//!
//! A unique constraint on `rid` is the authority for idempotent concurrent inserts;
//! `created_at` backs the hard-purge sweep, `expires_at` backs the TTL sweep.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "request_id_ledger")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub rid: String,
    pub expires_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
