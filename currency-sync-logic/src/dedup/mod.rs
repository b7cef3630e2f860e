mod sweeper;

pub use sweeper::build_sweep_jobs;

use chrono::{Duration as ChronoDuration, Utc};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};

use currency_sync_entity::dedup_entry;

use crate::error::ServiceError;

/// Durable set of observed `rid`s with TTL, guaranteeing at-most-once handling of
/// duplicate bus deliveries. A unique constraint on `rid` is the authority for
/// concurrent inserts; `insert` is idempotent (upsert with the same `rid` is a no-op).
#[derive(Clone)]
pub struct DedupLedger {
    db: DatabaseConnection,
    ttl_days: i64,
    hard_purge_days: i64,
}

impl DedupLedger {
    pub fn new(db: DatabaseConnection, ttl_days: i64, hard_purge_days: i64) -> Self {
        Self {
            db,
            ttl_days,
            hard_purge_days,
        }
    }

    pub async fn exists(&self, rid: &str) -> Result<bool, ServiceError> {
        let found = dedup_entry::Entity::find_by_id(rid.to_string())
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }

    /// Inserts `rid` with `expiresAt = now + ttlDays`. A concurrent duplicate insert is
    /// absorbed by the `ON CONFLICT DO NOTHING` clause rather than erroring. Returns
    /// `true` iff this call is the one that actually created the row — the unique
    /// constraint on `rid` is the sole serialisation point, so callers should branch on
    /// this instead of a separate `exists` check (which races against a concurrent
    /// insert of the same `rid` between the read and the write).
    pub async fn insert(&self, rid: &str) -> Result<bool, ServiceError> {
        let now = Utc::now();
        let expires_at = now + ChronoDuration::days(self.ttl_days);

        let rows_affected = dedup_entry::Entity::insert(dedup_entry::ActiveModel {
            rid: sea_orm::ActiveValue::Set(rid.to_string()),
            expires_at: sea_orm::ActiveValue::Set(expires_at),
            created_at: sea_orm::ActiveValue::Set(now),
        })
        .on_conflict(
            OnConflict::column(dedup_entry::Column::Rid)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;

        Ok(rows_affected > 0)
    }

    pub async fn purge_expired(&self) -> Result<u64, ServiceError> {
        let result = dedup_entry::Entity::delete_many()
            .filter(dedup_entry::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn purge_older_than_hard_limit(&self) -> Result<u64, ServiceError> {
        let cutoff = Utc::now() - ChronoDuration::days(self.hard_purge_days);
        let result = dedup_entry::Entity::delete_many()
            .filter(dedup_entry::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
