use blockscout_service_launcher::database;
use chrono::{Duration as ChronoDuration, Utc};
use currency_sync_entity::dedup_entry;
use currency_sync_logic::DedupLedger;
use currency_sync_migration::Migrator;
use sea_orm::{ActiveValue, EntityTrait};

#[tokio::test]
async fn insert_is_idempotent_and_exists_reflects_state() {
    let db_guard = database!(Migrator);
    let ledger = DedupLedger::new(db_guard.client().as_ref().clone(), 10, 15);

    assert!(!ledger.exists("rid-1").await.unwrap());

    ledger.insert("rid-1").await.unwrap();
    assert!(ledger.exists("rid-1").await.unwrap());

    // A duplicate insert of the same rid must not error (idempotent upsert).
    ledger.insert("rid-1").await.unwrap();
    assert!(ledger.exists("rid-1").await.unwrap());
}

#[tokio::test]
async fn purge_expired_removes_only_past_deadlines() {
    let db_guard = database!(Migrator);
    let db = db_guard.client();
    let ledger = DedupLedger::new(db.as_ref().clone(), 10, 15);

    let now = Utc::now();
    dedup_entry::Entity::insert(dedup_entry::ActiveModel {
        rid: ActiveValue::Set("expired".to_string()),
        expires_at: ActiveValue::Set(now - ChronoDuration::days(1)),
        created_at: ActiveValue::Set(now - ChronoDuration::days(11)),
    })
    .exec(db.as_ref())
    .await
    .unwrap();

    ledger.insert("still-live").await.unwrap();

    let removed = ledger.purge_expired().await.unwrap();
    assert_eq!(removed, 1);
    assert!(!ledger.exists("expired").await.unwrap());
    assert!(ledger.exists("still-live").await.unwrap());
}

#[tokio::test]
async fn purge_older_than_hard_limit_ignores_expires_at() {
    let db_guard = database!(Migrator);
    let db = db_guard.client();
    let ledger = DedupLedger::new(db.as_ref().clone(), 10, 15);

    let now = Utc::now();
    // expires_at is far in the future, but created_at is past the 15-day hard limit.
    dedup_entry::Entity::insert(dedup_entry::ActiveModel {
        rid: ActiveValue::Set("ancient".to_string()),
        expires_at: ActiveValue::Set(now + ChronoDuration::days(30)),
        created_at: ActiveValue::Set(now - ChronoDuration::days(16)),
    })
    .exec(db.as_ref())
    .await
    .unwrap();

    let removed = ledger.purge_older_than_hard_limit().await.unwrap();
    assert_eq!(removed, 1);
    assert!(!ledger.exists("ancient").await.unwrap());
}
