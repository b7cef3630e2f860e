use std::collections::BTreeMap;

use blockscout_service_launcher::database;
use chrono::Utc;
use currency_sync_logic::cache::repository;
use currency_sync_migration::Migrator;

#[tokio::test]
async fn payload_round_trips_through_touch_and_get() {
    let db_guard = database!(Migrator);
    let db = db_guard.client();

    assert!(repository::get_payload(db.as_ref(), "ALL:").await.unwrap().is_none());

    let before = Utc::now();
    repository::touch_payload(db.as_ref(), "ALL:", before).await.unwrap();

    let stored = repository::get_payload(db.as_ref(), "ALL:")
        .await
        .unwrap()
        .expect("payload row should exist after touch");
    assert_eq!(stored.payload, "ALL:");
    assert_eq!(stored.last_saved.timestamp(), before.timestamp());

    // touching again overwrites lastSaved rather than erroring on the primary key.
    let after = before + chrono::Duration::hours(2);
    repository::touch_payload(db.as_ref(), "ALL:", after).await.unwrap();
    let stored = repository::get_payload(db.as_ref(), "ALL:").await.unwrap().unwrap();
    assert_eq!(stored.last_saved.timestamp(), after.timestamp());
}

#[tokio::test]
async fn upsert_cached_reply_overwrites_rates_in_one_commit() {
    let db_guard = database!(Migrator);
    let db = db_guard.client();

    let mut rates = BTreeMap::new();
    rates.insert("USD".to_string(), 1.1);
    rates.insert("RUB".to_string(), 100.0);

    repository::upsert_cached_reply(db.as_ref(), "ALL", "EUR", "2024-01-15", "rid-1", &rates)
        .await
        .unwrap();

    let reply = repository::get_cached_reply(db.as_ref(), "ALL")
        .await
        .unwrap()
        .expect("cached reply should exist");
    assert_eq!(reply.base_currency, "EUR");
    assert_eq!(reply.date, "2024-01-15");
    assert_eq!(reply.rates.get("USD"), Some(&1.1));
    assert_eq!(reply.rates.len(), 2);

    // A second upsert for the same key replaces the rate set rather than appending to it.
    let mut refreshed = BTreeMap::new();
    refreshed.insert("USD".to_string(), 1.2);
    repository::upsert_cached_reply(db.as_ref(), "ALL", "EUR", "2024-01-16", "rid-2", &refreshed)
        .await
        .unwrap();

    let reply = repository::get_cached_reply(db.as_ref(), "ALL").await.unwrap().unwrap();
    assert_eq!(reply.date, "2024-01-16");
    assert_eq!(reply.rates.len(), 1);
    assert_eq!(reply.rates.get("USD"), Some(&1.2));
    assert_eq!(reply.request_id, "rid-2");
}

#[tokio::test]
async fn distinct_currency_keys_stay_independent() {
    let db_guard = database!(Migrator);
    let db = db_guard.client();

    let mut all_rates = BTreeMap::new();
    all_rates.insert("USD".to_string(), 1.1);
    repository::upsert_cached_reply(db.as_ref(), "ALL", "EUR", "2024-01-15", "rid-1", &all_rates)
        .await
        .unwrap();

    let mut filter_rates = BTreeMap::new();
    filter_rates.insert("USD".to_string(), 1.1);
    filter_rates.insert("JPY".to_string(), 160.0);
    repository::upsert_cached_reply(db.as_ref(), "USD,JPY", "EUR", "2024-01-15", "rid-2", &filter_rates)
        .await
        .unwrap();

    let all_reply = repository::get_cached_reply(db.as_ref(), "ALL").await.unwrap().unwrap();
    assert_eq!(all_reply.rates.len(), 1);

    let filter_reply = repository::get_cached_reply(db.as_ref(), "USD,JPY")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(filter_reply.rates.len(), 2);
}
