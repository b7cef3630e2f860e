mod fetch;
pub mod repository;

pub use fetch::FetchSideHandler;

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use sea_orm::DatabaseConnection;

use crate::{
    bus::{topics, Bus, BusRecord, Headers},
    dedup::DedupLedger,
    error::{retry_storage_once, DltReason},
    metrics::{CACHE_HITS, CACHE_MISSES, DEDUP_DROPPED},
    types::{QueryKind, ReplyBody},
};

/// The request-side half of the cache & freshness engine: consumes `request`, checks
/// the dedup ledger, checks payload freshness, and either serves a cached reply or
/// republishes onto `fetch`.
pub struct RequestSideHandler {
    db: DatabaseConnection,
    bus: Arc<dyn Bus>,
    dedup: DedupLedger,
    staleness_window: Duration,
}

impl RequestSideHandler {
    pub fn new(
        db: DatabaseConnection,
        bus: Arc<dyn Bus>,
        dedup: DedupLedger,
        staleness_window: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            bus,
            dedup,
            staleness_window,
        })
    }

    pub async fn handle(&self, record: BusRecord) {
        let Some(rid) = record.message_key.clone() else {
            tracing::warn!("request record missing messageKey header");
            let _ = self
                .bus
                .dead_letter(DltReason::MissingCorrelation, &record.body)
                .await;
            return;
        };

        let Some(query) = QueryKind::parse_envelope(&record.body) else {
            let _ = self
                .bus
                .dead_letter(DltReason::Unrecognised, &record.body)
                .await;
            return;
        };

        // `insert` is the single serialisation point (unique constraint on `rid`): a
        // separate `exists` check beforehand would race against a concurrent delivery
        // of the same `rid` landing on another worker between the read and the write,
        // letting both through. Branching on `insert`'s own result instead makes the
        // dedup gate atomic.
        match self.dedup.insert(&rid).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(rid, "duplicate request delivery, dropping silently");
                DEDUP_DROPPED.inc();
                return;
            }
            Err(err) => {
                tracing::error!(err = ?err, rid, "dedup insert failed");
                return;
            }
        }

        self.resolve(&rid, &query, &record.body).await;
    }

    async fn resolve(&self, rid: &str, query: &QueryKind, body: &str) {
        let payload = match retry_storage_once(|| repository::get_payload(&self.db, body)).await {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(err = ?err, rid, "payload lookup failed after retry");
                let _ = self.bus.dead_letter(DltReason::StorageFailure, body).await;
                publish_synthetic_error(&self.bus, rid, query).await;
                return;
            }
        };

        let Some(payload) = payload else {
            self.republish_on_fetch(rid, body).await;
            return;
        };

        let age = Utc::now().signed_duration_since(payload.last_saved);
        let fresh = age.to_std().map(|d| d < self.staleness_window).unwrap_or(false);

        if !fresh {
            if let Err(err) = repository::touch_payload(&self.db, body, Utc::now()).await {
                tracing::error!(err = ?err, rid, "failed to bump payload lastSaved");
            }
            self.republish_on_fetch(rid, body).await;
            return;
        }

        let cached = match retry_storage_once(|| repository::get_cached_reply(&self.db, &query.argument()))
            .await
        {
            Ok(cached) => cached,
            Err(err) => {
                tracing::error!(err = ?err, rid, "cached reply lookup failed after retry");
                let _ = self.bus.dead_letter(DltReason::StorageFailure, body).await;
                publish_synthetic_error(&self.bus, rid, query).await;
                return;
            }
        };

        let codes = query.codes();
        match cached {
            Some(reply) if reply.rates_superset_of(&codes) => {
                CACHE_HITS.inc();
                let mut reply = reply.projected(&codes);
                reply.request_id = rid.to_string();

                let serialized = match serde_json::to_string(&reply) {
                    Ok(serialized) => serialized,
                    Err(err) => {
                        tracing::error!(err = ?err, rid, "failed to serialise cached reply");
                        return;
                    }
                };

                if let Err(err) = self
                    .bus
                    .publish(
                        topics::RESPONSE,
                        rid,
                        &serialized,
                        Headers::for_response(rid),
                    )
                    .await
                {
                    tracing::error!(err = ?err, rid, "failed to publish cached reply");
                }
            }
            _ => {
                // Either no row yet, or the code-set containment invariant failed —
                // both are treated as a miss.
                self.republish_on_fetch(rid, body).await;
            }
        }
    }

    async fn republish_on_fetch(&self, rid: &str, body: &str) {
        CACHE_MISSES.inc();
        if let Err(err) = self
            .bus
            .publish(topics::FETCH, rid, body, Headers::for_request(rid))
            .await
        {
            tracing::error!(err = ?err, rid, "failed to republish on fetch");
        }
    }
}

/// Emits a synthetic error body on `response` so the correlator surfaces `Upstream`
/// instead of timing out, after either side of the cache engine fails twice on a
/// storage operation or exhausts upstream retries. Shared by both handlers so the
/// synthetic-error wire shape has one definition.
pub(crate) async fn publish_synthetic_error(bus: &Arc<dyn Bus>, rid: &str, query: &QueryKind) {
    let reply = ReplyBody {
        rates: std::collections::BTreeMap::new(),
        base_currency: String::new(),
        date: String::new(),
        currency: query.argument(),
        request_id: rid.to_string(),
    };
    let serialized = match serde_json::to_string(&reply) {
        Ok(serialized) => serialized,
        Err(_) => return,
    };
    let _ = bus
        .publish(
            topics::RESPONSE,
            rid,
            &serialized,
            Headers::for_synthetic_error(rid),
        )
        .await;
}
