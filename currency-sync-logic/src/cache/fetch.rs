use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    bus::{topics, Bus, BusRecord, Headers},
    error::{retry_storage_once, DltReason},
    metrics::UPSTREAM_CALLS,
    types::{QueryKind, ReplyBody},
    upstream::{retry_with_backoff, RetrySettings, UpstreamClient},
};

use super::{publish_synthetic_error, repository};

/// The fetch-side half of the cache & freshness engine: consumes `fetch`, calls
/// upstream with retries, upserts the cache, and publishes the fresh reply.
pub struct FetchSideHandler {
    db: DatabaseConnection,
    bus: Arc<dyn Bus>,
    upstream: UpstreamClient,
    access_key: String,
    retry: RetrySettings,
}

impl FetchSideHandler {
    pub fn new(
        db: DatabaseConnection,
        bus: Arc<dyn Bus>,
        upstream: UpstreamClient,
        access_key: String,
        retry: RetrySettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            bus,
            upstream,
            access_key,
            retry,
        })
    }

    pub async fn handle(&self, record: BusRecord) {
        let Some(rid) = record.message_key.clone() else {
            tracing::warn!("fetch record missing messageKey header");
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

        let access_key = self.access_key.clone();
        let upstream = &self.upstream;
        let fetched = retry_with_backoff(self.retry, || {
            let access_key = access_key.clone();
            UPSTREAM_CALLS.inc();
            async move { upstream.fetch_rates(&access_key).await }
        })
        .await;

        let upstream_reply = match fetched {
            Ok(reply) if reply.success => reply,
            Ok(_) => {
                tracing::error!(rid, "upstream reported success=false");
                let _ = self
                    .bus
                    .dead_letter(DltReason::UpstreamUnavailable, &record.body)
                    .await;
                publish_synthetic_error(&self.bus, &rid, &query).await;
                return;
            }
            Err(trace) => {
                tracing::error!(rid, attempts = trace.len(), "upstream exhausted retries");
                let _ = self
                    .bus
                    .dead_letter(DltReason::UpstreamUnavailable, &record.body)
                    .await;
                publish_synthetic_error(&self.bus, &rid, &query).await;
                return;
            }
        };

        let codes = query.codes();
        let argument = query.argument();

        let rates = if codes.is_empty() {
            upstream_reply.rates.clone()
        } else {
            let mut projected = std::collections::BTreeMap::new();
            for code in &codes {
                match upstream_reply.rates.get(code) {
                    Some(rate) => {
                        projected.insert(code.clone(), *rate);
                    }
                    None => {
                        let _ = self
                            .bus
                            .dead_letter(DltReason::UnknownCode, &record.body)
                            .await;
                        return;
                    }
                }
            }
            projected
        };

        if let Err(err) = retry_storage_once(|| {
            repository::upsert_cached_reply(
                &self.db,
                &argument,
                &upstream_reply.base,
                &upstream_reply.date,
                &rid,
                &rates,
            )
        })
        .await
        {
            tracing::error!(err = ?err, rid, "failed to upsert cache entry after retry");
            let _ = self
                .bus
                .dead_letter(DltReason::StorageFailure, &record.body)
                .await;
            publish_synthetic_error(&self.bus, &rid, &query).await;
            return;
        }

        let reply = ReplyBody {
            rates,
            base_currency: upstream_reply.base,
            date: upstream_reply.date,
            currency: argument,
            request_id: rid.clone(),
        };

        let serialized = match serde_json::to_string(&reply) {
            Ok(serialized) => serialized,
            Err(err) => {
                tracing::error!(err = ?err, rid, "failed to serialise fetched reply");
                return;
            }
        };

        if let Err(err) = self
            .bus
            .publish(
                topics::RESPONSE,
                &rid,
                &serialized,
                Headers::for_response(&rid),
            )
            .await
        {
            tracing::error!(err = ?err, rid, "failed to publish fetched reply");
        }
    }
}
