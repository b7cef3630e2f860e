use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::{
    bus::{topics, Bus, BusRecord, Headers},
    error::ServiceError,
    pool::WorkerPool,
    types::QueryKind,
};

type CompletionSink = oneshot::Sender<Result<String, ServiceError>>;

/// Ephemeral, edge-owned record mapping an `rid` to its single-shot completion sink.
/// Invariant: at most one live pending slot per `rid` per process, and the completion
/// callback fires at most once.
struct PendingSlot {
    sink: CompletionSink,
}

/// The edge gateway: accepts `query(kind, argument)`, mints an `rid`, suspends the
/// caller on a pending slot, and resumes it when a matching reply arrives on
/// `response` — or the 10s deadline elapses.
pub struct Correlator {
    bus: Arc<dyn Bus>,
    pool: Arc<WorkerPool>,
    pending: Arc<DashMap<String, PendingSlot>>,
    request_timeout: Duration,
    consumer_group: String,
}

impl Correlator {
    pub fn new(
        bus: Arc<dyn Bus>,
        pool: Arc<WorkerPool>,
        request_timeout: Duration,
        consumer_group: String,
    ) -> Arc<Self> {
        let correlator = Arc::new(Self {
            bus,
            pool,
            pending: Arc::new(DashMap::new()),
            request_timeout,
            consumer_group,
        });
        correlator.clone().spawn_response_listener();
        correlator
    }

    /// Subscribes to `response`; on each record, looks up `rid` via `correlationId`,
    /// removes the slot atomically and completes it. A record with no matching slot
    /// (late or foreign reply) is acknowledged and discarded — this is normal and must
    /// not error. A record stamped `is_error` (the fetch-side's synthetic error body
    /// after exhausting upstream retries) completes the slot with `Upstream` instead
    /// of resolving it as a successful reply.
    fn spawn_response_listener(self: Arc<Self>) {
        let pending = self.pending.clone();
        let handler = Arc::new(move |record: BusRecord| {
            let Some(rid) = record.correlation_id.or(record.message_key) else {
                tracing::debug!("response record missing correlationId header, discarding");
                return;
            };
            if let Some((_, slot)) = pending.remove(&rid) {
                let result = if record.is_error {
                    Err(ServiceError::Upstream(record.body))
                } else {
                    Ok(record.body)
                };
                let _ = slot.sink.send(result);
            }
        });

        self.bus
            .subscribe(topics::RESPONSE, &self.consumer_group, handler);
    }

    /// Validates, mints an `rid`, publishes on `request`, and suspends the caller
    /// until the reply arrives or the deadline elapses.
    pub async fn query(&self, kind: &str, argument: &str) -> Result<String, ServiceError> {
        let query = QueryKind::from_parts(kind, argument)?;
        let rid = Uuid::new_v4().to_string();

        let (tx, rx) = oneshot::channel();
        match self.pending.entry(rid.clone()) {
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(PendingSlot { sink: tx });
            }
            dashmap::mapref::entry::Entry::Occupied(_) => {
                // rid collision is practically impossible (uuid v4); treat defensively
                // as overloaded rather than silently overwriting a live slot.
                return Err(ServiceError::Overloaded(
                    "correlation id collision".to_string(),
                ));
            }
        }

        let result = self.publish_and_await(&rid, query, rx).await;
        self.pending.remove(&rid);
        result
    }

    async fn publish_and_await(
        &self,
        rid: &str,
        query: QueryKind,
        rx: oneshot::Receiver<Result<String, ServiceError>>,
    ) -> Result<String, ServiceError> {
        let bus = self.bus.clone();
        let pending = self.pending.clone();
        let rid_owned = rid.to_string();
        let body = query.to_envelope();

        let enqueued = self.pool.submit(async move {
            if let Err(err) = bus
                .publish(topics::REQUEST, &rid_owned, &body, Headers::for_request(&rid_owned))
                .await
            {
                tracing::error!(err = ?err, rid = rid_owned, "failed to publish request");
                // The response listener can never complete this slot now — the
                // request never reached the bus — so fail it here rather than let
                // the caller wait out the full deadline for nothing.
                if let Some((_, slot)) = pending.remove(&rid_owned) {
                    let _ = slot.sink.send(Err(err));
                }
            }
        });

        if let Err(err) = enqueued {
            return Err(err);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ServiceError::Upstream("pending slot dropped".to_string())),
            Err(_) => Err(ServiceError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusRecord;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct EchoBus {
        published: StdMutex<Vec<(String, String)>>,
        responder: Arc<StdMutex<Option<Arc<dyn Fn(BusRecord) + Send + Sync>>>>,
    }

    impl EchoBus {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                published: StdMutex::new(Vec::new()),
                responder: Arc::new(StdMutex::new(None)),
            })
        }
    }

    #[async_trait]
    impl Bus for EchoBus {
        async fn publish(
            &self,
            topic: &str,
            _key: &str,
            body: &str,
            headers: Headers,
        ) -> Result<(), ServiceError> {
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), body.to_string()));

            if topic == topics::REQUEST {
                if let Some(responder) = self.responder.lock().unwrap().clone() {
                    responder(BusRecord {
                        key: None,
                        body: format!("{{\"echo\":\"{body}\"}}"),
                        message_key: Some(headers.message_key.clone()),
                        correlation_id: Some(headers.message_key),
                        is_error: false,
                    });
                }
            }
            Ok(())
        }

        fn subscribe(
            &self,
            _topic: &'static str,
            _group: &str,
            handler: Arc<dyn Fn(BusRecord) + Send + Sync>,
        ) -> tokio::task::JoinHandle<()> {
            *self.responder.lock().unwrap() = Some(handler);
            tokio::spawn(async {})
        }
    }

    #[tokio::test]
    async fn query_resolves_on_matching_response() {
        let bus = EchoBus::new();
        let pool = WorkerPool::start(crate::pool::PoolSettings::default());
        let correlator = Correlator::new(bus, pool, Duration::from_secs(1), "edge".to_string());

        let reply = correlator.query("ALL", "").await.unwrap();
        assert!(reply.contains("ALL:"));
    }

    #[tokio::test]
    async fn query_rejects_invalid_kind() {
        let bus = EchoBus::new();
        let pool = WorkerPool::start(crate::pool::PoolSettings::default());
        let correlator = Correlator::new(bus, pool, Duration::from_secs(1), "edge".to_string());

        let err = correlator.query("SINGLE", "usd").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
    }
}
